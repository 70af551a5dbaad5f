//! Reconciliation of compiled-class execution data against a structural
//! diff.
//!
//! A [`CoverageBuilder`] consumes [`CoverageRecord`]s produced by bytecode
//! analysis, matches each one against the classes of a
//! [`DiffResult`](deltacov_core::DiffResult), and narrows line counters to
//! the spans of added and modified methods. Records that cannot be trusted
//! (conflicting compiled forms, duplicate source claims, stale line
//! information) surface through
//! [`no_match_classes`](CoverageBuilder::no_match_classes) instead of
//! silently skewing the report.

mod builder;
mod record;

pub use builder::{
    BundleCoverage, CoverageBuilder, ReconcileStatus, ReconciledClass, SourceFileCoverage,
};
pub use record::{Counter, CoverageRecord, LineHits};
