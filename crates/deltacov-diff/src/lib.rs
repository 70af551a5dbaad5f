//! Method-level structural diffing between two revisions.
//!
//! [`diff_methods`] classifies each method of one file as added, modified,
//! or deleted by signature and normalized-body fingerprint; [`CodeDiff`]
//! orchestrates a whole run: resolve the revision pair, fan the changed
//! files out over a bounded worker pool, and aggregate per-class records in
//! a stable order with degraded failures collected as diagnostics.

mod aggregate;
mod differ;

pub use aggregate::{CancelFlag, CodeDiff, DiffRunOptions};
pub use differ::diff_methods;
