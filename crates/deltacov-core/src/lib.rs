//! Core types, configuration, and error handling for deltacov.
//!
//! This crate provides the shared foundation used by all other deltacov
//! crates:
//! - [`DeltacovError`] — unified error type using `thiserror`
//! - [`DeltacovConfig`] — configuration loaded from `.deltacov.toml`
//! - Shared types: [`ChangeKind`], [`MethodInfo`], [`ClassInfo`],
//!   [`DiffResult`], [`Diagnostic`], [`ReportMode`], [`SignaturePolicy`]

mod config;
mod error;
mod types;

pub use config::{DeltacovConfig, DiffConfig, RepoConfig, ReportConfig};
pub use error::DeltacovError;
pub use types::{
    ChangeKind, ClassInfo, Diagnostic, DiffResult, MethodInfo, ReportMode, SignaturePolicy,
    SkipReason,
};

/// A convenience `Result` type for deltacov operations.
pub type Result<T> = std::result::Result<T, DeltacovError>;
