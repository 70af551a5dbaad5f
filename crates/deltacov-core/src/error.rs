/// Errors that can occur across the deltacov crates.
///
/// Each variant wraps a specific error domain. Fatal conditions
/// ([`DeltacovError::RevisionNotFound`], [`DeltacovError::Cancelled`]) abort
/// the whole diff or reconcile call; per-file degradations (fetch/parse
/// failures) are reported as diagnostics alongside the partial result
/// instead of surfacing here.
///
/// # Examples
///
/// ```
/// use deltacov_core::DeltacovError;
///
/// let err = DeltacovError::RevisionNotFound("release-1.4".into());
/// assert!(err.to_string().contains("release-1.4"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum DeltacovError {
    /// Filesystem I/O failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or missing configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Git operation failure.
    #[error("git error: {0}")]
    Git(String),

    /// Source code parsing failure.
    #[error("parse error: {0}")]
    Parse(String),

    /// A branch, tag, or commit name did not resolve in the revision store.
    #[error("revision not found: {0}")]
    RevisionNotFound(String),

    /// The diff run was cancelled before completion.
    #[error("diff cancelled")]
    Cancelled,

    /// JSON serialization / deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML deserialization failure.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}
