use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::DeltacovError;
use crate::types::{ReportMode, SignaturePolicy};

/// Top-level configuration loaded from `.deltacov.toml`.
///
/// The core consumes these values but does not own how they are produced;
/// a CLI or CI wrapper may override any field before handing the config in.
///
/// # Examples
///
/// ```
/// use deltacov_core::DeltacovConfig;
///
/// let config = DeltacovConfig::default();
/// assert_eq!(config.diff.old_revision, "master");
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeltacovConfig {
    /// Repository location settings.
    #[serde(default)]
    pub repo: RepoConfig,
    /// Revision pair and diff behavior settings.
    #[serde(default)]
    pub diff: DiffConfig,
    /// Reconciliation and reporting settings.
    #[serde(default)]
    pub report: ReportConfig,
}

impl DeltacovConfig {
    /// Load configuration from a TOML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`DeltacovError::Io`] if the file cannot be read, or
    /// [`DeltacovError::Toml`] if the content is not valid TOML.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use deltacov_core::DeltacovConfig;
    /// use std::path::Path;
    ///
    /// let config = DeltacovConfig::from_file(Path::new(".deltacov.toml")).unwrap();
    /// ```
    pub fn from_file(path: &Path) -> Result<Self, DeltacovError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`DeltacovError::Toml`] if parsing fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use deltacov_core::DeltacovConfig;
    ///
    /// let toml = r#"
    /// [diff]
    /// new_revision = "feature/login"
    /// "#;
    /// let config = DeltacovConfig::from_toml(toml).unwrap();
    /// assert_eq!(config.diff.new_revision, "feature/login");
    /// ```
    pub fn from_toml(content: &str) -> Result<Self, DeltacovError> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }
}

/// Repository location settings.
///
/// # Examples
///
/// ```
/// use std::path::PathBuf;
/// use deltacov_core::RepoConfig;
///
/// let config = RepoConfig::default();
/// assert_eq!(config.path, PathBuf::from("."));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoConfig {
    /// Local path of the (already fetched) git repository.
    #[serde(default = "default_repo_path")]
    pub path: PathBuf,
}

fn default_repo_path() -> PathBuf {
    PathBuf::from(".")
}

impl Default for RepoConfig {
    fn default() -> Self {
        Self {
            path: default_repo_path(),
        }
    }
}

/// Revision pair and diff behavior settings.
///
/// For branch-to-branch comparisons only `new_revision`/`old_revision` are
/// used. For tag-to-tag comparisons both names are tag names and `branch`
/// names the branch the tags were cut from.
///
/// # Examples
///
/// ```
/// use deltacov_core::DiffConfig;
///
/// let config = DiffConfig::default();
/// assert_eq!(config.old_revision, "master");
/// assert_eq!(config.workers, 0);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiffConfig {
    /// Name of the revision under test (branch, tag, or commit-ish).
    #[serde(default)]
    pub new_revision: String,
    /// Name of the baseline revision (default: `master`).
    #[serde(default = "default_old_revision")]
    pub old_revision: String,
    /// Branch the tags belong to; only meaningful for tag-to-tag diffs.
    #[serde(default)]
    pub branch: Option<String>,
    /// Worker pool size for per-file work; 0 means available parallelism.
    #[serde(default)]
    pub workers: usize,
}

fn default_old_revision() -> String {
    "master".into()
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            new_revision: String::new(),
            old_revision: default_old_revision(),
            branch: None,
            workers: 0,
        }
    }
}

impl DiffConfig {
    /// Check that every configured revision name is a non-empty string.
    ///
    /// Resolution against the revision store is attempted only after this
    /// passes.
    ///
    /// # Errors
    ///
    /// Returns [`DeltacovError::Config`] naming the offending field.
    ///
    /// # Examples
    ///
    /// ```
    /// use deltacov_core::DiffConfig;
    ///
    /// let mut config = DiffConfig::default();
    /// assert!(config.validate().is_err());
    ///
    /// config.new_revision = "feature/login".into();
    /// assert!(config.validate().is_ok());
    /// ```
    pub fn validate(&self) -> Result<(), DeltacovError> {
        if self.new_revision.trim().is_empty() {
            return Err(DeltacovError::Config(
                "diff.new_revision must not be empty".into(),
            ));
        }
        if self.old_revision.trim().is_empty() {
            return Err(DeltacovError::Config(
                "diff.old_revision must not be empty".into(),
            ));
        }
        if let Some(branch) = &self.branch {
            if branch.trim().is_empty() {
                return Err(DeltacovError::Config(
                    "diff.branch must not be empty when set".into(),
                ));
            }
        }
        Ok(())
    }
}

/// Reconciliation and reporting settings.
///
/// # Examples
///
/// ```
/// use deltacov_core::{ReportConfig, ReportMode};
///
/// let config = ReportConfig::default();
/// assert_eq!(config.mode, ReportMode::Incremental);
/// assert_eq!(config.bundle_name, "deltacov");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Whether untouched classes appear in the output.
    #[serde(default)]
    pub mode: ReportMode,
    /// Overload-identity rule used when building method signatures.
    #[serde(default)]
    pub signature_policy: SignaturePolicy,
    /// Name given to the aggregated bundle view.
    #[serde(default = "default_bundle_name")]
    pub bundle_name: String,
}

fn default_bundle_name() -> String {
    "deltacov".into()
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            mode: ReportMode::default(),
            signature_policy: SignaturePolicy::default(),
            bundle_name: default_bundle_name(),
        }
    }
}
