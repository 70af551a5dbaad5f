use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rayon::prelude::*;

use deltacov_core::{
    ChangeKind, ClassInfo, DeltacovConfig, DeltacovError, Diagnostic, DiffResult, Result,
    SignaturePolicy, SkipReason,
};
use deltacov_revstore::{ChangedFile, FileStatus, Resolution, RevisionStore, Snapshot};
use deltacov_structural::{parse, Language, StructuralUnit};

use crate::differ::diff_methods;

/// Cooperative cancellation handle for a running diff.
///
/// Cloning shares the flag; cancelling aborts in-flight per-file work and
/// makes the diff call return [`DeltacovError::Cancelled`].
///
/// # Examples
///
/// ```
/// use deltacov_diff::CancelFlag;
///
/// let flag = CancelFlag::default();
/// assert!(!flag.is_cancelled());
/// flag.cancel();
/// assert!(flag.is_cancelled());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// Request cancellation of the diff sharing this flag.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Returns `true` once cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Options for a diff run.
///
/// # Examples
///
/// ```
/// use deltacov_diff::DiffRunOptions;
///
/// let options = DiffRunOptions::default();
/// assert_eq!(options.workers, 0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct DiffRunOptions {
    /// Worker pool size for per-file fetch+parse+diff; 0 means available
    /// parallelism.
    pub workers: usize,
    /// Overload-identity rule passed to the structural parser.
    pub signature_policy: SignaturePolicy,
    /// Cancellation handle shared with the caller.
    pub cancel: CancelFlag,
}

impl DiffRunOptions {
    /// Build run options from loaded configuration.
    ///
    /// The cancellation flag starts fresh; callers that want to cancel the
    /// run keep a clone of it.
    pub fn from_config(config: &DeltacovConfig) -> Self {
        Self {
            workers: config.diff.workers,
            signature_policy: config.report.signature_policy,
            cancel: CancelFlag::default(),
        }
    }
}

/// Aggregates per-class diff records between two revisions of a repository.
///
/// Resolution and final aggregation run single-threaded for deterministic
/// error reporting and stable output order; the independent per-file work in
/// between fans out over a bounded worker pool. Class order in the result
/// equals the revision store's changed-file order.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use deltacov_diff::{CodeDiff, DiffRunOptions};
/// use deltacov_revstore::GitRevisionStore;
///
/// let store = GitRevisionStore::open(Path::new(".")).unwrap();
/// let diff = CodeDiff::new(store, DiffRunOptions::default());
/// let result = diff.diff_branch_to_branch("feature/login", "master").unwrap();
/// for class in &result.classes {
///     println!("{class}");
/// }
/// ```
pub struct CodeDiff<S: RevisionStore> {
    store: S,
    options: DiffRunOptions,
}

enum FileOutcome {
    Class(ClassInfo),
    Diag(Diagnostic),
    Skip,
}

impl<S: RevisionStore> CodeDiff<S> {
    /// Create an aggregator over a pre-configured revision store.
    pub fn new(store: S, options: DiffRunOptions) -> Self {
        Self { store, options }
    }

    /// Diff two branches (or any two commit-ish names).
    ///
    /// # Errors
    ///
    /// Returns [`DeltacovError::Config`] for empty names,
    /// [`DeltacovError::RevisionNotFound`] if either name does not resolve,
    /// and [`DeltacovError::Cancelled`] if the run was cancelled. Per-file
    /// failures degrade into [`DiffResult::diagnostics`] instead.
    pub fn diff_branch_to_branch(&self, new_revision: &str, old_revision: &str) -> Result<DiffResult> {
        validate_name("new revision", new_revision)?;
        validate_name("old revision", old_revision)?;
        let new = self.resolve_required(new_revision)?;
        let old = self.resolve_required(old_revision)?;
        self.diff_snapshots(&old, &new)
    }

    /// Diff two tags cut from `branch`.
    ///
    /// The branch itself must resolve; this guards against comparing tags
    /// from a repository that never had the release branch fetched.
    ///
    /// # Errors
    ///
    /// Same contract as [`CodeDiff::diff_branch_to_branch`].
    pub fn diff_tag_to_tag(&self, branch: &str, new_tag: &str, old_tag: &str) -> Result<DiffResult> {
        validate_name("branch", branch)?;
        validate_name("new tag", new_tag)?;
        validate_name("old tag", old_tag)?;
        self.resolve_required(branch)?;
        let new = self.resolve_required(new_tag)?;
        let old = self.resolve_required(old_tag)?;
        self.diff_snapshots(&old, &new)
    }

    fn resolve_required(&self, name: &str) -> Result<Snapshot> {
        match self.store.resolve(name)? {
            Resolution::Found(snapshot) => Ok(snapshot),
            Resolution::NotFound => Err(DeltacovError::RevisionNotFound(name.to_string())),
            Resolution::Transient(detail) => Err(DeltacovError::Git(format!(
                "transient failure resolving '{name}': {detail}"
            ))),
        }
    }

    fn diff_snapshots(&self, old: &Snapshot, new: &Snapshot) -> Result<DiffResult> {
        if old.same_tree(new) {
            return Ok(DiffResult::default());
        }

        let changed = self.store.changed_files(old, new)?;

        let mut diagnostics = Vec::new();
        let mut work: Vec<&ChangedFile> = Vec::new();
        for file in &changed {
            if Language::from_path(&file.path).is_none() {
                continue;
            }
            match file.status {
                // No "after" target exists for a deleted file; its classes
                // vanish from the report but the skip stays visible.
                FileStatus::Deleted => diagnostics.push(Diagnostic {
                    path: file.path.clone(),
                    reason: SkipReason::Deleted,
                    detail: "file deleted in new revision".into(),
                }),
                FileStatus::Added | FileStatus::Modified => work.push(file),
            }
        }

        let outcomes: Vec<FileOutcome> = match self.options.workers {
            0 => work
                .par_iter()
                .map(|file| self.process_file(old, new, file))
                .collect(),
            n => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(n)
                    .build()
                    .map_err(|e| {
                        DeltacovError::Config(format!("failed to build worker pool: {e}"))
                    })?;
                pool.install(|| {
                    work.par_iter()
                        .map(|file| self.process_file(old, new, file))
                        .collect()
                })
            }
        };

        if self.options.cancel.is_cancelled() {
            return Err(DeltacovError::Cancelled);
        }

        let mut classes: Vec<ClassInfo> = Vec::new();
        let mut by_name: HashMap<String, usize> = HashMap::new();
        let mut duplicates: Vec<String> = Vec::new();
        for outcome in outcomes {
            match outcome {
                FileOutcome::Class(class) => {
                    let name = class.qualified_name();
                    match by_name.get(&name) {
                        Some(&index) => {
                            // Same qualified name from two files: identical
                            // content merges, conflicting content poisons
                            // the class for reconciliation.
                            let held = &classes[index];
                            let conflicting = held.methods != class.methods
                                || held.change_kind != class.change_kind;
                            if conflicting && !duplicates.contains(&name) {
                                duplicates.push(name);
                            }
                        }
                        None => {
                            by_name.insert(name, classes.len());
                            classes.push(class);
                        }
                    }
                }
                FileOutcome::Diag(diagnostic) => diagnostics.push(diagnostic),
                FileOutcome::Skip => {}
            }
        }

        Ok(DiffResult {
            classes,
            diagnostics,
            duplicate_classes: duplicates,
        })
    }

    fn process_file(&self, old: &Snapshot, new: &Snapshot, file: &ChangedFile) -> FileOutcome {
        if self.options.cancel.is_cancelled() {
            return FileOutcome::Skip;
        }

        let before_text = match self.store.read_file(old, &file.path) {
            Ok(text) => text,
            Err(e) => {
                return FileOutcome::Diag(Diagnostic {
                    path: file.path.clone(),
                    reason: SkipReason::Fetch,
                    detail: format!("old side: {e}"),
                })
            }
        };
        let after_text = match self.store.read_file(new, &file.path) {
            Ok(text) => text,
            Err(e) => {
                return FileOutcome::Diag(Diagnostic {
                    path: file.path.clone(),
                    reason: SkipReason::Fetch,
                    detail: format!("new side: {e}"),
                })
            }
        };

        let before_unit = match self.parse_side(before_text.as_deref(), file) {
            Ok(unit) => unit,
            Err(diag) => return FileOutcome::Diag(diag),
        };
        let after_unit = match self.parse_side(after_text.as_deref(), file) {
            Ok(unit) => unit,
            Err(diag) => return FileOutcome::Diag(diag),
        };

        let methods = diff_methods(before_unit.as_ref(), after_unit.as_ref());
        // A class whose only changes are deletions has no coverage target
        // in the new revision and is never materialized.
        if !methods
            .iter()
            .any(|m| m.change_kind != ChangeKind::Deleted)
        {
            return FileOutcome::Skip;
        }

        let Some(unit) = after_unit.as_ref().or(before_unit.as_ref()) else {
            return FileOutcome::Skip;
        };
        let change_kind = if before_unit.is_none() {
            ChangeKind::Added
        } else {
            ChangeKind::Modified
        };

        FileOutcome::Class(ClassInfo {
            package: unit.package.clone(),
            class_name: unit.class_name.clone(),
            source_path: file.path.clone(),
            methods,
            change_kind,
        })
    }

    fn parse_side(
        &self,
        text: Option<&str>,
        file: &ChangedFile,
    ) -> std::result::Result<Option<StructuralUnit>, Diagnostic> {
        let Some(text) = text else {
            return Ok(None);
        };
        if text.trim().is_empty() {
            return Ok(None);
        }
        parse(text, &file.path, self.options.signature_policy)
            .map(Some)
            .map_err(|e| Diagnostic {
                path: file.path.clone(),
                reason: SkipReason::Parse,
                detail: e.to_string(),
            })
    }
}

fn validate_name(what: &str, name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(DeltacovError::Config(format!("{what} must not be empty")));
    }
    Ok(())
}
