use std::path::{Path, PathBuf};

use deltacov_core::Result;

/// A resolved, immutable tree snapshot.
///
/// Two snapshots are comparable only through
/// [`RevisionStore::changed_files`]; equality of the tree id means equality
/// of content.
///
/// # Examples
///
/// ```
/// use deltacov_revstore::Snapshot;
///
/// let snap = Snapshot {
///     revision: "release-2.1".into(),
///     commit_id: "0123abcd".into(),
///     tree_id: "feed4567".into(),
/// };
/// assert_eq!(snap.revision, "release-2.1");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// The revision name this snapshot was resolved from.
    pub revision: String,
    /// Commit object id, hex-encoded.
    pub commit_id: String,
    /// Root tree object id, hex-encoded.
    pub tree_id: String,
}

impl Snapshot {
    /// Returns `true` if both snapshots point at the same tree content.
    pub fn same_tree(&self, other: &Snapshot) -> bool {
        self.tree_id == other.tree_id
    }
}

/// Outcome of resolving a revision name.
///
/// A tagged result instead of exception-subtype dispatch: callers decide
/// whether an unresolvable name is fatal without inspecting error internals.
///
/// # Examples
///
/// ```
/// use deltacov_revstore::Resolution;
///
/// let res = Resolution::NotFound;
/// assert!(res.found().is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The name resolved to a snapshot.
    Found(Snapshot),
    /// No branch, tag, or commit by that name exists in the store.
    NotFound,
    /// The store could not answer right now (I/O, lock contention); the
    /// name may still exist.
    Transient(String),
}

impl Resolution {
    /// The snapshot, if resolution succeeded.
    pub fn found(&self) -> Option<&Snapshot> {
        match self {
            Resolution::Found(snapshot) => Some(snapshot),
            _ => None,
        }
    }
}

/// Status of one path that differs between two snapshots.
///
/// # Examples
///
/// ```
/// use deltacov_revstore::FileStatus;
///
/// assert_ne!(FileStatus::Added, FileStatus::Deleted);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    /// Present only in the new snapshot.
    Added,
    /// Present in both snapshots with differing content.
    Modified,
    /// Tombstone: present only in the old snapshot.
    Deleted,
}

/// One path that differs between two snapshots.
///
/// # Examples
///
/// ```
/// use std::path::PathBuf;
/// use deltacov_revstore::{ChangedFile, FileStatus};
///
/// let file = ChangedFile {
///     path: PathBuf::from("src/main/java/App.java"),
///     status: FileStatus::Modified,
/// };
/// assert_eq!(file.status, FileStatus::Modified);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangedFile {
    /// Path relative to the repository root; the old-side path for
    /// deletions, the new-side path otherwise.
    pub path: PathBuf,
    /// How the path differs.
    pub status: FileStatus,
}

/// Read-only access to historical tree snapshots.
///
/// Implementations are pre-configured by the caller; this crate never
/// handles transport, credentials, or fetching. Methods may block on I/O,
/// so callers that need timeouts apply them at this boundary.
pub trait RevisionStore: Send + Sync {
    /// Resolve a branch, tag, or commit-ish name to a snapshot.
    ///
    /// # Errors
    ///
    /// Only infrastructure failures surface as `Err`; an unknown name is
    /// [`Resolution::NotFound`], not an error.
    fn resolve(&self, revision: &str) -> Result<Resolution>;

    /// Enumerate paths that differ between two snapshots, in a stable
    /// order. Deletions are reported with a tombstone status.
    fn changed_files(&self, old: &Snapshot, new: &Snapshot) -> Result<Vec<ChangedFile>>;

    /// Full text of `path` at `snapshot`, or `None` if the path does not
    /// exist there.
    fn read_file(&self, snapshot: &Snapshot, path: &Path) -> Result<Option<String>>;
}
