use std::path::Path;
use std::sync::Mutex;

use deltacov_core::{DeltacovError, Result};
use git2::{Delta, DiffOptions, ErrorCode, Oid, Repository};

use crate::store::{ChangedFile, FileStatus, Resolution, RevisionStore, Snapshot};

/// [`RevisionStore`] backed by a local git repository via git2.
///
/// The repository must already be fetched: this store performs no network
/// operations and no transport or credential configuration. Reads are
/// serialized behind a mutex because the underlying repository handle is
/// not shareable across threads.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use deltacov_revstore::{GitRevisionStore, Resolution, RevisionStore};
///
/// let store = GitRevisionStore::open(Path::new(".")).unwrap();
/// if let Resolution::Found(snap) = store.resolve("master").unwrap() {
///     println!("master is at {}", snap.commit_id);
/// }
/// ```
pub struct GitRevisionStore {
    repo: Mutex<Repository>,
}

impl GitRevisionStore {
    /// Open the repository at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`DeltacovError::Git`] if `path` is not a git repository.
    pub fn open(path: &Path) -> Result<Self> {
        let repo = Repository::open(path)
            .map_err(|e| DeltacovError::Git(format!("failed to open repository: {e}")))?;
        Ok(Self {
            repo: Mutex::new(repo),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Repository>> {
        self.repo
            .lock()
            .map_err(|_| DeltacovError::Git("repository lock poisoned".into()))
    }

    fn tree_of<'r>(repo: &'r Repository, snapshot: &Snapshot) -> Result<git2::Tree<'r>> {
        let oid = Oid::from_str(&snapshot.tree_id)
            .map_err(|e| DeltacovError::Git(format!("invalid tree id: {e}")))?;
        repo.find_tree(oid)
            .map_err(|e| DeltacovError::Git(format!("failed to load tree: {e}")))
    }
}

impl RevisionStore for GitRevisionStore {
    fn resolve(&self, revision: &str) -> Result<Resolution> {
        let repo = self.lock()?;
        let object = match repo.revparse_single(revision) {
            Ok(object) => object,
            Err(e) if e.code() == ErrorCode::NotFound => return Ok(Resolution::NotFound),
            Err(e) if e.code() == ErrorCode::Locked => {
                return Ok(Resolution::Transient(e.message().to_string()));
            }
            Err(e) => return Err(DeltacovError::Git(format!("failed to resolve: {e}"))),
        };
        // Annotated tags peel through to their commit.
        let commit = object
            .peel_to_commit()
            .map_err(|e| DeltacovError::Git(format!("'{revision}' is not a commit: {e}")))?;
        Ok(Resolution::Found(Snapshot {
            revision: revision.to_string(),
            commit_id: commit.id().to_string(),
            tree_id: commit.tree_id().to_string(),
        }))
    }

    fn changed_files(&self, old: &Snapshot, new: &Snapshot) -> Result<Vec<ChangedFile>> {
        let repo = self.lock()?;
        let old_tree = Self::tree_of(&repo, old)?;
        let new_tree = Self::tree_of(&repo, new)?;

        let mut diff_opts = DiffOptions::new();
        let mut diff = repo
            .diff_tree_to_tree(Some(&old_tree), Some(&new_tree), Some(&mut diff_opts))
            .map_err(|e| DeltacovError::Git(format!("failed to compute diff: {e}")))?;

        let mut find_opts = git2::DiffFindOptions::new();
        find_opts.renames(true);
        diff.find_similar(Some(&mut find_opts))
            .map_err(|e| DeltacovError::Git(format!("failed to find renames: {e}")))?;

        let mut changed = Vec::new();
        for delta in diff.deltas() {
            let new_path = delta.new_file().path().map(Path::to_path_buf);
            let old_path = delta.old_file().path().map(Path::to_path_buf);

            match delta.status() {
                Delta::Added => {
                    if let Some(path) = new_path {
                        changed.push(ChangedFile {
                            path,
                            status: FileStatus::Added,
                        });
                    }
                }
                Delta::Deleted => {
                    if let Some(path) = old_path {
                        changed.push(ChangedFile {
                            path,
                            status: FileStatus::Deleted,
                        });
                    }
                }
                // A rename is a tombstone at the old path plus a fresh file
                // at the new one; coverage follows the compiled class name.
                Delta::Renamed => {
                    if let Some(path) = old_path {
                        changed.push(ChangedFile {
                            path,
                            status: FileStatus::Deleted,
                        });
                    }
                    if let Some(path) = new_path {
                        changed.push(ChangedFile {
                            path,
                            status: FileStatus::Added,
                        });
                    }
                }
                _ => {
                    if let Some(path) = new_path {
                        changed.push(ChangedFile {
                            path,
                            status: FileStatus::Modified,
                        });
                    }
                }
            }
        }

        Ok(changed)
    }

    fn read_file(&self, snapshot: &Snapshot, path: &Path) -> Result<Option<String>> {
        let repo = self.lock()?;
        let tree = Self::tree_of(&repo, snapshot)?;
        let entry = match tree.get_path(path) {
            Ok(entry) => entry,
            Err(e) if e.code() == ErrorCode::NotFound => return Ok(None),
            Err(e) => return Err(DeltacovError::Git(format!("failed to walk tree: {e}"))),
        };
        let blob = match repo.find_blob(entry.id()) {
            Ok(blob) => blob,
            // Submodule or tree entry at this path; nothing to read.
            Err(_) => return Ok(None),
        };
        Ok(Some(
            String::from_utf8_lossy(blob.content()).into_owned(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init_repo() -> (tempfile::TempDir, Repository) {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        repo.set_head("refs/heads/master").unwrap();
        (dir, repo)
    }

    fn commit_files(repo: &Repository, files: &[(&str, &str)], message: &str) -> Oid {
        let workdir = repo.workdir().unwrap();
        for (path, content) in files {
            let full = workdir.join(path);
            if let Some(parent) = full.parent() {
                std::fs::create_dir_all(parent).unwrap();
            }
            std::fs::write(&full, content).unwrap();
        }
        let mut index = repo.index().unwrap();
        for (path, _) in files {
            index.add_path(Path::new(path)).unwrap();
        }
        index.write().unwrap();
        write_commit(repo, message)
    }

    fn commit_removal(repo: &Repository, path: &str, message: &str) -> Oid {
        std::fs::remove_file(repo.workdir().unwrap().join(path)).unwrap();
        let mut index = repo.index().unwrap();
        index.remove_path(Path::new(path)).unwrap();
        index.write().unwrap();
        write_commit(repo, message)
    }

    fn write_commit(repo: &Repository, message: &str) -> Oid {
        let tree_id = repo.index().unwrap().write_tree().unwrap();
        let tree = repo.find_tree(tree_id).unwrap();
        let sig = git2::Signature::now("test", "test@example.com").unwrap();
        let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
        let parents: Vec<&git2::Commit> = parent.iter().collect();
        repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
            .unwrap()
    }

    #[test]
    fn resolves_branch_tag_and_commit() {
        let (_dir, repo) = init_repo();
        let oid = commit_files(&repo, &[("a.txt", "one")], "initial");
        repo.tag_lightweight("v1", &repo.find_object(oid, None).unwrap(), false)
            .unwrap();

        let store = GitRevisionStore::open(repo.workdir().unwrap()).unwrap();

        let by_branch = store.resolve("master").unwrap();
        let by_tag = store.resolve("v1").unwrap();
        let by_commit = store.resolve(&oid.to_string()).unwrap();

        let snap = by_branch.found().expect("branch should resolve");
        assert_eq!(snap.commit_id, oid.to_string());
        assert_eq!(by_tag.found().unwrap().commit_id, snap.commit_id);
        assert_eq!(by_commit.found().unwrap().tree_id, snap.tree_id);
    }

    #[test]
    fn unknown_revision_is_not_found_not_an_error() {
        let (_dir, repo) = init_repo();
        commit_files(&repo, &[("a.txt", "one")], "initial");

        let store = GitRevisionStore::open(repo.workdir().unwrap()).unwrap();
        assert_eq!(store.resolve("no-such-branch").unwrap(), Resolution::NotFound);
    }

    #[test]
    fn changed_files_classifies_add_modify_delete() {
        let (_dir, repo) = init_repo();
        commit_files(
            &repo,
            &[("keep.txt", "same"), ("edit.txt", "v1"), ("gone.txt", "bye")],
            "initial",
        );
        let store = GitRevisionStore::open(repo.workdir().unwrap()).unwrap();
        let old = store.resolve("master").unwrap().found().unwrap().clone();

        commit_files(&repo, &[("edit.txt", "v2"), ("fresh.txt", "hi")], "changes");
        commit_removal(&repo, "gone.txt", "remove");
        let new = store.resolve("master").unwrap().found().unwrap().clone();

        let changed = store.changed_files(&old, &new).unwrap();
        let status_of = |name: &str| {
            changed
                .iter()
                .find(|f| f.path == Path::new(name))
                .map(|f| f.status)
        };
        assert_eq!(status_of("fresh.txt"), Some(FileStatus::Added));
        assert_eq!(status_of("edit.txt"), Some(FileStatus::Modified));
        assert_eq!(status_of("gone.txt"), Some(FileStatus::Deleted));
        assert_eq!(status_of("keep.txt"), None);
    }

    #[test]
    fn read_file_returns_snapshot_content() {
        let (_dir, repo) = init_repo();
        commit_files(&repo, &[("src/App.java", "class App {}")], "initial");
        let store = GitRevisionStore::open(repo.workdir().unwrap()).unwrap();
        let old = store.resolve("master").unwrap().found().unwrap().clone();

        commit_files(&repo, &[("src/App.java", "class App { int x; }")], "edit");
        let new = store.resolve("master").unwrap().found().unwrap().clone();

        assert_eq!(
            store.read_file(&old, Path::new("src/App.java")).unwrap(),
            Some("class App {}".to_string())
        );
        assert_eq!(
            store.read_file(&new, Path::new("src/App.java")).unwrap(),
            Some("class App { int x; }".to_string())
        );
        assert_eq!(
            store.read_file(&new, Path::new("src/Missing.java")).unwrap(),
            None
        );
    }

    #[test]
    fn same_tree_detects_identical_snapshots() {
        let (_dir, repo) = init_repo();
        let oid = commit_files(&repo, &[("a.txt", "one")], "initial");
        repo.tag_lightweight("v1", &repo.find_object(oid, None).unwrap(), false)
            .unwrap();

        let store = GitRevisionStore::open(repo.workdir().unwrap()).unwrap();
        let a = store.resolve("master").unwrap().found().unwrap().clone();
        let b = store.resolve("v1").unwrap().found().unwrap().clone();
        assert!(a.same_tree(&b));
        assert!(store.changed_files(&a, &b).unwrap().is_empty());
    }
}
