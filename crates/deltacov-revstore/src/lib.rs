//! Revision snapshot access for deltacov.
//!
//! Defines the [`RevisionStore`] capability the diff aggregator depends on
//! (resolve a revision name, enumerate changed paths, read a file at a
//! snapshot) and provides [`GitRevisionStore`], a git2-backed implementation
//! over an already-fetched local repository. Transport, credentials, and
//! fetch policy stay with the caller.

mod git;
mod store;

pub use git::GitRevisionStore;
pub use store::{ChangedFile, FileStatus, Resolution, RevisionStore, Snapshot};
