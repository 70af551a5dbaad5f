//! End-to-end diff runs against throwaway git repositories.

use std::path::Path;

use deltacov_core::{ChangeKind, DeltacovError};
use deltacov_diff::{CodeDiff, DiffRunOptions};
use deltacov_revstore::GitRevisionStore;
use git2::{Oid, Repository};

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

    let tree_id = repo.index().unwrap().write_tree().unwrap();
    let tree = repo.find_tree(tree_id).unwrap();
    let sig = git2::Signature::now("test", "test@example.com").unwrap();
    let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
    let parents: Vec<&git2::Commit> = parent.iter().collect();
    repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
        .unwrap()
}

const FOO_V1: &str = "package pkg;\n\npublic class Foo {\n    void bar() {\n        int a = 1;\n    }\n\n    void baz() {\n        int b = 2;\n    }\n}\n";

const FOO_V2: &str = "package pkg;\n\npublic class Foo {\n    void bar() {\n        int a = 42;\n    }\n\n    void baz() {\n        int b = 2;\n    }\n\n    void qux() {\n        int c = 3;\n    }\n}\n";

#[test]
fn branch_to_branch_reports_modified_and_added_methods() {
    let (_dir, repo) = init_repo();
    let base = commit_files(&repo, &[("src/pkg/Foo.java", FOO_V1)], "base");
    repo.branch("feature", &repo.find_commit(base).unwrap(), false)
        .unwrap();
    repo.set_head("refs/heads/feature").unwrap();
    commit_files(&repo, &[("src/pkg/Foo.java", FOO_V2)], "extend foo");

    let store = GitRevisionStore::open(repo.workdir().unwrap()).unwrap();
    let diff = CodeDiff::new(store, DiffRunOptions::default());
    let result = diff.diff_branch_to_branch("feature", "master").unwrap();

    assert_eq!(result.classes.len(), 1);
    let class = &result.classes[0];
    assert_eq!(class.qualified_name(), "pkg/Foo");
    assert_eq!(class.change_kind, ChangeKind::Modified);

    let kinds: Vec<(&str, ChangeKind)> = class
        .methods
        .iter()
        .map(|m| (m.signature.as_str(), m.change_kind))
        .collect();
    assert_eq!(
        kinds,
        vec![("bar()", ChangeKind::Modified), ("qux()", ChangeKind::Added)]
    );
}

#[test]
fn tag_to_tag_reports_the_same_change_set() {
    let (_dir, repo) = init_repo();
    let v1 = commit_files(&repo, &[("src/pkg/Foo.java", FOO_V1)], "release 1");
    repo.tag_lightweight("rel-1", &repo.find_object(v1, None).unwrap(), false)
        .unwrap();
    let v2 = commit_files(&repo, &[("src/pkg/Foo.java", FOO_V2)], "release 2");
    repo.tag_lightweight("rel-2", &repo.find_object(v2, None).unwrap(), false)
        .unwrap();

    let store = GitRevisionStore::open(repo.workdir().unwrap()).unwrap();
    let diff = CodeDiff::new(store, DiffRunOptions::default());
    let result = diff.diff_tag_to_tag("master", "rel-2", "rel-1").unwrap();

    assert_eq!(result.classes.len(), 1);
    assert_eq!(result.classes[0].qualified_name(), "pkg/Foo");
    assert_eq!(result.classes[0].methods.len(), 2);
}

#[test]
fn unresolvable_tag_fails_without_partial_result() {
    let (_dir, repo) = init_repo();
    let v1 = commit_files(&repo, &[("src/pkg/Foo.java", FOO_V1)], "release 1");
    repo.tag_lightweight("rel-1", &repo.find_object(v1, None).unwrap(), false)
        .unwrap();

    let store = GitRevisionStore::open(repo.workdir().unwrap()).unwrap();
    let diff = CodeDiff::new(store, DiffRunOptions::default());
    let err = diff.diff_tag_to_tag("master", "rel-1", "rel-0").unwrap_err();
    assert!(matches!(err, DeltacovError::RevisionNotFound(name) if name == "rel-0"));
}

#[test]
fn equal_revisions_yield_an_empty_diff() {
    let (_dir, repo) = init_repo();
    commit_files(&repo, &[("src/pkg/Foo.java", FOO_V1)], "base");

    let store = GitRevisionStore::open(repo.workdir().unwrap()).unwrap();
    let diff = CodeDiff::new(store, DiffRunOptions::default());
    let result = diff.diff_branch_to_branch("master", "master").unwrap();
    assert!(result.is_empty());
}

#[test]
fn whitespace_only_commits_produce_no_classes() {
    let (_dir, repo) = init_repo();
    let base = commit_files(&repo, &[("src/pkg/Foo.java", FOO_V1)], "base");
    repo.branch("reformat", &repo.find_commit(base).unwrap(), false)
        .unwrap();
    repo.set_head("refs/heads/reformat").unwrap();
    let reformatted = FOO_V1.replace("    ", "\t");
    commit_files(&repo, &[("src/pkg/Foo.java", &reformatted)], "tabs");

    let store = GitRevisionStore::open(repo.workdir().unwrap()).unwrap();
    let diff = CodeDiff::new(store, DiffRunOptions::default());
    let result = diff.diff_branch_to_branch("reformat", "master").unwrap();
    assert!(result.is_empty(), "{:?}", result.classes);
}

#[test]
fn repeated_runs_are_byte_identical() {
    let (_dir, repo) = init_repo();
    let base = commit_files(
        &repo,
        &[
            ("src/pkg/Foo.java", FOO_V1),
            ("src/pkg/Bar.java", "package pkg;\nclass Bar {\n  void b() { int z = 1; }\n}\n"),
        ],
        "base",
    );
    repo.branch("feature", &repo.find_commit(base).unwrap(), false)
        .unwrap();
    repo.set_head("refs/heads/feature").unwrap();
    commit_files(
        &repo,
        &[
            ("src/pkg/Foo.java", FOO_V2),
            ("src/pkg/Bar.java", "package pkg;\nclass Bar {\n  void b() { int z = 9; }\n}\n"),
        ],
        "change both",
    );

    let store = GitRevisionStore::open(repo.workdir().unwrap()).unwrap();
    let diff = CodeDiff::new(store, DiffRunOptions::default());
    let first = diff.diff_branch_to_branch("feature", "master").unwrap();
    let second = diff.diff_branch_to_branch("feature", "master").unwrap();

    assert_eq!(first, second);
    assert_eq!(
        serde_json_bytes(&first),
        serde_json_bytes(&second),
        "serialized results should be byte-identical"
    );
}

fn serde_json_bytes(result: &deltacov_core::DiffResult) -> Vec<u8> {
    serde_json::to_vec(result).unwrap()
}
