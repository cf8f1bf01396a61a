//! Integration tests for `git tf clone`.

mod common;

use std::sync::Arc;

use common::{FakeTf, TestRepo};
use gittf::clone::{CloneOptions, CloneVersion, ROOT_COMMIT_MESSAGE};
use gittf::{BridgeError, ChangesetId};
use tempfile::TempDir;

fn server_with_three(repo: &TestRepo) {
    repo.tf.server_commit("CORP\\alice", "First", &[("a.txt", "one\n")]);
    repo.tf
        .server_commit("CORP\\bob", "Second", &[("a.txt", "two\n")]);
    repo.tf.server_commit(
        "CORP\\carol",
        "Third",
        &[("a.txt", "two\n"), ("docs/b.txt", "bee\n")],
    );
}

#[test]
fn clone_latest_imports_one_changeset() {
    let repo = TestRepo::empty();
    server_with_three(&repo);

    repo.clone_version(CloneVersion::Latest).unwrap();

    assert_eq!(repo.current_branch(), "master");
    assert_eq!(repo.rev("master"), repo.rev("tfs"));
    assert_eq!(repo.notes_on("tfs"), vec!["3"]);
    assert_eq!(repo.read("docs/b.txt"), "bee\n");
    assert_eq!(repo.git(&["log", "-1", "--format=%s", "tfs~1"]), ROOT_COMMIT_MESSAGE);
    assert_eq!(
        repo.git(&["log", "-1", "--format=%an <%ae>", "tfs"]),
        "carol <carol@example.com>"
    );
    assert_eq!(repo.git(&["rev-parse", "--abbrev-ref", "master@{upstream}"]), "tfs");
}

#[test]
fn clone_all_imports_every_changeset_in_order() {
    let repo = TestRepo::empty();
    server_with_three(&repo);

    repo.clone_version(CloneVersion::All).unwrap();

    assert_eq!(repo.notes_on("tfs"), vec!["3", "2", "1"]);
    assert_eq!(repo.git(&["log", "-1", "--format=%s", "tfs~2"]), "First");
    assert_eq!(repo.git(&["status", "--porcelain"]), "");
}

#[test]
fn clone_since_starts_at_the_given_changeset() {
    let repo = TestRepo::empty();
    server_with_three(&repo);

    repo.clone_version(CloneVersion::Since(ChangesetId::new(2)))
        .unwrap();

    assert_eq!(repo.notes_on("tfs"), vec!["3", "2"]);
}

#[test]
fn clone_with_empty_history_leaves_root_commit() {
    let repo = TestRepo::empty();

    repo.clone_version(CloneVersion::Latest).unwrap();

    assert_eq!(repo.git(&["log", "--format=%s", "master"]), ROOT_COMMIT_MESSAGE);
    assert!(repo.notes_on("tfs").is_empty());
}

#[test]
fn clone_into_existing_repository_is_rejected() {
    let repo = TestRepo::cloned();

    let err = repo.clone_version(CloneVersion::Latest).unwrap_err();

    assert!(
        matches!(err, BridgeError::RepositoryExists { has_notes: true }),
        "unexpected error: {err}"
    );
}

#[test]
fn clone_with_malformed_email_removes_git_dir() {
    let repo = TestRepo::empty();
    repo.tf.server_commit("CORP\\alice", "First", &[("a.txt", "one\n")]);

    let err = repo
        .clone_options(&CloneOptions {
            version: CloneVersion::Latest,
            email: Some("not-an-email".to_owned()),
        })
        .unwrap_err();

    assert!(matches!(err, BridgeError::Config { .. }), "unexpected error: {err}");
    assert!(!repo.root().join(".git").exists());
}

#[test]
fn clone_requires_exact_folder_mapping() {
    let mut repo = TestRepo::empty();
    let elsewhere = TempDir::new().unwrap();
    repo.tf = Arc::new(FakeTf::new(elsewhere.path()));

    let err = repo.clone_version(CloneVersion::Latest).unwrap_err();

    assert!(matches!(err, BridgeError::WorkfoldMismatch { .. }), "unexpected error: {err}");
    assert!(!repo.root().join(".git").exists());
}

#[test]
fn clone_refuses_pending_server_changes() {
    let repo = TestRepo::empty();
    repo.tf.server_commit("CORP\\alice", "First", &[("a.txt", "one\n")]);
    repo.tf.add_pending("a.txt");

    let err = repo.clone_version(CloneVersion::Latest).unwrap_err();

    assert!(matches!(err, BridgeError::PendingServerChanges { .. }), "unexpected error: {err}");
    assert!(!repo.root().join(".git").exists());
}

#[test]
fn clone_configures_identity_from_email() {
    let repo = TestRepo::cloned();

    assert_eq!(repo.git(&["config", "user.email"]), "alice@example.com");
    assert_eq!(repo.git(&["config", "user.name"]), "alice");
    assert_eq!(repo.git(&["config", "core.autocrlf"]), "false");
}
