//! Shared helpers for git-tf integration tests.
//!
//! Every test gets a temp directory that doubles as the mapped server
//! folder and the git worktree. git is real; the server is [`FakeTf`].
#![allow(dead_code)]

pub mod fake_tf;
pub mod git_fault;

use std::path::Path;
use std::process::{Command, Output};
use std::sync::Arc;

use gittf::clone::{CloneOptions, CloneVersion, clone_repository};
use gittf::config::BridgeConfig;
use gittf::{BridgeError, CommandContext, ContextOptions};
use gittf_tools::ProcessRunner;
use tempfile::TempDir;

pub use fake_tf::FakeTf;
pub use git_fault::GitFault;

pub const EMAIL: &str = "alice@example.com";

pub struct TestRepo {
    dir: TempDir,
    pub tf: Arc<FakeTf>,
}

impl TestRepo {
    /// A mapped folder with no repository; the server has no history.
    pub fn empty() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        let tf = Arc::new(FakeTf::new(dir.path()));
        Self { dir, tf }
    }

    /// Server with a single changeset holding `files`, cloned at latest.
    pub fn cloned_with(files: &[(&str, &str)]) -> Self {
        let repo = Self::empty();
        repo.tf.server_commit("CORP\\alice", "Initial import", files);
        repo.clone_version(CloneVersion::Latest)
            .expect("clone should succeed");
        repo
    }

    pub fn cloned() -> Self {
        Self::cloned_with(&[("readme.txt", "hello\n")])
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn config() -> BridgeConfig {
        BridgeConfig {
            domain: Some("example.com".to_owned()),
            clone_autocrlf: "false".to_owned(),
            ..BridgeConfig::default()
        }
    }

    pub fn context(&self) -> CommandContext {
        self.context_with(ContextOptions::default())
    }

    pub fn context_with(&self, options: ContextOptions) -> CommandContext {
        self.try_context(options).expect("context should open")
    }

    pub fn try_context(&self, options: ContextOptions) -> Result<CommandContext, BridgeError> {
        CommandContext::with_runners(
            self.root().to_path_buf(),
            options,
            Self::config(),
            Arc::new(ProcessRunner::new(self.root())),
            self.tf.clone(),
        )
    }

    /// A context whose git calls go through `git`.
    pub fn context_with_git(&self, git: Arc<GitFault>) -> CommandContext {
        CommandContext::with_runners(
            self.root().to_path_buf(),
            ContextOptions::default(),
            Self::config(),
            git,
            self.tf.clone(),
        )
        .expect("context should open")
    }

    pub fn clone_version(&self, version: CloneVersion) -> Result<(), BridgeError> {
        self.clone_options(&CloneOptions {
            version,
            email: Some(EMAIL.to_owned()),
        })
    }

    pub fn clone_options(&self, options: &CloneOptions) -> Result<(), BridgeError> {
        let mut ctx = self.try_context(ContextOptions::default())?;
        clone_repository(&mut ctx, options)
    }

    // -----------------------------------------------------------------------
    // git helpers
    // -----------------------------------------------------------------------

    pub fn git_output(&self, args: &[&str]) -> Output {
        Command::new("git")
            .args(args)
            .current_dir(self.root())
            .output()
            .expect("failed to run git")
    }

    /// Run git, asserting success; returns trimmed stdout.
    pub fn git(&self, args: &[&str]) -> String {
        let out = self.git_output(args);
        assert!(
            out.status.success(),
            "git {} failed: {}",
            args.join(" "),
            String::from_utf8_lossy(&out.stderr)
        );
        String::from_utf8_lossy(&out.stdout).trim().to_owned()
    }

    pub fn rev(&self, rev: &str) -> String {
        self.git(&["rev-parse", rev])
    }

    pub fn current_branch(&self) -> String {
        self.git(&["rev-parse", "--abbrev-ref", "HEAD"])
    }

    /// The changeset note on `rev`, if any.
    pub fn note(&self, rev: &str) -> Option<String> {
        let out = self.git_output(&["notes", "--ref=tf", "show", rev]);
        out.status
            .success()
            .then(|| String::from_utf8_lossy(&out.stdout).trim().to_owned())
    }

    /// Changeset notes along the first-parent chain of `rev`, newest first.
    pub fn notes_on(&self, rev: &str) -> Vec<String> {
        self.git(&["rev-list", "--first-parent", rev])
            .lines()
            .filter_map(|commit| self.note(commit))
            .collect()
    }

    pub fn write(&self, path: &str, content: &str) {
        let full = self.root().join(path);
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(full, content).unwrap();
    }

    pub fn read(&self, path: &str) -> String {
        std::fs::read_to_string(self.root().join(path)).unwrap()
    }

    /// Stage everything and commit on the current branch.
    pub fn commit_all(&self, message: &str) -> String {
        self.git(&["add", "-A"]);
        self.git(&["commit", "--quiet", "-m", message]);
        self.rev("HEAD")
    }

    pub fn commit_file(&self, path: &str, content: &str, message: &str) -> String {
        self.write(path, content);
        self.commit_all(message)
    }
}
