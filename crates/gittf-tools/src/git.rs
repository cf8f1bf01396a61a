//! Typed git subcommands.
//!
//! Navigation (`checkout <branch>`) runs even in dry-run mode; everything
//! that writes objects, refs, notes or config is a mutation.

use std::path::PathBuf;
use std::sync::Arc;

use crate::diff::{RawChange, parse_raw_diff};
use crate::error::ToolError;
use crate::runner::ToolRunner;
use crate::tool::Tool;

/// Metadata for a commit created on behalf of a server changeset.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommitSpec {
    /// Full commit message.
    pub message: String,
    /// `Name <email>` author identity.
    pub author: String,
    /// Author date in a format `git commit --date` accepts (RFC 3339).
    pub date: String,
    /// Create the commit even if the index matches `HEAD`.
    pub allow_empty: bool,
}

/// The git client.
#[derive(Clone, Debug)]
pub struct Git {
    tool: Tool,
}

impl Git {
    /// Wrap `git` run through `runner`.
    #[must_use]
    pub fn new(runner: Arc<dyn ToolRunner>, dry_run: bool) -> Self {
        Self {
            tool: Tool::new("git", runner, dry_run),
        }
    }

    /// The underlying [`Tool`], for pass-through commands.
    #[must_use]
    pub const fn tool(&self) -> &Tool {
        &self.tool
    }

    // -----------------------------------------------------------------------
    // Repository discovery and status
    // -----------------------------------------------------------------------

    /// `true` if the runner's directory is inside a git repository.
    ///
    /// # Errors
    /// Runner errors only.
    pub fn is_repository(&self) -> Result<bool, ToolError> {
        Ok(self.tool.query_opt(["rev-parse", "--git-dir"])?.is_some())
    }

    /// Absolute path of the worktree root.
    ///
    /// # Errors
    /// Fails outside a repository.
    pub fn toplevel(&self) -> Result<PathBuf, ToolError> {
        self.tool
            .query(["rev-parse", "--show-toplevel"])
            .map(PathBuf::from)
    }

    /// Porcelain status, including untracked files. Empty means clean.
    ///
    /// # Errors
    /// Fails outside a repository.
    pub fn status_porcelain(&self) -> Result<String, ToolError> {
        self.tool.query(["status", "--porcelain", "--untracked-files=all"])
    }

    /// `true` if the worktree or index differs from `HEAD`.
    ///
    /// # Errors
    /// Fails outside a repository.
    pub fn has_changes(&self) -> Result<bool, ToolError> {
        Ok(!self.status_porcelain()?.is_empty())
    }

    /// The short name of the checked-out branch, or `None` when `HEAD` is
    /// detached.
    ///
    /// # Errors
    /// Runner errors only.
    pub fn current_branch(&self) -> Result<Option<String>, ToolError> {
        self.tool.query_opt(["symbolic-ref", "--quiet", "--short", "HEAD"])
    }

    /// Resolve a revision to a full commit hash.
    ///
    /// # Errors
    /// Fails when the revision does not resolve.
    pub fn rev_parse(&self, rev: &str) -> Result<String, ToolError> {
        self.tool
            .query(["rev-parse", "--verify", "--quiet", &format!("{rev}^{{commit}}")])
    }

    /// Like [`rev_parse`](Self::rev_parse) but `None` for unknown revisions.
    ///
    /// # Errors
    /// Runner errors only.
    pub fn rev_parse_opt(&self, rev: &str) -> Result<Option<String>, ToolError> {
        self.tool
            .query_opt(["rev-parse", "--verify", "--quiet", &format!("{rev}^{{commit}}")])
    }

    /// Abbreviated hash of `rev`.
    ///
    /// # Errors
    /// Fails when the revision does not resolve.
    pub fn short_hash(&self, rev: &str) -> Result<String, ToolError> {
        self.tool.query(["rev-parse", "--short", rev])
    }

    /// Commit hashes in `range`, following first parents.
    ///
    /// # Errors
    /// Fails on an invalid range.
    pub fn rev_list(&self, range: &str, oldest_first: bool, limit: Option<usize>) -> Result<Vec<String>, ToolError> {
        let mut args = vec!["rev-list".to_owned(), "--first-parent".to_owned()];
        if oldest_first {
            args.push("--reverse".to_owned());
        }
        if let Some(n) = limit {
            args.push(format!("--max-count={n}"));
        }
        args.push(range.to_owned());
        Ok(self
            .tool
            .query(args)?
            .lines()
            .filter(|l| !l.is_empty())
            .map(str::to_owned)
            .collect())
    }

    /// `true` if `ancestor` is reachable from `descendant`.
    ///
    /// # Errors
    /// Fails when either revision does not resolve.
    pub fn is_ancestor(&self, ancestor: &str, descendant: &str) -> Result<bool, ToolError> {
        let out = self
            .tool
            .query_allowing(["merge-base", "--is-ancestor", ancestor, descendant], &[0, 1])?;
        Ok(out.exit_code == 0)
    }

    /// `<short hash> <subject>` lines for `range`, first parents only.
    ///
    /// # Errors
    /// Fails on an invalid range.
    pub fn oneline_log(&self, range: &str) -> Result<Vec<String>, ToolError> {
        Ok(self
            .tool
            .query(["log", "--first-parent", "--format=%h %s", range])?
            .lines()
            .map(str::to_owned)
            .collect())
    }

    /// Full message of a commit (subject and body).
    ///
    /// # Errors
    /// Fails when the commit does not exist.
    pub fn commit_message(&self, rev: &str) -> Result<String, ToolError> {
        self.tool.query(["log", "-1", "--format=%B", rev])
    }

    /// Raw diff of `commit` against its first parent, with rename and copy
    /// detection.
    ///
    /// # Errors
    /// Fails for root commits or unparsable output.
    pub fn raw_diff(&self, commit: &str) -> Result<Vec<RawChange>, ToolError> {
        let raw = self.tool.query_raw([
            "diff",
            "--raw",
            "-z",
            "--no-color",
            "-M",
            "--find-copies-harder",
            &format!("{commit}^"),
            commit,
        ])?;
        parse_raw_diff(&raw)
    }

    // -----------------------------------------------------------------------
    // Navigation
    // -----------------------------------------------------------------------

    /// `git checkout <target>`. Runs in dry-run mode too.
    ///
    /// # Errors
    /// Fails when git refuses (e.g. local changes would be overwritten).
    pub fn checkout(&self, target: &str) -> Result<(), ToolError> {
        self.tool.query(["checkout", "--quiet", target]).map(drop)
    }

    /// `git checkout -f <target>`, discarding local modifications.
    ///
    /// # Errors
    /// Fails when the target does not exist.
    pub fn checkout_force(&self, target: &str) -> Result<(), ToolError> {
        self.tool
            .mutate(["checkout", "--quiet", "-f", target], "")
            .map(drop)
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    /// `git init` in the runner's directory.
    ///
    /// # Errors
    /// Fails when git cannot create the repository.
    pub fn init(&self) -> Result<(), ToolError> {
        self.tool.mutate(["init", "--quiet"], "").map(drop)
    }

    /// Point `HEAD` at `refs/heads/<branch>` (used before the first commit).
    ///
    /// # Errors
    /// Fails outside a repository.
    pub fn set_head_branch(&self, branch: &str) -> Result<(), ToolError> {
        self.tool
            .mutate(["symbolic-ref", "HEAD", &format!("refs/heads/{branch}")], "")
            .map(drop)
    }

    /// Stage every change in the worktree, including deletions.
    ///
    /// # Errors
    /// Fails when the index cannot be written.
    pub fn add_all(&self) -> Result<(), ToolError> {
        self.tool.mutate(["add", "-A", "."], "").map(drop)
    }

    /// Create a commit with explicit author metadata; returns git's summary.
    ///
    /// # Errors
    /// Fails when git rejects the commit.
    pub fn commit(&self, spec: &CommitSpec) -> Result<String, ToolError> {
        let mut args = vec!["commit".to_owned(), "--quiet".to_owned()];
        if spec.allow_empty {
            args.push("--allow-empty".to_owned());
        }
        args.push("-m".to_owned());
        args.push(spec.message.clone());
        args.push(format!("--author={}", spec.author));
        args.push(format!("--date={}", spec.date));
        self.tool.mutate(args, "")
    }

    /// Commit whatever is staged (or nothing) with a plain message.
    ///
    /// # Errors
    /// Fails when git rejects the commit.
    pub fn commit_empty(&self, message: &str) -> Result<(), ToolError> {
        self.tool
            .mutate(["commit", "--quiet", "--allow-empty", "-m", message], "")
            .map(drop)
    }

    /// Force-create (or move) `branch` at `start` (default `HEAD`).
    ///
    /// # Errors
    /// Fails on an invalid branch name.
    pub fn branch_force(&self, branch: &str, start: Option<&str>) -> Result<(), ToolError> {
        let mut args = vec!["branch", "-f", branch];
        args.extend(start);
        self.tool.mutate(args, "").map(drop)
    }

    /// Make `upstream` the tracking branch of `branch`.
    ///
    /// # Errors
    /// Fails when either branch is missing.
    pub fn set_upstream(&self, branch: &str, upstream: &str) -> Result<(), ToolError> {
        self.tool
            .mutate(
                ["branch", "--quiet", &format!("--set-upstream-to={upstream}"), branch],
                "",
            )
            .map(drop)
    }

    /// `git reset --hard [target]`.
    ///
    /// # Errors
    /// Fails when the target does not resolve.
    pub fn reset_hard(&self, target: Option<&str>) -> Result<(), ToolError> {
        let mut args = vec!["reset", "--quiet", "--hard"];
        args.extend(target);
        self.tool.mutate(args, "").map(drop)
    }

    /// Remove untracked files and directories.
    ///
    /// # Errors
    /// Fails when files cannot be removed.
    pub fn clean(&self) -> Result<(), ToolError> {
        self.tool.mutate(["clean", "-f", "-d", "--quiet"], "").map(drop)
    }

    /// Fast-forward the current branch to `commit`, never creating a merge.
    ///
    /// # Errors
    /// Fails when a fast-forward is impossible.
    pub fn merge_ff_only(&self, commit: &str) -> Result<(), ToolError> {
        self.tool
            .mutate(["merge", "--quiet", "--ff-only", commit], "")
            .map(drop)
    }

    /// Rebase the current branch onto `upstream`.
    ///
    /// # Errors
    /// Fails on conflicts (the rebase is left in progress).
    pub fn rebase(&self, upstream: &str) -> Result<String, ToolError> {
        self.tool.mutate(["rebase", upstream], "")
    }

    // -----------------------------------------------------------------------
    // Notes
    // -----------------------------------------------------------------------

    /// Note text attached to `commit` in namespace `refs/notes/<ns>`.
    ///
    /// # Errors
    /// Runner errors only; a missing note is `None`.
    pub fn notes_show(&self, ns: &str, commit: &str) -> Result<Option<String>, ToolError> {
        self.tool
            .query_opt(["notes", &format!("--ref={ns}"), "show", commit])
    }

    /// Attach `message` to `commit`. Without `force`, an existing note makes
    /// this fail.
    ///
    /// # Errors
    /// Fails when a note exists and `force` is off.
    pub fn notes_add(&self, ns: &str, commit: &str, message: &str, force: bool) -> Result<(), ToolError> {
        let ns_arg = format!("--ref={ns}");
        let mut args = vec!["notes", ns_arg.as_str(), "add"];
        if force {
            args.push("-f");
        }
        args.extend(["-m", message, commit]);
        self.tool.mutate(args, "").map(drop)
    }

    /// Remove the note on `commit`; a missing note is not an error.
    ///
    /// # Errors
    /// Runner errors only.
    pub fn notes_remove(&self, ns: &str, commit: &str) -> Result<(), ToolError> {
        self.tool
            .mutate(
                ["notes", &format!("--ref={ns}"), "remove", "--ignore-missing", commit],
                "",
            )
            .map(drop)
    }

    // -----------------------------------------------------------------------
    // Config
    // -----------------------------------------------------------------------

    /// Read a config value; `None` when unset.
    ///
    /// # Errors
    /// Runner errors only.
    pub fn config_get(&self, key: &str) -> Result<Option<String>, ToolError> {
        Ok(self
            .tool
            .query_opt(["config", "--get", key])?
            .filter(|v| !v.is_empty()))
    }

    /// Write a repository-local config value.
    ///
    /// # Errors
    /// Fails outside a repository.
    pub fn config_set(&self, key: &str, value: &str) -> Result<(), ToolError> {
        self.tool.mutate(["config", key, value], "").map(drop)
    }
}
