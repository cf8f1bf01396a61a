//! Push engine: local commits become server changesets.
//!
//! Each commit on the work branch that the mirror branch does not have is
//! checked out, diffed against its parent, and translated into pending
//! server changes (delete, rename, edit, add). The check-in's changeset
//! number is recorded on the commit and the mirror branch is fast-forwarded
//! to it. Any failure undoes the pending changes and returns to the mirror
//! tip before the error propagates; later commits are not attempted.

use std::fs;
use std::io::Write as _;
use std::path::Path;
use std::sync::LazyLock;

use gittf_tools::{ChangeStatus, RawChange};
use regex::Regex;
use tracing::{debug, info, instrument, warn};

use crate::branch::BranchGuard;
use crate::changeset::ChangesetId;
use crate::context::CommandContext;
use crate::error::BridgeError;
use crate::history::HistoryFetcher;
use crate::notes::{CorrelationStore, WorkItemStore, short};
use crate::repair::RepairEngine;

static CHECKIN_CONFIRMATION: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"(?m)^Changeset #(\d+)"));

/// Find the changeset number in `tf checkin` output.
#[must_use]
pub fn parse_checkin_output(output: &str) -> Option<ChangesetId> {
    CHECKIN_CONFIRMATION
        .as_ref()
        .ok()?
        .captures(output)
        .and_then(|caps| caps[1].parse().ok())
}

// ---------------------------------------------------------------------------
// PendingChanges
// ---------------------------------------------------------------------------

/// A rename detected by git.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Rename {
    pub from: String,
    pub to: String,
    /// Similarity percentage; below 100 the content changed too.
    pub similarity: u8,
}

/// The server operations one commit needs, grouped by kind.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PendingChanges {
    pub deleted: Vec<String>,
    pub modified: Vec<String>,
    pub renamed: Vec<Rename>,
    pub added: Vec<String>,
}

impl PendingChanges {
    /// Sort every diff record into exactly one group. Copies become adds of
    /// the destination.
    ///
    /// # Errors
    /// [`BridgeError::UnexpectedChangeType`] for type changes, unmerged,
    /// unknown or broken records. Nothing is classified in that case.
    pub fn classify(commit: &str, changes: &[RawChange]) -> Result<Self, BridgeError> {
        let mut pending = Self::default();
        for change in changes {
            match change.status {
                ChangeStatus::Added => pending.added.push(change.path.clone()),
                ChangeStatus::Copied => pending.added.push(change.new_path().to_owned()),
                ChangeStatus::Deleted => pending.deleted.push(change.path.clone()),
                ChangeStatus::Modified => pending.modified.push(change.path.clone()),
                ChangeStatus::Renamed => pending.renamed.push(Rename {
                    from: change.path.clone(),
                    to: change.new_path().to_owned(),
                    similarity: change.score.unwrap_or(100),
                }),
                ChangeStatus::TypeChanged
                | ChangeStatus::Unmerged
                | ChangeStatus::Unknown
                | ChangeStatus::Broken => {
                    return Err(BridgeError::UnexpectedChangeType {
                        commit: short(commit).to_owned(),
                        change: change.to_string(),
                    });
                }
            }
        }
        Ok(pending)
    }

    /// Total number of classified paths.
    #[must_use]
    pub fn len(&self) -> usize {
        self.deleted.len() + self.modified.len() + self.renamed.len() + self.added.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn print(&self) {
        let groups: [(&str, Vec<String>); 4] = [
            ("Removed", self.deleted.clone()),
            (
                "Renamed",
                self.renamed.iter().map(|r| format!("{} -> {}", r.from, r.to)).collect(),
            ),
            ("Modified", self.modified.clone()),
            ("Added", self.added.clone()),
        ];
        for (label, paths) in groups {
            if paths.is_empty() {
                continue;
            }
            println!("{label}:");
            for path in paths {
                println!("    {path}");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// PushEngine
// ---------------------------------------------------------------------------

/// A commit that reached the server.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PushedCommit {
    pub commit: String,
    pub changeset: ChangesetId,
}

/// Checks in local commits one by one.
#[derive(Debug)]
pub struct PushEngine<'a> {
    ctx: &'a CommandContext,
}

impl<'a> PushEngine<'a> {
    #[must_use]
    pub const fn new(ctx: &'a CommandContext) -> Self {
        Self { ctx }
    }

    /// Commits on the work branch that are not on the mirror branch, oldest
    /// first, following first parents only.
    ///
    /// # Errors
    /// Tool errors.
    pub fn unpushed(&self, limit: Option<usize>) -> Result<Vec<String>, BridgeError> {
        let range = format!("{}..{}", self.ctx.mirror_branch(), self.ctx.work_branch());
        let mut commits = self.ctx.git().rev_list(&range, true, None)?;
        if let Some(limit) = limit {
            commits.truncate(limit);
        }
        Ok(commits)
    }

    /// Push up to `limit` commits.
    ///
    /// # Errors
    /// [`BridgeError::WorkBranchBehindMirror`] or
    /// [`BridgeError::UnfetchedServerHistory`] before anything is touched;
    /// otherwise the first per-commit failure, after repair.
    #[instrument(skip(self))]
    pub fn push(&self, limit: Option<usize>) -> Result<Vec<PushedCommit>, BridgeError> {
        let git = self.ctx.git();
        let mirror = self.ctx.mirror_branch();
        let work = self.ctx.work_branch();

        let _branch = BranchGuard::switch(git, work)?;

        if !git.is_ancestor(mirror, work)? {
            return Err(BridgeError::WorkBranchBehindMirror {
                work: work.to_owned(),
                mirror: mirror.to_owned(),
            });
        }

        println!("Last synchronized commit: {}", git.short_hash(mirror)?);
        let commits = self.unpushed(limit)?;
        if commits.is_empty() {
            println!("Nothing to push");
            return Ok(Vec::new());
        }

        let fetched = CorrelationStore::new(git).latest_on_branch(mirror)?;
        let latest = HistoryFetcher::new(self.ctx.tf()).latest()?;
        if latest.id > fetched {
            return Err(BridgeError::UnfetchedServerHistory {
                fetched,
                latest: latest.id,
            });
        }

        println!("{} commit(s) to be pushed", commits.len());
        let total = commits.len();
        let mut pushed = Vec::with_capacity(total);
        for (index, commit) in commits.iter().enumerate() {
            match self.push_one(commit, index, total) {
                Ok(changeset) => pushed.push(PushedCommit {
                    commit: commit.clone(),
                    changeset,
                }),
                Err(err) => {
                    warn!(commit = short(commit), %err, "push failed; restoring");
                    if let Err(repair_err) = RepairEngine::new(self.ctx).restore(mirror) {
                        warn!(%repair_err, "restore failed; run `git tf repair`");
                    }
                    return Err(err);
                }
            }
        }
        Ok(pushed)
    }

    fn push_one(&self, commit: &str, index: usize, total: usize) -> Result<ChangesetId, BridgeError> {
        let git = self.ctx.git();
        let tf = self.ctx.tf();

        git.checkout(commit)?;
        let subject = git.tool().query(["log", "-1", "--format=%h %s", commit])?;
        println!("Pushing [{}/{total}] {subject}", index + 1);

        let pending = PendingChanges::classify(commit, &git.raw_diff(commit)?)?;
        pending.print();
        debug!(paths = pending.len(), "classified changes");

        tf.delete(&pending.deleted)?;
        for rename in &pending.renamed {
            self.pend_rename(rename)?;
        }
        tf.checkout(&pending.modified)?;
        tf.add(&pending.added)?;

        println!("Checking in...");
        let message = git.commit_message(commit)?;
        let mut comment = tempfile::NamedTempFile::new()?;
        comment.write_all(message.trim().as_bytes())?;
        comment.flush()?;
        let work_items = WorkItemStore::new(git).list(commit)?;

        let output = tf.checkin(comment.path(), &work_items).map_err(|err| {
            BridgeError::CheckInFailed {
                commit: short(commit).to_owned(),
                output: err.detail(),
            }
        })?;
        let changeset = parse_checkin_output(&output).ok_or_else(|| BridgeError::CheckInFailed {
            commit: short(commit).to_owned(),
            output: output.clone(),
        })?;
        info!(commit = short(commit), %changeset, "checked in");

        let mirror = self.ctx.mirror_branch();
        git.checkout(mirror)?;
        git.merge_ff_only(commit)
            .map_err(|err| BridgeError::MergeNotFastForward {
                branch: mirror.to_owned(),
                commit: short(commit).to_owned(),
                detail: err.detail(),
            })?;
        CorrelationStore::new(git).record(commit, changeset)?;
        println!("Checked in C{changeset}; '{mirror}' moved to {}", short(commit));
        Ok(changeset)
    }

    /// `tf rename` expects the old path on disk, but the worktree already
    /// holds the commit's state. Move the file back first, and forward again
    /// if the server refuses.
    fn pend_rename(&self, rename: &Rename) -> Result<(), BridgeError> {
        let tf = self.ctx.tf();
        let root = self.ctx.root();
        let from = root.join(&rename.from);
        let to = root.join(&rename.to);

        if !self.ctx.dry_run() {
            create_parent(&from)?;
            fs::rename(&to, &from)?;
            create_parent(&to)?;
        }
        if let Err(err) = tf.rename(&rename.from, &rename.to) {
            if !self.ctx.dry_run() {
                fs::rename(&from, &to)?;
            }
            return Err(err.into());
        }
        if rename.similarity < 100 {
            tf.checkout(std::slice::from_ref(&rename.to))?;
        }
        Ok(())
    }
}

fn create_parent(path: &Path) -> std::io::Result<()> {
    match path.parent() {
        Some(parent) => fs::create_dir_all(parent),
        None => Ok(()),
    }
}
