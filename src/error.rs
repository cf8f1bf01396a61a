//! Error types for git-tf.
//!
//! [`BridgeError`] is returned by every engine. Each variant carries the
//! context needed to act on it (changeset ids, commit refs, tool output) and
//! its `Display` ends with a "To fix:" hint. Callers that need to branch on
//! the failure match on [`BridgeError::kind`].

use std::fmt;
use std::path::PathBuf;

use gittf_tools::ToolError;

use crate::changeset::ChangesetId;

// ---------------------------------------------------------------------------
// ErrorKind
// ---------------------------------------------------------------------------

/// Payload-free tag for each [`BridgeError`] variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    DirtyWorktree,
    PendingServerChanges,
    MissingCorrelation,
    UnfetchedServerHistory,
    UnexpectedChangeType,
    CheckInFailed,
    MergeNotFastForward,
    CommandInProgress,
    DetachedHead,
    WorkBranchBehindMirror,
    EmptyChangeset,
    ReplayDiverged,
    WorkfoldMismatch,
    RepositoryExists,
    NotARepository,
    WorkItemNotAssociated,
    NoServerHistory,
    MalformedHistory,
    RebaseConflict,
    Config,
    Tool,
    Io,
}

// ---------------------------------------------------------------------------
// BridgeError
// ---------------------------------------------------------------------------

/// Everything that can abort a git-tf command.
#[derive(Debug)]
pub enum BridgeError {
    /// The git worktree or index has uncommitted changes.
    DirtyWorktree {
        /// `git status --porcelain` output.
        status: String,
    },

    /// The server workspace has pending (un-checked-in) changes.
    PendingServerChanges {
        /// `tf status` output.
        status: String,
    },

    /// A branch tip that must carry a changeset note does not.
    MissingCorrelation {
        /// Branch whose tip was inspected.
        branch: String,
        /// The tip commit.
        commit: String,
    },

    /// The server has changesets newer than the last fetched one.
    UnfetchedServerHistory {
        /// Changeset recorded on the mirror branch tip.
        fetched: ChangesetId,
        /// Newest changeset on the server.
        latest: ChangesetId,
    },

    /// A commit contains a change the server cannot express.
    UnexpectedChangeType {
        /// Commit being pushed.
        commit: String,
        /// The offending raw diff record.
        change: String,
    },

    /// The server rejected a check-in or did not confirm it.
    CheckInFailed {
        /// Commit being pushed.
        commit: String,
        /// Client output (stdout, or stderr on failure).
        output: String,
    },

    /// The mirror branch could not be fast-forwarded.
    MergeNotFastForward {
        /// Branch that was being advanced.
        branch: String,
        /// Commit it should have advanced to.
        commit: String,
        /// Git's explanation.
        detail: String,
    },

    /// Another git-tf command holds the repository lock.
    CommandInProgress {
        /// Path of the lock file.
        lock: PathBuf,
    },

    /// `HEAD` is not on a branch.
    DetachedHead,

    /// The mirror branch has commits the work branch has not merged.
    WorkBranchBehindMirror {
        /// Work branch name.
        work: String,
        /// Mirror branch name.
        mirror: String,
    },

    /// The first changeset of a batch materialized no change.
    EmptyChangeset {
        /// The changeset that produced nothing.
        changeset: ChangesetId,
    },

    /// Re-materializing the last recorded changeset changed the worktree.
    ReplayDiverged {
        /// The changeset that was re-materialized.
        changeset: ChangesetId,
    },

    /// The server workspace mapping does not cover the repository root.
    WorkfoldMismatch {
        /// Repository root.
        root: PathBuf,
        /// `tf workfold` output.
        mapping: String,
    },

    /// `clone` was asked to create a repository where one already exists.
    RepositoryExists {
        /// The existing repository already carries changeset notes.
        has_notes: bool,
    },

    /// The working directory is not inside a git repository.
    NotARepository {
        /// Directory that was inspected.
        path: PathBuf,
    },

    /// A work item to remove is not associated with the commit.
    WorkItemNotAssociated {
        /// Commit whose associations were inspected.
        commit: String,
        /// The work item id.
        work_item: u64,
    },

    /// The server returned no history at all.
    NoServerHistory,

    /// The server's history could not be interpreted.
    MalformedHistory {
        /// What was wrong.
        detail: String,
    },

    /// Rebasing the work branch onto the mirror branch stopped on conflicts.
    RebaseConflict {
        /// Work branch name.
        work: String,
        /// Git's output.
        detail: String,
    },

    /// A configuration value is missing or invalid.
    Config {
        /// The config key.
        key: String,
        /// What is wrong with it.
        detail: String,
    },

    /// An external tool failed.
    Tool(ToolError),

    /// Local filesystem error.
    Io(std::io::Error),
}

impl BridgeError {
    /// The variant tag.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::DirtyWorktree { .. } => ErrorKind::DirtyWorktree,
            Self::PendingServerChanges { .. } => ErrorKind::PendingServerChanges,
            Self::MissingCorrelation { .. } => ErrorKind::MissingCorrelation,
            Self::UnfetchedServerHistory { .. } => ErrorKind::UnfetchedServerHistory,
            Self::UnexpectedChangeType { .. } => ErrorKind::UnexpectedChangeType,
            Self::CheckInFailed { .. } => ErrorKind::CheckInFailed,
            Self::MergeNotFastForward { .. } => ErrorKind::MergeNotFastForward,
            Self::CommandInProgress { .. } => ErrorKind::CommandInProgress,
            Self::DetachedHead => ErrorKind::DetachedHead,
            Self::WorkBranchBehindMirror { .. } => ErrorKind::WorkBranchBehindMirror,
            Self::EmptyChangeset { .. } => ErrorKind::EmptyChangeset,
            Self::ReplayDiverged { .. } => ErrorKind::ReplayDiverged,
            Self::WorkfoldMismatch { .. } => ErrorKind::WorkfoldMismatch,
            Self::RepositoryExists { .. } => ErrorKind::RepositoryExists,
            Self::NotARepository { .. } => ErrorKind::NotARepository,
            Self::WorkItemNotAssociated { .. } => ErrorKind::WorkItemNotAssociated,
            Self::NoServerHistory => ErrorKind::NoServerHistory,
            Self::MalformedHistory { .. } => ErrorKind::MalformedHistory,
            Self::RebaseConflict { .. } => ErrorKind::RebaseConflict,
            Self::Config { .. } => ErrorKind::Config,
            Self::Tool(_) => ErrorKind::Tool,
            Self::Io(_) => ErrorKind::Io,
        }
    }

    pub(crate) fn config(key: &str, detail: impl Into<String>) -> Self {
        Self::Config {
            key: key.to_owned(),
            detail: detail.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Display
// ---------------------------------------------------------------------------

impl fmt::Display for BridgeError {
    #[allow(clippy::too_many_lines)]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DirtyWorktree { status } => {
                write!(f, "the working directory has uncommitted changes:")?;
                for line in status.lines().take(10) {
                    write!(f, "\n    {line}")?;
                }
                write!(
                    f,
                    "\n  To fix: commit or stash them first:\n    git stash"
                )
            }
            Self::PendingServerChanges { status } => {
                write!(f, "the server workspace has pending changes:")?;
                for line in status.lines().take(10) {
                    write!(f, "\n    {line}")?;
                }
                write!(
                    f,
                    "\n  To fix: undo them with `git tf repair`, or rerun with --no-checks."
                )
            }
            Self::MissingCorrelation { branch, commit } => {
                write!(
                    f,
                    "the tip of '{branch}' ({commit}) has no changeset note; the branch moved without git-tf recording it.\n  To fix: this repository is inconsistent. Reset '{branch}' to the last commit with a note:\n    git log --notes=tf {branch}"
                )
            }
            Self::UnfetchedServerHistory { fetched, latest } => {
                write!(
                    f,
                    "the server has changesets newer than C{fetched} (latest is C{latest}).\n  To fix: fetch and merge them before pushing:\n    git tf pull"
                )
            }
            Self::UnexpectedChangeType { commit, change } => {
                write!(
                    f,
                    "commit {commit} contains a change the server cannot represent: {change}\n  To fix: rewrite the commit so it only adds, modifies, deletes or renames regular files."
                )
            }
            Self::CheckInFailed { commit, output } => {
                write!(f, "check-in of commit {commit} was not confirmed by the server")?;
                if !output.trim().is_empty() {
                    write!(f, "\n  output: {}", output.trim())?;
                }
                write!(
                    f,
                    "\n  To fix: pending changes were undone; resolve the server-side problem and rerun `git tf push`."
                )
            }
            Self::MergeNotFastForward {
                branch,
                commit,
                detail,
            } => {
                write!(
                    f,
                    "could not fast-forward '{branch}' to {commit}: {detail}\n  To fix: the branch moved during the push. Inspect it with:\n    git log --oneline --graph {branch} {commit}"
                )
            }
            Self::CommandInProgress { lock } => {
                write!(
                    f,
                    "another git-tf command is running in this repository (lock: {}).\n  To fix: wait for it to finish and retry.",
                    lock.display()
                )
            }
            Self::DetachedHead => {
                write!(
                    f,
                    "HEAD is detached; git-tf needs a branch checked out.\n  To fix: check out a branch first:\n    git checkout master"
                )
            }
            Self::WorkBranchBehindMirror { work, mirror } => {
                write!(
                    f,
                    "'{mirror}' has changesets that are not merged into '{work}'.\n  To fix: merge them first:\n    git tf pull"
                )
            }
            Self::EmptyChangeset { changeset } => {
                write!(
                    f,
                    "changeset C{changeset} produced no change in the working directory.\n  To fix: if that changeset really is empty (e.g. a branch or merge), rerun with --force to record an empty commit."
                )
            }
            Self::ReplayDiverged { changeset } => {
                write!(
                    f,
                    "re-fetching changeset C{changeset} changed the working directory; the mirror no longer matches the server.\n  To fix: re-clone the repository."
                )
            }
            Self::WorkfoldMismatch { root, mapping } => {
                write!(
                    f,
                    "the server workspace mapping does not cover {}:\n    {}\n  To fix: map the repository root with `tf workfold` and retry.",
                    root.display(),
                    mapping.trim()
                )
            }
            Self::RepositoryExists { has_notes } => {
                if *has_notes {
                    write!(
                        f,
                        "this directory is already a git-tf repository.\n  To fix: update it instead:\n    git tf pull"
                    )
                } else {
                    write!(
                        f,
                        "this directory is already a git repository.\n  To fix: clone into an empty directory."
                    )
                }
            }
            Self::NotARepository { path } => {
                write!(
                    f,
                    "{} is not inside a git repository.\n  To fix: run `git tf clone` first, or change directory.",
                    path.display()
                )
            }
            Self::WorkItemNotAssociated { commit, work_item } => {
                write!(
                    f,
                    "work item {work_item} is not associated with {commit}.\n  To fix: list the associations with:\n    git tf wi -c {commit}"
                )
            }
            Self::NoServerHistory => {
                write!(
                    f,
                    "the server returned no history for this folder.\n  To fix: check the workspace mapping with `tf workfold`."
                )
            }
            Self::MalformedHistory { detail } => {
                write!(
                    f,
                    "could not read server history: {detail}\n  To fix: check that the tf client works: tf history -recursive ."
                )
            }
            Self::RebaseConflict { work, detail } => {
                write!(f, "rebasing '{work}' stopped on conflicts")?;
                if !detail.trim().is_empty() {
                    write!(f, ":\n    {}", detail.trim())?;
                }
                write!(
                    f,
                    "\n  To fix: resolve the conflicts, then:\n    git rebase --continue"
                )
            }
            Self::Config { key, detail } => {
                write!(
                    f,
                    "configuration error in '{key}': {detail}\n  To fix: git config {key} <value>"
                )
            }
            Self::Tool(err) => {
                write!(
                    f,
                    "{err}\n  To fix: check the command output above and retry."
                )
            }
            Self::Io(err) => {
                write!(
                    f,
                    "I/O error: {err}\n  To fix: check file permissions and disk space."
                )
            }
        }
    }
}

impl std::error::Error for BridgeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Tool(err) => Some(err),
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// From impls
// ---------------------------------------------------------------------------

impl From<ToolError> for BridgeError {
    fn from(err: ToolError) -> Self {
        match err {
            ToolError::Parse { what, message } if what.starts_with("tf history") => {
                Self::MalformedHistory { detail: message }
            }
            other => Self::Tool(other),
        }
    }
}

impl From<std::io::Error> for BridgeError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}
