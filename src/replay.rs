//! Fetch/replay engine: server changesets become mirror commits.
//!
//! Each changeset is materialized with `tf get`, committed with the
//! changeset's author, date and comment, and then annotated with its number.
//! If anything fails part-way through a batch, the branch and worktree are
//! rolled back to the newest commit that carries a changeset note, so the
//! mirror never holds a half-applied changeset.

use gittf_tools::CommitSpec;
use tracing::{debug, error, info, instrument, warn};

use crate::branch::BranchGuard;
use crate::changeset::{Changeset, ChangesetId};
use crate::context::CommandContext;
use crate::error::BridgeError;
use crate::notes::{CorrelationStore, short};
use crate::readonly::ReadOnlyWorktree;

/// Knobs for [`ReplayEngine`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReplayOptions {
    /// Commit an empty changeset at the start of a batch instead of failing.
    pub force: bool,
}

/// Applies changesets to a branch, oldest first.
#[derive(Debug)]
pub struct ReplayEngine<'a> {
    ctx: &'a CommandContext,
    options: ReplayOptions,
}

impl<'a> ReplayEngine<'a> {
    #[must_use]
    pub const fn new(ctx: &'a CommandContext, options: ReplayOptions) -> Self {
        Self { ctx, options }
    }

    /// Replay `changesets` (oldest first) onto `branch`.
    ///
    /// Returns `false` when there was nothing to replay.
    ///
    /// # Errors
    /// The first failure, after the rollback has run. A failed rollback is
    /// logged; the original error is still the one returned.
    #[instrument(skip_all, fields(branch = %branch, count = changesets.len()))]
    pub fn replay(&self, changesets: &[Changeset], branch: &str) -> Result<bool, BridgeError> {
        if changesets.is_empty() {
            return Ok(false);
        }
        let domain = self.ctx.config().require_domain()?;
        let _branch = BranchGuard::switch(self.ctx.git(), branch)?;

        let total = changesets.len();
        for (index, changeset) in changesets.iter().enumerate() {
            println!("Fetching [{}/{total}] {}", index + 1, changeset.summary_line());
            if let Err(err) = self.apply(changeset, index == 0, domain) {
                warn!(changeset = %changeset.id, %err, "replay failed");
                if !self.ctx.dry_run() {
                    if let Err(rollback_err) = self.rollback(total) {
                        error!(%rollback_err, "rollback failed; run `git tf repair`");
                    }
                }
                return Err(err);
            }
        }
        Ok(true)
    }

    fn apply(&self, changeset: &Changeset, first: bool, domain: &str) -> Result<(), BridgeError> {
        let git = self.ctx.git();
        let _read_only = if self.ctx.dry_run() {
            None
        } else {
            Some(ReadOnlyWorktree::acquire(self.ctx.root())?)
        };

        self.materialize(changeset.id)?;

        if !self.ctx.dry_run() && !git.has_changes()? {
            warn!(changeset = %changeset.id, "changeset produced no change in the worktree");
            if first {
                self.check_empty_first(changeset.id)?;
            }
            println!("Nothing to commit for C{}; recording an empty commit.", changeset.id);
        }

        git.add_all()?;
        git.commit(&CommitSpec {
            message: changeset.commit_message(),
            author: changeset.author_identity(domain),
            date: changeset.timestamp.to_rfc3339(),
            allow_empty: true,
        })?;
        let head = git.rev_parse("HEAD")?;
        CorrelationStore::new(git).record(&head, changeset.id)?;
        info!(changeset = %changeset.id, commit = short(&head), "replayed changeset");
        Ok(())
    }

    /// An empty first changeset can also mean the server workspace and the
    /// branch disagree. Re-materialize the last recorded changeset: if that
    /// changes anything, the mirror is corrupt.
    fn check_empty_first(&self, id: ChangesetId) -> Result<(), BridgeError> {
        let git = self.ctx.git();
        if let Some((commit, previous)) = CorrelationStore::new(git).last_recorded("HEAD", 1)? {
            debug!(previous = %previous, commit = short(&commit), "probing previous changeset");
            self.materialize(previous)?;
            if git.has_changes()? {
                return Err(BridgeError::ReplayDiverged { changeset: previous });
            }
            self.materialize(id)?;
        }
        if self.options.force {
            Ok(())
        } else {
            Err(BridgeError::EmptyChangeset { changeset: id })
        }
    }

    fn rollback(&self, batch_len: usize) -> Result<(), BridgeError> {
        let git = self.ctx.git();
        match CorrelationStore::new(git).last_recorded("HEAD", batch_len + 1)? {
            Some((commit, id)) => {
                warn!(changeset = %id, commit = short(&commit), "rolling back");
                println!("Rolling back to the last synchronized changeset: C{id}");
                self.materialize(id)?;
                git.reset_hard(Some(&commit))?;
            }
            None => {
                warn!("no synchronized changeset on branch; resetting to HEAD");
                git.reset_hard(None)?;
            }
        }
        git.clean()?;
        Ok(())
    }

    fn materialize(&self, id: ChangesetId) -> Result<(), BridgeError> {
        self.ctx
            .tf()
            .get(id.get(), &mut |line| debug!(target: "gittf::tf", "{line}"))?;
        Ok(())
    }
}
