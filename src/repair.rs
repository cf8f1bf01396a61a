//! Repair engine: throw away pending server changes and put the worktree
//! back on a known-good branch tip.

use tracing::{info, instrument};

use crate::context::CommandContext;
use crate::error::BridgeError;
use crate::readonly::ReadOnlyWorktree;

/// What [`RepairEngine::run`] did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RepairOutcome {
    /// The server reported no pending changes; nothing was touched.
    Clean,
    /// Pending changes were undone and the worktree reset.
    Repaired,
}

/// Discards server-side pending changes.
#[derive(Debug)]
pub struct RepairEngine<'a> {
    ctx: &'a CommandContext,
}

impl<'a> RepairEngine<'a> {
    #[must_use]
    pub const fn new(ctx: &'a CommandContext) -> Self {
        Self { ctx }
    }

    /// Undo pending server changes, then force-checkout `target`. A no-op
    /// when nothing is pending, so running it twice changes nothing the
    /// second time.
    ///
    /// # Errors
    /// Tool failures other than "nothing to undo".
    #[instrument(skip(self))]
    pub fn run(&self, target: &str) -> Result<RepairOutcome, BridgeError> {
        if !self.ctx.tf().has_pending_changes()? {
            info!("no pending server changes");
            return Ok(RepairOutcome::Clean);
        }
        self.undo_pending()?;
        self.ctx.git().checkout_force(target)?;
        info!(target, "repaired");
        Ok(RepairOutcome::Repaired)
    }

    /// Recovery after a failed push: undo whatever is pending and check out
    /// `target` unconditionally, since the worktree may sit on a detached
    /// commit even when the server has nothing pending.
    ///
    /// # Errors
    /// Tool failures other than "nothing to undo".
    #[instrument(skip(self))]
    pub fn restore(&self, target: &str) -> Result<(), BridgeError> {
        if self.ctx.dry_run() {
            return Ok(());
        }
        println!("Restoring git and server state...");
        if self.ctx.tf().has_pending_changes()? {
            self.undo_pending()?;
        }
        self.ctx.git().checkout_force(target)?;
        Ok(())
    }

    fn undo_pending(&self) -> Result<(), BridgeError> {
        println!("Clearing pending server changes...");
        let _read_only = if self.ctx.dry_run() {
            None
        } else {
            Some(ReadOnlyWorktree::acquire(self.ctx.root())?)
        };
        self.ctx.tf().undo_all()?;
        Ok(())
    }
}
