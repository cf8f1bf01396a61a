use anyhow::Result;
use gittf::branch::BranchGuard;
use gittf::repair::{RepairEngine, RepairOutcome};
use gittf::{CommandContext, ContextOptions};
use tracing::instrument;

use crate::cwd;

/// Undo pending server changes and reset the work branch checkout.
#[instrument]
pub fn run(verbose: u8) -> Result<()> {
    let ctx = CommandContext::open(
        &cwd()?,
        ContextOptions {
            verbose,
            ..ContextOptions::default()
        },
    )?;
    let work = ctx.work_branch();
    let _branch = BranchGuard::switch(ctx.git(), work)?;
    ctx.ensure_clean_worktree()?;

    match RepairEngine::new(&ctx).run(work)? {
        RepairOutcome::Clean => println!("Nothing to repair"),
        RepairOutcome::Repaired => println!("Pending server changes were undone; '{work}' is checked out"),
    }
    Ok(())
}
