//! git-tf CLI crate. One module per subcommand; `main.rs` dispatches.

pub mod clone;
pub mod fetch;
pub mod log;
pub mod pull;
pub mod push;
pub mod repair;
pub mod status;
pub mod telemetry;
pub mod wi;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use gittf::{CommandContext, ContextOptions};

/// Flags shared by the commands that talk to the server.
#[derive(Args, Clone, Copy, Debug, Default)]
pub struct CheckArgs {
    /// Skip the server pre-flight checks (pending changes, folder mapping).
    #[arg(short = 'C', long = "no-checks")]
    pub no_checks: bool,
}

/// Directory the command was started from.
///
/// # Errors
/// Fails when the current directory is gone or unreadable.
pub fn cwd() -> Result<PathBuf> {
    std::env::current_dir().context("could not determine the current directory")
}

/// Open the enclosing repository with the given flags.
///
/// # Errors
/// Not in a repository, the lock is held, or config is invalid.
pub fn open_context(verbose: u8, dry_run: bool, checks: CheckArgs) -> Result<CommandContext> {
    let options = ContextOptions {
        dry_run,
        verbose,
        no_checks: checks.no_checks,
    };
    if dry_run {
        println!("DRY RUN. Nothing is going to be changed.\n");
    }
    Ok(CommandContext::open(&cwd()?, options)?)
}

/// Clean worktree, no pending server changes, and a folder mapping that
/// covers the repository. The server checks are skipped with `-C`.
///
/// # Errors
/// The first check that fails.
pub fn preflight(ctx: &CommandContext) -> Result<()> {
    ctx.ensure_clean_worktree()?;
    if ctx.options().no_checks {
        return Ok(());
    }
    println!("Checking server status. There must be no pending changes...");
    ctx.ensure_workfold_matches(false)?;
    ctx.ensure_no_pending_server_changes()?;
    Ok(())
}
