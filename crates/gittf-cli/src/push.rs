use anyhow::Result;
use clap::Args;
use gittf::notes::short;
use gittf::push::PushEngine;
use tracing::instrument;

use crate::{CheckArgs, open_context, preflight};

#[derive(Args, Debug)]
pub struct PushArgs {
    /// Push at most this many commits, oldest first.
    #[arg(short = 'n', long = "number", value_name = "N")]
    number: Option<usize>,

    /// Show the server commands without running them.
    #[arg(long)]
    dry_run: bool,

    #[command(flatten)]
    checks: CheckArgs,
}

/// Check in every unpushed commit on the work branch.
///
/// Each commit becomes one changeset, in order. The work branch must
/// contain the mirror branch and the mirror must hold the latest server
/// changeset; run `git tf pull` first otherwise. On failure, pending server
/// changes are undone and the mirror branch stays at the last commit that
/// made it.
#[instrument(skip(args), fields(number = ?args.number, dry_run = args.dry_run))]
pub fn run(args: &PushArgs, verbose: u8) -> Result<()> {
    let ctx = open_context(verbose, args.dry_run, args.checks)?;
    preflight(&ctx)?;

    let pushed = PushEngine::new(&ctx).push(args.number)?;
    if !pushed.is_empty() {
        println!();
        for entry in &pushed {
            println!("  {} -> C{}", short(&entry.commit), entry.changeset);
        }
        println!("{} commit(s) pushed", pushed.len());
    }
    Ok(())
}
