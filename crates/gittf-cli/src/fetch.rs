use anyhow::Result;
use clap::Args;
use gittf::sync::{FetchOptions, fetch};
use tracing::instrument;

use crate::{CheckArgs, open_context, preflight};

#[derive(Args, Debug)]
pub struct FetchArgs {
    /// Fetch at most this many changesets.
    #[arg(short = 'n', long = "number", value_name = "N")]
    pub number: Option<usize>,

    /// Record an empty commit when the first fetched changeset changes no
    /// files, instead of stopping.
    #[arg(short, long)]
    pub force: bool,

    /// Print what would be done without changing anything.
    #[arg(long)]
    pub dry_run: bool,

    #[command(flatten)]
    pub checks: CheckArgs,
}

impl FetchArgs {
    pub(crate) const fn options(&self) -> FetchOptions {
        FetchOptions {
            limit: self.number,
            force: self.force,
        }
    }
}

/// Replay new changesets onto the mirror branch.
#[instrument(skip(args), fields(number = ?args.number, dry_run = args.dry_run))]
pub fn run(args: &FetchArgs, verbose: u8) -> Result<()> {
    let ctx = open_context(verbose, args.dry_run, args.checks)?;
    preflight(&ctx)?;
    fetch(&ctx, args.options())?;
    Ok(())
}
