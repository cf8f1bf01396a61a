use anyhow::Result;
use clap::Args;
use gittf::sync::pull;
use tracing::instrument;

use crate::fetch::FetchArgs;
use crate::{open_context, preflight};

/// Same flags as `fetch`.
#[derive(Args, Debug)]
pub struct PullArgs {
    #[command(flatten)]
    fetch: FetchArgs,
}

/// Fetch, then rebase the work branch onto the mirror branch.
#[instrument(skip(args))]
pub fn run(args: &PullArgs, verbose: u8) -> Result<()> {
    let ctx = open_context(verbose, args.fetch.dry_run, args.fetch.checks)?;
    preflight(&ctx)?;
    if !pull(&ctx, args.fetch.options())? {
        println!("'{}' is up to date with '{}'", ctx.work_branch(), ctx.mirror_branch());
    }
    Ok(())
}
