use anyhow::Result;
use clap::Args;
use gittf::clone::{CloneOptions, CloneVersion, clone_repository};
use gittf::{ChangesetId, CommandContext, ContextOptions};
use tracing::instrument;

use crate::{CheckArgs, cwd};

#[derive(Args, Debug)]
pub struct CloneArgs {
    /// Import history from this changeset onward instead of only the latest.
    #[arg(short = 'V', long = "version", value_name = "CHANGESET", conflicts_with = "all")]
    version: Option<ChangesetId>,

    /// Import the entire server history.
    #[arg(short = 'A', long)]
    all: bool,

    /// Email to commit with. Also sets `user.name` to its local part.
    #[arg(short, long)]
    email: Option<String>,

    #[command(flatten)]
    checks: CheckArgs,
}

impl CloneArgs {
    const fn clone_version(&self) -> CloneVersion {
        match (self.all, self.version) {
            (true, _) => CloneVersion::All,
            (false, Some(id)) => CloneVersion::Since(id),
            (false, None) => CloneVersion::Latest,
        }
    }
}

/// Clone the server folder mapped to the current directory.
#[instrument(skip(args))]
pub fn run(args: &CloneArgs, verbose: u8) -> Result<()> {
    let options = ContextOptions {
        dry_run: false,
        verbose,
        no_checks: args.checks.no_checks,
    };
    let mut ctx = CommandContext::for_clone(&cwd()?, options)?;
    clone_repository(
        &mut ctx,
        &CloneOptions {
            version: args.clone_version(),
            email: args.email.clone(),
        },
    )?;
    Ok(())
}
