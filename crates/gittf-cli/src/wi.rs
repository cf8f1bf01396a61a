use anyhow::Result;
use clap::Args;
use gittf::notes::WorkItemStore;
use gittf::{CommandContext, ContextOptions};
use tracing::instrument;

use crate::cwd;

/// Work items attached to a commit are associated with its changeset on
/// push.
///
/// Examples:
///
///   git tf wi 123        associate 123 with HEAD
///   git tf wi            list associations
///   git tf wi -d 123     remove 123
///   git tf wi -d         remove all
#[derive(Args, Debug)]
pub struct WiArgs {
    /// Commit to associate with.
    #[arg(short, long, default_value = "HEAD")]
    commit: String,

    /// Remove the association (all of them without a work item id).
    #[arg(short, long)]
    delete: bool,

    /// Work item id.
    #[arg(value_name = "WORKITEM")]
    workitem: Option<u64>,
}

fn join(items: &[u64]) -> String {
    items.iter().map(u64::to_string).collect::<Vec<_>>().join(",")
}

/// Add, list or remove work item associations.
#[instrument(skip(args), fields(commit = %args.commit))]
pub fn run(args: &WiArgs, verbose: u8) -> Result<()> {
    let ctx = CommandContext::open(
        &cwd()?,
        ContextOptions {
            verbose,
            ..ContextOptions::default()
        },
    )?;
    let store = WorkItemStore::new(ctx.git());
    let commit = ctx.git().rev_parse(&args.commit)?;

    match (args.delete, args.workitem) {
        (true, Some(item)) => {
            store.remove(&commit, item)?;
        }
        (true, None) => store.clear(&commit)?,
        (false, Some(item)) => {
            store.add(&commit, item)?;
        }
        (false, None) => {
            let items = store.list(&commit)?;
            if !items.is_empty() {
                println!("{}", join(&items));
            }
        }
    }
    Ok(())
}
