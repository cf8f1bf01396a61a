//! `fetch` and `pull`: bring server history onto the mirror branch, and
//! optionally rebase the work branch on top of it.

use tracing::{info, instrument};

use crate::branch::BranchGuard;
use crate::context::CommandContext;
use crate::error::BridgeError;
use crate::history::HistoryFetcher;
use crate::notes::CorrelationStore;
use crate::replay::{ReplayEngine, ReplayOptions};

/// Options shared by fetch and pull.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FetchOptions {
    /// Fetch at most this many changesets.
    pub limit: Option<usize>,
    /// Record empty commits for a leading no-op changeset.
    pub force: bool,
}

/// Replay every server changeset newer than the mirror tip.
///
/// Returns `true` if anything was fetched.
///
/// # Errors
/// [`BridgeError::MissingCorrelation`] if the mirror tip has no note, plus
/// anything the replay engine returns.
#[instrument(skip(ctx))]
pub fn fetch(ctx: &CommandContext, options: FetchOptions) -> Result<bool, BridgeError> {
    let mirror = ctx.mirror_branch();
    println!("Fetching from the server");

    let last = CorrelationStore::new(ctx.git()).latest_on_branch(mirror)?;
    println!("Last synchronized changeset: C{last}");

    let fetcher = HistoryFetcher::new(ctx.tf());
    let latest = fetcher.latest()?;
    println!("Latest changeset on the server: C{}", latest.id);
    if latest.id <= last {
        println!("Nothing to fetch");
        return Ok(false);
    }

    let mut changesets = fetcher.since(last)?;
    if let Some(limit) = options.limit {
        changesets.truncate(limit);
    }
    println!("{} changeset(s) to fetch", changesets.len());

    let fetched = ReplayEngine::new(ctx, ReplayOptions { force: options.force })
        .replay(&changesets, mirror)?;
    info!(count = changesets.len(), "fetch complete");
    Ok(fetched)
}

/// Fetch, then rebase the work branch onto the mirror branch if the mirror
/// has anything the work branch lacks.
///
/// # Errors
/// Fetch errors, or [`BridgeError::RebaseConflict`] when the rebase stops.
#[instrument(skip(ctx))]
pub fn pull(ctx: &CommandContext, options: FetchOptions) -> Result<bool, BridgeError> {
    let git = ctx.git();
    let mirror = ctx.mirror_branch();
    let work = ctx.work_branch();

    let fetched = fetch(ctx, options)?;
    if !fetched && git.is_ancestor(mirror, work)? {
        return Ok(false);
    }

    println!("Rebasing '{work}' onto '{mirror}'");
    let _branch = BranchGuard::switch(git, work)?;
    git.rebase(mirror).map_err(|err| BridgeError::RebaseConflict {
        work: work.to_owned(),
        detail: err.detail(),
    })?;
    Ok(true)
}
