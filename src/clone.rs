//! `clone`: create a git repository in a mapped server folder and replay
//! server history into it.

use std::fs;

use tracing::{info, instrument, warn};

use crate::changeset::{Changeset, ChangesetId};
use crate::config::{CORRELATION_NOTES, email_user, is_valid_email};
use crate::context::CommandContext;
use crate::error::BridgeError;
use crate::history::HistoryFetcher;
use crate::replay::{ReplayEngine, ReplayOptions};

/// Message of the empty commit both branches start from.
pub const ROOT_COMMIT_MESSAGE: &str = "root-commit";

/// How much history to import.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CloneVersion {
    /// Only the newest changeset.
    #[default]
    Latest,
    /// From this changeset (inclusive) to the newest.
    Since(ChangesetId),
    /// Everything.
    All,
}

/// Options for [`clone_repository`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CloneOptions {
    pub version: CloneVersion,
    /// Email to configure; defaults to the existing `user.email`.
    pub email: Option<String>,
}

/// Clone into `ctx.root()`, which must be a mapped folder without a git
/// repository.
///
/// If anything fails before a changeset was recorded, the new `.git`
/// directory is removed again.
///
/// # Errors
/// [`BridgeError::RepositoryExists`], [`BridgeError::WorkfoldMismatch`],
/// [`BridgeError::PendingServerChanges`], config errors for a missing or
/// malformed email, and any replay failure.
#[instrument(skip(ctx))]
pub fn clone_repository(ctx: &mut CommandContext, options: &CloneOptions) -> Result<(), BridgeError> {
    if ctx.git().is_repository()? {
        let has_notes = ctx.git().notes_show(CORRELATION_NOTES, "HEAD")?.is_some();
        return Err(BridgeError::RepositoryExists { has_notes });
    }
    println!("Determining the server workspace and folder mapping...");
    ctx.ensure_workfold_matches(true)?;
    ctx.ensure_no_pending_server_changes()?;

    ctx.git().init()?;
    ctx.git().set_head_branch(ctx.work_branch())?;
    ctx.lock()?;

    let result = populate(ctx, options);
    if let Err(err) = &result {
        discard_if_empty(ctx, err);
    }
    result?;

    println!();
    println!("Cloning is completed. Try \"git tf log\" to see the change history.");
    Ok(())
}

fn populate(ctx: &mut CommandContext, options: &CloneOptions) -> Result<(), BridgeError> {
    let autocrlf = ctx.config().clone_autocrlf.clone();
    ctx.git().config_set("core.autocrlf", &autocrlf)?;
    setup_email(ctx, options.email.as_deref())?;
    ctx.reload_config()?;

    let git = ctx.git();
    let mirror = ctx.mirror_branch();
    let work = ctx.work_branch();
    git.commit_empty(ROOT_COMMIT_MESSAGE)?;
    git.branch_force(mirror, None)?;
    git.set_upstream(work, mirror)?;
    git.checkout(mirror)?;

    let history = history_to_fetch(ctx, options.version)?;
    let replayed = if history.is_empty() {
        println!("Nothing to fetch");
        Ok(false)
    } else {
        ReplayEngine::new(ctx, ReplayOptions { force: true }).replay(&history, mirror)
    };

    let finish = git
        .checkout(work)
        .and_then(|()| git.reset_hard(Some(mirror)));
    match (replayed, finish) {
        (Err(err), finish) => {
            if let Err(finish_err) = finish {
                warn!(%finish_err, "could not move back to the work branch");
            }
            Err(err)
        }
        (Ok(_), finish) => finish.map_err(BridgeError::from),
    }
}

fn setup_email(ctx: &CommandContext, email: Option<&str>) -> Result<(), BridgeError> {
    let git = ctx.git();
    if let Some(email) = email {
        if !is_valid_email(email) {
            return Err(BridgeError::config("user.email", format!("malformed email: {email}")));
        }
        git.config_set("user.email", email)?;
        git.config_set("user.name", email_user(email))?;
        return Ok(());
    }
    let email = git
        .config_get("user.email")?
        .ok_or_else(|| BridgeError::config("user.email", "email is not specified; pass -e <email>"))?;
    if !is_valid_email(&email) {
        return Err(BridgeError::config("user.email", format!("malformed email: {email}")));
    }
    info!(%email, "using configured email");
    Ok(())
}

fn history_to_fetch(ctx: &CommandContext, version: CloneVersion) -> Result<Vec<Changeset>, BridgeError> {
    let fetcher = HistoryFetcher::new(ctx.tf());
    match version {
        CloneVersion::All => {
            println!("Requesting the entire server history...");
            fetcher.all()
        }
        CloneVersion::Since(from) => {
            println!("Requesting server history since C{from}...");
            fetcher.since_inclusive(from)
        }
        CloneVersion::Latest => {
            println!("Version is not specified, so using the latest version...");
            Ok(fetcher.latest_opt()?.into_iter().collect())
        }
    }
}

fn discard_if_empty(ctx: &mut CommandContext, err: &BridgeError) {
    let recorded = matches!(
        ctx.git().notes_show(CORRELATION_NOTES, "HEAD"),
        Ok(Some(_))
    );
    if recorded {
        return;
    }
    warn!(%err, "clone failed before any changeset was recorded; removing .git");
    ctx.unlock();
    let git_dir = ctx.root().join(".git");
    if let Err(remove_err) = fs::remove_dir_all(&git_dir) {
        warn!(path = %git_dir.display(), %remove_err, "could not remove .git");
    }
}
