use anyhow::Result;
use gittf::ContextOptions;
use gittf::branch::BranchGuard;
use tracing::instrument;

use crate::cwd;

/// List commits on the work branch that the server has not seen.
#[instrument]
pub fn run(verbose: u8) -> Result<()> {
    let ctx = gittf::CommandContext::open(
        &cwd()?,
        ContextOptions {
            verbose,
            ..ContextOptions::default()
        },
    )?;
    let git = ctx.git();
    let _branch = BranchGuard::switch(git, ctx.work_branch())?;

    let commits = git.oneline_log(&format!("{}..{}", ctx.mirror_branch(), ctx.work_branch()))?;
    if commits.is_empty() {
        println!("There are no commits to be pushed to the server");
        return Ok(());
    }

    let plural = if commits.len() > 1 { "s" } else { "" };
    println!("{} commit{plural} to be pushed to the server:", commits.len());
    for line in &commits {
        println!("    {line}");
    }
    Ok(())
}
