//! Branch coordinator: run an operation on a given branch and go back to the
//! user's branch afterwards.

use gittf_tools::Git;
use tracing::{debug, warn};

use crate::error::BridgeError;

/// Scoped branch switch. Records the checked-out branch, switches to the
/// target, and switches back on drop.
///
/// Returning to the original branch is skipped when `HEAD` is detached at
/// drop time or already on the original branch.
#[derive(Debug)]
#[must_use = "dropping the guard switches back immediately"]
pub struct BranchGuard<'a> {
    git: &'a Git,
    original: String,
}

impl<'a> BranchGuard<'a> {
    /// Switch to `target`.
    ///
    /// # Errors
    /// [`BridgeError::DetachedHead`] when no branch is checked out, or the
    /// checkout failure.
    pub fn switch(git: &'a Git, target: &str) -> Result<Self, BridgeError> {
        let original = git.current_branch()?.ok_or(BridgeError::DetachedHead)?;
        if original != target {
            debug!(from = %original, to = target, "switching branch");
            git.checkout(target)?;
        }
        Ok(Self { git, original })
    }
}

impl Drop for BranchGuard<'_> {
    fn drop(&mut self) {
        match self.git.current_branch() {
            Ok(Some(current)) if current != self.original => {
                debug!(from = %current, to = %self.original, "restoring branch");
                if let Err(err) = self.git.checkout(&self.original) {
                    warn!(branch = %self.original, %err, "could not switch back");
                }
            }
            Ok(_) => {}
            Err(err) => warn!(%err, "could not determine current branch"),
        }
    }
}
