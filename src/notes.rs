//! Correlation store: changeset numbers and work items kept as git notes.
//!
//! A note under [`CORRELATION_NOTES`] says which server changeset a commit
//! represents. A note under [`WORK_ITEM_NOTES`] lists the work items to
//! associate when the commit is checked in. The two namespaces are
//! independent.

use gittf_tools::Git;
use tracing::debug;

use crate::changeset::ChangesetId;
use crate::config::{CORRELATION_NOTES, WORK_ITEM_NOTES};
use crate::error::BridgeError;

/// Extract the changeset number from a correlation note: the last line that
/// starts with digits. Older notes may carry extra lines of text.
#[must_use]
pub fn parse_changeset_note(note: &str) -> Option<ChangesetId> {
    note.lines()
        .filter_map(|line| {
            let digits: String = line.trim_start().chars().take_while(char::is_ascii_digit).collect();
            digits.parse().ok().map(ChangesetId::new)
        })
        .last()
}

/// Parse a comma-separated work-item note. Blank and non-numeric entries are
/// ignored.
#[must_use]
pub fn parse_work_items(note: &str) -> Vec<u64> {
    note.split([',', '\n'])
        .filter_map(|item| item.trim().parse().ok())
        .collect()
}

// ---------------------------------------------------------------------------
// CorrelationStore
// ---------------------------------------------------------------------------

/// Commit to changeset correlation.
#[derive(Clone, Copy, Debug)]
pub struct CorrelationStore<'a> {
    git: &'a Git,
}

impl<'a> CorrelationStore<'a> {
    #[must_use]
    pub const fn new(git: &'a Git) -> Self {
        Self { git }
    }

    /// The changeset recorded on `commit`, if any.
    ///
    /// # Errors
    /// Tool errors only.
    pub fn get(&self, commit: &str) -> Result<Option<ChangesetId>, BridgeError> {
        Ok(self
            .git
            .notes_show(CORRELATION_NOTES, commit)?
            .as_deref()
            .and_then(parse_changeset_note))
    }

    /// The changeset recorded on the tip of `branch`.
    ///
    /// # Errors
    /// [`BridgeError::MissingCorrelation`] when the tip has no note.
    pub fn latest_on_branch(&self, branch: &str) -> Result<ChangesetId, BridgeError> {
        let commit = self.git.rev_parse(branch)?;
        self.get(&commit)?.ok_or_else(|| BridgeError::MissingCorrelation {
            branch: branch.to_owned(),
            commit: short(&commit).to_owned(),
        })
    }

    /// The newest first-parent ancestor of `start` (inclusive) that carries a
    /// note, looking back at most `depth` commits.
    ///
    /// # Errors
    /// Tool errors only.
    pub fn last_recorded(
        &self,
        start: &str,
        depth: usize,
    ) -> Result<Option<(String, ChangesetId)>, BridgeError> {
        for commit in self.git.rev_list(start, false, Some(depth))? {
            if let Some(id) = self.get(&commit)? {
                return Ok(Some((commit, id)));
            }
        }
        Ok(None)
    }

    /// Attach `id` to `commit`. An existing note is an error: a commit
    /// represents exactly one changeset.
    ///
    /// # Errors
    /// Fails when git refuses to write the note.
    pub fn record(&self, commit: &str, id: ChangesetId) -> Result<(), BridgeError> {
        debug!(commit = short(commit), changeset = %id, "recording correlation");
        self.git
            .notes_add(CORRELATION_NOTES, commit, &id.to_string(), false)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// WorkItemStore
// ---------------------------------------------------------------------------

/// Work items associated with commits awaiting check-in.
#[derive(Clone, Copy, Debug)]
pub struct WorkItemStore<'a> {
    git: &'a Git,
}

impl<'a> WorkItemStore<'a> {
    #[must_use]
    pub const fn new(git: &'a Git) -> Self {
        Self { git }
    }

    /// Work items on `commit`, in the order they were added.
    ///
    /// # Errors
    /// Tool errors only.
    pub fn list(&self, commit: &str) -> Result<Vec<u64>, BridgeError> {
        Ok(self
            .git
            .notes_show(WORK_ITEM_NOTES, commit)?
            .as_deref()
            .map(parse_work_items)
            .unwrap_or_default())
    }

    /// Associate `work_item` with `commit`. Adding an existing item is a
    /// no-op.
    ///
    /// # Errors
    /// Tool errors only.
    pub fn add(&self, commit: &str, work_item: u64) -> Result<Vec<u64>, BridgeError> {
        let mut items = self.list(commit)?;
        if !items.contains(&work_item) {
            items.push(work_item);
            self.write(commit, &items)?;
        }
        Ok(items)
    }

    /// Remove one association.
    ///
    /// # Errors
    /// [`BridgeError::WorkItemNotAssociated`] when `work_item` is not on
    /// `commit`.
    pub fn remove(&self, commit: &str, work_item: u64) -> Result<Vec<u64>, BridgeError> {
        let mut items = self.list(commit)?;
        let before = items.len();
        items.retain(|&item| item != work_item);
        if items.len() == before {
            return Err(BridgeError::WorkItemNotAssociated {
                commit: short(commit).to_owned(),
                work_item,
            });
        }
        if items.is_empty() {
            self.git.notes_remove(WORK_ITEM_NOTES, commit)?;
        } else {
            self.write(commit, &items)?;
        }
        Ok(items)
    }

    /// Remove every association from `commit`.
    ///
    /// # Errors
    /// Tool errors only.
    pub fn clear(&self, commit: &str) -> Result<(), BridgeError> {
        self.git.notes_remove(WORK_ITEM_NOTES, commit)?;
        Ok(())
    }

    fn write(&self, commit: &str, items: &[u64]) -> Result<(), BridgeError> {
        let text = items.iter().map(u64::to_string).collect::<Vec<_>>().join(",");
        self.git.notes_add(WORK_ITEM_NOTES, commit, &text, true)?;
        Ok(())
    }
}

/// First 7 characters of a hash, for messages.
#[must_use]
pub fn short(commit: &str) -> &str {
    commit.get(..7).unwrap_or(commit)
}
