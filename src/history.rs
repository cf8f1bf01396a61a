//! History fetcher: server history as oldest-first [`Changeset`] lists.

use gittf_tools::{HistoryQuery, Tf};
use tracing::{debug, instrument};

use crate::changeset::{Changeset, ChangesetId};
use crate::error::BridgeError;

/// Resolves server history ranges. The client prints newest first; every
/// list returned here is sorted oldest first.
#[derive(Clone, Copy, Debug)]
pub struct HistoryFetcher<'a> {
    tf: &'a Tf,
}

impl<'a> HistoryFetcher<'a> {
    #[must_use]
    pub const fn new(tf: &'a Tf) -> Self {
        Self { tf }
    }

    /// The newest changeset on the server.
    ///
    /// # Errors
    /// [`BridgeError::NoServerHistory`] when the server has none.
    pub fn latest(&self) -> Result<Changeset, BridgeError> {
        self.latest_opt()?.ok_or(BridgeError::NoServerHistory)
    }

    /// Like [`latest`](Self::latest) but an empty history is `None`.
    ///
    /// # Errors
    /// Query or parse failures.
    pub fn latest_opt(&self) -> Result<Option<Changeset>, BridgeError> {
        Ok(self.query(&HistoryQuery::latest())?.pop())
    }

    /// Every changeset after `after` up to the newest, oldest first. The
    /// boundary itself is excluded even though the client's range is
    /// inclusive.
    ///
    /// # Errors
    /// Query or parse failures.
    #[instrument(skip(self), fields(after = %after))]
    pub fn since(&self, after: ChangesetId) -> Result<Vec<Changeset>, BridgeError> {
        let Some(latest) = self.latest_opt()? else {
            return Ok(Vec::new());
        };
        if latest.id <= after {
            return Ok(Vec::new());
        }
        let mut changesets = self.between(after, latest.id)?;
        changesets.retain(|cs| cs.id > after);
        debug!(count = changesets.len(), "changesets to fetch");
        Ok(changesets)
    }

    /// Changesets from `from` (inclusive) to the newest, oldest first.
    ///
    /// # Errors
    /// Query or parse failures.
    pub fn since_inclusive(&self, from: ChangesetId) -> Result<Vec<Changeset>, BridgeError> {
        let latest = self.latest()?;
        if latest.id < from {
            return Ok(Vec::new());
        }
        self.between(from, latest.id)
    }

    /// The whole history, oldest first.
    ///
    /// # Errors
    /// Query or parse failures.
    pub fn all(&self) -> Result<Vec<Changeset>, BridgeError> {
        self.query(&HistoryQuery::default())
    }

    fn between(&self, from: ChangesetId, to: ChangesetId) -> Result<Vec<Changeset>, BridgeError> {
        self.query(&HistoryQuery::between(from.get(), to.get()))
    }

    fn query(&self, query: &HistoryQuery) -> Result<Vec<Changeset>, BridgeError> {
        let mut changesets = self
            .tf
            .history(query)?
            .iter()
            .map(Changeset::from_entry)
            .collect::<Result<Vec<_>, _>>()?;
        changesets.sort_by_key(|cs| cs.id);
        changesets.dedup_by_key(|cs| cs.id);
        Ok(changesets)
    }
}
