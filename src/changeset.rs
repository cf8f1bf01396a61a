//! The changeset model: one entry of server history.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset};
use gittf_tools::HistoryEntry;

use crate::error::BridgeError;

/// Length cap for [`Changeset::summary_line`].
const SUMMARY_WIDTH: usize = 128;

// ---------------------------------------------------------------------------
// ChangesetId
// ---------------------------------------------------------------------------

/// A server-assigned changeset number. Monotonic, so `Ord` is history order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChangesetId(u64);

impl ChangesetId {
    /// Wrap a raw changeset number.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// The raw number.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ChangesetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ChangesetId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

// ---------------------------------------------------------------------------
// Changeset
// ---------------------------------------------------------------------------

/// One server history entry. Immutable once built.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Changeset {
    /// Changeset number.
    pub id: ChangesetId,
    /// Committer user name with any `DOMAIN\` prefix removed.
    pub author: String,
    /// When the changeset was checked in.
    pub timestamp: DateTime<FixedOffset>,
    /// Check-in comment, possibly empty.
    pub comment: String,
}

impl Changeset {
    /// Build a changeset from a parsed history entry.
    ///
    /// # Errors
    /// [`BridgeError::MalformedHistory`] when the id or date does not parse.
    pub fn from_entry(entry: &HistoryEntry) -> Result<Self, BridgeError> {
        let id = entry.id.parse::<ChangesetId>().map_err(|e| BridgeError::MalformedHistory {
            detail: format!("changeset id {:?}: {e}", entry.id),
        })?;
        let timestamp = parse_date(&entry.date).ok_or_else(|| BridgeError::MalformedHistory {
            detail: format!("changeset {id} has unparsable date {:?}", entry.date),
        })?;
        Ok(Self {
            id,
            author: strip_domain(&entry.committer).to_owned(),
            timestamp,
            comment: entry.comment.clone(),
        })
    }

    /// Commit message for the mirror commit: the comment, or the changeset
    /// number when the comment is blank.
    #[must_use]
    pub fn commit_message(&self) -> String {
        if self.comment.trim().is_empty() {
            self.id.to_string()
        } else {
            self.comment.clone()
        }
    }

    /// `name <name@domain>` identity for the mirror commit.
    #[must_use]
    pub fn author_identity(&self, domain: &str) -> String {
        format!("{0} <{0}@{domain}>", self.author)
    }

    /// One line for progress output: `id author date comment`, with newlines
    /// folded and the whole thing capped in width.
    #[must_use]
    pub fn summary_line(&self) -> String {
        let comment = self.comment.split_whitespace().collect::<Vec<_>>().join(" ");
        let line = format!(
            "{} {} {} {comment}",
            self.id,
            self.author,
            self.timestamp.format("%Y-%m-%d %H:%M")
        );
        line.trim_end().chars().take(SUMMARY_WIDTH).collect()
    }
}

impl fmt::Display for Changeset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "C{}", self.id)
    }
}

/// `CORP\alice` -> `alice`. Names without a domain pass through.
#[must_use]
pub fn strip_domain(user: &str) -> &str {
    user.rsplit_once('\\').map_or(user, |(_, name)| name)
}

fn parse_date(raw: &str) -> Option<DateTime<FixedOffset>> {
    let raw = raw.trim();
    DateTime::parse_from_rfc3339(raw)
        .or_else(|_| DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f%z"))
        .ok()
}
