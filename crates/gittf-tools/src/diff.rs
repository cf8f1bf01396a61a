//! Parser for `git diff --raw -z` output.
//!
//! With `-z` every record is `:<src mode> <dst mode> <src sha> <dst sha> <status>`
//! followed by one NUL-terminated path, or two for copies and renames. Paths
//! are never quoted in this form, so arbitrary file names survive intact.

use std::fmt;

use crate::error::ToolError;

/// The status letter of a raw diff record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChangeStatus {
    /// `A`
    Added,
    /// `C`, a copy of another path (carries a similarity score).
    Copied,
    /// `D`
    Deleted,
    /// `M`
    Modified,
    /// `R`, a rename (carries a similarity score).
    Renamed,
    /// `T`, a type change between file, symlink and submodule.
    TypeChanged,
    /// `U`, unmerged.
    Unmerged,
    /// `X`, unknown: git itself could not classify it.
    Unknown,
    /// `B`, a broken pairing.
    Broken,
}

impl ChangeStatus {
    /// Decode a status letter.
    #[must_use]
    pub const fn from_letter(letter: char) -> Option<Self> {
        Some(match letter {
            'A' => Self::Added,
            'C' => Self::Copied,
            'D' => Self::Deleted,
            'M' => Self::Modified,
            'R' => Self::Renamed,
            'T' => Self::TypeChanged,
            'U' => Self::Unmerged,
            'X' => Self::Unknown,
            'B' => Self::Broken,
            _ => return None,
        })
    }

    /// The status letter git prints.
    #[must_use]
    pub const fn letter(self) -> char {
        match self {
            Self::Added => 'A',
            Self::Copied => 'C',
            Self::Deleted => 'D',
            Self::Modified => 'M',
            Self::Renamed => 'R',
            Self::TypeChanged => 'T',
            Self::Unmerged => 'U',
            Self::Unknown => 'X',
            Self::Broken => 'B',
        }
    }

    /// Copies and renames carry a second (destination) path.
    #[must_use]
    pub const fn has_destination(self) -> bool {
        matches!(self, Self::Copied | Self::Renamed)
    }
}

/// One record from `git diff --raw`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawChange {
    /// The status letter.
    pub status: ChangeStatus,
    /// Similarity (copies, renames) or dissimilarity (broken) percentage.
    pub score: Option<u8>,
    /// Path in the old tree (or the only path).
    pub path: String,
    /// Destination path for copies and renames.
    pub dest: Option<String>,
}

impl RawChange {
    /// The path this change leaves behind in the new tree.
    #[must_use]
    pub fn new_path(&self) -> &str {
        self.dest.as_deref().unwrap_or(&self.path)
    }
}

impl fmt::Display for RawChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.status.letter())?;
        if let Some(score) = self.score {
            write!(f, "{score:03}")?;
        }
        write!(f, "\t{}", self.path)?;
        if let Some(dest) = &self.dest {
            write!(f, " -> {dest}")?;
        }
        Ok(())
    }
}

/// Parse the complete output of `git diff --raw -z`.
///
/// # Errors
/// [`ToolError::Parse`] on a truncated record or an unrecognised status
/// letter.
pub fn parse_raw_diff(raw: &str) -> Result<Vec<RawChange>, ToolError> {
    let mut fields = raw.split('\0');
    let mut changes = Vec::new();

    while let Some(meta) = fields.next() {
        let meta = meta.trim_start_matches('\n');
        if meta.is_empty() {
            continue;
        }
        let Some(meta) = meta.strip_prefix(':') else {
            return Err(parse_error(format!("expected ':' record header, got {meta:?}")));
        };
        let status_field = meta
            .split_whitespace()
            .nth(4)
            .ok_or_else(|| parse_error(format!("record header has no status: {meta:?}")))?;

        let mut chars = status_field.chars();
        let letter = chars
            .next()
            .ok_or_else(|| parse_error("empty status field".to_owned()))?;
        let status = ChangeStatus::from_letter(letter)
            .ok_or_else(|| parse_error(format!("unknown status letter {letter:?}")))?;
        let score = match chars.as_str() {
            "" => None,
            digits => Some(
                digits
                    .parse::<u8>()
                    .map_err(|e| parse_error(format!("bad score {digits:?}: {e}")))?,
            ),
        };

        let path = next_path(&mut fields, status_field)?;
        let dest = if status.has_destination() {
            Some(next_path(&mut fields, status_field)?)
        } else {
            None
        };

        changes.push(RawChange {
            status,
            score,
            path,
            dest,
        });
    }

    Ok(changes)
}

fn next_path<'a>(
    fields: &mut impl Iterator<Item = &'a str>,
    status_field: &str,
) -> Result<String, ToolError> {
    match fields.next() {
        Some(path) if !path.is_empty() => Ok(path.to_owned()),
        _ => Err(parse_error(format!("record {status_field} is missing a path"))),
    }
}

fn parse_error(message: String) -> ToolError {
    ToolError::Parse {
        what: "git raw diff",
        message,
    }
}
