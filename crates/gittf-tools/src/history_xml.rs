//! Parser for `tf history -format:xml`.
//!
//! The feed looks like:
//!
//! ```xml
//! <?xml version="1.0" encoding="utf-8"?>
//! <history>
//!   <changeset id="42" owner="CORP\alice" committer="CORP\alice"
//!              date="2014-03-01T10:21:33.123+04:00">
//!     <comment>Fix the build</comment>
//!     <item .../>
//!   </changeset>
//! </history>
//! ```
//!
//! Only the fields git-tf needs are extracted; values stay raw strings and
//! are validated by the caller.

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::error::ToolError;

/// One `<changeset>` element, as printed by the server tool.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HistoryEntry {
    /// The `id` attribute.
    pub id: String,
    /// The `committer` attribute (usually `DOMAIN\user`).
    pub committer: String,
    /// The `date` attribute (ISO 8601 with offset).
    pub date: String,
    /// Text of the `<comment>` child, empty when absent.
    pub comment: String,
}

/// Parse a complete history document. Entries are returned in document
/// order (the server prints newest first).
///
/// Blank input is an empty history. Anything else must contain a
/// `<history>` root.
///
/// # Errors
/// [`ToolError::Parse`] on malformed XML, a missing root element, or a
/// changeset without an `id`.
pub fn parse_history(xml: &str) -> Result<Vec<HistoryEntry>, ToolError> {
    if xml.trim().is_empty() {
        return Ok(Vec::new());
    }

    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut entries = Vec::new();
    let mut saw_root = false;
    let mut current: Option<HistoryEntry> = None;
    let mut in_comment = false;

    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Start(e) => match e.name().as_ref() {
                b"history" => saw_root = true,
                b"changeset" => current = Some(entry_from_attributes(&e)?),
                b"comment" => in_comment = current.is_some(),
                _ => {}
            },
            Event::Empty(e) => match e.name().as_ref() {
                b"history" => saw_root = true,
                b"changeset" => entries.push(entry_from_attributes(&e)?),
                _ => {}
            },
            Event::Text(text) if in_comment => {
                let text = text.unescape().map_err(xml_error)?;
                if let Some(entry) = current.as_mut() {
                    entry.comment.push_str(&text);
                }
            }
            Event::CData(data) if in_comment => {
                if let Some(entry) = current.as_mut() {
                    entry.comment.push_str(&String::from_utf8_lossy(&data));
                }
            }
            Event::End(e) => match e.name().as_ref() {
                b"comment" => in_comment = false,
                b"changeset" => entries.extend(current.take()),
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    if !saw_root {
        return Err(ToolError::Parse {
            what: "tf history xml",
            message: format!("no <history> element in output: {}", first_line(xml)),
        });
    }
    Ok(entries)
}

fn entry_from_attributes(start: &BytesStart<'_>) -> Result<HistoryEntry, ToolError> {
    let mut entry = HistoryEntry::default();
    for attr in start.attributes() {
        let attr = attr.map_err(xml_error)?;
        let value = attr.unescape_value().map_err(xml_error)?.into_owned();
        match attr.key.as_ref() {
            b"id" => entry.id = value,
            b"committer" => entry.committer = value,
            b"date" => entry.date = value,
            _ => {}
        }
    }
    if entry.id.is_empty() {
        return Err(ToolError::Parse {
            what: "tf history xml",
            message: "changeset element without an id attribute".to_owned(),
        });
    }
    Ok(entry)
}

fn xml_error(err: impl std::fmt::Display) -> ToolError {
    ToolError::Parse {
        what: "tf history xml",
        message: err.to_string(),
    }
}

fn first_line(text: &str) -> &str {
    text.trim().lines().next().unwrap_or_default()
}
