use anyhow::Result;
use chrono::{Local, TimeZone};
use clap::Args;
use gittf::notes::{CorrelationStore, short};
use gittf::{CommandContext, ContextOptions};
use tracing::instrument;

use crate::cwd;

/// Rendered lines are cut to this many characters.
const MAX_LINE: usize = 160;

#[derive(Args, Debug)]
pub struct LogArgs {
    /// Revision range, as for `git log` (defaults to HEAD).
    #[arg(value_name = "RANGE")]
    range: Option<String>,
}

/// One first-parent commit as shown by `git tf log`.
#[derive(Clone, Debug, PartialEq, Eq)]
struct LogEntry {
    commit: String,
    author: String,
    timestamp: i64,
    subject: String,
}

fn parse_log(raw: &str) -> Vec<LogEntry> {
    raw.lines()
        .filter_map(|line| {
            let mut fields = line.splitn(4, '\t');
            let commit = fields.next()?.to_owned();
            let author = fields.next()?.to_owned();
            let timestamp = fields.next()?.parse().ok()?;
            let subject = fields.next().unwrap_or_default().to_owned();
            Some(LogEntry {
                commit,
                author,
                timestamp,
                subject,
            })
        })
        .collect()
}

fn render(label: &str, entry: &LogEntry) -> String {
    let date = Local
        .timestamp_opt(entry.timestamp, 0)
        .single()
        .map(|d| d.format("%x %X").to_string())
        .unwrap_or_default();
    let line = format!("{label:<7} {:<15} {date:<23} {}", entry.author, entry.subject);
    if line.chars().count() > MAX_LINE {
        let cut: String = line.chars().take(MAX_LINE - 3).collect();
        format!("{cut}...")
    } else {
        line
    }
}

/// Print first-parent history, labelling each commit with its changeset
/// number when it has one.
#[instrument(skip(args))]
pub fn run(args: &LogArgs, verbose: u8) -> Result<()> {
    let ctx = CommandContext::open(
        &cwd()?,
        ContextOptions {
            verbose,
            ..ContextOptions::default()
        },
    )?;
    let git = ctx.git();
    let range = args.range.as_deref().unwrap_or("HEAD");
    let raw = git
        .tool()
        .query(["log", "--first-parent", "--format=%H%x09%an%x09%at%x09%s", range])?;

    let notes = CorrelationStore::new(git);
    for entry in parse_log(&raw) {
        let label = match notes.get(&entry.commit)? {
            Some(id) => id.to_string(),
            None => short(&entry.commit).to_owned(),
        };
        println!("{}", render(&label, &entry));
    }
    Ok(())
}
