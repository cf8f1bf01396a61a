//! Typed tf (TFVC command-line client) subcommands.
//!
//! The client spells options `/name:value` on Windows and `-name:value`
//! elsewhere; [`Tf`] builds every option through [`Tf::opt`] so the prefix
//! is decided in one place. All commands operate recursively on the mapped
//! folder (`.`), which is the repository root.

use std::path::Path;
use std::sync::Arc;

use crate::error::ToolError;
use crate::history_xml::{HistoryEntry, parse_history};
use crate::runner::ToolRunner;
use crate::tool::Tool;

/// What `tf status` prints when nothing is pending.
pub const NO_PENDING_CHANGES: &str = "There are no matching pending changes.";

/// Exit code of `tf undo` when there was nothing to undo.
pub const UNDO_NOTHING_EXIT_CODE: i32 = 100;

/// Exit code of `tf checkin` on partial success; the output still decides.
pub const CHECKIN_PARTIAL_EXIT_CODE: i32 = 1;

/// Filter for `tf history`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HistoryQuery {
    /// Inclusive changeset range `(from, to)`.
    pub range: Option<(u64, u64)>,
    /// Maximum number of entries (`-stopafter`).
    pub stop_after: Option<usize>,
}

impl HistoryQuery {
    /// Only the newest changeset.
    #[must_use]
    pub const fn latest() -> Self {
        Self {
            range: None,
            stop_after: Some(1),
        }
    }

    /// Everything between `from` and `to`, both inclusive.
    #[must_use]
    pub const fn between(from: u64, to: u64) -> Self {
        Self {
            range: Some((from, to)),
            stop_after: None,
        }
    }
}

/// The tf client.
#[derive(Clone, Debug)]
pub struct Tf {
    tool: Tool,
    prefix: String,
}

impl Tf {
    /// Wrap `program` (usually `tf`) using `prefix` (`-` or `/`) for options.
    #[must_use]
    pub fn new(
        program: impl Into<String>,
        prefix: impl Into<String>,
        runner: Arc<dyn ToolRunner>,
        dry_run: bool,
    ) -> Self {
        Self {
            tool: Tool::new(program, runner, dry_run),
            prefix: prefix.into(),
        }
    }

    /// The underlying [`Tool`].
    #[must_use]
    pub const fn tool(&self) -> &Tool {
        &self.tool
    }

    /// A bare flag, e.g. `-recursive`.
    #[must_use]
    pub fn flag(&self, name: &str) -> String {
        format!("{}{name}", self.prefix)
    }

    /// An option with a value, e.g. `-version:C42`.
    #[must_use]
    pub fn opt(&self, name: &str, value: &str) -> String {
        format!("{}{name}:{value}", self.prefix)
    }

    /// Query history for the mapped folder.
    ///
    /// # Errors
    /// Fails when the client fails or prints unparsable XML.
    pub fn history(&self, query: &HistoryQuery) -> Result<Vec<HistoryEntry>, ToolError> {
        let mut args = vec![
            "history".to_owned(),
            self.flag("recursive"),
            self.opt("format", "xml"),
            self.flag("noprompt"),
        ];
        if let Some((from, to)) = query.range {
            args.push(self.opt("version", &format!("C{from}~C{to}")));
        }
        if let Some(n) = query.stop_after {
            args.push(self.opt("stopafter", &n.to_string()));
        }
        args.push(".".to_owned());
        parse_history(&self.tool.query(args)?)
    }

    /// Materialize changeset `version` into the workspace, streaming the
    /// client's progress lines to `on_line`.
    ///
    /// # Errors
    /// Fails when the client fails.
    pub fn get(&self, version: u64, on_line: &mut dyn FnMut(&str)) -> Result<String, ToolError> {
        let args = [
            "get".to_owned(),
            self.opt("version", &format!("C{version}")),
            self.flag("recursive"),
            self.flag("noprompt"),
            ".".to_owned(),
        ];
        self.tool.mutate_streaming(args, on_line)
    }

    /// Raw `tf status` output for the mapped folder.
    ///
    /// # Errors
    /// Fails when the client fails.
    pub fn status(&self) -> Result<String, ToolError> {
        self.tool
            .query(["status".to_owned(), self.flag("recursive"), ".".to_owned()])
    }

    /// `true` unless the server reports no pending changes.
    ///
    /// # Errors
    /// Fails when the client fails.
    pub fn has_pending_changes(&self) -> Result<bool, ToolError> {
        Ok(self.status()?.trim() != NO_PENDING_CHANGES)
    }

    /// Undo every pending change. "Nothing to undo" counts as success.
    ///
    /// # Errors
    /// Fails on any other non-zero exit.
    pub fn undo_all(&self) -> Result<(), ToolError> {
        self.tool
            .mutate_allowing(
                [
                    "undo".to_owned(),
                    self.flag("recursive"),
                    self.flag("noprompt"),
                    ".".to_owned(),
                ],
                &[0, UNDO_NOTHING_EXIT_CODE],
                "",
            )
            .map(drop)
    }

    /// Pend deletes for `paths` (directories recursively).
    ///
    /// # Errors
    /// Fails when the client fails.
    pub fn delete(&self, paths: &[String]) -> Result<(), ToolError> {
        self.pend("delete", true, paths)
    }

    /// Pend a rename. The client moves the file on disk itself.
    ///
    /// # Errors
    /// Fails when the client fails.
    pub fn rename(&self, from: &str, to: &str) -> Result<(), ToolError> {
        self.tool
            .mutate(
                [
                    "rename".to_owned(),
                    self.flag("noprompt"),
                    from.to_owned(),
                    to.to_owned(),
                ],
                "",
            )
            .map(drop)
    }

    /// Pend edits for `paths`.
    ///
    /// # Errors
    /// Fails when the client fails.
    pub fn checkout(&self, paths: &[String]) -> Result<(), ToolError> {
        self.pend("checkout", false, paths)
    }

    /// Pend adds for `paths`.
    ///
    /// # Errors
    /// Fails when the client fails.
    pub fn add(&self, paths: &[String]) -> Result<(), ToolError> {
        self.pend("add", false, paths)
    }

    /// Check in every pending change with the comment stored in
    /// `comment_file`, associating `work_items`. Returns the client output,
    /// which the caller must search for the new changeset number.
    ///
    /// # Errors
    /// Fails on an exit code other than 0 or partial success.
    pub fn checkin(&self, comment_file: &Path, work_items: &[u64]) -> Result<String, ToolError> {
        let mut args = vec![
            "checkin".to_owned(),
            self.opt("comment", &format!("@{}", comment_file.display())),
            self.flag("recursive"),
            self.flag("noprompt"),
        ];
        if !work_items.is_empty() {
            let ids: Vec<String> = work_items.iter().map(u64::to_string).collect();
            args.push(self.opt("associate", &ids.join(",")));
        }
        args.push(".".to_owned());
        let out = self.tool.mutate_allowing(
            args,
            &[0, CHECKIN_PARTIAL_EXIT_CODE],
            "Changeset #0 checked in (dry run).",
        )?;
        Ok(out.stdout)
    }

    /// Workspace mapping of the current folder.
    ///
    /// # Errors
    /// Fails when the folder is not mapped.
    pub fn workfold(&self) -> Result<String, ToolError> {
        self.tool.query(["workfold", "."])
    }

    fn pend(&self, command: &str, recursive: bool, paths: &[String]) -> Result<(), ToolError> {
        if paths.is_empty() {
            return Ok(());
        }
        let mut args = vec![command.to_owned()];
        if recursive {
            args.push(self.flag("recursive"));
        }
        args.push(self.flag("noprompt"));
        args.extend(paths.iter().cloned());
        self.tool.mutate(args, "").map(drop)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::runner::ToolOutput;

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<Vec<String>>>,
        stdout: String,
    }

    impl ToolRunner for Recorder {
        fn run(&self, _program: &str, args: &[String]) -> Result<ToolOutput, ToolError> {
            self.calls.lock().unwrap().push(args.to_vec());
            Ok(ToolOutput::new(self.stdout.clone(), "", 0))
        }

        fn run_streaming(
            &self,
            program: &str,
            args: &[String],
            _on_line: &mut dyn FnMut(&str),
        ) -> Result<ToolOutput, ToolError> {
            self.run(program, args)
        }
    }

    #[test]
    fn windows_prefix_is_applied_everywhere() {
        let runner = Arc::new(Recorder::default());
        let tf = Tf::new("tf.exe", "/", runner.clone(), false);
        tf.get(42, &mut |_| {}).unwrap();
        let calls = runner.calls.lock().unwrap();
        assert_eq!(calls[0], ["get", "/version:C42", "/recursive", "/noprompt", "."]);
    }

    #[test]
    fn history_query_arguments() {
        let runner = Arc::new(Recorder {
            stdout: "<history/>".to_owned(),
            ..Recorder::default()
        });
        let tf = Tf::new("tf", "-", runner.clone(), false);
        tf.history(&HistoryQuery::between(5, 9)).unwrap();
        tf.history(&HistoryQuery::latest()).unwrap();
        let calls = runner.calls.lock().unwrap();
        assert!(calls[0].contains(&"-version:C5~C9".to_owned()));
        assert!(calls[1].contains(&"-stopafter:1".to_owned()));
        assert_eq!(calls[1].last().map(String::as_str), Some("."));
    }

    #[test]
    fn empty_pend_issues_no_command() {
        let runner = Arc::new(Recorder::default());
        let tf = Tf::new("tf", "-", runner.clone(), false);
        tf.add(&[]).unwrap();
        tf.delete(&[]).unwrap();
        assert!(runner.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn checkin_associates_work_items() {
        let runner = Arc::new(Recorder {
            stdout: "Changeset #7 checked in.".to_owned(),
            ..Recorder::default()
        });
        let tf = Tf::new("tf", "-", runner.clone(), false);
        let out = tf.checkin(Path::new("/tmp/msg"), &[12, 34]).unwrap();
        assert_eq!(out, "Changeset #7 checked in.");
        let calls = runner.calls.lock().unwrap();
        assert!(calls[0].contains(&"-comment:@/tmp/msg".to_owned()));
        assert!(calls[0].contains(&"-associate:12,34".to_owned()));
    }

    #[test]
    fn pending_changes_detection() {
        let clean = Arc::new(Recorder {
            stdout: format!("{NO_PENDING_CHANGES}\n"),
            ..Recorder::default()
        });
        assert!(!Tf::new("tf", "-", clean, false).has_pending_changes().unwrap());

        let dirty = Arc::new(Recorder {
            stdout: "File name Change Local path\n a.txt edit /w/a.txt".to_owned(),
            ..Recorder::default()
        });
        assert!(Tf::new("tf", "-", dirty, false).has_pending_changes().unwrap());
    }
}
