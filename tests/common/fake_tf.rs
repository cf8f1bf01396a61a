//! In-process stand-in for the tf client.
//!
//! Holds the server history as full file snapshots, one per changeset, and
//! operates on a real worktree directory: `get` rewrites the tree, `rename`
//! moves files, `checkin` snapshots the tree into a new changeset.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use gittf_tools::tf::NO_PENDING_CHANGES;
use gittf_tools::{ToolError, ToolOutput, ToolRunner};

pub type Snapshot = BTreeMap<String, String>;

#[derive(Clone, Debug)]
pub struct ServerChangeset {
    pub id: u64,
    pub committer: String,
    pub comment: String,
    pub files: Snapshot,
}

#[derive(Debug, Default)]
struct State {
    changesets: Vec<ServerChangeset>,
    pending: Vec<String>,
    commands: Vec<Vec<String>>,
    failures: Vec<(String, usize)>,
    checkins: Vec<(String, Vec<u64>)>,
}

#[derive(Debug)]
pub struct FakeTf {
    root: PathBuf,
    state: Mutex<State>,
}

impl FakeTf {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            state: Mutex::new(State::default()),
        }
    }

    /// Add a changeset made by someone else. Returns its id.
    pub fn server_commit(&self, committer: &str, comment: &str, files: &[(&str, &str)]) -> u64 {
        let mut state = self.state.lock().unwrap();
        let id = state.changesets.last().map_or(1, |c| c.id + 1);
        state.changesets.push(ServerChangeset {
            id,
            committer: committer.to_owned(),
            comment: comment.to_owned(),
            files: files
                .iter()
                .map(|(p, c)| ((*p).to_owned(), (*c).to_owned()))
                .collect(),
        });
        id
    }

    /// Same tree as the previous changeset, new id.
    pub fn server_noop(&self, comment: &str) -> u64 {
        let mut state = self.state.lock().unwrap();
        let last = state.changesets.last().cloned().expect("history is not empty");
        let id = last.id + 1;
        state.changesets.push(ServerChangeset {
            id,
            comment: comment.to_owned(),
            ..last
        });
        id
    }

    pub fn latest(&self) -> Option<ServerChangeset> {
        self.state.lock().unwrap().changesets.last().cloned()
    }

    /// The next invocation of `verb` fails with exit code 1.
    pub fn fail_next(&self, verb: &str) {
        self.fail_nth(verb, 1);
    }

    /// The `n`th invocation of `verb` from now (1-based) fails with exit
    /// code 1; earlier ones run normally.
    pub fn fail_nth(&self, verb: &str, n: usize) {
        assert!(n > 0, "n is 1-based");
        self.state.lock().unwrap().failures.push((verb.to_owned(), n));
    }

    /// Pretend someone left a pending change in the workspace.
    pub fn add_pending(&self, path: &str) {
        self.state.lock().unwrap().pending.push(format!("edit {path}"));
    }

    pub fn pending(&self) -> Vec<String> {
        self.state.lock().unwrap().pending.clone()
    }

    /// Every command seen so far, verb first.
    pub fn commands(&self) -> Vec<Vec<String>> {
        self.state.lock().unwrap().commands.clone()
    }

    /// Verbs of the mutating commands seen so far.
    pub fn mutations(&self) -> Vec<String> {
        self.commands()
            .into_iter()
            .map(|c| c[0].clone())
            .filter(|verb| !matches!(verb.as_str(), "history" | "status" | "workfold"))
            .collect()
    }

    pub fn clear_commands(&self) {
        self.state.lock().unwrap().commands.clear();
    }

    /// `(comment, work items)` of each successful check-in.
    pub fn checkins(&self) -> Vec<(String, Vec<u64>)> {
        self.state.lock().unwrap().checkins.clone()
    }

    /// The `-version:` argument of every `get`, in call order.
    pub fn gets(&self) -> Vec<String> {
        self.commands()
            .into_iter()
            .filter(|c| c[0] == "get")
            .filter_map(|c| option(&c, "version").map(str::to_owned))
            .collect()
    }

    fn dispatch(&self, args: &[String]) -> ToolOutput {
        let mut state = self.state.lock().unwrap();
        state.commands.push(args.to_vec());
        let verb = args[0].as_str();
        if let Some(pos) = state.failures.iter().position(|(v, _)| v == verb) {
            if state.failures[pos].1 == 1 {
                state.failures.remove(pos);
                return ToolOutput::new("", format!("injected {verb} failure"), 1);
            }
            state.failures[pos].1 -= 1;
        }
        match verb {
            "history" => ToolOutput::new(history_xml(&state.changesets, args), "", 0),
            "get" => {
                let id = option(args, "version")
                    .and_then(|v| v.trim_start_matches('C').parse::<u64>().ok())
                    .expect("get has a version");
                let Some(changeset) = state.changesets.iter().find(|c| c.id == id) else {
                    return ToolOutput::new("", format!("no changeset {id}"), 1);
                };
                write_tree(&self.root, &changeset.files);
                ToolOutput::new(format!("Getting C{id}\n"), "", 0)
            }
            "status" => {
                if state.pending.is_empty() {
                    ToolOutput::new(format!("{NO_PENDING_CHANGES}\n"), "", 0)
                } else {
                    ToolOutput::new(state.pending.join("\n"), "", 0)
                }
            }
            "undo" => {
                if state.pending.is_empty() {
                    ToolOutput::new("", "No pending changes.", 100)
                } else {
                    state.pending.clear();
                    ToolOutput::new("Undoing.\n", "", 0)
                }
            }
            "delete" | "checkout" | "add" => {
                for path in paths(args) {
                    state.pending.push(format!("{verb} {path}"));
                }
                ToolOutput::new("", "", 0)
            }
            "rename" => {
                let paths = paths(args);
                let (from, to) = (&paths[0], &paths[1]);
                if let Err(err) = fs::rename(self.root.join(from), self.root.join(to)) {
                    return ToolOutput::new("", format!("cannot rename {from} to {to}: {err}"), 1);
                }
                state.pending.push(format!("rename {from} -> {to}"));
                ToolOutput::new("", "", 0)
            }
            "checkin" => {
                let comment_file = option(args, "comment").expect("checkin has a comment");
                let comment = fs::read_to_string(comment_file.trim_start_matches('@')).unwrap();
                let work_items = option(args, "associate")
                    .map(|ids| ids.split(',').map(|id| id.parse().unwrap()).collect())
                    .unwrap_or_default();
                let id = state.changesets.last().map_or(1, |c| c.id + 1);
                state.changesets.push(ServerChangeset {
                    id,
                    committer: "CORP\\alice".to_owned(),
                    comment: comment.clone(),
                    files: read_tree(&self.root),
                });
                state.pending.clear();
                state.checkins.push((comment, work_items));
                ToolOutput::new(format!("Checking in.\nChangeset #{id} checked in.\n"), "", 0)
            }
            "workfold" => ToolOutput::new(
                format!(
                    "===============\nWorkspace : test (alice)\nCollection: http://tfs/tfs\n $/Project: {}\n",
                    self.root.display()
                ),
                "",
                0,
            ),
            other => ToolOutput::new("", format!("unknown command {other}"), 1),
        }
    }
}

impl ToolRunner for FakeTf {
    fn run(&self, _program: &str, args: &[String]) -> Result<ToolOutput, ToolError> {
        Ok(self.dispatch(args))
    }

    fn run_streaming(
        &self,
        _program: &str,
        args: &[String],
        on_line: &mut dyn FnMut(&str),
    ) -> Result<ToolOutput, ToolError> {
        let out = self.dispatch(args);
        for line in out.stdout.lines() {
            on_line(line);
        }
        Ok(out)
    }
}

fn option<'a>(args: &'a [String], name: &str) -> Option<&'a str> {
    let prefix = format!("-{name}:");
    args.iter().find_map(|a| a.strip_prefix(prefix.as_str()))
}

fn paths(args: &[String]) -> Vec<String> {
    args[1..]
        .iter()
        .filter(|a| !a.starts_with('-'))
        .cloned()
        .collect()
}

fn history_xml(changesets: &[ServerChangeset], args: &[String]) -> String {
    let (from, to) = option(args, "version")
        .and_then(|v| v.split_once('~'))
        .map_or((0, u64::MAX), |(a, b)| {
            (
                a.trim_start_matches('C').parse().unwrap(),
                b.trim_start_matches('C').parse().unwrap(),
            )
        });
    let stop_after = option(args, "stopafter").map_or(usize::MAX, |n| n.parse().unwrap());

    let mut xml = String::from("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<history>\n");
    for c in changesets
        .iter()
        .rev()
        .filter(|c| c.id >= from && c.id <= to)
        .take(stop_after)
    {
        xml.push_str(&format!(
            "  <changeset id=\"{}\" owner=\"{}\" committer=\"{}\" date=\"2024-01-01T10:{:02}:00.000+00:00\">\n    <comment>{}</comment>\n  </changeset>\n",
            c.id,
            c.committer,
            c.committer,
            c.id % 60,
            escape(&c.comment),
        ));
    }
    xml.push_str("</history>\n");
    xml
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

/// Replace everything outside `.git` with `files`.
fn write_tree(root: &Path, files: &Snapshot) {
    for entry in fs::read_dir(root).unwrap() {
        let entry = entry.unwrap();
        if entry.file_name() == ".git" {
            continue;
        }
        let path = entry.path();
        if entry.file_type().unwrap().is_dir() {
            fs::remove_dir_all(path).unwrap();
        } else {
            fs::remove_file(path).unwrap();
        }
    }
    for (rel, content) in files {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }
}

pub fn read_tree(root: &Path) -> Snapshot {
    let mut files = Snapshot::new();
    collect(root, root, &mut files);
    files
}

fn collect(root: &Path, dir: &Path, files: &mut Snapshot) {
    for entry in fs::read_dir(dir).unwrap() {
        let entry = entry.unwrap();
        if entry.file_name() == ".git" {
            continue;
        }
        let path = entry.path();
        if entry.file_type().unwrap().is_dir() {
            collect(root, &path, files);
        } else if entry.file_type().unwrap().is_file() {
            let rel = path
                .strip_prefix(root)
                .unwrap()
                .to_string_lossy()
                .replace('\\', "/");
            files.insert(rel, fs::read_to_string(&path).unwrap());
        }
    }
}
