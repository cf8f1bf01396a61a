//! Tool invocation layer for git-tf.
//!
//! Every interaction with the two external command-line tools goes through
//! this crate. Nothing else in git-tf spawns processes; callers program
//! against the [`ToolRunner`] trait and the typed [`Git`] and [`Tf`]
//! wrappers built on top of it.
//!
//! # Crate layout
//!
//! - [`runner`]: the [`ToolRunner`] trait and [`ToolOutput`].
//! - [`process`]: [`ProcessRunner`], the `std::process` backed runner.
//! - [`tool`]: [`Tool`], a program bound to a runner with dry-run gating.
//! - [`git`]: [`Git`], typed git subcommands.
//! - [`tf`]: [`Tf`], typed tf subcommands with parameter-prefix handling.
//! - [`diff`]: parser for `git diff --raw -z`.
//! - [`history_xml`]: parser for `tf history -format:xml`.
//! - [`error`]: the [`ToolError`] enum returned by everything above.

pub mod diff;
pub mod error;
pub mod git;
pub mod history_xml;
pub mod process;
pub mod runner;
pub mod tf;
pub mod tool;

pub use diff::{ChangeStatus, RawChange, parse_raw_diff};
pub use error::ToolError;
pub use git::{CommitSpec, Git};
pub use history_xml::{HistoryEntry, parse_history};
pub use process::ProcessRunner;
pub use runner::{ToolOutput, ToolRunner};
pub use tf::{HistoryQuery, Tf};
pub use tool::Tool;
