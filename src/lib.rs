//! git-tf core library.
//!
//! Keeps a git repository and a TFVC server in step. Server changesets are
//! replayed as commits on a mirror branch (`tfs`), local commits on the work
//! branch (`master`) are checked in as new changesets, and every mirror
//! commit carries a git note naming the changeset it represents.
//!
//! The `git-tf` binary lives in `crates/gittf-cli`; process invocation and
//! output parsing live in `crates/gittf-tools`. Everything here operates on
//! a [`CommandContext`], built once per command.

pub mod branch;
pub mod changeset;
pub mod clone;
pub mod config;
pub mod context;
pub mod error;
pub mod history;
pub mod notes;
pub mod push;
pub mod readonly;
pub mod repair;
pub mod replay;
pub mod sync;

pub use changeset::{Changeset, ChangesetId};
pub use context::{CommandContext, ContextOptions};
pub use error::{BridgeError, ErrorKind};
