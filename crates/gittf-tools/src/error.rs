//! Error types for tool invocations.
//!
//! [`ToolError`] is the single error type returned by the runner and the
//! typed wrappers. Exit-status failures keep the rendered command line and
//! captured stderr so the caller can print a complete diagnostic.

use thiserror::Error;

/// Errors returned by [`ToolRunner`](crate::ToolRunner) implementations and
/// the [`Git`](crate::Git) / [`Tf`](crate::Tf) wrappers.
#[derive(Debug, Error)]
pub enum ToolError {
    /// The program could not be started at all (not installed, not on `PATH`).
    #[error("failed to start `{program}`: {source}")]
    Spawn {
        /// The program that was being started.
        program: String,
        /// The underlying OS error.
        source: std::io::Error,
    },

    /// The program ran but exited with a status the caller does not accept.
    #[error("command `{command}` exited with code {exit_code}{}", stderr_suffix(.stderr))]
    Failed {
        /// The rendered command line.
        command: String,
        /// The exit code (`-1` when the process was killed by a signal).
        exit_code: i32,
        /// Captured standard error, trimmed.
        stderr: String,
    },

    /// Tool output could not be parsed.
    #[error("could not parse {what}: {message}")]
    Parse {
        /// What was being parsed (e.g. `"tf history xml"`).
        what: &'static str,
        /// Details about the failure.
        message: String,
    },

    /// An I/O error unrelated to spawning (pipes, temp files).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ToolError {
    /// The exit code carried by a [`ToolError::Failed`], if any.
    #[must_use]
    pub const fn exit_code(&self) -> Option<i32> {
        match self {
            Self::Failed { exit_code, .. } => Some(*exit_code),
            _ => None,
        }
    }

    /// The captured stderr of a [`ToolError::Failed`], or the display string.
    #[must_use]
    pub fn detail(&self) -> String {
        match self {
            Self::Failed { stderr, .. } if !stderr.is_empty() => stderr.clone(),
            other => other.to_string(),
        }
    }
}

fn stderr_suffix(stderr: &str) -> String {
    if stderr.is_empty() {
        String::new()
    } else {
        format!(": {stderr}")
    }
}
