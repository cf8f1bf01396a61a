//! The [`ToolRunner`] trait, the single boundary between git-tf and the
//! processes it drives.
//!
//! A runner executes `program args...` to completion and reports what
//! happened. It never decides whether an exit code is acceptable; that is the
//! caller's job (see [`Tool`](crate::Tool)), because several tf subcommands
//! use non-zero codes for benign outcomes.

use crate::error::ToolError;

/// Everything observed from one finished tool invocation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// Captured standard output, unmodified.
    pub stdout: String,
    /// Captured standard error, unmodified.
    pub stderr: String,
    /// Process exit code (`-1` if terminated by a signal).
    pub exit_code: i32,
}

impl ToolOutput {
    /// Build an output value; handy for test doubles.
    #[must_use]
    pub fn new(stdout: impl Into<String>, stderr: impl Into<String>, exit_code: i32) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: stderr.into(),
            exit_code,
        }
    }

    /// `true` when the exit code is zero.
    #[must_use]
    pub const fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Runs external programs.
///
/// # Object safety
///
/// The trait is object-safe so both tools can share `Arc<dyn ToolRunner>`
/// handles and tests can substitute a scripted double for either program.
pub trait ToolRunner {
    /// Run to completion, buffering all output.
    ///
    /// # Errors
    /// Returns [`ToolError::Spawn`] when the program cannot be started and
    /// [`ToolError::Io`] when its pipes fail. A non-zero exit is *not* an
    /// error at this level.
    fn run(&self, program: &str, args: &[String]) -> Result<ToolOutput, ToolError>;

    /// Run to completion, handing each stdout line to `on_line` as soon as it
    /// is read. The returned [`ToolOutput::stdout`] still holds the full text.
    ///
    /// # Errors
    /// Same as [`run`](Self::run).
    fn run_streaming(
        &self,
        program: &str,
        args: &[String],
        on_line: &mut dyn FnMut(&str),
    ) -> Result<ToolOutput, ToolError>;
}

/// Render `program args...` for logs and diagnostics, quoting arguments that
/// contain whitespace.
#[must_use]
pub fn render_command(program: &str, args: &[String]) -> String {
    let mut rendered = program.to_owned();
    for arg in args {
        rendered.push(' ');
        if arg.is_empty() || arg.chars().any(char::is_whitespace) {
            rendered.push('"');
            rendered.push_str(&arg.replace('"', "\\\""));
            rendered.push('"');
        } else {
            rendered.push_str(arg);
        }
    }
    rendered
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_quotes_whitespace() {
        let args = vec!["commit".to_owned(), "-m".to_owned(), "fix the \"bug\"".to_owned()];
        assert_eq!(
            render_command("git", &args),
            r#"git commit -m "fix the \"bug\"""#
        );
    }

    #[test]
    fn output_success() {
        assert!(ToolOutput::new("", "", 0).success());
        assert!(!ToolOutput::new("", "boom", 100).success());
    }
}
