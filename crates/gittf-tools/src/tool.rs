//! [`Tool`]: a program bound to a runner, with exit-code policy and dry-run
//! gating.
//!
//! Calls fall in two groups. *Queries* inspect state and always run, even in
//! dry-run mode. *Mutations* change repository or server state; in dry-run
//! mode they are logged and skipped, and the caller receives a synthetic
//! stdout value instead.

use std::sync::Arc;

use tracing::{debug, info};

use crate::error::ToolError;
use crate::runner::{ToolOutput, ToolRunner, render_command};

/// A named program plus the runner that executes it.
#[derive(Clone)]
pub struct Tool {
    program: String,
    runner: Arc<dyn ToolRunner>,
    dry_run: bool,
}

impl std::fmt::Debug for Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tool")
            .field("program", &self.program)
            .field("dry_run", &self.dry_run)
            .finish_non_exhaustive()
    }
}

/// Collect anything string-like into an owned argument vector.
pub fn to_args<I, S>(args: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    args.into_iter().map(|a| a.as_ref().to_owned()).collect()
}

impl Tool {
    /// Bind `program` to `runner`.
    #[must_use]
    pub fn new(program: impl Into<String>, runner: Arc<dyn ToolRunner>, dry_run: bool) -> Self {
        Self {
            program: program.into(),
            runner,
            dry_run,
        }
    }

    /// The program name or path.
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Whether mutations are suppressed.
    #[must_use]
    pub const fn dry_run(&self) -> bool {
        self.dry_run
    }

    /// Run a query; exit code 0 is required. Returns stdout with the trailing
    /// newline removed.
    ///
    /// # Errors
    /// [`ToolError::Failed`] on a non-zero exit, or any runner error.
    pub fn query<I, S>(&self, args: I) -> Result<String, ToolError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let out = self.query_allowing(args, &[0])?;
        Ok(chomp(out.stdout))
    }

    /// Run a query and return stdout untouched (for NUL-delimited output).
    ///
    /// # Errors
    /// [`ToolError::Failed`] on a non-zero exit, or any runner error.
    pub fn query_raw<I, S>(&self, args: I) -> Result<String, ToolError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Ok(self.query_allowing(args, &[0])?.stdout)
    }

    /// Run a query where a non-zero exit means "absent" rather than failure.
    ///
    /// # Errors
    /// Only runner errors (spawn, pipes).
    pub fn query_opt<I, S>(&self, args: I) -> Result<Option<String>, ToolError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let args = to_args(args);
        let out = self.runner.run(&self.program, &args)?;
        Ok(out.success().then(|| chomp(out.stdout)))
    }

    /// Run a query accepting any exit code in `allowed`.
    ///
    /// # Errors
    /// [`ToolError::Failed`] when the exit code is not in `allowed`.
    pub fn query_allowing<I, S>(&self, args: I, allowed: &[i32]) -> Result<ToolOutput, ToolError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let args = to_args(args);
        let out = self.runner.run(&self.program, &args)?;
        self.check(&args, out, allowed)
    }

    /// Run a mutation; exit code 0 is required. In dry-run mode returns
    /// `dry_value` without running anything.
    ///
    /// # Errors
    /// [`ToolError::Failed`] on a non-zero exit, or any runner error.
    pub fn mutate<I, S>(&self, args: I, dry_value: &str) -> Result<String, ToolError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let out = self.mutate_allowing(args, &[0], dry_value)?;
        Ok(chomp(out.stdout))
    }

    /// Run a mutation accepting any exit code in `allowed`.
    ///
    /// # Errors
    /// [`ToolError::Failed`] when the exit code is not in `allowed`.
    pub fn mutate_allowing<I, S>(
        &self,
        args: I,
        allowed: &[i32],
        dry_value: &str,
    ) -> Result<ToolOutput, ToolError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let args = to_args(args);
        if self.dry_run {
            info!(command = %render_command(&self.program, &args), "dry run: skipped");
            return Ok(ToolOutput::new(dry_value, "", 0));
        }
        let out = self.runner.run(&self.program, &args)?;
        self.check(&args, out, allowed)
    }

    /// Run a mutation, streaming each stdout line to `on_line`.
    ///
    /// # Errors
    /// [`ToolError::Failed`] on a non-zero exit, or any runner error.
    pub fn mutate_streaming<I, S>(
        &self,
        args: I,
        on_line: &mut dyn FnMut(&str),
    ) -> Result<String, ToolError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let args = to_args(args);
        if self.dry_run {
            info!(command = %render_command(&self.program, &args), "dry run: skipped");
            return Ok(String::new());
        }
        let out = self.runner.run_streaming(&self.program, &args, on_line)?;
        let out = self.check(&args, out, &[0])?;
        Ok(chomp(out.stdout))
    }

    fn check(&self, args: &[String], out: ToolOutput, allowed: &[i32]) -> Result<ToolOutput, ToolError> {
        if allowed.contains(&out.exit_code) {
            return Ok(out);
        }
        let command = render_command(&self.program, args);
        debug!(%command, exit_code = out.exit_code, "command failed");
        Err(ToolError::Failed {
            command,
            exit_code: out.exit_code,
            stderr: out.stderr.trim().to_owned(),
        })
    }
}

fn chomp(mut text: String) -> String {
    while text.ends_with('\n') || text.ends_with('\r') {
        text.pop();
    }
    text
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    /// Answers every call with a fixed output and remembers what it ran.
    struct Canned {
        output: ToolOutput,
        calls: Mutex<Vec<Vec<String>>>,
    }

    impl ToolRunner for Canned {
        fn run(&self, _program: &str, args: &[String]) -> Result<ToolOutput, ToolError> {
            self.calls.lock().unwrap().push(args.to_vec());
            Ok(self.output.clone())
        }

        fn run_streaming(
            &self,
            program: &str,
            args: &[String],
            on_line: &mut dyn FnMut(&str),
        ) -> Result<ToolOutput, ToolError> {
            let out = self.run(program, args)?;
            out.stdout.lines().for_each(|l| on_line(l));
            Ok(out)
        }
    }

    fn canned(stdout: &str, code: i32) -> Arc<Canned> {
        Arc::new(Canned {
            output: ToolOutput::new(stdout, "stderr text\n", code),
            calls: Mutex::new(Vec::new()),
        })
    }

    #[test]
    fn query_chomps_trailing_newline() {
        let runner = canned("abc\n", 0);
        let tool = Tool::new("git", runner, false);
        assert_eq!(tool.query(["rev-parse", "HEAD"]).unwrap(), "abc");
    }

    #[test]
    fn query_rejects_nonzero() {
        let tool = Tool::new("git", canned("", 1), false);
        let err = tool.query(["status"]).unwrap_err();
        assert_eq!(err.exit_code(), Some(1));
        assert_eq!(err.detail(), "stderr text");
    }

    #[test]
    fn query_opt_maps_failure_to_none() {
        let tool = Tool::new("git", canned("note", 1), false);
        assert_eq!(tool.query_opt(["notes", "show"]).unwrap(), None);
    }

    #[test]
    fn allowed_exit_codes_pass() {
        let tool = Tool::new("tf", canned("nothing to undo", 100), false);
        let out = tool
            .mutate_allowing(["undo", "-recursive", "."], &[0, 100], "")
            .unwrap();
        assert_eq!(out.exit_code, 100);
    }

    #[test]
    fn dry_run_skips_mutations_but_runs_queries() {
        let runner = canned("real", 0);
        let tool = Tool::new("tf", runner.clone(), true);
        assert_eq!(tool.mutate(["checkin"], "Changeset #0").unwrap(), "Changeset #0");
        assert!(runner.calls.lock().unwrap().is_empty());
        assert_eq!(tool.query(["status"]).unwrap(), "real");
        assert_eq!(runner.calls.lock().unwrap().len(), 1);
    }
}
