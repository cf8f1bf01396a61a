//! Real git with scripted failures for chosen invocations.

use std::path::Path;
use std::sync::Mutex;

use gittf_tools::{ProcessRunner, ToolError, ToolOutput, ToolRunner};

#[derive(Debug)]
pub struct GitFault {
    inner: ProcessRunner,
    /// `(tokens, n)`: the `n`th call whose arguments contain every token
    /// fails.
    failures: Mutex<Vec<(Vec<String>, usize)>>,
}

impl GitFault {
    pub fn new(root: &Path) -> Self {
        Self {
            inner: ProcessRunner::new(root),
            failures: Mutex::new(Vec::new()),
        }
    }

    /// Fail the `n`th git call (1-based) containing all of `tokens`.
    pub fn fail_nth(&self, tokens: &[&str], n: usize) {
        assert!(n > 0, "n is 1-based");
        let tokens = tokens.iter().map(|t| (*t).to_owned()).collect();
        self.failures.lock().unwrap().push((tokens, n));
    }

    fn injected(&self, args: &[String]) -> Option<ToolOutput> {
        let mut failures = self.failures.lock().unwrap();
        let pos = failures
            .iter()
            .position(|(tokens, _)| tokens.iter().all(|t| args.contains(t)))?;
        if failures[pos].1 == 1 {
            failures.remove(pos);
            return Some(ToolOutput::new("", "fatal: injected failure", 128));
        }
        failures[pos].1 -= 1;
        None
    }
}

impl ToolRunner for GitFault {
    fn run(&self, program: &str, args: &[String]) -> Result<ToolOutput, ToolError> {
        match self.injected(args) {
            Some(out) => Ok(out),
            None => self.inner.run(program, args),
        }
    }

    fn run_streaming(
        &self,
        program: &str,
        args: &[String],
        on_line: &mut dyn FnMut(&str),
    ) -> Result<ToolOutput, ToolError> {
        match self.injected(args) {
            Some(out) => Ok(out),
            None => self.inner.run_streaming(program, args, on_line),
        }
    }
}
