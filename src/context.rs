//! [`CommandContext`]: everything one git-tf invocation needs, built once
//! and passed by reference to every engine.
//!
//! Creating a context for an existing repository takes an exclusive lock on
//! `.git/git-tf.lock`. A second invocation against the same repository fails
//! with [`BridgeError::CommandInProgress`] while the first is running. The
//! lock is released when the context is dropped.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

use fs4::fs_std::FileExt;
use gittf_tools::{Git, ProcessRunner, Tf, ToolRunner};
use regex::Regex;
use tracing::{debug, warn};

use crate::config::BridgeConfig;
use crate::error::BridgeError;

/// Lock file name inside `.git`.
pub const LOCK_FILE: &str = "git-tf.lock";

static WORKFOLD_MAPPING: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*(\$[^:]+): (\S.*?)\s*$"));

/// Flags shared by every command.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ContextOptions {
    /// Log mutating commands instead of running them.
    pub dry_run: bool,
    /// Verbosity level from `-v` flags.
    pub verbose: u8,
    /// Skip the pending-server-changes check.
    pub no_checks: bool,
}

/// One `(server path, local path)` line of `tf workfold` output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FolderMapping {
    pub server: String,
    pub local: PathBuf,
}

/// Parse the folder mappings out of `tf workfold` output.
#[must_use]
pub fn parse_workfold(output: &str) -> Vec<FolderMapping> {
    let Ok(pattern) = WORKFOLD_MAPPING.as_ref() else {
        return Vec::new();
    };
    pattern
        .captures_iter(output)
        .map(|caps| FolderMapping {
            server: caps[1].trim().to_owned(),
            local: PathBuf::from(&caps[2]),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// CommandContext
// ---------------------------------------------------------------------------

/// Per-invocation state: repository root, options, config, tool handles and
/// the repository lock.
pub struct CommandContext {
    root: PathBuf,
    options: ContextOptions,
    config: BridgeConfig,
    git: Git,
    tf: Tf,
    tf_runner: Arc<dyn ToolRunner>,
    lock: Option<File>,
}

impl std::fmt::Debug for CommandContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandContext")
            .field("root", &self.root)
            .field("options", &self.options)
            .field("config", &self.config)
            .field("locked", &self.lock.is_some())
            .finish_non_exhaustive()
    }
}

impl CommandContext {
    /// Open the repository containing `cwd` with process-backed runners,
    /// loading config from git and taking the repository lock.
    ///
    /// # Errors
    /// [`BridgeError::NotARepository`] outside a repository,
    /// [`BridgeError::CommandInProgress`] if the lock is held.
    pub fn open(cwd: &Path, options: ContextOptions) -> Result<Self, BridgeError> {
        let probe = Git::new(Arc::new(ProcessRunner::new(cwd)), options.dry_run);
        if !probe.is_repository()? {
            return Err(BridgeError::NotARepository {
                path: cwd.to_path_buf(),
            });
        }
        let root = probe.toplevel()?;
        let runner: Arc<dyn ToolRunner> = Arc::new(ProcessRunner::new(&root));
        let config = BridgeConfig::load(&Git::new(Arc::clone(&runner), options.dry_run))?;
        Self::with_runners(root, options, config, Arc::clone(&runner), runner)
    }

    /// Context for `clone`: `dir` need not be a repository yet. The lock is
    /// taken later with [`lock`](Self::lock), once `.git` exists.
    ///
    /// # Errors
    /// Fails when git cannot be run.
    pub fn for_clone(dir: &Path, options: ContextOptions) -> Result<Self, BridgeError> {
        let runner: Arc<dyn ToolRunner> = Arc::new(ProcessRunner::new(dir));
        let config = BridgeConfig::load(&Git::new(Arc::clone(&runner), options.dry_run))?;
        Ok(Self::unlocked(dir.to_path_buf(), options, config, Arc::clone(&runner), runner))
    }

    /// Build a context from explicit parts. The lock is taken if `root`
    /// already contains a `.git` directory.
    ///
    /// # Errors
    /// [`BridgeError::CommandInProgress`] if the lock is held.
    pub fn with_runners(
        root: PathBuf,
        options: ContextOptions,
        config: BridgeConfig,
        git_runner: Arc<dyn ToolRunner>,
        tf_runner: Arc<dyn ToolRunner>,
    ) -> Result<Self, BridgeError> {
        let mut ctx = Self::unlocked(root, options, config, git_runner, tf_runner);
        if ctx.root.join(".git").is_dir() {
            ctx.lock()?;
        }
        Ok(ctx)
    }

    fn unlocked(
        root: PathBuf,
        options: ContextOptions,
        config: BridgeConfig,
        git_runner: Arc<dyn ToolRunner>,
        tf_runner: Arc<dyn ToolRunner>,
    ) -> Self {
        let git = Git::new(git_runner, options.dry_run);
        let tf = Tf::new(
            config.tf_command.clone(),
            config.param_prefix.clone(),
            Arc::clone(&tf_runner),
            options.dry_run,
        );
        Self {
            root,
            options,
            config,
            git,
            tf,
            tf_runner,
            lock: None,
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub const fn options(&self) -> ContextOptions {
        self.options
    }

    #[must_use]
    pub const fn dry_run(&self) -> bool {
        self.options.dry_run
    }

    #[must_use]
    pub const fn config(&self) -> &BridgeConfig {
        &self.config
    }

    #[must_use]
    pub const fn git(&self) -> &Git {
        &self.git
    }

    #[must_use]
    pub const fn tf(&self) -> &Tf {
        &self.tf
    }

    /// The mirror branch name (`tfs` by default).
    #[must_use]
    pub fn mirror_branch(&self) -> &str {
        &self.config.mirror_branch
    }

    /// The work branch name (`master` by default).
    #[must_use]
    pub fn work_branch(&self) -> &str {
        &self.config.work_branch
    }

    /// Re-read config from git (clone changes `user.email` mid-command).
    ///
    /// # Errors
    /// Config errors.
    pub fn reload_config(&mut self) -> Result<(), BridgeError> {
        self.config = BridgeConfig::load(&self.git)?;
        self.tf = Tf::new(
            self.config.tf_command.clone(),
            self.config.param_prefix.clone(),
            Arc::clone(&self.tf_runner),
            self.options.dry_run,
        );
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Locking
    // -----------------------------------------------------------------------

    /// Path of the repository lock file.
    #[must_use]
    pub fn lock_path(&self) -> PathBuf {
        self.root.join(".git").join(LOCK_FILE)
    }

    /// Take the repository lock. Idempotent.
    ///
    /// # Errors
    /// [`BridgeError::CommandInProgress`] if another process holds it.
    pub fn lock(&mut self) -> Result<(), BridgeError> {
        if self.lock.is_some() {
            return Ok(());
        }
        let path = self.lock_path();
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)?;
        match FileExt::try_lock_exclusive(&file) {
            Ok(true) => {
                debug!(lock = %path.display(), "acquired repository lock");
                self.lock = Some(file);
                Ok(())
            }
            Ok(false) => Err(BridgeError::CommandInProgress { lock: path }),
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => {
                Err(BridgeError::CommandInProgress { lock: path })
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Release the lock early (clone does this before deleting `.git`).
    pub fn unlock(&mut self) {
        if let Some(file) = self.lock.take() {
            if let Err(err) = FileExt::unlock(&file) {
                warn!(%err, "failed to release repository lock");
            }
        }
    }

    // -----------------------------------------------------------------------
    // Pre-flight checks
    // -----------------------------------------------------------------------

    /// # Errors
    /// [`BridgeError::DirtyWorktree`] when git reports any change, untracked
    /// files included.
    pub fn ensure_clean_worktree(&self) -> Result<(), BridgeError> {
        let status = self.git.status_porcelain()?;
        if status.is_empty() {
            Ok(())
        } else {
            Err(BridgeError::DirtyWorktree { status })
        }
    }

    /// Skipped with `--no-checks`.
    ///
    /// # Errors
    /// [`BridgeError::PendingServerChanges`] when `tf status` lists any.
    pub fn ensure_no_pending_server_changes(&self) -> Result<(), BridgeError> {
        if self.options.no_checks {
            debug!("skipping pending server changes check");
            return Ok(());
        }
        if self.tf.has_pending_changes()? {
            return Err(BridgeError::PendingServerChanges {
                status: self.tf.status()?,
            });
        }
        Ok(())
    }

    /// The server workspace must map a folder containing the repository
    /// root. With `exact`, the mapping must be the root itself.
    ///
    /// # Errors
    /// [`BridgeError::WorkfoldMismatch`] otherwise.
    pub fn ensure_workfold_matches(&self, exact: bool) -> Result<(), BridgeError> {
        let output = self.tf.workfold()?;
        let root = normalize(&self.root);
        let covered = parse_workfold(&output).iter().any(|mapping| {
            let local = normalize(&mapping.local);
            if exact { local == root } else { root.starts_with(&local) }
        });
        if covered {
            Ok(())
        } else {
            Err(BridgeError::WorkfoldMismatch {
                root: self.root.clone(),
                mapping: output,
            })
        }
    }
}

impl Drop for CommandContext {
    fn drop(&mut self) {
        self.unlock();
    }
}

fn normalize(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workfold_pattern_compiles() {
        assert!(WORKFOLD_MAPPING.is_ok());
    }

    #[test]
    fn parses_workfold_output() {
        let output = "===============================================================================\n\
                      Workspace : build01 (alice)\n\
                      Collection: http://tfs:8080/tfs/DefaultCollection\n \
                      $/Project/Main: /home/alice/src/main\n \
                      $/Project/Docs: /home/alice/docs\n";
        let maps = parse_workfold(output);
        assert_eq!(maps.len(), 2);
        assert_eq!(maps[0].server, "$/Project/Main");
        assert_eq!(maps[0].local, PathBuf::from("/home/alice/src/main"));
        assert_eq!(maps[1].local, PathBuf::from("/home/alice/docs"));
    }

    #[test]
    fn workfold_ignores_header_lines() {
        assert!(parse_workfold("Workspace : ws (me)\nCollection: http://x/").is_empty());
    }
}
