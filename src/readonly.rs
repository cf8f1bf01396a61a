//! Scoped read-only worktree.
//!
//! While a [`ReadOnlyWorktree`] is alive every regular file under the root,
//! except inside `.git`, has its write permission removed. Stray edits made
//! while the server client rewrites the tree then fail instead of being
//! silently committed. Dropping the guard makes every file writable again.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

/// RAII guard returned by [`ReadOnlyWorktree::acquire`].
#[derive(Debug)]
#[must_use = "the worktree becomes writable again when the guard drops"]
pub struct ReadOnlyWorktree {
    root: PathBuf,
}

impl ReadOnlyWorktree {
    /// Remove write permission from every file under `root`.
    ///
    /// # Errors
    /// Fails when the tree cannot be walked or a permission cannot be
    /// changed. Files already processed are made writable again first.
    pub fn acquire(root: &Path) -> io::Result<Self> {
        debug!(root = %root.display(), "making worktree read-only");
        let guard = Self {
            root: root.to_path_buf(),
        };
        set_tree_writable(root, false)?;
        Ok(guard)
    }
}

impl Drop for ReadOnlyWorktree {
    fn drop(&mut self) {
        debug!(root = %self.root.display(), "making worktree writable");
        if let Err(err) = set_tree_writable(&self.root, true) {
            warn!(root = %self.root.display(), %err, "could not restore write permission");
        }
    }
}

fn set_tree_writable(dir: &Path, writable: bool) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        let path = entry.path();
        if file_type.is_dir() {
            if entry.file_name() == ".git" {
                continue;
            }
            set_tree_writable(&path, writable)?;
        } else if file_type.is_file() {
            set_writable(&path, writable)?;
        }
    }
    Ok(())
}

#[cfg(unix)]
fn set_writable(path: &Path, writable: bool) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut perms = fs::metadata(path)?.permissions();
    let mode = perms.mode();
    let new_mode = if writable { mode | 0o200 } else { mode & !0o222 };
    if new_mode != mode {
        perms.set_mode(new_mode);
        fs::set_permissions(path, perms)?;
    }
    Ok(())
}

#[cfg(not(unix))]
fn set_writable(path: &Path, writable: bool) -> io::Result<()> {
    let mut perms = fs::metadata(path)?.permissions();
    if perms.readonly() == writable {
        perms.set_readonly(!writable);
        fs::set_permissions(path, perms)?;
    }
    Ok(())
}

#[cfg(all(test, unix))]
mod tests {
    use std::os::unix::fs::PermissionsExt;

    use super::*;

    fn mode(path: &Path) -> u32 {
        fs::metadata(path).unwrap().permissions().mode() & 0o777
    }

    #[test]
    fn files_are_read_only_while_held_and_restored_after() {
        let dir = tempfile::TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("src/deep")).unwrap();
        fs::create_dir_all(root.join(".git")).unwrap();
        fs::write(root.join("a.txt"), "a").unwrap();
        fs::write(root.join("src/deep/b.txt"), "b").unwrap();
        fs::write(root.join(".git/config"), "c").unwrap();

        {
            let _guard = ReadOnlyWorktree::acquire(root).unwrap();
            assert_eq!(mode(&root.join("a.txt")) & 0o222, 0);
            assert_eq!(mode(&root.join("src/deep/b.txt")) & 0o222, 0);
            assert_ne!(mode(&root.join(".git/config")) & 0o200, 0);
        }

        assert_ne!(mode(&root.join("a.txt")) & 0o200, 0);
        assert_ne!(mode(&root.join("src/deep/b.txt")) & 0o200, 0);
    }

    #[test]
    fn restored_when_the_body_fails() {
        let dir = tempfile::TempDir::new().unwrap();
        fs::write(dir.path().join("a.txt"), "a").unwrap();

        let result: Result<(), &str> = (|| {
            let _guard = ReadOnlyWorktree::acquire(dir.path()).unwrap();
            Err("materialization failed")
        })();

        assert!(result.is_err());
        assert_ne!(mode(&dir.path().join("a.txt")) & 0o200, 0);
    }
}
