// Copyright 2025-present Andrew Lindesay
// SPDX-License-Identifier: MIT

//! Root directory resolution and the advisory lock that keeps an install
//! and a query from touching the index at the same time.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use crate::error::{DeenError, Result};

const ENV_ROOT: &str = "DEEN_ROOT";
const LOCK_FILE_NAME: &str = "ding.lock";

/// Resolve the directory deen keeps its installed corpus and index in:
/// `$DEEN_ROOT` if set, else the platform data directory, else the current
/// directory as a last resort (e.g. a user account with no home directory).
pub fn root_dir() -> PathBuf {
    if let Ok(value) = std::env::var(ENV_ROOT) {
        if !value.is_empty() {
            return PathBuf::from(value);
        }
    }
    if let Some(dir) = dirs::data_dir() {
        return dir.join("deen");
    }
    PathBuf::from(".")
}

pub fn ensure_root_dir(root: &Path) -> Result<()> {
    fs::create_dir_all(root).map_err(|e| DeenError::io(root, e))
}

/// Holds an advisory, install-vs-query exclusion lock for as long as it's
/// alive. Uses `create_new` so two processes racing to install never both
/// believe they hold it; the lock file is removed on drop.
pub struct RootLock {
    path: PathBuf,
}

impl RootLock {
    pub fn acquire(root: &Path) -> Result<Self> {
        let path = root.join(LOCK_FILE_NAME);
        OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| DeenError::io(&path, e))?;
        Ok(RootLock { path })
    }

    /// `true` if a lock held by another process would currently be refused,
    /// without attempting to take it.
    pub fn is_locked(root: &Path) -> bool {
        root.join(LOCK_FILE_NAME).exists()
    }
}

impl Drop for RootLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

pub fn corpus_path(root: &Path) -> PathBuf {
    root.join("ding.txt")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn root_dir_honours_env_override() {
        let dir = tempdir().unwrap();
        std::env::set_var(ENV_ROOT, dir.path());
        assert_eq!(root_dir(), dir.path());
        std::env::remove_var(ENV_ROOT);
    }

    #[test]
    fn lock_is_exclusive_and_released_on_drop() {
        let dir = tempdir().unwrap();
        ensure_root_dir(dir.path()).unwrap();

        let lock = RootLock::acquire(dir.path()).unwrap();
        assert!(RootLock::is_locked(dir.path()));
        assert!(RootLock::acquire(dir.path()).is_err());

        drop(lock);
        assert!(!RootLock::is_locked(dir.path()));
        assert!(RootLock::acquire(dir.path()).is_ok());
    }
}
