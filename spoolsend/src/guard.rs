//! Run-overlap prevention
//!
//! Keeps a second scheduled batch from scanning a spool that another batch is
//! still draining. Claims stay exclusive without it.

use std::{
    fs::{File, OpenOptions},
    io,
    os::fd::AsRawFd,
    path::{Path, PathBuf},
};

use serde::Deserialize;
use spoolsend_common::internal;

fn default_lock_file() -> PathBuf {
    std::env::temp_dir().join("spoolsend.lock")
}

/// Where the lock file lives
#[derive(Debug, Clone, Deserialize)]
pub struct GuardConfig {
    /// Default: `spoolsend.lock` in the system temporary directory
    #[serde(default = "default_lock_file")]
    pub lock_file: PathBuf,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            lock_file: default_lock_file(),
        }
    }
}

/// Decides whether this batch may run, and is told when it is over
pub trait RunGuard: Send {
    /// `false` means another batch is active and this one must not touch the
    /// spool
    ///
    /// # Errors
    /// If the guard itself cannot be evaluated
    fn check_run_status(&mut self) -> anyhow::Result<bool>;

    /// Release whatever `check_run_status` acquired; safe to call repeatedly
    fn complete_run(&mut self);
}

/// Exclusive non-blocking `flock(2)` on a lock file
///
/// The kernel drops the lock when the process exits, so a crashed batch never
/// leaves a stale lock behind.
#[derive(Debug)]
pub struct LockFileGuard {
    path: PathBuf,
    file: Option<File>,
}

impl LockFileGuard {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: None,
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether this guard currently holds the lock
    #[must_use]
    pub const fn is_held(&self) -> bool {
        self.file.is_some()
    }
}

impl RunGuard for LockFileGuard {
    fn check_run_status(&mut self) -> anyhow::Result<bool> {
        if self.file.is_some() {
            return Ok(true);
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)
            .map_err(|e| {
                anyhow::anyhow!("Failed to open lock file {}: {e}", self.path.display())
            })?;

        // SAFETY: the descriptor belongs to `file`, which outlives the call.
        let result = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
        if result == 0 {
            internal!(level = DEBUG, path = %self.path.display(), "Acquired run lock");
            self.file = Some(file);
            return Ok(true);
        }

        let err = io::Error::last_os_error();
        if err.kind() == io::ErrorKind::WouldBlock {
            return Ok(false);
        }

        Err(anyhow::anyhow!(
            "Failed to lock {}: {err}",
            self.path.display()
        ))
    }

    fn complete_run(&mut self) {
        if let Some(file) = self.file.take() {
            // SAFETY: the descriptor belongs to `file`, which is still open.
            unsafe {
                libc::flock(file.as_raw_fd(), libc::LOCK_UN);
            }
            internal!(level = DEBUG, path = %self.path.display(), "Released run lock");
        }
    }
}

impl Drop for LockFileGuard {
    fn drop(&mut self) {
        self.complete_run();
    }
}

/// Always lets the batch run
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopGuard;

impl RunGuard for NoopGuard {
    fn check_run_status(&mut self) -> anyhow::Result<bool> {
        Ok(true)
    }

    fn complete_run(&mut self) {}
}
