//! Exclusive ownership of spool entries
//!
//! A claim is a single `rename(2)` of the entry to `<base>.sending`. Rename is
//! atomic, so when several dispatchers (threads or processes) race for the
//! same entry exactly one rename succeeds; the others see `ENOENT` because
//! the source name no longer exists. No lock is involved.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use spoolsend_common::internal;

use crate::{
    message::SpooledMessage,
    types::{SpoolEntry, SpoolState, with_suffix},
};

/// An entry this process owns until it is completed or requeued
///
/// Dropping a `ClaimedEntry` without finalizing it leaves the file in the
/// in-flight state.
#[derive(Debug)]
pub struct ClaimedEntry {
    base: PathBuf,
    sending: PathBuf,
    prior: SpoolState,
    message: SpooledMessage,
    reverse_path: String,
}

/// Take ownership of `entry` by renaming it to its in-flight name
///
/// The returned entry remembers the state it was claimed from, which decides
/// where a failed attempt goes next.
///
/// An in-flight entry (only offered by the scanner once it is stale) is
/// recovered in two steps: it is first renamed to the final-retry state and
/// then claimed from there. A crash between the steps leaves a valid
/// final-retry entry behind. The recovered entry is treated as being on its
/// last attempt.
///
/// Every claim shares the same in-flight name, so the file is stat'ed again
/// first and recovery is refused unless its inode and status-change time
/// still match `entry`. A claim landing between that check and the first
/// rename is not detected.
///
/// # Errors
/// Returns the rename error. `NotFound` means another dispatcher got there
/// first and is not a failure of this process.
pub fn claim(
    entry: &SpoolEntry,
    message: SpooledMessage,
    reverse_path: String,
) -> io::Result<ClaimedEntry> {
    let sending = entry.path_in(SpoolState::InFlight);

    let prior = match entry.state() {
        SpoolState::InFlight => {
            let metadata = fs::symlink_metadata(&sending)?;
            if !entry.is_unchanged(&metadata) {
                return Err(io::Error::new(
                    io::ErrorKind::NotFound,
                    "in-flight entry changed since it was observed",
                ));
            }

            let final_retry = entry.path_in(SpoolState::RetryFinal);
            fs::rename(&sending, &final_retry)?;
            internal!(
                level = WARN,
                path = %sending.display(),
                "Recovered stale in-flight entry"
            );
            fs::rename(&final_retry, &sending)?;
            SpoolState::RetryFinal
        }
        state => {
            fs::rename(entry.path(), &sending)?;
            state
        }
    };

    internal!(
        level = DEBUG,
        path = %sending.display(),
        prior = %prior,
        "Claimed spool entry"
    );

    Ok(ClaimedEntry {
        base: entry.base().to_path_buf(),
        sending,
        prior,
        message,
        reverse_path,
    })
}

impl ClaimedEntry {
    /// The logical identifier shared by every state of this message
    #[must_use]
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// The in-flight path currently holding the message
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.sending
    }

    /// The state the entry was claimed from
    #[must_use]
    pub const fn prior(&self) -> SpoolState {
        self.prior
    }

    #[must_use]
    pub const fn message(&self) -> &SpooledMessage {
        &self.message
    }

    /// The resolved envelope sender
    #[must_use]
    pub fn reverse_path(&self) -> &str {
        &self.reverse_path
    }

    /// Remove the message from the spool for good
    ///
    /// # Errors
    /// If the in-flight file cannot be removed
    pub fn complete(self) -> io::Result<()> {
        fs::remove_file(&self.sending)?;
        internal!(level = DEBUG, path = %self.base.display(), "Removed spool entry");
        Ok(())
    }

    /// Hand the message back to the spool in `state`
    ///
    /// # Errors
    /// If the rename fails
    pub fn requeue(self, state: SpoolState) -> io::Result<PathBuf> {
        let target = with_suffix(&self.base, state.suffix());
        fs::rename(&self.sending, &target)?;
        internal!(
            level = DEBUG,
            path = %target.display(),
            state = %state,
            "Requeued spool entry"
        );
        Ok(target)
    }
}
