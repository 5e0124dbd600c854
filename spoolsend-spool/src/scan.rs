//! Lazy spool scanning
//!
//! [`SpoolScanner`] walks the spool directory once and yields only entries it
//! has successfully claimed. Everything else is skipped and counted; nothing
//! about a single bad entry can stop the scan.
//!
//! Entries are requeued under new names while the scan is still running, and
//! the directory listing may return those names too. Each message is
//! therefore yielded at most once per scan.

use std::{
    collections::HashSet,
    fs::{self, DirEntry, ReadDir},
    io,
    path::PathBuf,
    sync::Arc,
    time::SystemTime,
};

use spoolsend_common::internal;

use crate::{
    claim::{ClaimedEntry, claim},
    config::SpoolConfig,
    error::Result,
    message::SpooledMessage,
    reverse_path::reverse_path,
    types::{SpoolEntry, SpoolName, SpoolState},
};

/// Per-reason counts of entries the scanner did not yield
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScanStats {
    /// Entries claimed and handed downstream
    pub claimed: usize,
    /// Names that are not spool entries, and non-files
    pub unrecognized: usize,
    /// Older than the maximum age
    pub too_old: usize,
    /// In flight elsewhere (or stranded and not yet reclaimable)
    pub in_flight: usize,
    /// Content that is not a message
    pub corrupt: usize,
    /// Messages without any envelope-sender candidate
    pub no_reverse_path: usize,
    /// Claimed by a concurrent dispatcher first
    pub lost_race: usize,
    /// Metadata, read or claim failures other than a lost race
    pub unreadable: usize,
    /// Messages already yielded earlier in the same scan
    pub revisited: usize,
}

impl ScanStats {
    /// Total number of directory entries looked at
    #[must_use]
    pub const fn seen(&self) -> usize {
        self.claimed
            + self.unrecognized
            + self.too_old
            + self.in_flight
            + self.corrupt
            + self.no_reverse_path
            + self.lost_race
            + self.unreadable
            + self.revisited
    }
}

/// Single-pass iterator over claimable spool entries
///
/// The directory is listed lazily, so entries created after the scan starts
/// may or may not be seen. Each call to `next` does the filesystem work for
/// as many directory entries as it takes to produce one claim.
#[derive(Debug)]
pub struct SpoolScanner {
    config: Arc<SpoolConfig>,
    entries: Option<ReadDir>,
    now: SystemTime,
    stats: ScanStats,
    yielded: HashSet<PathBuf>,
}

enum Skip {
    Unrecognized,
    TooOld,
    InFlight,
    Corrupt,
    NoReversePath,
    LostRace,
    Unreadable,
    Revisited,
}

impl SpoolScanner {
    /// Start scanning the configured spool, measuring ages against the
    /// current time
    ///
    /// A spool directory that does not exist is an empty spool.
    ///
    /// # Errors
    /// If the directory exists but cannot be listed
    pub fn open(config: Arc<SpoolConfig>) -> Result<Self> {
        Self::open_at(config, SystemTime::now())
    }

    /// Start scanning with ages measured against `now`
    ///
    /// # Errors
    /// If the directory exists but cannot be listed
    pub fn open_at(config: Arc<SpoolConfig>, now: SystemTime) -> Result<Self> {
        let entries = match fs::read_dir(config.path()) {
            Ok(entries) => Some(entries),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                internal!(
                    level = DEBUG,
                    path = %config.path().display(),
                    "Spool directory does not exist, nothing to do"
                );
                None
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            config,
            entries,
            now,
            stats: ScanStats::default(),
            yielded: HashSet::new(),
        })
    }

    /// Counts so far; final once the iterator is exhausted
    #[must_use]
    pub const fn stats(&self) -> ScanStats {
        self.stats
    }

    fn record(&mut self, skip: &Skip) {
        let counter = match skip {
            Skip::Unrecognized => &mut self.stats.unrecognized,
            Skip::TooOld => &mut self.stats.too_old,
            Skip::InFlight => &mut self.stats.in_flight,
            Skip::Corrupt => &mut self.stats.corrupt,
            Skip::NoReversePath => &mut self.stats.no_reverse_path,
            Skip::LostRace => &mut self.stats.lost_race,
            Skip::Unreadable => &mut self.stats.unreadable,
            Skip::Revisited => &mut self.stats.revisited,
        };
        *counter += 1;
    }

    /// Observe one directory entry, returning its spool view if it names a
    /// regular spool file
    fn observe(&self, dir_entry: &DirEntry) -> std::result::Result<SpoolEntry, Skip> {
        let filename = dir_entry.file_name();
        let Some(filename) = filename.to_str() else {
            return Err(Skip::Unrecognized);
        };
        let Some(name) = SpoolName::parse(filename, &self.config.extension) else {
            return Err(Skip::Unrecognized);
        };

        let metadata = dir_entry.metadata().map_err(|e| {
            internal!(level = DEBUG, file = filename, error = %e, "Cannot stat spool entry");
            Skip::Unreadable
        })?;
        if !metadata.is_file() {
            return Err(Skip::Unrecognized);
        }

        SpoolEntry::from_metadata(
            name.base(self.config.path(), &self.config.extension),
            name.state,
            &metadata,
        )
        .map_err(|_| Skip::Unreadable)
    }

    fn try_claim(&self, dir_entry: &DirEntry) -> std::result::Result<ClaimedEntry, Skip> {
        let entry = self.observe(dir_entry)?;

        if self.yielded.contains(entry.base()) {
            return Err(Skip::Revisited);
        }

        if entry.age(self.now) > self.config.max_age() {
            internal!(path = %entry.path().display(), "Skipping entry older than max age");
            return Err(Skip::TooOld);
        }

        if entry.state() == SpoolState::InFlight {
            let reclaimable = self
                .config
                .reclaim_in_flight_after()
                .is_some_and(|after| entry.time_in_state(self.now) >= after);
            if !reclaimable {
                return Err(Skip::InFlight);
            }
        }

        let data = fs::read(entry.path()).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                Skip::LostRace
            } else {
                internal!(level = WARN, path = %entry.path().display(), error = %e, "Cannot read spool entry");
                Skip::Unreadable
            }
        })?;

        let message = SpooledMessage::decode(data).map_err(|e| {
            internal!(level = DEBUG, path = %entry.path().display(), error = %e, "Skipping corrupt spool entry");
            Skip::Corrupt
        })?;

        let Some(reverse_path) = reverse_path(&message).map(str::to_string) else {
            internal!(level = DEBUG, path = %entry.path().display(), "Skipping entry without reverse path");
            return Err(Skip::NoReversePath);
        };

        claim(&entry, message, reverse_path).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                internal!(path = %entry.path().display(), "Lost claim race");
                Skip::LostRace
            } else {
                internal!(level = WARN, path = %entry.path().display(), error = %e, "Cannot claim spool entry");
                Skip::Unreadable
            }
        })
    }
}

impl Iterator for SpoolScanner {
    type Item = ClaimedEntry;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let dir_entry = match self.entries.as_mut()?.next() {
                Some(Ok(dir_entry)) => dir_entry,
                Some(Err(e)) => {
                    internal!(level = WARN, error = %e, "Error reading spool directory");
                    self.record(&Skip::Unreadable);
                    continue;
                }
                None => {
                    self.entries = None;
                    return None;
                }
            };

            match self.try_claim(&dir_entry) {
                Ok(claimed) => {
                    self.stats.claimed += 1;
                    self.yielded.insert(claimed.base().to_path_buf());
                    return Some(claimed);
                }
                Err(skip) => self.record(&skip),
            }
        }
    }
}
