use std::{
    ffi::OsString,
    fmt, fs, io,
    path::{Path, PathBuf},
    time::SystemTime,
};

/// Delivery state of a spooled message, encoded as a file name suffix
///
/// Over the life of a message the state only moves forward:
/// `Pending -> InFlight -> RetryOnce -> InFlight -> RetryFinal -> InFlight`,
/// with deletion possible after any in-flight stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpoolState {
    /// `<id>.message`
    Pending,
    /// `<id>.message.sending`
    InFlight,
    /// `<id>.message.tryagain`
    RetryOnce,
    /// `<id>.message.finalretry`
    RetryFinal,
}

impl SpoolState {
    pub const ALL: [Self; 4] = [
        Self::Pending,
        Self::InFlight,
        Self::RetryOnce,
        Self::RetryFinal,
    ];

    /// The suffix appended to the base name, without the leading dot
    #[must_use]
    pub const fn suffix(self) -> Option<&'static str> {
        match self {
            Self::Pending => None,
            Self::InFlight => Some("sending"),
            Self::RetryOnce => Some("tryagain"),
            Self::RetryFinal => Some("finalretry"),
        }
    }

    /// Inverse of [`SpoolState::suffix`] for the suffixed states
    #[must_use]
    pub fn from_suffix(suffix: &str) -> Option<Self> {
        match suffix {
            "sending" => Some(Self::InFlight),
            "tryagain" => Some(Self::RetryOnce),
            "finalretry" => Some(Self::RetryFinal),
            _ => None,
        }
    }
}

impl fmt::Display for SpoolState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pending => "pending",
            Self::InFlight => "in-flight",
            Self::RetryOnce => "retry-once",
            Self::RetryFinal => "retry-final",
        })
    }
}

/// A spool file name split into its stable identifier and state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpoolName<'a> {
    pub id: &'a str,
    pub state: SpoolState,
}

impl<'a> SpoolName<'a> {
    /// Parse a file name such as `abc.message` or `abc.message.tryagain`
    ///
    /// Returns `None` for anything that is not one of the four recognized
    /// forms for `extension`.
    ///
    /// # Security
    /// Names containing path separators or `..`, and hidden names (leading
    /// `.`, used by producers for partially written files), are rejected.
    #[must_use]
    pub fn parse(filename: &'a str, extension: &str) -> Option<Self> {
        if filename.starts_with('.')
            || filename.contains('/')
            || filename.contains('\\')
            || filename.contains("..")
        {
            return None;
        }

        let (head, last) = filename.rsplit_once('.')?;

        let (id, state) = if last == extension {
            (head, SpoolState::Pending)
        } else {
            let state = SpoolState::from_suffix(last)?;
            let (id, ext) = head.rsplit_once('.')?;
            if ext != extension {
                return None;
            }
            (id, state)
        };

        if id.is_empty() {
            return None;
        }

        Some(Self { id, state })
    }

    /// `<dir>/<id>.<extension>`
    #[must_use]
    pub fn base(&self, dir: &Path, extension: &str) -> PathBuf {
        dir.join(format!("{}.{extension}", self.id))
    }
}

/// Append `.suffix` to a path without going through UTF-8
pub(crate) fn with_suffix(base: &Path, suffix: Option<&str>) -> PathBuf {
    let Some(suffix) = suffix else {
        return base.to_path_buf();
    };

    let mut path = OsString::from(base.as_os_str());
    path.push(".");
    path.push(suffix);
    PathBuf::from(path)
}

/// A recognized spool file, as observed during a scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpoolEntry {
    /// `<dir>/<id>.<extension>`, shared by every state of one message
    base: PathBuf,
    state: SpoolState,
    /// Modification time, which renames preserve
    created_at: SystemTime,
    /// Last inode status change; renames update it
    changed_at: SystemTime,
    inode: Option<u64>,
}

impl SpoolEntry {
    #[must_use]
    pub const fn new(
        base: PathBuf,
        state: SpoolState,
        created_at: SystemTime,
        changed_at: SystemTime,
    ) -> Self {
        Self {
            base,
            state,
            created_at,
            changed_at,
            inode: None,
        }
    }

    /// Snapshot an entry from the metadata of its current file
    ///
    /// # Errors
    /// If the platform does not report a modification time
    pub fn from_metadata(
        base: PathBuf,
        state: SpoolState,
        metadata: &fs::Metadata,
    ) -> io::Result<Self> {
        let created_at = metadata.modified()?;
        let changed_at = status_changed(metadata).unwrap_or(created_at);

        Ok(Self {
            base,
            state,
            created_at,
            changed_at,
            inode: inode(metadata),
        })
    }

    /// Snapshot the file currently holding `base` in `state`
    ///
    /// # Errors
    /// If the file cannot be stat'ed
    pub fn stat(base: PathBuf, state: SpoolState) -> io::Result<Self> {
        let metadata = fs::symlink_metadata(with_suffix(&base, state.suffix()))?;
        Self::from_metadata(base, state, &metadata)
    }

    /// The logical identifier shared by every state of this message
    #[must_use]
    pub fn base(&self) -> &Path {
        &self.base
    }

    #[must_use]
    pub const fn state(&self) -> SpoolState {
        self.state
    }

    #[must_use]
    pub const fn created_at(&self) -> SystemTime {
        self.created_at
    }

    #[must_use]
    pub const fn changed_at(&self) -> SystemTime {
        self.changed_at
    }

    #[must_use]
    pub const fn inode(&self) -> Option<u64> {
        self.inode
    }

    /// Whether `metadata` still describes the file this entry was observed
    /// from, with no rename or other status change since
    #[must_use]
    pub fn is_unchanged(&self, metadata: &fs::Metadata) -> bool {
        let same_inode = self.inode.is_none_or(|ino| inode(metadata) == Some(ino));
        same_inode && status_changed(metadata) == Some(self.changed_at)
    }

    /// The current on-disk path of this entry
    #[must_use]
    pub fn path(&self) -> PathBuf {
        self.path_in(self.state)
    }

    /// The path this message would have in `state`
    #[must_use]
    pub fn path_in(&self, state: SpoolState) -> PathBuf {
        with_suffix(&self.base, state.suffix())
    }

    /// Age relative to `now`; timestamps in the future count as zero
    #[must_use]
    pub fn age(&self, now: SystemTime) -> std::time::Duration {
        now.duration_since(self.created_at).unwrap_or_default()
    }

    /// Time since the last state change relative to `now`
    #[must_use]
    pub fn time_in_state(&self, now: SystemTime) -> std::time::Duration {
        now.duration_since(self.changed_at).unwrap_or_default()
    }
}

#[cfg(unix)]
fn status_changed(metadata: &fs::Metadata) -> Option<SystemTime> {
    use std::{os::unix::fs::MetadataExt, time::Duration};

    let secs = u64::try_from(metadata.ctime()).ok()?;
    let nanos = u32::try_from(metadata.ctime_nsec()).ok()?;
    SystemTime::UNIX_EPOCH.checked_add(Duration::new(secs, nanos))
}

#[cfg(not(unix))]
fn status_changed(metadata: &fs::Metadata) -> Option<SystemTime> {
    metadata.modified().ok()
}

#[cfg(unix)]
fn inode(metadata: &fs::Metadata) -> Option<u64> {
    use std::os::unix::fs::MetadataExt;

    Some(metadata.ino())
}

#[cfg(not(unix))]
const fn inode(_metadata: &fs::Metadata) -> Option<u64> {
    None
}
