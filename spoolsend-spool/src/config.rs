use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;

use crate::error::ValidationError;

const fn default_max_age_secs() -> u64 {
    2 * 24 * 3600 // 2 days
}

fn default_extension() -> String {
    "message".to_string()
}

fn default_path() -> PathBuf {
    PathBuf::from("/var/spool/spoolsend/default")
}

/// Configuration for the spool directory
///
/// # Examples
///
/// ```ron
/// Dispatcher (
///     spool: (
///         path: "/var/spool/mautic/default",
///         max_age_secs: 172800,
///         reclaim_in_flight_after_secs: Some(3600),
///     ),
/// )
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct SpoolConfig {
    /// The flat directory holding spooled messages
    #[serde(default = "default_path")]
    pub path: PathBuf,

    /// Logical extension of pending entries, without the leading dot
    ///
    /// Default: `message`
    #[serde(default = "default_extension")]
    pub extension: String,

    /// Entries whose modification time is older than this are never claimed
    ///
    /// They are left in place for an operator to inspect.
    ///
    /// Default: 172800 seconds (2 days)
    #[serde(default = "default_max_age_secs")]
    pub max_age_secs: u64,

    /// How long an entry may sit in the in-flight state before another run
    /// may recover it
    ///
    /// `None` never recovers in-flight entries: a dispatcher that dies after
    /// claiming leaves the entry stranded until an operator intervenes.
    ///
    /// Default: `None`
    #[serde(default)]
    pub reclaim_in_flight_after_secs: Option<u64>,
}

impl Default for SpoolConfig {
    fn default() -> Self {
        Self {
            path: default_path(),
            extension: default_extension(),
            max_age_secs: default_max_age_secs(),
            reclaim_in_flight_after_secs: None,
        }
    }
}

impl SpoolConfig {
    /// Create a configuration for `path` with every other field defaulted
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// The spool directory
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Maximum age of a claimable entry
    #[must_use]
    pub const fn max_age(&self) -> Duration {
        Duration::from_secs(self.max_age_secs)
    }

    /// Minimum time in flight before an entry may be recovered, if enabled
    #[must_use]
    pub fn reclaim_in_flight_after(&self) -> Option<Duration> {
        self.reclaim_in_flight_after_secs.map(Duration::from_secs)
    }

    /// Validate the configuration
    ///
    /// The directory itself is not checked; an absent spool is an empty one.
    ///
    /// # Errors
    /// Returns the first invalid field found
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.path.as_os_str().is_empty() {
            return Err(ValidationError::EmptyPath);
        }

        if self.extension.is_empty() {
            return Err(ValidationError::EmptyExtension);
        }

        if self
            .extension
            .chars()
            .any(|c| matches!(c, '.' | '/' | '\\'))
        {
            return Err(ValidationError::InvalidExtension(self.extension.clone()));
        }

        if self.max_age_secs == 0 {
            return Err(ValidationError::ZeroMaxAge);
        }

        Ok(())
    }
}
