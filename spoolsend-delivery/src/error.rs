//! Typed error handling for delivery operations.
//!
//! Two classes of failure exist:
//! - Configuration errors, raised before the spool is touched and fatal to the
//!   run
//! - Transport errors, contained to the single message they happened to

use spoolsend_spool::SpoolError;
use thiserror::Error;

/// Top-level delivery error type.
///
/// Per-message failures never surface here; a batch only fails as a whole
/// when it cannot start.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The spool could not be opened.
    #[error("Spool error: {0}")]
    Spool(#[from] SpoolError),

    /// The delivery configuration is invalid.
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),
}

/// Invalid or missing configuration values.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A required field is missing or blank.
    #[error("Missing required configuration field: {0}")]
    MissingField(&'static str),

    /// A field is present but unusable.
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue {
        field: &'static str,
        reason: String,
    },
}

/// Failure to obtain any response from the delivery API.
///
/// A response with a non-success status is not an error at this level; it is
/// returned as a [`Receipt`](crate::Receipt) and classified by the caller.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The request could not be sent or its response could not be read.
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The configured endpoint cannot be used to build a request.
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// The request could not be signed.
    #[error("Signing failed: {0}")]
    Signing(String),

    /// The submission task panicked.
    #[error("Transport panicked: {0}")]
    Panicked(String),
}

impl From<url::ParseError> for TransportError {
    fn from(value: url::ParseError) -> Self {
        Self::InvalidEndpoint(value.to_string())
    }
}
