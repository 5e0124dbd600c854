//! Error types for the spoolsend-spool crate.
//!
//! Only configuration and directory-level failures surface to callers. Per
//! entry failures (corrupt content, lost claim races) are absorbed by the
//! scanner and reported through [`ScanStats`](crate::ScanStats).

use std::io;

use thiserror::Error;

/// Top-level spool error type.
#[derive(Debug, Error)]
pub enum SpoolError {
    /// I/O operation failed (directory listing, read, rename, delete).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A spool entry could not be decoded into a message.
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Spool configuration validation failed.
    #[error("Spool validation error: {0}")]
    Validation(#[from] ValidationError),
}

/// Reasons a spool entry is not a transmittable message.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The entry has no content at all.
    #[error("Spool entry is empty")]
    Empty,

    /// The header section could not be parsed.
    #[error("Malformed message: {0}")]
    Malformed(#[from] mailparse::MailParseError),

    /// The content parsed but is not shaped like a mail message.
    #[error("Invalid message shape: {0}")]
    InvalidShape(String),
}

/// Spool configuration validation errors.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// The logical extension is empty.
    #[error("Spool extension cannot be empty")]
    EmptyExtension,

    /// The logical extension would break file name parsing.
    #[error("Spool extension cannot contain '.' or path separators: {0}")]
    InvalidExtension(String),

    /// The maximum age must be positive.
    #[error("Spool max_age_secs must be greater than zero")]
    ZeroMaxAge,

    /// The spool path cannot be empty.
    #[error("Spool path cannot be empty")]
    EmptyPath,
}

/// Specialized `Result` type for spool operations.
pub type Result<T> = std::result::Result<T, SpoolError>;
