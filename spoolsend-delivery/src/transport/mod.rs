//! The remote delivery API as seen by the dispatch pool

pub mod ses;
pub mod sigv4;

use async_trait::async_trait;

use crate::error::TransportError;

/// The answer the delivery API gave for one submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    /// HTTP status of the response
    pub status: u16,
    /// Identifier assigned by the API to an accepted message
    pub message_id: Option<String>,
    /// Response body of a rejected submission, for logging
    pub detail: Option<String>,
}

impl Receipt {
    /// A bare acknowledgement with `status`
    #[must_use]
    pub const fn new(status: u16) -> Self {
        Self {
            status,
            message_id: None,
            detail: None,
        }
    }

    /// Whether the API accepted the message
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Submits one raw message and reports what happened
///
/// A single instance is shared by every in-flight submission of a batch, so
/// implementations must tolerate concurrent calls.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Submit `raw`, exactly as read from the spool
    ///
    /// # Errors
    /// If no response could be obtained at all. A response carrying a
    /// failure status is still `Ok`.
    async fn submit(&self, raw: &[u8]) -> Result<Receipt, TransportError>;
}
