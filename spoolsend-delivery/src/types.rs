use crate::{error::TransportError, transport::Receipt};

/// Result of submitting one claimed message
#[derive(Debug)]
pub enum Outcome {
    /// The API acknowledged the message
    Delivered(Receipt),
    /// The API answered, but not with success
    Rejected(Receipt),
    /// No answer: the request failed or the submission panicked
    Failed(TransportError),
}

impl Outcome {
    /// Classify a transport result
    #[must_use]
    pub fn from_result(result: Result<Receipt, TransportError>) -> Self {
        match result {
            Ok(receipt) if receipt.is_success() => Self::Delivered(receipt),
            Ok(receipt) => Self::Rejected(receipt),
            Err(e) => Self::Failed(e),
        }
    }

    #[must_use]
    pub const fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered(_))
    }
}

/// Totals for one batch
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchReport {
    /// Entries claimed and submitted
    pub claimed: usize,
    /// Confirmed deliveries
    pub sent: usize,
    /// Failures requeued for another attempt
    pub retried: usize,
    /// Failures on the last attempt, removed from the spool
    pub abandoned: usize,
    /// Entries whose final rename or delete failed
    pub failed_transitions: usize,
}
