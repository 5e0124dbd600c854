//! Delivery processor orchestration

pub mod delivery;
pub mod process;

use std::sync::Arc;

use serde::Deserialize;
use spoolsend_common::internal;
use spoolsend_spool::ClaimedEntry;

use crate::{error::ConfigError, transport::Transport, types::BatchReport};

const fn default_concurrency() -> usize {
    150
}

/// Settings for the dispatch pool
///
/// # Examples
///
/// ```ron
/// delivery: ( concurrency: 200 )
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct DeliveryProcessor {
    /// Maximum number of submissions in flight at once
    ///
    /// Default: 150
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for DeliveryProcessor {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
        }
    }
}

impl DeliveryProcessor {
    /// A processor allowing `concurrency` submissions in flight
    #[must_use]
    pub const fn with_concurrency(concurrency: usize) -> Self {
        Self { concurrency }
    }

    /// Validate the configuration
    ///
    /// # Errors
    /// If the concurrency limit is zero
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.concurrency == 0 {
            return Err(ConfigError::InvalidValue {
                field: "delivery.concurrency",
                reason: "must be greater than zero".to_string(),
            });
        }

        Ok(())
    }

    /// Drain `entries` through `transport`
    ///
    /// Must be called from within a Tokio runtime.
    pub async fn run_batch<I>(&self, entries: I, transport: Arc<dyn Transport>) -> BatchReport
    where
        I: IntoIterator<Item = ClaimedEntry>,
    {
        internal!(
            level = DEBUG,
            concurrency = self.concurrency,
            "Dispatching claimed entries"
        );

        process::dispatch(entries, transport, self.concurrency).await
    }
}
