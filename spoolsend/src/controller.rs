use std::sync::Arc;

use serde::Deserialize;
use spoolsend_common::internal;
use spoolsend_delivery::{
    BatchReport, DeliveryError, DeliveryProcessor, SesConfig, SesTransport, Transport,
};
use spoolsend_spool::{SpoolConfig, SpoolError, SpoolScanner};

use crate::guard::{GuardConfig, RunGuard};

/// Root configuration, and the controller for one batch
///
/// # Examples
///
/// ```ron
/// Dispatcher (
///     spool: ( path: "/var/spool/mautic/default" ),
///     delivery: ( concurrency: 150 ),
///     ses: (
///         version: "latest",
///         region: "eu-west-1",
///         credentials: ( key: "AKIA...", secret: "..." ),
///     ),
/// )
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct Dispatcher {
    #[serde(default)]
    pub spool: SpoolConfig,
    #[serde(default)]
    pub delivery: DeliveryProcessor,
    pub ses: SesConfig,
    #[serde(default)]
    pub guard: GuardConfig,
}

impl Dispatcher {
    /// Check every setting before anything on disk is touched
    ///
    /// # Errors
    /// The first missing or invalid setting
    pub fn validate(&self) -> Result<(), DeliveryError> {
        self.ses.validate()?;
        self.spool.validate().map_err(SpoolError::from)?;
        self.delivery.validate()?;
        Ok(())
    }

    /// Run one batch against SES
    ///
    /// Returns `None` when `guard` reports another batch in progress.
    ///
    /// # Errors
    /// If the configuration is invalid, the guard fails, or the spool cannot
    /// be listed. Failures of individual messages are not errors.
    pub async fn run(&self, guard: &mut dyn RunGuard) -> anyhow::Result<Option<BatchReport>> {
        self.validate()?;
        let transport = SesTransport::new(&self.ses)?;
        self.run_with(guard, Arc::new(transport)).await
    }

    /// Run one batch with a caller-supplied transport
    ///
    /// # Errors
    /// As [`Dispatcher::run`]
    pub async fn run_with(
        &self,
        guard: &mut dyn RunGuard,
        transport: Arc<dyn Transport>,
    ) -> anyhow::Result<Option<BatchReport>> {
        self.validate()?;

        if !guard.check_run_status()? {
            internal!(level = INFO, "Another batch is already running, nothing to do");
            return Ok(None);
        }

        let result = self.dispatch(transport).await;
        guard.complete_run();

        result.map(Some)
    }

    async fn dispatch(&self, transport: Arc<dyn Transport>) -> anyhow::Result<BatchReport> {
        internal!(level = INFO, spool = %self.spool.path().display(), "start");

        let mut scanner =
            SpoolScanner::open(Arc::new(self.spool.clone())).map_err(DeliveryError::from)?;
        let report = self.delivery.run_batch(&mut scanner, transport).await;
        let stats = scanner.stats();

        internal!(
            level = INFO,
            claimed = report.claimed,
            sent = report.sent,
            retried = report.retried,
            abandoned = report.abandoned,
            "done"
        );
        internal!(
            level = DEBUG,
            unrecognized = stats.unrecognized,
            too_old = stats.too_old,
            in_flight = stats.in_flight,
            corrupt = stats.corrupt,
            no_reverse_path = stats.no_reverse_path,
            lost_race = stats.lost_race,
            unreadable = stats.unreadable,
            revisited = stats.revisited,
            "Skipped spool entries"
        );
        if report.failed_transitions > 0 {
            internal!(
                level = WARN,
                failed_transitions = report.failed_transitions,
                "Some entries could not be finalized and remain in flight"
            );
        }

        Ok(report)
    }
}
