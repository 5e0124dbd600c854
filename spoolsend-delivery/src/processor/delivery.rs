//! Submission and finalization of a single claimed entry

use std::{any::Any, panic::AssertUnwindSafe};

use futures_util::FutureExt;
use spoolsend_common::{internal, outgoing};
use spoolsend_spool::ClaimedEntry;

use crate::{
    error::TransportError,
    policy::{Transition, transition},
    transport::Transport,
    types::{BatchReport, Outcome},
};

fn panic_message(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(ToString::to_string)
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

/// Submit the raw bytes of `entry`
///
/// Never fails: request errors, rejections and panics inside the transport
/// all become an [`Outcome`].
pub async fn submit(transport: &dyn Transport, entry: &ClaimedEntry) -> Outcome {
    let result = AssertUnwindSafe(transport.submit(&entry.message().data()[..]))
        .catch_unwind()
        .await
        .unwrap_or_else(|panic| Err(TransportError::Panicked(panic_message(&*panic))));

    let outcome = Outcome::from_result(result);

    match &outcome {
        Outcome::Delivered(receipt) => outgoing!(
            level = DEBUG,
            path = %entry.path().display(),
            reverse_path = entry.reverse_path(),
            status = receipt.status,
            "Delivered"
        ),
        Outcome::Rejected(receipt) => outgoing!(
            level = WARN,
            path = %entry.path().display(),
            status = receipt.status,
            detail = receipt.detail.as_deref(),
            "Delivery rejected"
        ),
        Outcome::Failed(e) => outgoing!(
            level = WARN,
            path = %entry.path().display(),
            error = %e,
            "Delivery failed"
        ),
    }

    outcome
}

/// Apply the retry transition for `entry` and account for it in `report`
///
/// A failed rename or delete is logged and counted; the entry is then left
/// in the in-flight state.
pub fn finalize(entry: ClaimedEntry, outcome: &Outcome, report: &mut BatchReport) {
    let delivered = outcome.is_delivered();
    if delivered {
        report.sent += 1;
    }

    let path = entry.path().to_path_buf();
    let prior = entry.prior();
    let next = transition(prior, delivered);

    let result = match next {
        Transition::Delete => entry.complete(),
        Transition::Requeue(state) => entry.requeue(state).map(|_| ()),
    };

    match result {
        Ok(()) => match next {
            Transition::Requeue(state) => {
                report.retried += 1;
                internal!(level = DEBUG, path = %path.display(), state = %state, "Requeued for retry");
            }
            Transition::Delete if next.abandons(delivered) => {
                report.abandoned += 1;
                internal!(level = WARN, path = %path.display(), prior = %prior, "Giving up on message");
            }
            Transition::Delete => {}
        },
        Err(e) => {
            report.failed_transitions += 1;
            internal!(
                level = ERROR,
                path = %path.display(),
                error = %e,
                "Failed to finalize spool entry, leaving it in flight"
            );
        }
    }
}
