//! Bounded-concurrency dispatch over a lazy source of claimed entries

use std::sync::Arc;

use spoolsend_common::internal;
use spoolsend_spool::ClaimedEntry;
use tokio::task::JoinSet;

use crate::{
    processor::delivery::{finalize, submit},
    transport::Transport,
    types::{BatchReport, Outcome},
};

fn spawn_delivery(
    join_set: &mut JoinSet<(ClaimedEntry, Outcome)>,
    transport: &Arc<dyn Transport>,
    entry: ClaimedEntry,
) {
    let transport = Arc::clone(transport);
    join_set.spawn(async move {
        let outcome = submit(transport.as_ref(), &entry).await;
        (entry, outcome)
    });
}

/// Submit every entry produced by `entries`, keeping at most `concurrency`
/// submissions in flight
///
/// The source is pulled only when a slot is free, so nothing is claimed
/// before it can be sent. Each entry's retry transition is applied as soon
/// as its own submission resolves, independently of its siblings. Returns
/// once every submitted entry has been finalized.
pub async fn dispatch<I>(
    entries: I,
    transport: Arc<dyn Transport>,
    concurrency: usize,
) -> BatchReport
where
    I: IntoIterator<Item = ClaimedEntry>,
{
    let mut report = BatchReport::default();
    let mut entries = entries.into_iter();
    let mut join_set = JoinSet::new();

    // Spawn the initial window
    for entry in entries.by_ref().take(concurrency.max(1)) {
        report.claimed += 1;
        spawn_delivery(&mut join_set, &transport, entry);
    }

    // As a slot frees, finalize its entry and refill it
    while let Some(joined) = join_set.join_next().await {
        match joined {
            Ok((entry, outcome)) => finalize(entry, &outcome, &mut report),
            Err(e) => {
                report.failed_transitions += 1;
                internal!(
                    level = ERROR,
                    error = %e,
                    "Delivery task did not complete, its entry stays in flight"
                );
            }
        }

        if let Some(entry) = entries.next() {
            report.claimed += 1;
            spawn_delivery(&mut join_set, &transport, entry);
        }
    }

    report
}
