//! Polling transport
//!
//! Fallback when push is unavailable: refetch the snapshot on a fixed
//! cadence and emit the status when it moves. Fetch failures skip the tick;
//! the loop only ends on cancellation.

use crate::api::SnapshotFetch;
use crate::channel::EventSink;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Poll until cancelled.
///
/// `last_seen` is owned by the caller so the dedup window survives a
/// poll → push → poll round trip within one subscription. The first tick
/// fires immediately, so fallback produces an update without waiting out a
/// full interval.
pub(crate) async fn run(
    fetcher: &dyn SnapshotFetch,
    order_id: &str,
    every: Duration,
    sink: &EventSink,
    cancel: &CancellationToken,
    last_seen: &mut Option<String>,
) {
    let mut ticker = tokio::time::interval(every);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = ticker.tick() => {}
        }

        match fetcher.fetch_order(order_id).await {
            Ok(snapshot) => {
                if last_seen.as_deref() != Some(snapshot.status.as_str()) {
                    tracing::debug!(order_id, status = %snapshot.status, "status changed via poll");
                    *last_seen = Some(snapshot.status.clone());
                    if !sink.emit(snapshot.status) {
                        return;
                    }
                }
            }
            Err(e) => {
                tracing::warn!(order_id, error = %e, "status poll failed, retrying next tick");
            }
        }
    }
}
