//! Status reconciliation
//!
//! Pure mapping of an inbound status value onto the stage pipeline. The
//! server is trusted verbatim: an event naming an earlier stage moves the
//! display backwards, and duplicates are no-ops by construction.

use shared::{OrderSnapshot, StagePipeline};

/// Apply an incoming status to a snapshot.
///
/// Replaces `status` wholesale and recomputes the stage index against the
/// pipeline. A stage the pipeline does not know yields `None` for the index;
/// the snapshot still carries the raw status so it stays displayable.
pub fn reconcile(
    pipeline: &StagePipeline,
    snapshot: &OrderSnapshot,
    incoming: &str,
) -> (OrderSnapshot, Option<usize>) {
    (snapshot.with_status(incoming), pipeline.index_of(incoming))
}
