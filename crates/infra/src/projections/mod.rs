//! Read-model projections over the event bus.
//!
//! Each projection consumes published envelopes (JSON payloads), keeps a
//! per-stream cursor so at-least-once delivery stays idempotent, and can be
//! rebuilt from scratch by replaying the event store.
//!
//! Notification feeds live here too: they are derived data exactly like the
//! directory and catalog read models, which is what makes a notification
//! failure unable to roll back a status change.

pub mod accounts;
pub mod board;
pub mod cascade;
pub mod catalog;
pub mod categories;
pub mod directory;
pub mod feeds;
pub mod library;

pub use accounts::{AccountRecord, AccountsProjection};
pub use board::{EnrichedInquiry, InquiryBoardProjection, InquiryRecord};
pub use cascade::{AccountOwned, BuyerOwned, CascadeRules};
pub use catalog::{ProductCatalogProjection, ProductRecord};
pub use categories::CategoryCatalog;
pub use directory::{
    BuyerDirectoryProjection, BuyerRecord, SupplierDirectoryProjection, SupplierRecord,
};
pub use feeds::{AdminNotificationFeed, NotificationFeed};
pub use library::{BuyerLibrary, FollowedSupplier, SavedProduct};

use std::collections::HashMap;
use std::sync::RwLock;

use thiserror::Error;

use tradepost_core::AggregateId;

#[derive(Debug, Error)]
pub enum ProjectionError {
    #[error("failed to deserialize event payload: {0}")]
    Deserialize(String),

    #[error("non-monotonic sequence number (last={last}, found={found})")]
    NonMonotonicSequence { last: u64, found: u64 },
}

/// Whether an incoming envelope should be applied or ignored.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CursorDecision {
    Apply,
    /// Duplicate or replay (`seq <= cursor`); safe to ignore.
    Skip,
}

/// Per-stream sequence cursors shared by all projections.
///
/// Rules, per aggregate stream:
/// - `seq == 0` is invalid (stores assign from 1);
/// - `seq <= cursor` is a replay → skip (idempotency under at-least-once);
/// - after the first applied event, only `cursor + 1` is accepted.
#[derive(Debug, Default)]
pub struct StreamCursors {
    inner: RwLock<HashMap<AggregateId, u64>>,
}

impl StreamCursors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn decide(
        &self,
        aggregate_id: AggregateId,
        seq: u64,
    ) -> Result<CursorDecision, ProjectionError> {
        let last = match self.inner.read() {
            Ok(cursors) => *cursors.get(&aggregate_id).unwrap_or(&0),
            Err(_) => 0,
        };

        if seq == 0 {
            return Err(ProjectionError::NonMonotonicSequence { last, found: seq });
        }
        if seq <= last {
            return Ok(CursorDecision::Skip);
        }
        if last != 0 && seq != last + 1 {
            return Err(ProjectionError::NonMonotonicSequence { last, found: seq });
        }

        Ok(CursorDecision::Apply)
    }

    pub fn advance(&self, aggregate_id: AggregateId, seq: u64) {
        if let Ok(mut cursors) = self.inner.write() {
            cursors.insert(aggregate_id, seq);
        }
    }

    pub fn clear(&self) {
        if let Ok(mut cursors) = self.inner.write() {
            cursors.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_skips_replays_and_rejects_gaps() {
        let cursors = StreamCursors::new();
        let id = AggregateId::new();

        assert_eq!(cursors.decide(id, 1).unwrap(), CursorDecision::Apply);
        cursors.advance(id, 1);

        // Replay of the same event is skipped, not an error.
        assert_eq!(cursors.decide(id, 1).unwrap(), CursorDecision::Skip);

        // A gap is a delivery bug.
        assert!(matches!(
            cursors.decide(id, 3),
            Err(ProjectionError::NonMonotonicSequence { last: 1, found: 3 })
        ));

        assert_eq!(cursors.decide(id, 2).unwrap(), CursorDecision::Apply);
    }

    #[test]
    fn first_event_may_start_above_one() {
        // Some rebuild paths hand a projection a suffix of a stream.
        let cursors = StreamCursors::new();
        let id = AggregateId::new();
        assert_eq!(cursors.decide(id, 4).unwrap(), CursorDecision::Apply);
    }

    #[test]
    fn sequence_zero_is_invalid() {
        let cursors = StreamCursors::new();
        let id = AggregateId::new();
        assert!(cursors.decide(id, 0).is_err());
    }
}
