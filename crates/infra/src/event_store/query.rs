//! Event query interface for the moderation audit trail.
//!
//! Read-only, paginated inspection of stored events; this is what backs the
//! admin audit endpoint.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tradepost_core::AggregateId;

use crate::event_store::{EventStoreError, StoredEvent};

/// Pagination parameters for event queries.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Pagination {
    /// Maximum number of events to return.
    pub limit: u32,
    /// Offset for pagination (0-based).
    pub offset: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            limit: 50,
            offset: 0,
        }
    }
}

impl Pagination {
    pub fn new(limit: Option<u32>, offset: Option<u32>) -> Self {
        Self {
            limit: limit.unwrap_or(50).min(1000),
            offset: offset.unwrap_or(0),
        }
    }
}

/// Filter criteria for event queries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventFilter {
    /// Filter by aggregate ID (optional).
    pub aggregate_id: Option<AggregateId>,
    /// Filter by aggregate type (optional, e.g., "catalog.product").
    pub aggregate_type: Option<String>,
    /// Filter by event type (optional, e.g., "catalog.product.approved").
    pub event_type: Option<String>,
    /// Filter events that occurred after this time (optional).
    pub occurred_after: Option<DateTime<Utc>>,
    /// Filter events that occurred before this time (optional).
    pub occurred_before: Option<DateTime<Utc>>,
}

impl EventFilter {
    pub fn matches(&self, event: &StoredEvent) -> bool {
        if let Some(id) = self.aggregate_id {
            if event.aggregate_id != id {
                return false;
            }
        }
        if let Some(at) = &self.aggregate_type {
            if &event.aggregate_type != at {
                return false;
            }
        }
        if let Some(et) = &self.event_type {
            if &event.event_type != et {
                return false;
            }
        }
        if let Some(after) = self.occurred_after {
            if event.occurred_at < after {
                return false;
            }
        }
        if let Some(before) = self.occurred_before {
            if event.occurred_at > before {
                return false;
            }
        }
        true
    }
}

/// Paginated event query result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventQueryResult {
    /// The events matching the query.
    pub events: Vec<StoredEvent>,
    /// Total number of events matching the filter (across all pages).
    pub total: u64,
    /// Pagination parameters used.
    pub pagination: Pagination,
    /// Whether there are more events available.
    pub has_more: bool,
}

/// Async query interface for event inspection.
#[async_trait::async_trait]
pub trait EventQuery: Send + Sync {
    /// Query events with optional filters and pagination.
    ///
    /// Returns events ordered by occurred_at (descending), with
    /// sequence_number breaking ties (ascending).
    async fn query_events(
        &self,
        filter: EventFilter,
        pagination: Pagination,
    ) -> Result<EventQueryResult, EventStoreError>;

    /// Get events for a specific aggregate stream.
    async fn get_aggregate_events(
        &self,
        aggregate_id: AggregateId,
        pagination: Option<Pagination>,
    ) -> Result<EventQueryResult, EventStoreError> {
        let filter = EventFilter {
            aggregate_id: Some(aggregate_id),
            ..Default::default()
        };
        self.query_events(filter, pagination.unwrap_or_default()).await
    }

    /// Get a single event by its ID.
    async fn get_event_by_id(
        &self,
        event_id: uuid::Uuid,
    ) -> Result<Option<StoredEvent>, EventStoreError>;
}
