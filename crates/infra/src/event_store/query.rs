//! Read-only event queries for inspection and debugging.
//!
//! Separate from [`super::EventStore`] so write-side implementations are not
//! forced to support ad-hoc filtering. All queries are tenant-scoped and
//! paginated.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stockpilot_core::{AggregateId, TenantId};

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
    /// Build pagination from optional query parameters; the limit is capped
    /// at 1000 to bound result sizes.
    pub fn new(limit: Option<u32>, offset: Option<u32>) -> Self {
        Self {
            limit: limit.unwrap_or(50).min(1000),
            offset: offset.unwrap_or(0),
        }
    }
}

/// Filter criteria for event queries. Every field is optional; `None` means
/// "do not filter on this".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventFilter {
    pub aggregate_id: Option<AggregateId>,
    /// e.g. "inventory.stock_item"
    pub aggregate_type: Option<String>,
    /// e.g. "inventory.stock.received"
    pub event_type: Option<String>,
    /// Inclusive lower bound on `occurred_at`.
    pub occurred_after: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `occurred_at`.
    pub occurred_before: Option<DateTime<Utc>>,
}

/// Paginated event query result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventQueryResult {
    pub events: Vec<StoredEvent>,
    /// Total number of events matching the filter (across all pages).
    pub total: u64,
    pub pagination: Pagination,
    /// Whether further pages exist beyond this one.
    pub has_more: bool,
}

/// Async query interface over the event log.
///
/// Results are ordered by `occurred_at` descending, then `sequence_number`
/// ascending, so the newest activity comes first while events sharing a
/// timestamp keep their stream order.
#[async_trait::async_trait]
pub trait EventQuery: Send + Sync {
    /// Query events for a tenant with optional filters and pagination.
    async fn query_events(
        &self,
        tenant_id: TenantId,
        filter: EventFilter,
        pagination: Pagination,
    ) -> Result<EventQueryResult, EventStoreError>;

    /// Get events for a specific aggregate stream.
    ///
    /// Convenience wrapper over `query_events`. Note the interface-wide
    /// ordering applies; use `EventStore::load_stream` when strict sequence
    /// order is required (e.g. for rehydration).
    async fn get_aggregate_events(
        &self,
        tenant_id: TenantId,
        aggregate_id: AggregateId,
        pagination: Option<Pagination>,
    ) -> Result<EventQueryResult, EventStoreError> {
        let filter = EventFilter {
            aggregate_id: Some(aggregate_id),
            ..Default::default()
        };
        self.query_events(tenant_id, filter, pagination.unwrap_or_default())
            .await
    }

    /// Get a single event by its ID, if it exists and belongs to the tenant.
    async fn get_event_by_id(
        &self,
        tenant_id: TenantId,
        event_id: uuid::Uuid,
    ) -> Result<Option<StoredEvent>, EventStoreError>;
}
