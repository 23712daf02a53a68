use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;
use uuid::Uuid;

use std::sync::Arc;
use stockpilot_core::{AggregateId, ExpectedVersion, TenantId};

/// An event ready to be appended to a stream, before a sequence number exists.
///
/// Events move through four shapes on their way from an aggregate to a
/// consumer:
///
/// 1. **Domain event**: produced by the aggregate's `handle()`
/// 2. **UncommittedEvent**: the domain event serialized to JSON plus stream
///    metadata (tenant, aggregate, event type)
/// 3. **StoredEvent**: persisted, with a sequence number assigned by the store
/// 4. **EventEnvelope**: published on the bus for projections and runners
///
/// Use [`UncommittedEvent::from_typed`] to build one from a typed domain
/// event; it serializes the payload and captures the event metadata
/// (`event_type`, schema version, `occurred_at`) needed to deserialize it
/// again on the read side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UncommittedEvent {
    pub event_id: Uuid,
    pub tenant_id: TenantId,
    pub aggregate_id: AggregateId,
    pub aggregate_type: String,

    pub event_type: String,
    pub event_version: u32,
    pub occurred_at: DateTime<Utc>,

    pub payload: JsonValue,
}

/// A persisted event in an append-only stream.
///
/// This is what [`EventStore::append`] hands back. The store assigns the
/// `sequence_number` during append; sequence numbers are stream-scoped
/// (per tenant + aggregate), start at 1, increase without gaps, and never
/// change once assigned. They carry the ordering guarantee projections rely
/// on and the version that optimistic concurrency checks against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEvent {
    pub event_id: Uuid,
    pub tenant_id: TenantId,
    pub aggregate_id: AggregateId,
    pub aggregate_type: String,

    /// Monotonically increasing position in the aggregate stream.
    pub sequence_number: u64,

    pub event_type: String,
    pub event_version: u32,
    pub occurred_at: DateTime<Utc>,

    pub payload: JsonValue,
}

impl StoredEvent {
    pub fn stream_version(&self) -> u64 {
        self.sequence_number
    }

    /// Convert a stored event into a tenant-scoped envelope for publication.
    pub fn to_envelope(&self) -> stockpilot_events::EventEnvelope<JsonValue> {
        stockpilot_events::EventEnvelope::new(
            self.event_id,
            self.tenant_id,
            self.aggregate_id,
            self.aggregate_type.clone(),
            self.sequence_number,
            self.payload.clone(),
        )
    }
}

/// Event store operation error.
///
/// Infrastructure failures only; domain validation lives in `DomainError`.
///
/// - **Concurrency**: optimistic version check failed (someone else wrote first)
/// - **TenantIsolation**: a cross-tenant read or write was attempted
/// - **AggregateTypeMismatch**: append would change the stream's aggregate type
/// - **Serialization**: a payload or row could not be (de)serialized
/// - **Storage**: the backing store rejected or failed the operation
/// - **Publish**: post-append publication to the bus failed
#[derive(Debug, Error)]
pub enum EventStoreError {
    #[error("optimistic concurrency check failed: {0}")]
    Concurrency(String),

    #[error("tenant isolation violation: {0}")]
    TenantIsolation(String),

    #[error("aggregate type mismatch: {0}")]
    AggregateTypeMismatch(String),

    #[error("event serialization failed: {0}")]
    Serialization(String),

    #[error("event storage failed: {0}")]
    Storage(String),

    #[error("event publication failed: {0}")]
    Publish(String),
}

/// Append-only, tenant-scoped event store.
///
/// Streams are keyed by `(tenant_id, aggregate_id)`: one stream per aggregate
/// instance, with sequence numbers 1, 2, 3, ... inside it. The trait makes no
/// storage assumptions; [`super::InMemoryEventStore`] backs tests and dev,
/// [`super::PostgresEventStore`] backs production.
///
/// `append` must, in order:
/// - reject batches that span tenants, aggregates or aggregate types
/// - check `expected_version` against the current stream version
/// - assign sequence numbers starting at `current_version + 1`
/// - persist the whole batch atomically
///
/// `load_stream` returns the full stream in sequence order, or an empty vector
/// when the aggregate has never emitted an event. Tenant isolation is enforced
/// on both paths.
pub trait EventStore: Send + Sync {
    /// Append events to an aggregate stream (append-only).
    fn append(
        &self,
        events: Vec<UncommittedEvent>,
        expected_version: ExpectedVersion,
    ) -> Result<Vec<StoredEvent>, EventStoreError>;

    /// Load the full stream for a tenant + aggregate.
    fn load_stream(
        &self,
        tenant_id: TenantId,
        aggregate_id: AggregateId,
    ) -> Result<Vec<StoredEvent>, EventStoreError>;
}

impl<S> EventStore for Arc<S>
where
    S: EventStore + ?Sized,
{
    fn append(
        &self,
        events: Vec<UncommittedEvent>,
        expected_version: ExpectedVersion,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        (**self).append(events, expected_version)
    }

    fn load_stream(
        &self,
        tenant_id: TenantId,
        aggregate_id: AggregateId,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        (**self).load_stream(tenant_id, aggregate_id)
    }
}

impl UncommittedEvent {
    /// Convenience constructor from a typed domain event.
    ///
    /// Keeps infra decoupled from the domain crates while still capturing the
    /// event metadata needed for later deserialization.
    pub fn from_typed<E>(
        tenant_id: TenantId,
        aggregate_id: AggregateId,
        aggregate_type: impl Into<String>,
        event_id: Uuid,
        event: &E,
    ) -> Result<Self, EventStoreError>
    where
        E: stockpilot_events::Event + Serialize,
    {
        let payload = serde_json::to_value(event).map_err(|e| {
            EventStoreError::Serialization(format!("payload serialization failed: {e}"))
        })?;

        Ok(Self {
            event_id,
            tenant_id,
            aggregate_id,
            aggregate_type: aggregate_type.into(),
            event_type: event.event_type().to_string(),
            event_version: event.version(),
            occurred_at: event.occurred_at(),
            payload,
        })
    }
}
