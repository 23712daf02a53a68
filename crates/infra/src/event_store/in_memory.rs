use std::collections::HashMap;
use std::sync::RwLock;

use stockpilot_core::{AggregateId, ExpectedVersion, TenantId};

use super::query::{EventFilter, EventQuery, EventQueryResult, Pagination};
use super::r#trait::{EventStore, EventStoreError, StoredEvent, UncommittedEvent};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
struct StreamKey {
    tenant_id: TenantId,
    aggregate_id: AggregateId,
}

/// In-memory append-only event store.
///
/// Default store for tests and development. Enforces the same batch, version
/// and tenant rules as the Postgres store, just without durability.
#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    streams: RwLock<HashMap<StreamKey, Vec<StoredEvent>>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn current_version(stream: &[StoredEvent]) -> u64 {
        stream.last().map(|e| e.sequence_number).unwrap_or(0)
    }
}

impl EventStore for InMemoryEventStore {
    fn append(
        &self,
        events: Vec<UncommittedEvent>,
        expected_version: ExpectedVersion,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        if events.is_empty() {
            return Ok(vec![]);
        }

        // All events must target the same tenant + aggregate stream.
        let tenant_id = events[0].tenant_id;
        let aggregate_id = events[0].aggregate_id;
        let aggregate_type = events[0].aggregate_type.clone();

        for (idx, e) in events.iter().enumerate() {
            if e.tenant_id != tenant_id {
                return Err(EventStoreError::TenantIsolation(format!(
                    "batch contains multiple tenant_ids (index {idx})"
                )));
            }
            if e.aggregate_id != aggregate_id {
                return Err(EventStoreError::Storage(format!(
                    "batch contains multiple aggregate_ids (index {idx})"
                )));
            }
            if e.aggregate_type != aggregate_type {
                return Err(EventStoreError::AggregateTypeMismatch(format!(
                    "batch contains multiple aggregate_types (index {idx})"
                )));
            }
        }

        let key = StreamKey {
            tenant_id,
            aggregate_id,
        };

        let mut streams = self
            .streams
            .write()
            .map_err(|_| EventStoreError::Storage("lock poisoned".to_string()))?;

        let stream = streams.entry(key).or_default();
        let current = Self::current_version(stream);

        if !expected_version.matches(current) {
            return Err(EventStoreError::Concurrency(format!(
                "expected {expected_version:?}, found {current}"
            )));
        }

        // Enforce aggregate type stability across the stream.
        if let Some(existing) = stream.first() {
            if existing.aggregate_type != aggregate_type {
                return Err(EventStoreError::AggregateTypeMismatch(format!(
                    "stream aggregate_type is '{}', attempted append with '{}'",
                    existing.aggregate_type, aggregate_type
                )));
            }
        }

        // Assign sequence numbers and append (append-only).
        let mut next = current + 1;
        let mut committed = Vec::with_capacity(events.len());
        for e in events {
            let stored = StoredEvent {
                event_id: e.event_id,
                tenant_id: e.tenant_id,
                aggregate_id: e.aggregate_id,
                aggregate_type: e.aggregate_type,
                sequence_number: next,
                event_type: e.event_type,
                event_version: e.event_version,
                occurred_at: e.occurred_at,
                payload: e.payload,
            };
            next += 1;
            stream.push(stored.clone());
            committed.push(stored);
        }

        Ok(committed)
    }

    fn load_stream(
        &self,
        tenant_id: TenantId,
        aggregate_id: AggregateId,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        let key = StreamKey {
            tenant_id,
            aggregate_id,
        };

        let streams = self
            .streams
            .read()
            .map_err(|_| EventStoreError::Storage("lock poisoned".to_string()))?;

        Ok(streams.get(&key).cloned().unwrap_or_default())
    }
}

fn matches_filter(filter: &EventFilter, event: &StoredEvent) -> bool {
    if let Some(aggregate_id) = filter.aggregate_id {
        if event.aggregate_id != aggregate_id {
            return false;
        }
    }
    if let Some(ref aggregate_type) = filter.aggregate_type {
        if &event.aggregate_type != aggregate_type {
            return false;
        }
    }
    if let Some(ref event_type) = filter.event_type {
        if &event.event_type != event_type {
            return false;
        }
    }
    if let Some(after) = filter.occurred_after {
        if event.occurred_at < after {
            return false;
        }
    }
    if let Some(before) = filter.occurred_before {
        if event.occurred_at > before {
            return false;
        }
    }
    true
}

#[async_trait::async_trait]
impl EventQuery for InMemoryEventStore {
    async fn query_events(
        &self,
        tenant_id: TenantId,
        filter: EventFilter,
        pagination: Pagination,
    ) -> Result<EventQueryResult, EventStoreError> {
        let streams = self
            .streams
            .read()
            .map_err(|_| EventStoreError::Storage("lock poisoned".to_string()))?;

        let mut matching: Vec<StoredEvent> = streams
            .iter()
            .filter(|(key, _)| key.tenant_id == tenant_id)
            .flat_map(|(_, stream)| stream.iter())
            .filter(|e| matches_filter(&filter, e))
            .cloned()
            .collect();

        // Same ordering as the Postgres store: newest first, stable by
        // sequence within a timestamp.
        matching.sort_by(|a, b| {
            b.occurred_at
                .cmp(&a.occurred_at)
                .then(a.sequence_number.cmp(&b.sequence_number))
        });

        let total = matching.len() as u64;
        let events: Vec<StoredEvent> = matching
            .into_iter()
            .skip(pagination.offset as usize)
            .take(pagination.limit as usize)
            .collect();
        let has_more = total > u64::from(pagination.offset + pagination.limit);

        Ok(EventQueryResult {
            events,
            total,
            pagination,
            has_more,
        })
    }

    async fn get_event_by_id(
        &self,
        tenant_id: TenantId,
        event_id: uuid::Uuid,
    ) -> Result<Option<StoredEvent>, EventStoreError> {
        let streams = self
            .streams
            .read()
            .map_err(|_| EventStoreError::Storage("lock poisoned".to_string()))?;

        Ok(streams
            .iter()
            .filter(|(key, _)| key.tenant_id == tenant_id)
            .flat_map(|(_, stream)| stream.iter())
            .find(|e| e.event_id == event_id)
            .cloned())
    }
}
