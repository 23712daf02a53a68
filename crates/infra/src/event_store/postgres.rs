//! Postgres-backed event store.
//!
//! Persists event streams in an `events` table with tenant isolation,
//! optimistic concurrency and append-only semantics enforced at the database
//! level (unique constraint on `(tenant_id, aggregate_id, sequence_number)`).
//!
//! ## Error mapping
//!
//! | SQLx error | Postgres code | `EventStoreError` |
//! |------------|---------------|-------------------|
//! | Database (unique violation) | `23505` | `Concurrency` |
//! | Database (anything else) | any | `Storage` |
//! | PoolClosed / RowNotFound / other | n/a | `Storage` |
//! | Row decode failure | n/a | `Serialization` |
//!
//! ## Thread safety
//!
//! `PostgresEventStore` is `Send + Sync`; all operations go through the SQLx
//! connection pool. The sync [`EventStore`] impl bridges into async via the
//! ambient tokio runtime handle, so it must be called from within a tokio
//! context (axum handlers qualify).

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, Row, Transaction};
use std::sync::Arc;
use tracing::{Span, instrument};

use stockpilot_core::{AggregateId, ExpectedVersion, TenantId};

use super::query::{EventFilter, EventQuery, EventQueryResult, Pagination};
use super::r#trait::{EventStore, EventStoreError, StoredEvent, UncommittedEvent};

/// Postgres-backed append-only event store.
///
/// `append_events` runs inside a transaction: read the current stream version
/// (`MAX(sequence_number)`), validate it against `expected_version`, insert
/// the batch, commit. If another writer commits between the read and the
/// insert, the unique constraint fires and the append surfaces as a
/// `Concurrency` error.
#[derive(Debug, Clone)]
pub struct PostgresEventStore {
    pool: Arc<PgPool>,
}

impl PostgresEventStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Load all events for a tenant + aggregate stream, in sequence order.
    ///
    /// Returns an empty vector if the stream doesn't exist.
    #[instrument(
        skip(self),
        fields(
            tenant_id = %tenant_id.as_uuid(),
            aggregate_id = %aggregate_id.as_uuid()
        ),
        err
    )]
    pub async fn load_stream(
        &self,
        tenant_id: TenantId,
        aggregate_id: AggregateId,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        let span = Span::current();
        span.record("operation", "load_stream");

        let rows = sqlx::query(
            r#"
            SELECT
                event_id,
                tenant_id,
                aggregate_id,
                aggregate_type,
                sequence_number,
                event_type,
                event_version,
                occurred_at,
                payload,
                created_at
            FROM events
            WHERE tenant_id = $1 AND aggregate_id = $2
            ORDER BY sequence_number ASC
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(aggregate_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("load_stream", e))?;

        let mut stored_events = Vec::with_capacity(rows.len());
        for row in rows {
            let stored = StoredEventRow::from_row(&row).map_err(|e| {
                EventStoreError::Serialization(format!("failed to decode event row: {e}"))
            })?;
            stored_events.push(stored.into());
        }

        span.record("event_count", stored_events.len());
        Ok(stored_events)
    }

    /// Append events to a stream with optimistic concurrency control.
    #[instrument(
        skip(self, events),
        fields(
            tenant_id = %tenant_id.as_uuid(),
            aggregate_id = %aggregate_id.as_uuid(),
            event_count = events.len(),
            expected_version = ?expected_version
        ),
        err
    )]
    pub async fn append_events(
        &self,
        tenant_id: TenantId,
        aggregate_id: AggregateId,
        events: Vec<UncommittedEvent>,
        expected_version: ExpectedVersion,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        if events.is_empty() {
            return Ok(vec![]);
        }

        let span = Span::current();
        span.record("operation", "append_events");

        // The whole batch must target the given tenant + aggregate stream.
        for (idx, e) in events.iter().enumerate() {
            if e.tenant_id != tenant_id {
                return Err(EventStoreError::TenantIsolation(format!(
                    "batch contains foreign tenant_id (index {idx})"
                )));
            }
            if e.aggregate_id != aggregate_id {
                return Err(EventStoreError::Storage(format!(
                    "batch contains foreign aggregate_id (index {idx})"
                )));
            }
        }

        let aggregate_type = events[0].aggregate_type.clone();

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let (current_version, existing_aggregate_type) =
            check_stream_version(&mut tx, tenant_id, aggregate_id).await?;

        // Enforce aggregate type stability across the stream.
        if let Some(ref existing_type) = existing_aggregate_type {
            if existing_type != &aggregate_type {
                tx.rollback()
                    .await
                    .map_err(|e| map_sqlx_error("rollback", e))?;
                return Err(EventStoreError::AggregateTypeMismatch(format!(
                    "stream aggregate_type is '{existing_type}', attempted append with '{aggregate_type}'"
                )));
            }
        }

        if !expected_version.matches(current_version) {
            tx.rollback()
                .await
                .map_err(|e| map_sqlx_error("rollback", e))?;
            return Err(EventStoreError::Concurrency(format!(
                "expected {expected_version:?}, found {current_version}"
            )));
        }

        // Insert with sequence numbers starting at current_version + 1.
        let mut stored_events = Vec::with_capacity(events.len());
        let mut next_sequence = current_version + 1;

        for event in events {
            sqlx::query(
                r#"
                INSERT INTO events (
                    event_id,
                    tenant_id,
                    aggregate_id,
                    aggregate_type,
                    sequence_number,
                    event_type,
                    event_version,
                    occurred_at,
                    payload
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                "#,
            )
            .bind(event.event_id)
            .bind(tenant_id.as_uuid())
            .bind(aggregate_id.as_uuid())
            .bind(&aggregate_type)
            .bind(next_sequence as i64)
            .bind(&event.event_type)
            .bind(event.event_version as i32)
            .bind(event.occurred_at)
            .bind(&event.payload)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                // A unique violation here means another transaction won the
                // race for this sequence number.
                if is_unique_violation(&e) {
                    EventStoreError::Concurrency(format!(
                        "concurrent append detected: sequence_number {next_sequence} already exists"
                    ))
                } else {
                    map_sqlx_error("insert_event", e)
                }
            })?;

            let stored = StoredEvent {
                event_id: event.event_id,
                tenant_id: event.tenant_id,
                aggregate_id: event.aggregate_id,
                aggregate_type: event.aggregate_type,
                sequence_number: next_sequence,
                event_type: event.event_type,
                event_version: event.event_version,
                occurred_at: event.occurred_at,
                payload: event.payload,
            };
            stored_events.push(stored);
            next_sequence += 1;
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        span.record("committed_events", stored_events.len());
        Ok(stored_events)
    }
}

/// Read the current version and aggregate type of a stream.
///
/// Returns `(0, None)` when the stream doesn't exist yet.
async fn check_stream_version(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: TenantId,
    aggregate_id: AggregateId,
) -> Result<(u64, Option<String>), EventStoreError> {
    let row = sqlx::query(
        r#"
        SELECT
            COALESCE(MAX(sequence_number), 0) as current_version,
            MAX(aggregate_type) as aggregate_type
        FROM events
        WHERE tenant_id = $1 AND aggregate_id = $2
        "#,
    )
    .bind(tenant_id.as_uuid())
    .bind(aggregate_id.as_uuid())
    .fetch_one(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("check_stream_version", e))?;

    let current_version: Option<i64> = row.try_get("current_version").map_err(|e| {
        EventStoreError::Serialization(format!("failed to read current_version: {e}"))
    })?;
    let aggregate_type: Option<String> = row.try_get("aggregate_type").map_err(|e| {
        EventStoreError::Serialization(format!("failed to read aggregate_type: {e}"))
    })?;

    Ok((current_version.unwrap_or(0) as u64, aggregate_type))
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> EventStoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            if db_err.code().as_deref() == Some("23505") {
                EventStoreError::Concurrency(msg)
            } else {
                EventStoreError::Storage(msg)
            }
        }
        sqlx::Error::PoolClosed => {
            EventStoreError::Storage(format!("connection pool closed in {operation}"))
        }
        _ => EventStoreError::Storage(format!("sqlx error in {operation}: {err}")),
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        return db_err.code().as_deref() == Some("23505");
    }
    false
}

#[derive(Debug)]
struct StoredEventRow {
    event_id: uuid::Uuid,
    tenant_id: uuid::Uuid,
    aggregate_id: uuid::Uuid,
    aggregate_type: String,
    sequence_number: i64,
    event_type: String,
    event_version: i32,
    occurred_at: DateTime<Utc>,
    payload: serde_json::Value,
    #[allow(dead_code)] // surfaced for monitoring queries, not part of StoredEvent
    created_at: DateTime<Utc>,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for StoredEventRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(StoredEventRow {
            event_id: row.try_get("event_id")?,
            tenant_id: row.try_get("tenant_id")?,
            aggregate_id: row.try_get("aggregate_id")?,
            aggregate_type: row.try_get("aggregate_type")?,
            sequence_number: row.try_get("sequence_number")?,
            event_type: row.try_get("event_type")?,
            event_version: row.try_get("event_version")?,
            occurred_at: row.try_get("occurred_at")?,
            payload: row.try_get("payload")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl From<StoredEventRow> for StoredEvent {
    fn from(row: StoredEventRow) -> Self {
        StoredEvent {
            event_id: row.event_id,
            tenant_id: TenantId::from_uuid(row.tenant_id),
            aggregate_id: AggregateId::from_uuid(row.aggregate_id),
            aggregate_type: row.aggregate_type,
            sequence_number: row.sequence_number as u64,
            event_type: row.event_type,
            event_version: row.event_version as u32,
            occurred_at: row.occurred_at,
            payload: row.payload,
        }
    }
}

fn runtime_handle() -> Result<tokio::runtime::Handle, EventStoreError> {
    tokio::runtime::Handle::try_current().map_err(|_| {
        EventStoreError::Storage(
            "PostgresEventStore requires a tokio runtime context".to_string(),
        )
    })
}

// Sync EventStore facade over the async operations. The command dispatcher is
// synchronous; when it runs inside axum handlers the ambient runtime handle
// lets us block on the async calls.
impl EventStore for PostgresEventStore {
    fn append(
        &self,
        events: Vec<UncommittedEvent>,
        expected_version: ExpectedVersion,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        if events.is_empty() {
            return Ok(vec![]);
        }

        let tenant_id = events[0].tenant_id;
        let aggregate_id = events[0].aggregate_id;

        runtime_handle()?.block_on(self.append_events(
            tenant_id,
            aggregate_id,
            events,
            expected_version,
        ))
    }

    fn load_stream(
        &self,
        tenant_id: TenantId,
        aggregate_id: AggregateId,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        runtime_handle()?.block_on(self.load_stream(tenant_id, aggregate_id))
    }
}

#[async_trait::async_trait]
impl EventQuery for PostgresEventStore {
    async fn query_events(
        &self,
        tenant_id: TenantId,
        filter: EventFilter,
        pagination: Pagination,
    ) -> Result<EventQueryResult, EventStoreError> {
        // COALESCE-style optional filters keep this a single parameterized
        // query regardless of which filters are set.
        let agg_id_param: Option<uuid::Uuid> = filter.aggregate_id.map(|id| *id.as_uuid());
        let agg_type_param: Option<&str> = filter.aggregate_type.as_deref();
        let evt_type_param: Option<&str> = filter.event_type.as_deref();

        let count_row = sqlx::query(
            r#"
            SELECT COUNT(*) as total
            FROM events
            WHERE tenant_id = $1
                AND ($2::uuid IS NULL OR aggregate_id = $2)
                AND ($3::text IS NULL OR aggregate_type = $3)
                AND ($4::text IS NULL OR event_type = $4)
                AND ($5::timestamptz IS NULL OR occurred_at >= $5)
                AND ($6::timestamptz IS NULL OR occurred_at <= $6)
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(agg_id_param)
        .bind(agg_type_param)
        .bind(evt_type_param)
        .bind(filter.occurred_after)
        .bind(filter.occurred_before)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("count_events", e))?;

        let total: i64 = count_row
            .try_get("total")
            .map_err(|e| EventStoreError::Serialization(format!("failed to read count: {e}")))?;

        let rows = sqlx::query(
            r#"
            SELECT
                event_id,
                tenant_id,
                aggregate_id,
                aggregate_type,
                sequence_number,
                event_type,
                event_version,
                occurred_at,
                payload,
                created_at
            FROM events
            WHERE tenant_id = $1
                AND ($2::uuid IS NULL OR aggregate_id = $2)
                AND ($3::text IS NULL OR aggregate_type = $3)
                AND ($4::text IS NULL OR event_type = $4)
                AND ($5::timestamptz IS NULL OR occurred_at >= $5)
                AND ($6::timestamptz IS NULL OR occurred_at <= $6)
            ORDER BY occurred_at DESC, sequence_number ASC
            LIMIT $7 OFFSET $8
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(agg_id_param)
        .bind(agg_type_param)
        .bind(evt_type_param)
        .bind(filter.occurred_after)
        .bind(filter.occurred_before)
        .bind(pagination.limit as i64)
        .bind(pagination.offset as i64)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("query_events", e))?;

        let mut events = Vec::with_capacity(rows.len());
        for row in rows {
            let stored = StoredEventRow::from_row(&row).map_err(|e| {
                EventStoreError::Serialization(format!("failed to decode event row: {e}"))
            })?;
            events.push(stored.into());
        }

        let has_more = total > i64::from(pagination.offset + pagination.limit);

        Ok(EventQueryResult {
            events,
            total: total as u64,
            pagination,
            has_more,
        })
    }

    async fn get_aggregate_events(
        &self,
        tenant_id: TenantId,
        aggregate_id: AggregateId,
        pagination: Option<Pagination>,
    ) -> Result<EventQueryResult, EventStoreError> {
        // Aggregate streams read best in replay order, so this override
        // orders by sequence_number ascending instead.
        let pagination = pagination.unwrap_or_default();

        let count_row = sqlx::query(
            "SELECT COUNT(*) as total FROM events WHERE tenant_id = $1 AND aggregate_id = $2",
        )
        .bind(tenant_id.as_uuid())
        .bind(aggregate_id.as_uuid())
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("count_aggregate_events", e))?;

        let total: i64 = count_row
            .try_get("total")
            .map_err(|e| EventStoreError::Serialization(format!("failed to read count: {e}")))?;

        let rows = sqlx::query(
            r#"
            SELECT
                event_id,
                tenant_id,
                aggregate_id,
                aggregate_type,
                sequence_number,
                event_type,
                event_version,
                occurred_at,
                payload,
                created_at
            FROM events
            WHERE tenant_id = $1 AND aggregate_id = $2
            ORDER BY sequence_number ASC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(aggregate_id.as_uuid())
        .bind(pagination.limit as i64)
        .bind(pagination.offset as i64)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_aggregate_events", e))?;

        let mut events = Vec::with_capacity(rows.len());
        for row in rows {
            let stored = StoredEventRow::from_row(&row).map_err(|e| {
                EventStoreError::Serialization(format!("failed to decode event row: {e}"))
            })?;
            events.push(stored.into());
        }

        let has_more = total > i64::from(pagination.offset + pagination.limit);

        Ok(EventQueryResult {
            events,
            total: total as u64,
            pagination,
            has_more,
        })
    }

    async fn get_event_by_id(
        &self,
        tenant_id: TenantId,
        event_id: uuid::Uuid,
    ) -> Result<Option<StoredEvent>, EventStoreError> {
        let row = sqlx::query(
            r#"
            SELECT
                event_id,
                tenant_id,
                aggregate_id,
                aggregate_type,
                sequence_number,
                event_type,
                event_version,
                occurred_at,
                payload,
                created_at
            FROM events
            WHERE tenant_id = $1 AND event_id = $2
            LIMIT 1
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(event_id)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_event_by_id", e))?;

        match row {
            Some(row) => {
                let stored = StoredEventRow::from_row(&row).map_err(|e| {
                    EventStoreError::Serialization(format!("failed to decode event row: {e}"))
                })?;
                Ok(Some(stored.into()))
            }
            None => Ok(None),
        }
    }
}
