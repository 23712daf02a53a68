//! Projection checkpoint persistence.
//!
//! A cursor records the last applied `sequence_number` per
//! (tenant, aggregate, projection) triple. Cursors make projections
//! idempotent under at-least-once delivery (replays at or below the cursor
//! are ignored), let them resume after a restart, and are cleared together
//! with the read models when a tenant is rebuilt from scratch.

use std::sync::Arc;

use sqlx::{PgPool, Row};

use stockpilot_core::{AggregateId, TenantId};

pub trait ProjectionCursorStore: Send + Sync {
    /// Last applied sequence number for the stream, if any.
    fn get_cursor(
        &self,
        tenant_id: TenantId,
        aggregate_id: AggregateId,
        projection_name: &str,
    ) -> Option<u64>;

    fn update_cursor(
        &self,
        tenant_id: TenantId,
        aggregate_id: AggregateId,
        projection_name: &str,
        sequence_number: u64,
    );

    /// Drop every cursor this projection holds for the tenant.
    fn clear_cursors(&self, tenant_id: TenantId, projection_name: &str);
}

/// The no-op cursor store. Projections default to it when they track
/// cursors purely in memory; it never reports progress, so a fresh process
/// replays streams from the beginning.
pub struct InMemoryCursorStore;

impl ProjectionCursorStore for InMemoryCursorStore {
    fn get_cursor(
        &self,
        _tenant_id: TenantId,
        _aggregate_id: AggregateId,
        _projection_name: &str,
    ) -> Option<u64> {
        None
    }

    fn update_cursor(
        &self,
        _tenant_id: TenantId,
        _aggregate_id: AggregateId,
        _projection_name: &str,
        _sequence_number: u64,
    ) {
    }

    fn clear_cursors(&self, _tenant_id: TenantId, _projection_name: &str) {}
}

/// Cursor store over the `projection_offsets` table.
///
/// Bridges onto the ambient tokio runtime per call; outside a runtime the
/// store reports no progress and writes nothing, which only costs a replay.
pub struct PostgresCursorStore {
    pool: Arc<PgPool>,
}

impl PostgresCursorStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }
}

impl ProjectionCursorStore for PostgresCursorStore {
    fn get_cursor(
        &self,
        tenant_id: TenantId,
        aggregate_id: AggregateId,
        projection_name: &str,
    ) -> Option<u64> {
        let handle = tokio::runtime::Handle::try_current().ok()?;
        let pool = self.pool.clone();
        let tenant_uuid = tenant_id.as_uuid();
        let aggregate_uuid = aggregate_id.as_uuid();
        let projection_name = projection_name.to_string();

        handle.block_on(async {
            let row = sqlx::query(
                r#"
                SELECT last_sequence_number
                FROM projection_offsets
                WHERE tenant_id = $1 AND aggregate_id = $2 AND projection_name = $3
                "#,
            )
            .bind(tenant_uuid)
            .bind(aggregate_uuid)
            .bind(&projection_name)
            .fetch_optional(&*pool)
            .await
            .ok()??;

            row.try_get::<i64, _>("last_sequence_number")
                .ok()
                .map(|seq| seq as u64)
        })
    }

    fn update_cursor(
        &self,
        tenant_id: TenantId,
        aggregate_id: AggregateId,
        projection_name: &str,
        sequence_number: u64,
    ) {
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(h) => h,
            Err(_) => return,
        };

        let pool = self.pool.clone();
        let tenant_uuid = tenant_id.as_uuid();
        let aggregate_uuid = aggregate_id.as_uuid();
        let projection_name = projection_name.to_string();

        handle.block_on(async {
            let _ = sqlx::query(
                r#"
                INSERT INTO projection_offsets (
                    tenant_id, aggregate_id, projection_name, last_sequence_number
                )
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (tenant_id, aggregate_id, projection_name)
                DO UPDATE SET
                    last_sequence_number = EXCLUDED.last_sequence_number,
                    updated_at = NOW()
                "#,
            )
            .bind(tenant_uuid)
            .bind(aggregate_uuid)
            .bind(&projection_name)
            .bind(sequence_number as i64)
            .execute(&*pool)
            .await;
        });
    }

    fn clear_cursors(&self, tenant_id: TenantId, projection_name: &str) {
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(h) => h,
            Err(_) => return,
        };

        let pool = self.pool.clone();
        let tenant_uuid = tenant_id.as_uuid();
        let projection_name = projection_name.to_string();

        handle.block_on(async {
            let _ = sqlx::query("SELECT clear_tenant_offsets($1, $2)")
                .bind(tenant_uuid)
                .bind(&projection_name)
                .execute(&*pool)
                .await;
        });
    }
}
