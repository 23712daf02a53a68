//! Postgres-backed read model storage.
//!
//! Persists the stock-levels read model in a `stock_items` table so the
//! dashboard and reorder advice survive a restart without a full replay.
//! Errors degrade to "not found" / no-op: read models are disposable and a
//! rebuild from the event stream is always available.

use std::sync::Arc;

use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::Span;

use stockpilot_core::{AggregateId, TenantId};
use stockpilot_catalog::ProductId;
use stockpilot_inventory::StockItemId;

use crate::projections::stock_levels::StockItemReadModel;
use super::TenantStore;

/// `TenantStore` over the `stock_items` table.
///
/// Tenant isolation is structural: `tenant_id` is part of the primary key
/// and every statement filters on it. The `TenantStore` trait is synchronous,
/// so each call bridges onto the ambient tokio runtime; outside a runtime
/// the store quietly serves nothing (the in-memory store covers that case).
pub struct PostgresStockStore {
    pool: Arc<PgPool>,
}

impl PostgresStockStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }
}

fn row_to_read_model(row: &PgRow) -> Option<StockItemReadModel> {
    Some(StockItemReadModel {
        item_id: StockItemId::new(AggregateId::from_uuid(row.try_get("item_id").ok()?)),
        product_id: ProductId::new(AggregateId::from_uuid(row.try_get("product_id").ok()?)),
        name: row.try_get("name").ok()?,
        quantity: row.try_get("quantity").ok()?,
        average_daily_sales: row.try_get("average_daily_sales").ok()?,
        lead_time_days: row.try_get("lead_time_days").ok()?,
    })
}

impl TenantStore<StockItemId, StockItemReadModel> for PostgresStockStore {
    fn get(&self, tenant_id: TenantId, key: &StockItemId) -> Option<StockItemReadModel> {
        let handle = tokio::runtime::Handle::try_current().ok()?;
        let pool = self.pool.clone();
        let tenant_uuid = tenant_id.as_uuid();
        let item_uuid = key.0.as_uuid();

        handle.block_on(async {
            Span::current().record("operation", "get_stock_item");

            let row = sqlx::query(
                r#"
                SELECT item_id, product_id, name, quantity,
                       average_daily_sales, lead_time_days
                FROM stock_items
                WHERE tenant_id = $1 AND item_id = $2
                "#,
            )
            .bind(tenant_uuid)
            .bind(item_uuid)
            .fetch_optional(&*pool)
            .await
            .ok()??;

            row_to_read_model(&row)
        })
    }

    fn upsert(&self, tenant_id: TenantId, key: StockItemId, value: StockItemReadModel) {
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(h) => h,
            Err(_) => return,
        };

        let pool = self.pool.clone();
        let tenant_uuid = tenant_id.as_uuid();
        let item_uuid = key.0.as_uuid();

        handle.block_on(async {
            Span::current().record("operation", "upsert_stock_item");

            let _ = sqlx::query(
                r#"
                INSERT INTO stock_items (
                    tenant_id, item_id, product_id, name, quantity,
                    average_daily_sales, lead_time_days
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                ON CONFLICT (tenant_id, item_id)
                DO UPDATE SET
                    product_id = EXCLUDED.product_id,
                    name = EXCLUDED.name,
                    quantity = EXCLUDED.quantity,
                    average_daily_sales = EXCLUDED.average_daily_sales,
                    lead_time_days = EXCLUDED.lead_time_days,
                    updated_at = NOW()
                "#,
            )
            .bind(tenant_uuid)
            .bind(item_uuid)
            .bind(value.product_id.0.as_uuid())
            .bind(&value.name)
            .bind(value.quantity)
            .bind(value.average_daily_sales)
            .bind(value.lead_time_days)
            .execute(&*pool)
            .await;
        });
    }

    fn list(&self, tenant_id: TenantId) -> Vec<StockItemReadModel> {
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(h) => h,
            Err(_) => return vec![],
        };

        let pool = self.pool.clone();
        let tenant_uuid = tenant_id.as_uuid();

        handle.block_on(async {
            Span::current().record("operation", "list_stock_items");

            match sqlx::query(
                r#"
                SELECT item_id, product_id, name, quantity,
                       average_daily_sales, lead_time_days
                FROM stock_items
                WHERE tenant_id = $1
                ORDER BY updated_at DESC
                "#,
            )
            .bind(tenant_uuid)
            .fetch_all(&*pool)
            .await
            {
                Ok(rows) => rows.iter().filter_map(row_to_read_model).collect(),
                Err(_) => vec![],
            }
        })
    }

    fn clear_tenant(&self, tenant_id: TenantId) {
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(h) => h,
            Err(_) => return,
        };

        let pool = self.pool.clone();
        let tenant_uuid = tenant_id.as_uuid();

        handle.block_on(async {
            Span::current().record("operation", "clear_tenant_stock_items");

            let _ = sqlx::query("SELECT clear_tenant_read_models($1)")
                .bind(tenant_uuid)
                .execute(&*pool)
                .await;
        });
    }
}
