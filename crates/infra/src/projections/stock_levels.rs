//! Stock levels read model.
//!
//! Folds `inventory.stock_item` streams into a per-item row carrying the
//! current quantity and replenishment policy. Movement events already carry
//! the resulting quantity, so applying one is an overwrite, never arithmetic;
//! replaying a movement can therefore never drift the read model.
//!
//! This is the projection behind the dashboard's low-stock view and, via
//! [`ReadModelReader`], the snapshot source for the reorder advisor.

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::{Arc, RwLock};

use serde_json::Value as JsonValue;
use thiserror::Error;

use stockpilot_advisor::{ReadModelReader, StockItemSnapshot, StockSnapshot};
use stockpilot_catalog::ProductId;
use stockpilot_core::{AggregateId, TenantId};
use stockpilot_events::EventEnvelope;
use stockpilot_inventory::{StockItemEvent, StockItemId};

use crate::projections::cursor_store::{InMemoryCursorStore, ProjectionCursorStore};
use crate::read_model::TenantStore;

#[derive(Debug, Clone, PartialEq)]
pub struct StockItemReadModel {
    pub item_id: StockItemId,
    pub product_id: ProductId,
    pub name: String,
    pub quantity: i64,
    pub average_daily_sales: f64,
    pub lead_time_days: f64,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
struct CursorKey {
    tenant_id: TenantId,
    aggregate_id: AggregateId,
}

#[derive(Debug, Error)]
pub enum StockLevelProjectionError {
    #[error("failed to deserialize stock event: {0}")]
    Deserialize(String),

    #[error("tenant isolation violation: {0}")]
    TenantIsolation(String),

    #[error("non-monotonic sequence number (last={last}, found={found})")]
    NonMonotonicSequence { last: u64, found: u64 },
}

#[derive(Debug)]
pub struct StockLevelsProjection<S, C = InMemoryCursorStore>
where
    S: TenantStore<StockItemId, StockItemReadModel>,
{
    store: S,
    cursors: RwLock<HashMap<CursorKey, u64>>,
    cursor_store: Option<Arc<C>>,
    projection_name: String,
}

impl<S> StockLevelsProjection<S>
where
    S: TenantStore<StockItemId, StockItemReadModel>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            cursors: RwLock::new(HashMap::new()),
            cursor_store: None,
            projection_name: "inventory.stock_levels".to_string(),
        }
    }

    pub fn with_persistent_cursors<C: ProjectionCursorStore + 'static>(
        self,
        cursor_store: Arc<C>,
        projection_name: impl Into<String>,
    ) -> StockLevelsProjection<S, C> {
        StockLevelsProjection {
            store: self.store,
            cursors: RwLock::new(HashMap::new()),
            cursor_store: Some(cursor_store),
            projection_name: projection_name.into(),
        }
    }
}

impl<S, C> StockLevelsProjection<S, C>
where
    S: TenantStore<StockItemId, StockItemReadModel>,
    C: ProjectionCursorStore + 'static,
{
    fn get_cursor(&self, tenant_id: TenantId, aggregate_id: AggregateId) -> u64 {
        if let Some(ref cursor_store) = self.cursor_store {
            cursor_store
                .get_cursor(tenant_id, aggregate_id, &self.projection_name)
                .unwrap_or(0)
        } else {
            match self.cursors.read() {
                Ok(cursors) => *cursors
                    .get(&CursorKey { tenant_id, aggregate_id })
                    .unwrap_or(&0),
                Err(_) => 0,
            }
        }
    }

    fn update_cursor(&self, tenant_id: TenantId, aggregate_id: AggregateId, sequence_number: u64) {
        if let Ok(mut cursors) = self.cursors.write() {
            cursors.insert(CursorKey { tenant_id, aggregate_id }, sequence_number);
        }
        if let Some(ref cursor_store) = self.cursor_store {
            cursor_store.update_cursor(tenant_id, aggregate_id, &self.projection_name, sequence_number);
        }
    }

    fn clear_cursors(&self, tenant_id: TenantId) {
        if let Ok(mut cursors) = self.cursors.write() {
            cursors.retain(|k, _| k.tenant_id != tenant_id);
        }
        if let Some(ref cursor_store) = self.cursor_store {
            cursor_store.clear_cursors(tenant_id, &self.projection_name);
        }
    }

    pub fn get(&self, tenant_id: TenantId, item_id: &StockItemId) -> Option<StockItemReadModel> {
        self.store.get(tenant_id, item_id)
    }

    pub fn list(&self, tenant_id: TenantId) -> Vec<StockItemReadModel> {
        self.store.list(tenant_id)
    }

    pub fn apply_envelope(
        &self,
        envelope: &EventEnvelope<JsonValue>,
    ) -> Result<(), StockLevelProjectionError> {
        if envelope.aggregate_type() != "inventory.stock_item" {
            return Ok(());
        }

        let tenant_id = envelope.tenant_id();
        let aggregate_id = envelope.aggregate_id();
        let seq = envelope.sequence_number();

        let last = self.get_cursor(tenant_id, aggregate_id);
        if seq == 0 {
            return Err(StockLevelProjectionError::NonMonotonicSequence { last, found: seq });
        }
        if seq <= last {
            return Ok(());
        }
        if seq != last + 1 && last != 0 {
            return Err(StockLevelProjectionError::NonMonotonicSequence { last, found: seq });
        }

        let ev: StockItemEvent = serde_json::from_value(envelope.payload().clone())
            .map_err(|e| StockLevelProjectionError::Deserialize(e.to_string()))?;

        let (event_tenant, item_id) = match &ev {
            StockItemEvent::ProductTracked(e) => (e.tenant_id, e.item_id),
            StockItemEvent::StockReceived(e) => (e.tenant_id, e.item_id),
            StockItemEvent::StockIssued(e) => (e.tenant_id, e.item_id),
            StockItemEvent::StockCorrected(e) => (e.tenant_id, e.item_id),
            StockItemEvent::ReplenishmentPolicySet(e) => (e.tenant_id, e.item_id),
        };

        if event_tenant != tenant_id {
            return Err(StockLevelProjectionError::TenantIsolation(
                "event tenant_id does not match envelope tenant_id".to_string(),
            ));
        }
        if item_id.0 != aggregate_id {
            return Err(StockLevelProjectionError::TenantIsolation(
                "event item_id does not match envelope aggregate_id".to_string(),
            ));
        }

        match ev {
            StockItemEvent::ProductTracked(e) => {
                self.store.upsert(
                    tenant_id,
                    e.item_id,
                    StockItemReadModel {
                        item_id: e.item_id,
                        product_id: e.product_id,
                        name: e.name,
                        quantity: e.initial_quantity,
                        average_daily_sales: e.policy.average_daily_sales,
                        lead_time_days: e.policy.lead_time_days,
                    },
                );
            }
            StockItemEvent::StockReceived(e) => {
                if let Some(mut rm) = self.store.get(tenant_id, &e.item_id) {
                    rm.quantity = e.resulting_quantity;
                    self.store.upsert(tenant_id, e.item_id, rm);
                }
            }
            StockItemEvent::StockIssued(e) => {
                if let Some(mut rm) = self.store.get(tenant_id, &e.item_id) {
                    rm.quantity = e.resulting_quantity;
                    self.store.upsert(tenant_id, e.item_id, rm);
                }
            }
            StockItemEvent::StockCorrected(e) => {
                if let Some(mut rm) = self.store.get(tenant_id, &e.item_id) {
                    rm.quantity = e.counted_quantity;
                    self.store.upsert(tenant_id, e.item_id, rm);
                }
            }
            StockItemEvent::ReplenishmentPolicySet(e) => {
                if let Some(mut rm) = self.store.get(tenant_id, &e.item_id) {
                    rm.average_daily_sales = e.policy.average_daily_sales;
                    rm.lead_time_days = e.policy.lead_time_days;
                    self.store.upsert(tenant_id, e.item_id, rm);
                }
            }
        }

        self.update_cursor(tenant_id, aggregate_id, seq);
        Ok(())
    }

    pub fn rebuild_from_scratch(
        &self,
        envelopes: impl IntoIterator<Item = EventEnvelope<JsonValue>>,
    ) -> Result<(), StockLevelProjectionError> {
        let mut envs: Vec<_> = envelopes.into_iter().collect();

        {
            let mut tenants = envs.iter().map(|e| e.tenant_id()).collect::<Vec<_>>();
            tenants.sort_by_key(|t| *t.as_uuid().as_bytes());
            tenants.dedup();
            for t in tenants {
                self.store.clear_tenant(t);
                self.clear_cursors(t);
            }
        }

        envs.sort_by_key(|e| {
            (
                *e.tenant_id().as_uuid().as_bytes(),
                *e.aggregate_id().as_uuid().as_bytes(),
                e.sequence_number(),
            )
        });

        for env in &envs {
            self.apply_envelope(env)?;
        }
        Ok(())
    }
}

/// Snapshot source for the reorder advisor: one [`StockItemSnapshot`] per
/// tracked item, straight from the read model.
impl<S, C> ReadModelReader<StockSnapshot> for StockLevelsProjection<S, C>
where
    S: TenantStore<StockItemId, StockItemReadModel>,
    C: ProjectionCursorStore + 'static,
{
    type Error = Infallible;

    fn get_snapshot(&self, tenant_id: TenantId) -> Result<StockSnapshot, Self::Error> {
        let items = self
            .store
            .list(tenant_id)
            .into_iter()
            .map(|rm| StockItemSnapshot {
                item_id: rm.item_id.to_string(),
                product_id: rm.product_id.to_string(),
                name: rm.name,
                quantity: rm.quantity,
                average_daily_sales: rm.average_daily_sales,
                lead_time_days: rm.lead_time_days,
            })
            .collect();

        Ok(StockSnapshot { tenant_id, items })
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use serde_json::Value as JsonValue;
    use uuid::Uuid;

    use stockpilot_inventory::{ProductTracked, ReplenishmentPolicy, StockReceived};

    use super::*;
    use crate::read_model::InMemoryTenantStore;

    fn envelope(
        tenant_id: TenantId,
        item_id: StockItemId,
        sequence_number: u64,
        payload: &StockItemEvent,
    ) -> EventEnvelope<JsonValue> {
        EventEnvelope::new(
            Uuid::now_v7(),
            tenant_id,
            item_id.0,
            "inventory.stock_item".to_string(),
            sequence_number,
            serde_json::to_value(payload).unwrap(),
        )
    }

    fn tracked(tenant_id: TenantId, item_id: StockItemId, quantity: i64) -> StockItemEvent {
        StockItemEvent::ProductTracked(ProductTracked {
            tenant_id,
            item_id,
            product_id: ProductId::new(AggregateId::new()),
            name: "Bolt M6".to_string(),
            initial_quantity: quantity,
            policy: ReplenishmentPolicy {
                average_daily_sales: 5.0,
                lead_time_days: 10.0,
            },
            occurred_at: Utc::now(),
        })
    }

    fn received(tenant_id: TenantId, item_id: StockItemId, resulting: i64) -> StockItemEvent {
        StockItemEvent::StockReceived(StockReceived {
            tenant_id,
            item_id,
            quantity: 1,
            resulting_quantity: resulting,
            reference: None,
            occurred_at: Utc::now(),
        })
    }

    #[test]
    fn replayed_events_are_ignored() {
        let projection = StockLevelsProjection::new(InMemoryTenantStore::new());
        let tenant_id = TenantId::new();
        let item_id = StockItemId::new(AggregateId::new());

        let e1 = envelope(tenant_id, item_id, 1, &tracked(tenant_id, item_id, 10));
        let e2 = envelope(tenant_id, item_id, 2, &received(tenant_id, item_id, 25));

        projection.apply_envelope(&e1).unwrap();
        projection.apply_envelope(&e2).unwrap();
        // At-least-once delivery: the same envelope again must not change anything.
        projection.apply_envelope(&e2).unwrap();
        projection.apply_envelope(&e1).unwrap();

        let rm = projection.get(tenant_id, &item_id).unwrap();
        assert_eq!(rm.quantity, 25);
    }

    #[test]
    fn sequence_gaps_are_rejected() {
        let projection = StockLevelsProjection::new(InMemoryTenantStore::new());
        let tenant_id = TenantId::new();
        let item_id = StockItemId::new(AggregateId::new());

        projection
            .apply_envelope(&envelope(tenant_id, item_id, 1, &tracked(tenant_id, item_id, 10)))
            .unwrap();

        let gap = envelope(tenant_id, item_id, 3, &received(tenant_id, item_id, 25));
        let err = projection.apply_envelope(&gap).unwrap_err();
        assert!(matches!(
            err,
            StockLevelProjectionError::NonMonotonicSequence { last: 1, found: 3 }
        ));
    }

    #[test]
    fn mismatched_event_tenant_is_rejected() {
        let projection = StockLevelsProjection::new(InMemoryTenantStore::new());
        let tenant_id = TenantId::new();
        let other_tenant = TenantId::new();
        let item_id = StockItemId::new(AggregateId::new());

        // Envelope says one tenant, payload says another.
        let env = envelope(tenant_id, item_id, 1, &tracked(other_tenant, item_id, 10));
        let err = projection.apply_envelope(&env).unwrap_err();
        assert!(matches!(err, StockLevelProjectionError::TenantIsolation(_)));
        assert!(projection.get(tenant_id, &item_id).is_none());
    }

    #[test]
    fn snapshot_reflects_current_levels() {
        let projection = StockLevelsProjection::new(InMemoryTenantStore::new());
        let tenant_id = TenantId::new();
        let item_id = StockItemId::new(AggregateId::new());

        projection
            .apply_envelope(&envelope(tenant_id, item_id, 1, &tracked(tenant_id, item_id, 50)))
            .unwrap();

        let snapshot = projection.get_snapshot(tenant_id).unwrap();
        assert_eq!(snapshot.tenant_id, tenant_id);
        assert_eq!(snapshot.items.len(), 1);
        assert_eq!(snapshot.items[0].quantity, 50);
        assert_eq!(snapshot.items[0].average_daily_sales, 5.0);
        assert_eq!(snapshot.items[0].lead_time_days, 10.0);
    }

    #[test]
    fn rebuild_is_deterministic_across_input_order() {
        let projection = StockLevelsProjection::new(InMemoryTenantStore::new());
        let tenant_id = TenantId::new();
        let item_id = StockItemId::new(AggregateId::new());

        let envs = vec![
            envelope(tenant_id, item_id, 2, &received(tenant_id, item_id, 30)),
            envelope(tenant_id, item_id, 1, &tracked(tenant_id, item_id, 10)),
        ];

        projection.rebuild_from_scratch(envs).unwrap();

        let rm = projection.get(tenant_id, &item_id).unwrap();
        assert_eq!(rm.quantity, 30);
    }
}
