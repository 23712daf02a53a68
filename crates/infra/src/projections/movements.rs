//! Stock movement history read model.
//!
//! Appends one record per receipt, issue or correction so the API can serve
//! a movements report without replaying streams. Lifecycle and policy events
//! produce no record but still advance the cursor, otherwise the next
//! movement on the same item would be mistaken for a sequence gap.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use thiserror::Error;

use stockpilot_core::{AggregateId, TenantId};
use stockpilot_events::EventEnvelope;
use stockpilot_inventory::{MovementKind, StockItemEvent, StockItemId};

use crate::projections::cursor_store::{InMemoryCursorStore, ProjectionCursorStore};
use crate::read_model::TenantStore;

/// One line of the movements report.
///
/// `quantity` is the signed delta the event applied; for corrections it is
/// the difference between the counted and previous quantities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovementRecord {
    pub item_id: StockItemId,
    pub kind: MovementKind,
    pub quantity: i64,
    pub resulting_quantity: i64,
    pub reference: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
struct CursorKey {
    tenant_id: TenantId,
    aggregate_id: AggregateId,
}

#[derive(Debug, Error)]
pub enum MovementProjectionError {
    #[error("failed to deserialize stock event: {0}")]
    Deserialize(String),

    #[error("tenant isolation violation: {0}")]
    TenantIsolation(String),

    #[error("non-monotonic sequence number (last={last}, found={found})")]
    NonMonotonicSequence { last: u64, found: u64 },
}

#[derive(Debug)]
pub struct StockMovementsProjection<S, C = InMemoryCursorStore>
where
    S: TenantStore<StockItemId, Vec<MovementRecord>>,
{
    store: S,
    cursors: RwLock<HashMap<CursorKey, u64>>,
    cursor_store: Option<Arc<C>>,
    projection_name: String,
}

impl<S> StockMovementsProjection<S>
where
    S: TenantStore<StockItemId, Vec<MovementRecord>>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            cursors: RwLock::new(HashMap::new()),
            cursor_store: None,
            projection_name: "inventory.movements".to_string(),
        }
    }

    pub fn with_persistent_cursors<C: ProjectionCursorStore + 'static>(
        self,
        cursor_store: Arc<C>,
        projection_name: impl Into<String>,
    ) -> StockMovementsProjection<S, C> {
        StockMovementsProjection {
            store: self.store,
            cursors: RwLock::new(HashMap::new()),
            cursor_store: Some(cursor_store),
            projection_name: projection_name.into(),
        }
    }
}

impl<S, C> StockMovementsProjection<S, C>
where
    S: TenantStore<StockItemId, Vec<MovementRecord>>,
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

    /// Movement history for one item, oldest first.
    pub fn for_item(&self, tenant_id: TenantId, item_id: &StockItemId) -> Vec<MovementRecord> {
        self.store.get(tenant_id, item_id).unwrap_or_default()
    }

    /// Tenant-wide report, newest first.
    pub fn list(&self, tenant_id: TenantId) -> Vec<MovementRecord> {
        let mut records: Vec<MovementRecord> =
            self.store.list(tenant_id).into_iter().flatten().collect();
        records.sort_by(|a, b| b.occurred_at.cmp(&a.occurred_at));
        records
    }

    pub fn apply_envelope(
        &self,
        envelope: &EventEnvelope<JsonValue>,
    ) -> Result<(), MovementProjectionError> {
        if envelope.aggregate_type() != "inventory.stock_item" {
            return Ok(());
        }

        let tenant_id = envelope.tenant_id();
        let aggregate_id = envelope.aggregate_id();
        let seq = envelope.sequence_number();

        let last = self.get_cursor(tenant_id, aggregate_id);
        if seq == 0 {
            return Err(MovementProjectionError::NonMonotonicSequence { last, found: seq });
        }
        if seq <= last {
            return Ok(());
        }
        if seq != last + 1 && last != 0 {
            return Err(MovementProjectionError::NonMonotonicSequence { last, found: seq });
        }

        let ev: StockItemEvent = serde_json::from_value(envelope.payload().clone())
            .map_err(|e| MovementProjectionError::Deserialize(e.to_string()))?;

        let (event_tenant, item_id) = match &ev {
            StockItemEvent::ProductTracked(e) => (e.tenant_id, e.item_id),
            StockItemEvent::StockReceived(e) => (e.tenant_id, e.item_id),
            StockItemEvent::StockIssued(e) => (e.tenant_id, e.item_id),
            StockItemEvent::StockCorrected(e) => (e.tenant_id, e.item_id),
            StockItemEvent::ReplenishmentPolicySet(e) => (e.tenant_id, e.item_id),
        };

        if event_tenant != tenant_id {
            return Err(MovementProjectionError::TenantIsolation(
                "event tenant_id does not match envelope tenant_id".to_string(),
            ));
        }
        if item_id.0 != aggregate_id {
            return Err(MovementProjectionError::TenantIsolation(
                "event item_id does not match envelope aggregate_id".to_string(),
            ));
        }

        let record = match &ev {
            StockItemEvent::StockReceived(e) => Some(MovementRecord {
                item_id: e.item_id,
                kind: MovementKind::Received,
                quantity: e.quantity,
                resulting_quantity: e.resulting_quantity,
                reference: e.reference.clone(),
                occurred_at: e.occurred_at,
            }),
            StockItemEvent::StockIssued(e) => Some(MovementRecord {
                item_id: e.item_id,
                kind: MovementKind::Issued,
                quantity: -e.quantity,
                resulting_quantity: e.resulting_quantity,
                reference: e.reference.clone(),
                occurred_at: e.occurred_at,
            }),
            StockItemEvent::StockCorrected(e) => Some(MovementRecord {
                item_id: e.item_id,
                kind: MovementKind::Corrected,
                quantity: e.counted_quantity - e.previous_quantity,
                resulting_quantity: e.counted_quantity,
                reference: e.reason.clone(),
                occurred_at: e.occurred_at,
            }),
            StockItemEvent::ProductTracked(_) | StockItemEvent::ReplenishmentPolicySet(_) => None,
        };

        if let Some(record) = record {
            let mut history = self.store.get(tenant_id, &item_id).unwrap_or_default();
            history.push(record);
            self.store.upsert(tenant_id, item_id, history);
        }

        self.update_cursor(tenant_id, aggregate_id, seq);
        Ok(())
    }

    pub fn rebuild_from_scratch(
        &self,
        envelopes: impl IntoIterator<Item = EventEnvelope<JsonValue>>,
    ) -> Result<(), MovementProjectionError> {
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

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use stockpilot_inventory::{
        ProductTracked, ReplenishmentPolicy, ReplenishmentPolicySet, StockIssued, StockReceived,
    };
    use stockpilot_catalog::ProductId;

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

    #[test]
    fn non_movement_events_advance_the_cursor_without_a_record() {
        let projection = StockMovementsProjection::new(InMemoryTenantStore::new());
        let tenant_id = TenantId::new();
        let item_id = StockItemId::new(AggregateId::new());
        let policy = ReplenishmentPolicy {
            average_daily_sales: 2.0,
            lead_time_days: 7.0,
        };

        let events = [
            StockItemEvent::ProductTracked(ProductTracked {
                tenant_id,
                item_id,
                product_id: ProductId::new(AggregateId::new()),
                name: "Hinge".to_string(),
                initial_quantity: 0,
                policy: policy.clone(),
                occurred_at: Utc::now(),
            }),
            StockItemEvent::ReplenishmentPolicySet(ReplenishmentPolicySet {
                tenant_id,
                item_id,
                policy,
                occurred_at: Utc::now(),
            }),
            StockItemEvent::StockReceived(StockReceived {
                tenant_id,
                item_id,
                quantity: 40,
                resulting_quantity: 40,
                reference: Some("po-1".to_string()),
                occurred_at: Utc::now(),
            }),
        ];

        for (i, ev) in events.iter().enumerate() {
            projection
                .apply_envelope(&envelope(tenant_id, item_id, (i + 1) as u64, ev))
                .unwrap();
        }

        let history = projection.for_item(tenant_id, &item_id);
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].kind, MovementKind::Received);
        assert_eq!(history[0].quantity, 40);
        assert_eq!(history[0].reference.as_deref(), Some("po-1"));
    }

    #[test]
    fn issues_are_recorded_as_negative_deltas() {
        let projection = StockMovementsProjection::new(InMemoryTenantStore::new());
        let tenant_id = TenantId::new();
        let item_id = StockItemId::new(AggregateId::new());

        let issued = StockItemEvent::StockIssued(StockIssued {
            tenant_id,
            item_id,
            quantity: 15,
            resulting_quantity: 85,
            reference: None,
            occurred_at: Utc::now(),
        });
        projection
            .apply_envelope(&envelope(tenant_id, item_id, 1, &issued))
            .unwrap();

        let history = projection.for_item(tenant_id, &item_id);
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].quantity, -15);
        assert_eq!(history[0].resulting_quantity, 85);
    }

    #[test]
    fn duplicate_delivery_does_not_double_log() {
        let projection = StockMovementsProjection::new(InMemoryTenantStore::new());
        let tenant_id = TenantId::new();
        let item_id = StockItemId::new(AggregateId::new());

        let received = StockItemEvent::StockReceived(StockReceived {
            tenant_id,
            item_id,
            quantity: 5,
            resulting_quantity: 5,
            reference: None,
            occurred_at: Utc::now(),
        });
        let env = envelope(tenant_id, item_id, 1, &received);

        projection.apply_envelope(&env).unwrap();
        projection.apply_envelope(&env).unwrap();

        assert_eq!(projection.for_item(tenant_id, &item_id).len(), 1);
    }
}
