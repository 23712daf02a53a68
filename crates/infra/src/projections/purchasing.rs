//! Purchase order read model.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde_json::Value as JsonValue;
use thiserror::Error;

use stockpilot_core::{AggregateId, TenantId};
use stockpilot_events::EventEnvelope;
use stockpilot_purchasing::{LineItem, PurchaseOrderEvent, PurchaseOrderId, PurchaseOrderStatus};
use stockpilot_suppliers::SupplierId;

use crate::projections::cursor_store::{InMemoryCursorStore, ProjectionCursorStore};
use crate::read_model::TenantStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseOrderReadModel {
    pub order_id: PurchaseOrderId,
    pub supplier_id: SupplierId,
    pub status: PurchaseOrderStatus,
    pub lines: Vec<LineItem>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
struct CursorKey {
    tenant_id: TenantId,
    aggregate_id: AggregateId,
}

#[derive(Debug, Error)]
pub enum PurchaseOrderProjectionError {
    #[error("failed to deserialize purchase order event: {0}")]
    Deserialize(String),

    #[error("tenant isolation violation: {0}")]
    TenantIsolation(String),

    #[error("non-monotonic sequence number (last={last}, found={found})")]
    NonMonotonicSequence { last: u64, found: u64 },
}

#[derive(Debug)]
pub struct PurchaseOrdersProjection<S, C = InMemoryCursorStore>
where
    S: TenantStore<PurchaseOrderId, PurchaseOrderReadModel>,
{
    store: S,
    cursors: RwLock<HashMap<CursorKey, u64>>,
    cursor_store: Option<Arc<C>>,
    projection_name: String,
}

impl<S> PurchaseOrdersProjection<S>
where
    S: TenantStore<PurchaseOrderId, PurchaseOrderReadModel>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            cursors: RwLock::new(HashMap::new()),
            cursor_store: None,
            projection_name: "purchasing.orders".to_string(),
        }
    }

    pub fn with_persistent_cursors<C: ProjectionCursorStore + 'static>(
        self,
        cursor_store: Arc<C>,
        projection_name: impl Into<String>,
    ) -> PurchaseOrdersProjection<S, C> {
        PurchaseOrdersProjection {
            store: self.store,
            cursors: RwLock::new(HashMap::new()),
            cursor_store: Some(cursor_store),
            projection_name: projection_name.into(),
        }
    }
}

impl<S, C> PurchaseOrdersProjection<S, C>
where
    S: TenantStore<PurchaseOrderId, PurchaseOrderReadModel>,
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

    pub fn get(&self, tenant_id: TenantId, order_id: &PurchaseOrderId) -> Option<PurchaseOrderReadModel> {
        self.store.get(tenant_id, order_id)
    }

    pub fn list(&self, tenant_id: TenantId) -> Vec<PurchaseOrderReadModel> {
        self.store.list(tenant_id)
    }

    pub fn apply_envelope(
        &self,
        envelope: &EventEnvelope<JsonValue>,
    ) -> Result<(), PurchaseOrderProjectionError> {
        if envelope.aggregate_type() != "purchasing.order" {
            return Ok(());
        }

        let tenant_id = envelope.tenant_id();
        let aggregate_id = envelope.aggregate_id();
        let seq = envelope.sequence_number();

        let last = self.get_cursor(tenant_id, aggregate_id);
        if seq == 0 {
            return Err(PurchaseOrderProjectionError::NonMonotonicSequence { last, found: seq });
        }
        if seq <= last {
            return Ok(());
        }
        if seq != last + 1 && last != 0 {
            return Err(PurchaseOrderProjectionError::NonMonotonicSequence { last, found: seq });
        }

        let ev: PurchaseOrderEvent = serde_json::from_value(envelope.payload().clone())
            .map_err(|e| PurchaseOrderProjectionError::Deserialize(e.to_string()))?;

        let (event_tenant, order_id) = match &ev {
            PurchaseOrderEvent::PurchaseOrderCreated(e) => (e.tenant_id, e.order_id),
            PurchaseOrderEvent::PurchaseOrderLineAdded(e) => (e.tenant_id, e.order_id),
            PurchaseOrderEvent::PurchaseOrderApproved(e) => (e.tenant_id, e.order_id),
            PurchaseOrderEvent::GoodsReceived(e) => (e.tenant_id, e.order_id),
            PurchaseOrderEvent::PurchaseOrderCancelled(e) => (e.tenant_id, e.order_id),
        };

        if event_tenant != tenant_id {
            return Err(PurchaseOrderProjectionError::TenantIsolation(
                "event tenant_id does not match envelope tenant_id".to_string(),
            ));
        }
        if order_id.0 != aggregate_id {
            return Err(PurchaseOrderProjectionError::TenantIsolation(
                "event order_id does not match envelope aggregate_id".to_string(),
            ));
        }

        match ev {
            PurchaseOrderEvent::PurchaseOrderCreated(e) => {
                self.store.upsert(
                    tenant_id,
                    e.order_id,
                    PurchaseOrderReadModel {
                        order_id: e.order_id,
                        supplier_id: e.supplier_id,
                        status: PurchaseOrderStatus::Draft,
                        lines: vec![],
                    },
                );
            }
            PurchaseOrderEvent::PurchaseOrderLineAdded(e) => {
                if let Some(mut rm) = self.store.get(tenant_id, &e.order_id) {
                    rm.lines.push(LineItem {
                        line_no: e.line_no,
                        product_id: e.product_id,
                        quantity: e.quantity,
                    });
                    self.store.upsert(tenant_id, e.order_id, rm);
                }
            }
            PurchaseOrderEvent::PurchaseOrderApproved(e) => {
                if let Some(mut rm) = self.store.get(tenant_id, &e.order_id) {
                    rm.status = PurchaseOrderStatus::Approved;
                    self.store.upsert(tenant_id, e.order_id, rm);
                }
            }
            PurchaseOrderEvent::GoodsReceived(e) => {
                if let Some(mut rm) = self.store.get(tenant_id, &e.order_id) {
                    rm.status = PurchaseOrderStatus::Received;
                    rm.lines = e.lines;
                    self.store.upsert(tenant_id, e.order_id, rm);
                }
            }
            PurchaseOrderEvent::PurchaseOrderCancelled(e) => {
                if let Some(mut rm) = self.store.get(tenant_id, &e.order_id) {
                    rm.status = PurchaseOrderStatus::Cancelled;
                    self.store.upsert(tenant_id, e.order_id, rm);
                }
            }
        }

        self.update_cursor(tenant_id, aggregate_id, seq);
        Ok(())
    }

    pub fn rebuild_from_scratch(
        &self,
        envelopes: impl IntoIterator<Item = EventEnvelope<JsonValue>>,
    ) -> Result<(), PurchaseOrderProjectionError> {
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
