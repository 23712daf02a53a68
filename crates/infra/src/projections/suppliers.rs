//! Supplier directory read model.
//!
//! The directory backs supplier listings and the lead-time lookup used when
//! stock items inherit a default replenishment policy.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde_json::Value as JsonValue;
use thiserror::Error;

use stockpilot_core::{AggregateId, TenantId};
use stockpilot_events::EventEnvelope;
use stockpilot_suppliers::{ContactInfo, SupplierEvent, SupplierId, SupplierStatus};

use crate::projections::cursor_store::{InMemoryCursorStore, ProjectionCursorStore};
use crate::read_model::TenantStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupplierReadModel {
    pub supplier_id: SupplierId,
    pub name: String,
    pub contact: ContactInfo,
    pub lead_time_days: u32,
    pub status: SupplierStatus,
}

impl SupplierReadModel {
    fn blank(supplier_id: SupplierId) -> Self {
        Self {
            supplier_id,
            name: String::new(),
            contact: ContactInfo::default(),
            lead_time_days: 0,
            status: SupplierStatus::Active,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
struct CursorKey {
    tenant_id: TenantId,
    aggregate_id: AggregateId,
}

#[derive(Debug, Error)]
pub enum SupplierProjectionError {
    #[error("failed to deserialize supplier event: {0}")]
    Deserialize(String),

    #[error("tenant isolation violation: {0}")]
    TenantIsolation(String),

    #[error("non-monotonic sequence number (last={last}, found={found})")]
    NonMonotonicSequence { last: u64, found: u64 },
}

#[derive(Debug)]
pub struct SupplierDirectoryProjection<S, C = InMemoryCursorStore>
where
    S: TenantStore<SupplierId, SupplierReadModel>,
{
    store: S,
    cursors: RwLock<HashMap<CursorKey, u64>>,
    cursor_store: Option<Arc<C>>,
    projection_name: String,
}

impl<S> SupplierDirectoryProjection<S>
where
    S: TenantStore<SupplierId, SupplierReadModel>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            cursors: RwLock::new(HashMap::new()),
            cursor_store: None,
            projection_name: "suppliers.directory".to_string(),
        }
    }

    pub fn with_persistent_cursors<C: ProjectionCursorStore + 'static>(
        self,
        cursor_store: Arc<C>,
        projection_name: impl Into<String>,
    ) -> SupplierDirectoryProjection<S, C> {
        SupplierDirectoryProjection {
            store: self.store,
            cursors: RwLock::new(HashMap::new()),
            cursor_store: Some(cursor_store),
            projection_name: projection_name.into(),
        }
    }
}

impl<S, C> SupplierDirectoryProjection<S, C>
where
    S: TenantStore<SupplierId, SupplierReadModel>,
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

    pub fn get(&self, tenant_id: TenantId, supplier_id: &SupplierId) -> Option<SupplierReadModel> {
        self.store.get(tenant_id, supplier_id)
    }

    pub fn list(&self, tenant_id: TenantId) -> Vec<SupplierReadModel> {
        self.store.list(tenant_id)
    }

    pub fn apply_envelope(
        &self,
        envelope: &EventEnvelope<JsonValue>,
    ) -> Result<(), SupplierProjectionError> {
        if envelope.aggregate_type() != "suppliers.supplier" {
            return Ok(());
        }

        let tenant_id = envelope.tenant_id();
        let aggregate_id = envelope.aggregate_id();
        let seq = envelope.sequence_number();

        let last = self.get_cursor(tenant_id, aggregate_id);
        if seq == 0 {
            return Err(SupplierProjectionError::NonMonotonicSequence { last, found: seq });
        }
        if seq <= last {
            return Ok(());
        }
        if seq != last + 1 && last != 0 {
            return Err(SupplierProjectionError::NonMonotonicSequence { last, found: seq });
        }

        let ev: SupplierEvent = serde_json::from_value(envelope.payload().clone())
            .map_err(|e| SupplierProjectionError::Deserialize(e.to_string()))?;

        let (event_tenant, supplier_id) = match &ev {
            SupplierEvent::SupplierRegistered(e) => (e.tenant_id, e.supplier_id),
            SupplierEvent::SupplierContactUpdated(e) => (e.tenant_id, e.supplier_id),
            SupplierEvent::SupplierLeadTimeSet(e) => (e.tenant_id, e.supplier_id),
            SupplierEvent::SupplierSuspended(e) => (e.tenant_id, e.supplier_id),
            SupplierEvent::SupplierReinstated(e) => (e.tenant_id, e.supplier_id),
        };

        if event_tenant != tenant_id {
            return Err(SupplierProjectionError::TenantIsolation(
                "event tenant_id does not match envelope tenant_id".to_string(),
            ));
        }
        if supplier_id.0 != aggregate_id {
            return Err(SupplierProjectionError::TenantIsolation(
                "event supplier_id does not match envelope aggregate_id".to_string(),
            ));
        }

        match ev {
            SupplierEvent::SupplierRegistered(e) => {
                self.store.upsert(
                    tenant_id,
                    e.supplier_id,
                    SupplierReadModel {
                        supplier_id: e.supplier_id,
                        name: e.name,
                        contact: e.contact,
                        lead_time_days: e.lead_time_days,
                        status: SupplierStatus::Active,
                    },
                );
            }
            SupplierEvent::SupplierContactUpdated(e) => {
                let mut rm = self
                    .store
                    .get(tenant_id, &e.supplier_id)
                    .unwrap_or_else(|| SupplierReadModel::blank(e.supplier_id));
                rm.name = e.name;
                rm.contact = e.contact;
                self.store.upsert(tenant_id, e.supplier_id, rm);
            }
            SupplierEvent::SupplierLeadTimeSet(e) => {
                let mut rm = self
                    .store
                    .get(tenant_id, &e.supplier_id)
                    .unwrap_or_else(|| SupplierReadModel::blank(e.supplier_id));
                rm.lead_time_days = e.lead_time_days;
                self.store.upsert(tenant_id, e.supplier_id, rm);
            }
            SupplierEvent::SupplierSuspended(e) => {
                let mut rm = self
                    .store
                    .get(tenant_id, &e.supplier_id)
                    .unwrap_or_else(|| SupplierReadModel::blank(e.supplier_id));
                rm.status = SupplierStatus::Suspended;
                self.store.upsert(tenant_id, e.supplier_id, rm);
            }
            SupplierEvent::SupplierReinstated(e) => {
                let mut rm = self
                    .store
                    .get(tenant_id, &e.supplier_id)
                    .unwrap_or_else(|| SupplierReadModel::blank(e.supplier_id));
                rm.status = SupplierStatus::Active;
                self.store.upsert(tenant_id, e.supplier_id, rm);
            }
        }

        self.update_cursor(tenant_id, aggregate_id, seq);
        Ok(())
    }

    pub fn rebuild_from_scratch(
        &self,
        envelopes: impl IntoIterator<Item = EventEnvelope<JsonValue>>,
    ) -> Result<(), SupplierProjectionError> {
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
