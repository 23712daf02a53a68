//! Category directory read model.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde_json::Value as JsonValue;
use thiserror::Error;

use stockpilot_catalog::{CategoryEvent, CategoryId, CategoryStatus};
use stockpilot_core::{AggregateId, TenantId};
use stockpilot_events::EventEnvelope;

use crate::projections::cursor_store::{InMemoryCursorStore, ProjectionCursorStore};
use crate::read_model::TenantStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryReadModel {
    pub category_id: CategoryId,
    pub name: String,
    pub description: String,
    pub status: CategoryStatus,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
struct CursorKey {
    tenant_id: TenantId,
    aggregate_id: AggregateId,
}

#[derive(Debug, Error)]
pub enum CategoryProjectionError {
    #[error("failed to deserialize category event: {0}")]
    Deserialize(String),

    #[error("tenant isolation violation: {0}")]
    TenantIsolation(String),

    #[error("non-monotonic sequence number (last={last}, found={found})")]
    NonMonotonicSequence { last: u64, found: u64 },
}

#[derive(Debug)]
pub struct CategoryDirectoryProjection<S, C = InMemoryCursorStore>
where
    S: TenantStore<CategoryId, CategoryReadModel>,
{
    store: S,
    cursors: RwLock<HashMap<CursorKey, u64>>,
    cursor_store: Option<Arc<C>>,
    projection_name: String,
}

impl<S> CategoryDirectoryProjection<S>
where
    S: TenantStore<CategoryId, CategoryReadModel>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            cursors: RwLock::new(HashMap::new()),
            cursor_store: None,
            projection_name: "catalog.categories".to_string(),
        }
    }

    pub fn with_persistent_cursors<C: ProjectionCursorStore + 'static>(
        self,
        cursor_store: Arc<C>,
        projection_name: impl Into<String>,
    ) -> CategoryDirectoryProjection<S, C> {
        CategoryDirectoryProjection {
            store: self.store,
            cursors: RwLock::new(HashMap::new()),
            cursor_store: Some(cursor_store),
            projection_name: projection_name.into(),
        }
    }
}

impl<S, C> CategoryDirectoryProjection<S, C>
where
    S: TenantStore<CategoryId, CategoryReadModel>,
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

    pub fn get(&self, tenant_id: TenantId, category_id: &CategoryId) -> Option<CategoryReadModel> {
        self.store.get(tenant_id, category_id)
    }

    pub fn list(&self, tenant_id: TenantId) -> Vec<CategoryReadModel> {
        self.store.list(tenant_id)
    }

    pub fn apply_envelope(
        &self,
        envelope: &EventEnvelope<JsonValue>,
    ) -> Result<(), CategoryProjectionError> {
        if envelope.aggregate_type() != "catalog.category" {
            return Ok(());
        }

        let tenant_id = envelope.tenant_id();
        let aggregate_id = envelope.aggregate_id();
        let seq = envelope.sequence_number();

        let last = self.get_cursor(tenant_id, aggregate_id);
        if seq == 0 {
            return Err(CategoryProjectionError::NonMonotonicSequence { last, found: seq });
        }
        if seq <= last {
            return Ok(());
        }
        if seq != last + 1 && last != 0 {
            return Err(CategoryProjectionError::NonMonotonicSequence { last, found: seq });
        }

        let ev: CategoryEvent = serde_json::from_value(envelope.payload().clone())
            .map_err(|e| CategoryProjectionError::Deserialize(e.to_string()))?;

        let (event_tenant, category_id) = match &ev {
            CategoryEvent::CategoryCreated(e) => (e.tenant_id, e.category_id),
            CategoryEvent::CategoryRenamed(e) => (e.tenant_id, e.category_id),
            CategoryEvent::CategoryArchived(e) => (e.tenant_id, e.category_id),
        };

        if event_tenant != tenant_id {
            return Err(CategoryProjectionError::TenantIsolation(
                "event tenant_id does not match envelope tenant_id".to_string(),
            ));
        }
        if category_id.0 != aggregate_id {
            return Err(CategoryProjectionError::TenantIsolation(
                "event category_id does not match envelope aggregate_id".to_string(),
            ));
        }

        match ev {
            CategoryEvent::CategoryCreated(e) => {
                self.store.upsert(
                    tenant_id,
                    e.category_id,
                    CategoryReadModel {
                        category_id: e.category_id,
                        name: e.name,
                        description: e.description,
                        status: CategoryStatus::Active,
                    },
                );
            }
            CategoryEvent::CategoryRenamed(e) => {
                let mut rm = self.store.get(tenant_id, &e.category_id).unwrap_or(CategoryReadModel {
                    category_id: e.category_id,
                    name: String::new(),
                    description: String::new(),
                    status: CategoryStatus::Active,
                });
                rm.name = e.name;
                self.store.upsert(tenant_id, e.category_id, rm);
            }
            CategoryEvent::CategoryArchived(e) => {
                let mut rm = self.store.get(tenant_id, &e.category_id).unwrap_or(CategoryReadModel {
                    category_id: e.category_id,
                    name: String::new(),
                    description: String::new(),
                    status: CategoryStatus::Active,
                });
                rm.status = CategoryStatus::Archived;
                self.store.upsert(tenant_id, e.category_id, rm);
            }
        }

        self.update_cursor(tenant_id, aggregate_id, seq);
        Ok(())
    }

    pub fn rebuild_from_scratch(
        &self,
        envelopes: impl IntoIterator<Item = EventEnvelope<JsonValue>>,
    ) -> Result<(), CategoryProjectionError> {
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
