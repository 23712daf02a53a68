use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, RwLock};

use stockpilot_core::TenantId;

/// Tenant-partitioned key/value storage for read models.
///
/// Read models are disposable: they can always be rebuilt from the event
/// stream, so implementations only need last-write-wins semantics. Every
/// operation takes the tenant explicitly; an implementation must never leak
/// a value across tenants, whatever its backing storage.
pub trait TenantStore<K, V>: Send + Sync {
    fn get(&self, tenant_id: TenantId, key: &K) -> Option<V>;
    fn upsert(&self, tenant_id: TenantId, key: K, value: V);
    fn list(&self, tenant_id: TenantId) -> Vec<V>;
    /// Drop every record for the tenant, used before a projection rebuild.
    fn clear_tenant(&self, tenant_id: TenantId);
}

impl<K, V, S> TenantStore<K, V> for Arc<S>
where
    S: TenantStore<K, V> + ?Sized,
{
    fn get(&self, tenant_id: TenantId, key: &K) -> Option<V> {
        (**self).get(tenant_id, key)
    }

    fn upsert(&self, tenant_id: TenantId, key: K, value: V) {
        (**self).upsert(tenant_id, key, value)
    }

    fn list(&self, tenant_id: TenantId) -> Vec<V> {
        (**self).list(tenant_id)
    }

    fn clear_tenant(&self, tenant_id: TenantId) {
        (**self).clear_tenant(tenant_id)
    }
}

/// In-memory store keyed by `(tenant, key)`, for dev mode and tests.
///
/// Lock poisoning degrades to "not found" / no-op rather than panicking;
/// a stale read model is already an accepted state of this layer.
#[derive(Debug)]
pub struct InMemoryTenantStore<K, V> {
    inner: RwLock<HashMap<(TenantId, K), V>>,
}

impl<K, V> InMemoryTenantStore<K, V> {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }
}

impl<K, V> Default for InMemoryTenantStore<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> TenantStore<K, V> for InMemoryTenantStore<K, V>
where
    K: Clone + Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn get(&self, tenant_id: TenantId, key: &K) -> Option<V> {
        let map = self.inner.read().ok()?;
        map.get(&(tenant_id, key.clone())).cloned()
    }

    fn upsert(&self, tenant_id: TenantId, key: K, value: V) {
        if let Ok(mut map) = self.inner.write() {
            map.insert((tenant_id, key), value);
        }
    }

    fn list(&self, tenant_id: TenantId) -> Vec<V> {
        let map = match self.inner.read() {
            Ok(m) => m,
            Err(_) => return vec![],
        };

        map.iter()
            .filter_map(|((t, _k), v)| if *t == tenant_id { Some(v.clone()) } else { None })
            .collect()
    }

    fn clear_tenant(&self, tenant_id: TenantId) {
        if let Ok(mut map) = self.inner.write() {
            map.retain(|(t, _k), _v| *t != tenant_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsert_then_get_roundtrips_within_a_tenant() {
        let store: InMemoryTenantStore<&'static str, u32> = InMemoryTenantStore::new();
        let tenant = TenantId::new();

        store.upsert(tenant, "widget", 3);
        store.upsert(tenant, "widget", 7);

        assert_eq!(store.get(tenant, &"widget"), Some(7));
        assert_eq!(store.get(tenant, &"gizmo"), None);
    }

    #[test]
    fn list_and_clear_respect_tenant_boundaries() {
        let store: InMemoryTenantStore<&'static str, u32> = InMemoryTenantStore::new();
        let tenant_a = TenantId::new();
        let tenant_b = TenantId::new();

        store.upsert(tenant_a, "widget", 1);
        store.upsert(tenant_a, "gizmo", 2);
        store.upsert(tenant_b, "widget", 9);

        assert_eq!(store.list(tenant_a).len(), 2);
        assert_eq!(store.list(tenant_b), vec![9]);

        store.clear_tenant(tenant_a);

        assert!(store.list(tenant_a).is_empty());
        assert_eq!(store.get(tenant_b, &"widget"), Some(9));
    }
}
