//! Tenant-isolated read model storage.

pub mod postgres;
pub mod tenant_store;

pub use postgres::PostgresStockStore;
pub use tenant_store::{InMemoryTenantStore, TenantStore};
