//! Infrastructure layer: event persistence, projections, advisory runners.
//!
//! Everything here is tenant-aware plumbing around the domain crates. The
//! event store is the single source of truth; projections and read models
//! are disposable derivatives; advisory runners consume read models and
//! never write back into the domain.

pub mod advisor;
pub mod command_dispatcher;
pub mod event_store;
pub mod projections;
pub mod read_model;


pub use command_dispatcher::{CommandDispatcher, DispatchError};
pub use event_store::{
    EventFilter, EventQuery, EventQueryResult, EventStore, EventStoreError, InMemoryEventStore,
    Pagination, PostgresEventStore, StoredEvent, UncommittedEvent,
};
pub use read_model::{InMemoryTenantStore, PostgresStockStore, TenantStore};
