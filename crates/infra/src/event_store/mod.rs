//! Append-only event store boundary.
//!
//! Storage-agnostic trait plus the two backends the application selects
//! between at startup: in-memory (tests/dev) and Postgres (persistent).
//! The read-only [`EventQuery`] interface backs the event inspection API.

pub mod in_memory;
pub mod postgres;
pub mod query;
pub mod r#trait;

pub use in_memory::InMemoryEventStore;
pub use postgres::PostgresEventStore;
pub use query::{EventFilter, EventQuery, EventQueryResult, Pagination};
pub use r#trait::{EventStore, EventStoreError, StoredEvent, UncommittedEvent};
