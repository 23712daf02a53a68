//! Projections: event consumers that maintain the read models.
//!
//! Every projection here follows the same contract:
//! - only envelopes of its own aggregate type are considered
//! - a per-stream cursor makes application idempotent under at-least-once
//!   delivery and rejects sequence gaps
//! - payload tenant and aggregate ids must agree with the envelope
//! - `rebuild_from_scratch` clears affected tenants and replays in
//!   deterministic order, so a rebuilt read model is byte-for-byte stable

pub mod cursor_store;

pub mod categories;
pub mod movements;
pub mod products;
pub mod purchasing;
pub mod stock_levels;
pub mod suppliers;

pub use cursor_store::{InMemoryCursorStore, PostgresCursorStore, ProjectionCursorStore};

pub use categories::{CategoryDirectoryProjection, CategoryProjectionError, CategoryReadModel};
pub use movements::{MovementProjectionError, MovementRecord, StockMovementsProjection};
pub use products::{ProductCatalogProjection, ProductProjectionError, ProductReadModel};
pub use purchasing::{
    PurchaseOrderProjectionError, PurchaseOrderReadModel, PurchaseOrdersProjection,
};
pub use stock_levels::{StockItemReadModel, StockLevelProjectionError, StockLevelsProjection};
pub use suppliers::{SupplierDirectoryProjection, SupplierProjectionError, SupplierReadModel};
