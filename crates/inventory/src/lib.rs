//! Inventory domain module (event-sourced).
//!
//! This crate contains business rules for stock items and their movements,
//! implemented purely as deterministic domain logic (no IO, no HTTP, no
//! storage).

pub mod stock_item;

pub use stock_item::{
    CorrectStock, IssueStock, MovementKind, ProductTracked, ReceiveStock, ReplenishmentPolicy,
    ReplenishmentPolicySet, SetReplenishmentPolicy, StockCorrected, StockIssued, StockItem,
    StockItemCommand, StockItemEvent, StockItemId, StockReceived, TrackProduct,
};
