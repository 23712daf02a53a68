//! Purchasing domain module (purchase orders, event-sourced).
//!
//! Business rules for the procurement lifecycle, implemented purely as
//! deterministic domain logic (no IO, no HTTP, no storage). Goods receipts
//! carry enough detail for the application layer to post matching stock
//! movements in inventory.

pub mod order;

pub use order::{
    AddLine, Approve, CancelOrder, CreatePurchaseOrder, GoodsReceived, LineItem, PurchaseOrder,
    PurchaseOrderApproved, PurchaseOrderCancelled, PurchaseOrderCommand, PurchaseOrderCreated,
    PurchaseOrderEvent, PurchaseOrderId, PurchaseOrderLineAdded, PurchaseOrderStatus, ReceiveGoods,
};
