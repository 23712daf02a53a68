//! Suppliers domain module (event-sourced).
//!
//! This crate contains business rules for suppliers, implemented purely as
//! deterministic domain logic (no IO, no HTTP, no storage).

pub mod supplier;

pub use supplier::{
    ContactInfo, RegisterSupplier, ReinstateSupplier, SetLeadTime, Supplier, SupplierCommand,
    SupplierContactUpdated, SupplierEvent, SupplierId, SupplierLeadTimeSet, SupplierRegistered,
    SupplierReinstated, SupplierStatus, SupplierSuspended, SuspendSupplier, UpdateContact,
};
