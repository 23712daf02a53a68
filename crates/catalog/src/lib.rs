//! Catalog domain module (products and categories, event-sourced).
//!
//! This crate contains business rules for the product catalog, implemented
//! purely as deterministic domain logic (no IO, no HTTP, no storage).

pub mod category;
pub mod product;

pub use category::{
    ArchiveCategory, Category, CategoryArchived, CategoryCommand, CategoryCreated, CategoryEvent,
    CategoryId, CategoryRenamed, CategoryStatus, CreateCategory, RenameCategory,
};
pub use product::{
    ActivateProduct, ArchiveProduct, AssignCategory, CreateProduct, PricingMetadata, Product,
    ProductActivated, ProductArchived, ProductAttributesSet, ProductCategoryAssigned,
    ProductCommand, ProductCreated, ProductDetailsUpdated, ProductEvent, ProductId,
    ProductPricingSet, ProductStatus, SetAttributes, SetPricing, UpdateDetails,
};
