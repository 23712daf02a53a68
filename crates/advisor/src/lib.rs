//! `stockpilot-advisor`
//!
//! **Responsibility:** Deterministic advisory subsystem boundary.
//!
//! This crate is intentionally **not** part of the domain model:
//! - It must not depend on domain aggregates (catalog/inventory/etc).
//! - It must not mutate domain state.
//! - It emits **advice**, not domain events.
//!
//! Every job in here is a pure function of its input snapshot: same
//! snapshot, same advice. There is no model call and no network IO.

pub mod advice;
pub mod assessment;
pub mod attributes;
pub mod description;
pub mod job;
pub mod reorder;
pub mod scheduler;
pub mod strategy;

pub use advice::{Advice, AdvisorError};
pub use assessment::{assess, StockAssessmentInput, StockAssessmentResult};
pub use attributes::{map_attribute, AttributeMapperJob, AttributeMapping, AttributeMappingInput, MatchKind};
pub use description::{DescriptionAdvisorJob, ProductSnapshot};
pub use job::AdvisorJob;
pub use reorder::ReorderAdvisorJob;
pub use scheduler::{
    AdvisorScheduler, LocalAdvisorScheduler, ReadModelReader, StockItemSnapshot, StockSnapshot,
    TenantScope,
};
pub use strategy::{default_rules, BusinessSnapshot, StrategyAdvisorJob, StrategyRule};
