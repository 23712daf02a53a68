//! Advisory runner adapters (background advice generation).
//!
//! These components re-run advisory jobs on a schedule or after projection
//! updates. Failures are isolated and must not impact command handling.

pub mod reorder_runner;

pub use reorder_runner::{
    AdviceSink, InMemoryAdviceSink, ReorderAdvisorRunner, ReorderAdvisorRunnerHandle,
};
