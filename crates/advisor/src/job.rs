use stockpilot_core::TenantId;

use crate::advice::{Advice, AdvisorError};

/// A tenant-scoped advisory unit.
///
/// Jobs consume **snapshots** of read-side state via their `Input` type.
/// This crate stays storage-agnostic: inputs are provided by callers
/// (infra/API), outputs are plain `Advice` values.
pub trait AdvisorJob: Send + Sync + 'static {
    type Input: Send + Sync + 'static;

    /// The tenant this job belongs to (tenant-safe execution model).
    fn tenant_id(&self) -> TenantId;

    /// The input snapshot the job will run on.
    fn input(&self) -> &Self::Input;

    /// Execute the job and return its advice.
    ///
    /// Must not mutate domain state. Deterministic: the same input must
    /// always yield the same advice.
    fn run(&self) -> Result<Vec<Advice>, AdvisorError>;
}
