use serde::{Deserialize, Serialize};

use stockpilot_core::TenantId;

use crate::advice::{Advice, AdvisorError};
use crate::job::AdvisorJob;

/// Tenant scope for execution.
///
/// - `Any`: run jobs for any tenant (useful for shared workers).
/// - `Tenant`: only accept jobs for the specified tenant (single-tenant worker).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TenantScope {
    Any,
    Tenant(TenantId),
}

impl TenantScope {
    pub fn allows(&self, tenant_id: TenantId) -> bool {
        match self {
            TenantScope::Any => true,
            TenantScope::Tenant(t) => *t == tenant_id,
        }
    }
}

/// Scheduler/executor for advisory jobs.
///
/// Intentionally minimal and storage/runtime agnostic.
pub trait AdvisorScheduler: Send + Sync + 'static {
    fn scope(&self) -> TenantScope;

    fn run<J: AdvisorJob>(&self, job: J) -> Result<Vec<Advice>, AdvisorError> {
        if !self.scope().allows(job.tenant_id()) {
            return Err(AdvisorError::InvalidInput(
                "tenant scope violation (job tenant not allowed by scheduler)".to_string(),
            ));
        }
        job.run()
    }
}

/// Simple synchronous scheduler that runs jobs immediately in-process.
#[derive(Debug, Copy, Clone)]
pub struct LocalAdvisorScheduler {
    scope: TenantScope,
}

impl LocalAdvisorScheduler {
    pub fn new(scope: TenantScope) -> Self {
        Self { scope }
    }

    pub fn for_tenant(tenant_id: TenantId) -> Self {
        Self::new(TenantScope::Tenant(tenant_id))
    }
}

impl AdvisorScheduler for LocalAdvisorScheduler {
    fn scope(&self) -> TenantScope {
        self.scope
    }
}

/// Snapshot of one tracked stock item, taken from the stock read model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockItemSnapshot {
    pub item_id: String,
    pub product_id: String,
    pub name: String,
    pub quantity: i64,
    pub average_daily_sales: f64,
    pub lead_time_days: f64,
}

/// Snapshot of a tenant's tracked stock, input to the reorder advisor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockSnapshot {
    pub tenant_id: TenantId,
    pub items: Vec<StockItemSnapshot>,
}

/// Read-side access used by advisory runners.
///
/// Kept minimal so this crate stays storage-agnostic: infra adapts its
/// projections onto this trait. `S` is the snapshot type a given runner
/// needs (e.g. [`StockSnapshot`] for the reorder runner).
pub trait ReadModelReader<S>: Send + Sync {
    type Error: std::fmt::Debug + Send;

    fn get_snapshot(&self, tenant_id: TenantId) -> Result<S, Self::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advice::Advice;

    struct NoopJob {
        tenant_id: TenantId,
    }

    impl AdvisorJob for NoopJob {
        type Input = ();

        fn tenant_id(&self) -> TenantId {
            self.tenant_id
        }

        fn input(&self) -> &Self::Input {
            &()
        }

        fn run(&self) -> Result<Vec<Advice>, AdvisorError> {
            Ok(vec![Advice::new(self.tenant_id, "noop", 0.0, 1.0)])
        }
    }

    #[test]
    fn tenant_scoped_scheduler_rejects_foreign_jobs() {
        let own = TenantId::new();
        let scheduler = LocalAdvisorScheduler::for_tenant(own);

        let foreign = NoopJob {
            tenant_id: TenantId::new(),
        };
        let err = scheduler.run(foreign).unwrap_err();
        match err {
            AdvisorError::InvalidInput(msg) => assert!(msg.contains("tenant scope violation")),
            _ => panic!("Expected InvalidInput for foreign tenant"),
        }

        let ours = NoopJob { tenant_id: own };
        let advice = scheduler.run(ours).unwrap();
        assert_eq!(advice.len(), 1);
    }

    #[test]
    fn any_scope_allows_every_tenant() {
        let scheduler = LocalAdvisorScheduler::new(TenantScope::Any);
        let job = NoopJob {
            tenant_id: TenantId::new(),
        };
        assert!(scheduler.run(job).is_ok());
    }
}
