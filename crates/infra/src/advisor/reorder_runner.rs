use std::sync::{mpsc, Arc};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{info, warn};

use stockpilot_advisor::{
    Advice, AdvisorScheduler, LocalAdvisorScheduler, ReadModelReader, ReorderAdvisorJob,
    StockSnapshot,
};
use stockpilot_core::TenantId;

/// Sink for advisory output.
///
/// Deliberately separate from the domain event stream: advice is derived
/// commentary on the read models, not a domain fact, so it never enters the
/// event store.
pub trait AdviceSink: Send + Sync + 'static {
    fn emit(&self, tenant_id: TenantId, advice: Vec<Advice>);
}

/// In-memory sink for tests/dev. Keeps every batch in emit order.
#[derive(Debug, Default)]
pub struct InMemoryAdviceSink {
    inner: std::sync::Mutex<Vec<(TenantId, Vec<Advice>)>>,
}

impl InMemoryAdviceSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all(&self) -> Vec<(TenantId, Vec<Advice>)> {
        self.inner.lock().unwrap().clone()
    }

    /// Most recent batch for the tenant, if any run has completed.
    pub fn latest(&self, tenant_id: TenantId) -> Option<Vec<Advice>> {
        self.inner
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(t, _)| *t == tenant_id)
            .map(|(_, advice)| advice.clone())
    }
}

impl AdviceSink for InMemoryAdviceSink {
    fn emit(&self, tenant_id: TenantId, advice: Vec<Advice>) {
        self.inner.lock().unwrap().push((tenant_id, advice));
    }
}

/// Config for the reorder advisor runner.
#[derive(Debug, Clone)]
pub struct ReorderAdvisorRunner {
    pub interval: Duration,
    pub max_retries: u32,
    pub base_backoff: Duration,
}

impl Default for ReorderAdvisorRunner {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            max_retries: 5,
            base_backoff: Duration::from_millis(250),
        }
    }
}

/// Handle for a running reorder runner (shutdown + trigger hook).
#[derive(Debug)]
pub struct ReorderAdvisorRunnerHandle {
    shutdown: mpsc::Sender<()>,
    trigger: mpsc::SyncSender<()>,
    join: Option<thread::JoinHandle<()>>,
}

impl ReorderAdvisorRunnerHandle {
    /// Event-trigger hook: call after a stock projection update.
    ///
    /// Triggers are coalesced through a bounded queue; while a run is
    /// already pending this is a no-op.
    pub fn trigger(&self) {
        let _ = self.trigger.try_send(());
    }

    /// Gracefully stop the runner thread.
    pub fn shutdown(mut self) {
        let _ = self.shutdown.send(());
        if let Some(j) = self.join.take() {
            let _ = j.join();
        }
    }
}

impl ReorderAdvisorRunner {
    /// Spawn a tenant-scoped runner.
    ///
    /// - Schedule: runs once at startup, then every `interval`
    /// - Event-trigger: call `handle.trigger()` after projection updates
    /// - Failures: logged and retried with bounded exponential backoff;
    ///   they never propagate to the caller
    pub fn spawn_for_tenant<R, S>(
        &self,
        name: &'static str,
        tenant_id: TenantId,
        reader: Arc<R>,
        sink: Arc<S>,
    ) -> ReorderAdvisorRunnerHandle
    where
        R: ReadModelReader<StockSnapshot> + 'static,
        S: AdviceSink + 'static,
    {
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
        let (trigger_tx, trigger_rx) = mpsc::sync_channel::<()>(1);

        let cfg = self.clone();
        let join = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                runner_loop(name, tenant_id, cfg, shutdown_rx, trigger_rx, reader, sink)
            })
            .expect("failed to spawn reorder advisor runner thread");

        ReorderAdvisorRunnerHandle {
            shutdown: shutdown_tx,
            trigger: trigger_tx,
            join: Some(join),
        }
    }
}

fn runner_loop<R, S>(
    name: &'static str,
    tenant_id: TenantId,
    cfg: ReorderAdvisorRunner,
    shutdown_rx: mpsc::Receiver<()>,
    trigger_rx: mpsc::Receiver<()>,
    reader: Arc<R>,
    sink: Arc<S>,
) where
    R: ReadModelReader<StockSnapshot> + 'static,
    S: AdviceSink + 'static,
{
    info!(runner = name, tenant = %tenant_id, "reorder advisor runner started");

    let scheduler = LocalAdvisorScheduler::for_tenant(tenant_id);

    let mut next_tick = Instant::now() + cfg.interval;
    let mut pending = true; // run once on startup
    let mut failures: u32 = 0;
    let mut backoff_until: Option<Instant> = None;

    loop {
        // Shutdown has priority.
        if shutdown_rx.try_recv().is_ok() {
            break;
        }

        let now = Instant::now();
        if now >= next_tick {
            pending = true;
            // Keep a stable cadence even if we were delayed.
            while next_tick <= now {
                next_tick += cfg.interval;
            }
        }

        // Non-blocking drain so bursts of triggers coalesce into one run.
        while trigger_rx.try_recv().is_ok() {
            pending = true;
        }

        // Backoff gate.
        if let Some(until) = backoff_until {
            if Instant::now() < until {
                thread::sleep(Duration::from_millis(50));
                continue;
            }
            backoff_until = None;
        }

        if !pending {
            let sleep_for = next_tick
                .saturating_duration_since(Instant::now())
                .min(Duration::from_millis(250));
            thread::sleep(sleep_for);
            continue;
        }

        pending = false;

        let snapshot = match reader.get_snapshot(tenant_id) {
            Ok(s) => s,
            Err(e) => {
                warn!(runner = name, tenant = %tenant_id, error = ?e, "failed to read stock snapshot");
                failures += 1;
                if failures <= cfg.max_retries {
                    pending = true;
                    backoff_until = Some(Instant::now() + backoff(cfg.base_backoff, failures));
                } else {
                    failures = 0;
                }
                continue;
            }
        };

        let job = ReorderAdvisorJob::new(tenant_id, snapshot);

        match scheduler.run(job) {
            Ok(advice) => {
                failures = 0;
                sink.emit(tenant_id, advice);
            }
            Err(e) => {
                warn!(runner = name, tenant = %tenant_id, error = ?e, "reorder advisor job failed");
                failures += 1;
                if failures <= cfg.max_retries {
                    pending = true;
                    backoff_until = Some(Instant::now() + backoff(cfg.base_backoff, failures));
                } else {
                    failures = 0;
                }
            }
        }
    }

    info!(runner = name, tenant = %tenant_id, "reorder advisor runner stopped");
}

fn backoff(base: Duration, attempt: u32) -> Duration {
    // base * 2^(attempt-1), capped at 10s.
    let pow = 1u32 << attempt.saturating_sub(1).min(10);
    let ms = base.as_millis().saturating_mul(pow as u128);
    Duration::from_millis(ms.min(10_000) as u64)
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;

    use stockpilot_advisor::StockItemSnapshot;

    use super::*;

    struct FixedReader {
        snapshot: StockSnapshot,
    }

    impl ReadModelReader<StockSnapshot> for FixedReader {
        type Error = Infallible;

        fn get_snapshot(&self, _tenant_id: TenantId) -> Result<StockSnapshot, Self::Error> {
            Ok(self.snapshot.clone())
        }
    }

    #[test]
    fn startup_run_emits_reorder_advice() {
        let tenant_id = TenantId::new();
        let reader = Arc::new(FixedReader {
            snapshot: StockSnapshot {
                tenant_id,
                items: vec![StockItemSnapshot {
                    item_id: "item-1".to_string(),
                    product_id: "product-1".to_string(),
                    name: "Bolt M6".to_string(),
                    quantity: 50,
                    average_daily_sales: 5.0,
                    lead_time_days: 10.0,
                }],
            },
        });
        let sink = Arc::new(InMemoryAdviceSink::new());

        let handle = ReorderAdvisorRunner {
            interval: Duration::from_secs(60),
            ..Default::default()
        }
        .spawn_for_tenant("reorder-test", tenant_id, reader, sink.clone());

        let mut latest = None;
        for _ in 0..100 {
            latest = sink.latest(tenant_id);
            if latest.is_some() {
                break;
            }
            thread::sleep(Duration::from_millis(10));
        }
        handle.shutdown();

        // 50 on hand vs threshold 60: one item advice plus the summary.
        let advice = latest.expect("runner did not emit advice in time");
        assert_eq!(advice.len(), 2);
        assert_eq!(advice[0].score, 90.0);
        assert_eq!(advice[1].score, 1.0);
    }

    #[test]
    fn backoff_grows_and_caps() {
        let base = Duration::from_millis(250);
        assert_eq!(backoff(base, 1), Duration::from_millis(250));
        assert_eq!(backoff(base, 2), Duration::from_millis(500));
        assert_eq!(backoff(base, 3), Duration::from_millis(1000));
        assert_eq!(backoff(base, 30), Duration::from_secs(10));
    }
}
