//! Router facade - owns the shared state and wires selection to execution.
//!
//! The catalog, guard, selector and pipeline form one snapshot. A refresh
//! swaps the snapshot; calls already running keep the one they started with.

use std::sync::Arc;

use duorun_core::{
    CombinedResult, DuoPlan, PerformanceSummary, TaskDescriptor, TaskPayload, TimeWindow,
    WorkerId,
};
use tokio::sync::RwLock;
use tracing::info;

use crate::adapter::AdapterRegistry;
use crate::catalog::CapabilityCatalog;
use crate::config::RouterConfig;
use crate::error::RouterError;
use crate::guard::ConcurrencyGuard;
use crate::ledger::PerformanceLedger;
use crate::metrics;
use crate::pipeline::{ExecutionOptions, ExecutionPipeline};
use crate::selector::DuoSelector;

#[derive(Debug, Clone)]
struct Snapshot {
    catalog: Arc<CapabilityCatalog>,
    guard: Arc<ConcurrencyGuard>,
    selector: DuoSelector,
    pipeline: ExecutionPipeline,
}

impl Snapshot {
    fn build(
        config: &RouterConfig,
        catalog: Arc<CapabilityCatalog>,
        guard: Arc<ConcurrencyGuard>,
        ledger: Arc<PerformanceLedger>,
        adapters: AdapterRegistry,
    ) -> Self {
        let selector = DuoSelector::new(catalog.clone())
            .with_load_penalty(guard.clone(), config.load_penalty);
        let pipeline = ExecutionPipeline::new(catalog.clone(), guard.clone(), ledger, adapters)
            .with_timeouts(config.primary_timeout, config.secondary_timeout);
        Self {
            catalog,
            guard,
            selector,
            pipeline,
        }
    }
}

/// Process-wide router: one catalog snapshot, one guard, one ledger.
pub struct Router {
    config: RouterConfig,
    adapters: AdapterRegistry,
    ledger: Arc<PerformanceLedger>,
    snapshot: RwLock<Snapshot>,
}

impl Router {
    /// Create a router over a populated catalog.
    pub fn new(
        config: RouterConfig,
        catalog: CapabilityCatalog,
        adapters: AdapterRegistry,
    ) -> Arc<Self> {
        Self::with_ledger(config, catalog, adapters, Arc::new(PerformanceLedger::new()))
    }

    /// Create a router that appends to an existing ledger.
    pub fn with_ledger(
        config: RouterConfig,
        catalog: CapabilityCatalog,
        adapters: AdapterRegistry,
        ledger: Arc<PerformanceLedger>,
    ) -> Arc<Self> {
        let catalog = Arc::new(catalog);
        let guard = Arc::new(ConcurrencyGuard::new(&catalog));
        let snapshot = Snapshot::build(&config, catalog, guard, ledger.clone(), adapters.clone());
        Arc::new(Self {
            config,
            adapters,
            ledger,
            snapshot: RwLock::new(snapshot),
        })
    }

    /// Create a router from configuration, loading the catalog file.
    pub fn from_config(
        config: RouterConfig,
        adapters: AdapterRegistry,
    ) -> Result<Arc<Self>, RouterError> {
        let path = config.catalog_path.clone().ok_or_else(|| {
            RouterError::Configuration(duorun_core::CoreError::InvalidInput(
                "no catalog path configured (set DUORUN_CATALOG)".to_string(),
            ))
        })?;
        let catalog = CapabilityCatalog::load(&path)?;
        Ok(Self::new(config, catalog, adapters))
    }

    async fn current(&self) -> Snapshot {
        self.snapshot.read().await.clone()
    }

    /// Select the duo for a task.
    pub async fn select(&self, task: &TaskDescriptor) -> Result<DuoPlan, RouterError> {
        self.current().await.selector.select(task)
    }

    /// Execute a plan with the configured timeouts.
    pub async fn execute(
        &self,
        plan: &DuoPlan,
        payload: &TaskPayload,
    ) -> Result<CombinedResult, RouterError> {
        self.current().await.pipeline.execute(plan, payload).await
    }

    /// Execute a plan with caller-supplied timeouts and cancellation.
    pub async fn execute_with(
        &self,
        plan: &DuoPlan,
        payload: &TaskPayload,
        options: &ExecutionOptions,
    ) -> Result<CombinedResult, RouterError> {
        self.current()
            .await
            .pipeline
            .execute_with(plan, payload, options)
            .await
    }

    /// Select and execute in one call, on one snapshot.
    pub async fn route(
        &self,
        task: &TaskDescriptor,
        payload: &TaskPayload,
    ) -> Result<CombinedResult, RouterError> {
        let snapshot = self.current().await;
        let plan = snapshot.selector.select(task)?;
        snapshot.pipeline.execute(&plan, payload).await
    }

    /// Performance of a worker over a window.
    pub async fn report(&self, worker_id: &WorkerId, window: TimeWindow) -> PerformanceSummary {
        self.ledger.report(worker_id, None, window).await
    }

    /// Performance of a worker over a window for one capability category.
    pub async fn report_category(
        &self,
        worker_id: &WorkerId,
        category: &str,
        window: TimeWindow,
    ) -> PerformanceSummary {
        self.ledger.report(worker_id, Some(category), window).await
    }

    /// Swap in a new catalog. The guard keeps counters for workers that
    /// remain, so outstanding permits stay accounted for.
    pub async fn refresh_catalog(&self, catalog: CapabilityCatalog) {
        let mut snapshot = self.snapshot.write().await;
        let catalog = Arc::new(catalog);
        let guard = Arc::new(snapshot.guard.rebuild(&catalog));
        info!(workers = catalog.len(), "Refreshed capability catalog");
        *snapshot = Snapshot::build(
            &self.config,
            catalog,
            guard,
            self.ledger.clone(),
            self.adapters.clone(),
        );
    }

    /// Prometheus text for the current guard and the ledger.
    pub async fn metrics(&self) -> String {
        let guard = self.current().await.guard;
        metrics::collect_metrics(&guard, &self.ledger).await
    }

    pub async fn catalog(&self) -> Arc<CapabilityCatalog> {
        self.current().await.catalog
    }

    pub async fn guard(&self) -> Arc<ConcurrencyGuard> {
        self.current().await.guard
    }

    pub fn ledger(&self) -> &Arc<PerformanceLedger> {
        &self.ledger
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }
}
