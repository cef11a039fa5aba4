//! Two-stage execution with context handoff.
//!
//! The primary runs first; its output plus the original prompt go to the
//! secondary. A primary failure aborts the pipeline. A secondary failure
//! (error, timeout, cancellation or no capacity) degrades to the primary
//! output with `partial` set. Every invocation is appended to the ledger.

use std::sync::Arc;
use std::time::Duration;

use duorun_core::{CombinedResult, DuoPlan, ExecutionRecord, Stage, TaskPayload, WorkerId};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::adapter::{AdapterRegistry, InvocationRequest};
use crate::catalog::CapabilityCatalog;
use crate::config::RouterConfig;
use crate::error::RouterError;
use crate::guard::ConcurrencyGuard;
use crate::ledger::PerformanceLedger;
use crate::prompt;

/// Per-call execution limits.
#[derive(Debug, Clone)]
pub struct ExecutionOptions {
    pub primary_timeout: Duration,
    pub secondary_timeout: Duration,
    /// Cancelling stops the current stage; a completed primary is kept.
    pub cancel: CancellationToken,
}

impl ExecutionOptions {
    pub fn new(primary_timeout: Duration, secondary_timeout: Duration) -> Self {
        Self {
            primary_timeout,
            secondary_timeout,
            cancel: CancellationToken::new(),
        }
    }

    /// Builder method to attach a caller-owned cancellation token.
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    fn timeout(&self, stage: Stage) -> Duration {
        match stage {
            Stage::Primary => self.primary_timeout,
            Stage::Secondary => self.secondary_timeout,
        }
    }
}

impl From<&RouterConfig> for ExecutionOptions {
    fn from(config: &RouterConfig) -> Self {
        Self::new(config.primary_timeout, config.secondary_timeout)
    }
}

/// Output of one successful stage.
#[derive(Debug)]
struct StageOutput {
    text: String,
    latency_ms: u64,
    cost: f64,
}

/// A failed stage and the time it spent before failing.
#[derive(Debug)]
struct StageFailure {
    error: RouterError,
    latency_ms: u64,
}

impl StageFailure {
    /// Failure before the worker was invoked.
    fn before_invoke(error: RouterError) -> Self {
        Self {
            error,
            latency_ms: 0,
        }
    }
}

impl From<StageFailure> for RouterError {
    fn from(failure: StageFailure) -> Self {
        failure.error
    }
}

/// Runs duo plans against worker adapters.
#[derive(Debug, Clone)]
pub struct ExecutionPipeline {
    catalog: Arc<CapabilityCatalog>,
    guard: Arc<ConcurrencyGuard>,
    ledger: Arc<PerformanceLedger>,
    adapters: AdapterRegistry,
    defaults: ExecutionOptions,
}

impl ExecutionPipeline {
    /// Create a pipeline over shared state.
    pub fn new(
        catalog: Arc<CapabilityCatalog>,
        guard: Arc<ConcurrencyGuard>,
        ledger: Arc<PerformanceLedger>,
        adapters: AdapterRegistry,
    ) -> Self {
        Self {
            catalog,
            guard,
            ledger,
            adapters,
            defaults: ExecutionOptions::from(&RouterConfig::default()),
        }
    }

    /// Builder method to set the default stage timeouts.
    pub fn with_timeouts(mut self, primary: Duration, secondary: Duration) -> Self {
        self.defaults.primary_timeout = primary;
        self.defaults.secondary_timeout = secondary;
        self
    }

    /// Execute a plan with the default timeouts and no cancellation.
    pub async fn execute(
        &self,
        plan: &DuoPlan,
        payload: &TaskPayload,
    ) -> Result<CombinedResult, RouterError> {
        let options = ExecutionOptions::new(
            self.defaults.primary_timeout,
            self.defaults.secondary_timeout,
        );
        self.execute_with(plan, payload, &options).await
    }

    /// Execute a plan with caller-supplied timeouts and cancellation.
    pub async fn execute_with(
        &self,
        plan: &DuoPlan,
        payload: &TaskPayload,
        options: &ExecutionOptions,
    ) -> Result<CombinedResult, RouterError> {
        let primary_prompt = prompt::primary_prompt(&plan.primary_role, &payload.prompt);
        let primary = self
            .run_stage(
                plan,
                Stage::Primary,
                &plan.primary,
                &plan.primary_role,
                primary_prompt,
                payload,
                options,
            )
            .await?;

        let Some((secondary_id, secondary_role)) = plan.stage(Stage::Secondary) else {
            info!(primary = %plan.primary, latency_ms = primary.latency_ms, "Single-stage execution completed");
            return Ok(CombinedResult::single(
                primary.text,
                primary.latency_ms,
                primary.cost,
            ));
        };

        if options.cancel.is_cancelled() {
            warn!(secondary = %secondary_id, "Cancelled before secondary stage, keeping primary output");
            return Ok(CombinedResult::degraded(
                primary.text,
                primary.latency_ms,
                primary.cost,
                "cancelled before secondary stage",
            ));
        }

        let secondary_prompt =
            prompt::secondary_prompt(secondary_role, &primary.text, &payload.prompt);
        match self
            .run_stage(
                plan,
                Stage::Secondary,
                secondary_id,
                secondary_role,
                secondary_prompt,
                payload,
                options,
            )
            .await
        {
            Ok(secondary) => {
                info!(
                    primary = %plan.primary,
                    secondary = %secondary_id,
                    total_latency_ms = primary.latency_ms + secondary.latency_ms,
                    "Duo execution completed"
                );
                Ok(CombinedResult::refined(
                    primary.text,
                    secondary.text,
                    primary.latency_ms + secondary.latency_ms,
                    primary.cost + secondary.cost,
                ))
            }
            Err(failure) => {
                let total_latency_ms = primary.latency_ms + failure.latency_ms;
                warn!(
                    secondary = %secondary_id,
                    error = %failure.error,
                    total_latency_ms,
                    "Secondary stage lost, returning partial result"
                );
                Ok(CombinedResult::degraded(
                    primary.text,
                    total_latency_ms,
                    primary.cost,
                    failure.error.to_string(),
                ))
            }
        }
    }

    /// Run one stage: admit, invoke under timeout/cancellation, release,
    /// and record. The permit is dropped on every exit path. Failures carry
    /// the time spent in the stage.
    #[allow(clippy::too_many_arguments)]
    async fn run_stage(
        &self,
        plan: &DuoPlan,
        stage: Stage,
        worker_id: &WorkerId,
        role: &str,
        prompt: String,
        payload: &TaskPayload,
        options: &ExecutionOptions,
    ) -> Result<StageOutput, StageFailure> {
        let category = plan.category.as_str();

        let adapter = self.adapters.get(worker_id).ok_or_else(|| {
            StageFailure::before_invoke(RouterError::AdapterMissing {
                worker_id: worker_id.clone(),
                stage,
                category: category.to_string(),
            })
        })?;
        let profile = self.catalog.get(worker_id).map_err(|_| {
            warn!(worker_id = %worker_id, stage = %stage, "Planned worker missing from current catalog");
            StageFailure::before_invoke(RouterError::WorkerNotInCatalog {
                worker_id: worker_id.clone(),
                stage,
                category: category.to_string(),
            })
        })?;

        if options.cancel.is_cancelled() {
            return Err(StageFailure::before_invoke(RouterError::Cancelled {
                worker_id: worker_id.clone(),
                stage,
                category: category.to_string(),
            }));
        }

        let permit = self.guard.acquire(worker_id).ok_or_else(|| {
            StageFailure::before_invoke(RouterError::WorkerUnavailable {
                worker_id: worker_id.clone(),
                stage,
                category: category.to_string(),
            })
        })?;

        let timeout = options.timeout(stage);
        let request = InvocationRequest {
            prompt,
            max_tokens: payload.max_tokens,
            temperature: payload.temperature,
        };

        info!(worker_id = %worker_id, stage = %stage, role = %role, "Invoking worker");
        debug!(prompt_len = request.prompt.len(), timeout_ms = timeout.as_millis() as u64, "Stage request");

        let started = Instant::now();
        let outcome = tokio::select! {
            biased;
            _ = options.cancel.cancelled() => Err(RouterError::Cancelled {
                worker_id: worker_id.clone(),
                stage,
                category: category.to_string(),
            }),
            result = tokio::time::timeout(timeout, adapter.invoke(request)) => match result {
                Ok(Ok(output)) => Ok(output),
                Ok(Err(source)) => Err(RouterError::WorkerInvocation {
                    worker_id: worker_id.clone(),
                    stage,
                    category: category.to_string(),
                    source,
                }),
                Err(_) => Err(RouterError::StageTimeout {
                    worker_id: worker_id.clone(),
                    stage,
                    category: category.to_string(),
                    timeout,
                }),
            },
        };
        drop(permit);
        let latency_ms = started.elapsed().as_millis() as u64;

        match outcome {
            Ok(output) => {
                let tokens = output.usage.total();
                let cost = profile.estimate_cost(tokens);
                self.ledger
                    .append(ExecutionRecord::succeeded(
                        worker_id.clone(),
                        stage,
                        role,
                        category,
                        latency_ms,
                        tokens,
                        cost,
                    ))
                    .await;
                info!(
                    worker_id = %worker_id,
                    stage = %stage,
                    latency_ms,
                    tokens,
                    "Worker invocation succeeded"
                );
                Ok(StageOutput {
                    text: output.text,
                    latency_ms,
                    cost,
                })
            }
            Err(e) => {
                self.ledger
                    .append(ExecutionRecord::failed(
                        worker_id.clone(),
                        stage,
                        role,
                        category,
                        latency_ms,
                        e.to_string(),
                    ))
                    .await;
                warn!(worker_id = %worker_id, stage = %stage, error = %e, "Worker invocation failed");
                Err(StageFailure {
                    error: e,
                    latency_ms,
                })
            }
        }
    }
}
