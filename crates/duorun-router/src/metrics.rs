//! Prometheus metrics collection and formatting.
//!
//! This module renders guard occupancy and ledger totals in Prometheus text
//! exposition format.

use std::fmt::Write;

use duorun_core::TimeWindow;

use crate::guard::ConcurrencyGuard;
use crate::ledger::PerformanceLedger;

/// Collect all metrics and format as Prometheus text.
pub async fn collect_metrics(guard: &ConcurrencyGuard, ledger: &PerformanceLedger) -> String {
    let mut output = String::new();

    collect_guard_metrics(guard, &mut output);
    collect_ledger_metrics(ledger, &mut output).await;

    output
}

/// In-flight invocations and capacity per worker.
fn collect_guard_metrics(guard: &ConcurrencyGuard, output: &mut String) {
    let usage = guard.usage();

    writeln!(
        output,
        "# HELP duorun_worker_in_flight Invocations currently holding a slot"
    )
    .ok();
    writeln!(output, "# TYPE duorun_worker_in_flight gauge").ok();
    for slot in &usage {
        writeln!(
            output,
            "duorun_worker_in_flight{{worker=\"{}\"}} {}",
            slot.worker_id, slot.in_flight
        )
        .ok();
    }

    writeln!(output).ok();
    writeln!(
        output,
        "# HELP duorun_worker_capacity Maximum concurrent invocations per worker"
    )
    .ok();
    writeln!(output, "# TYPE duorun_worker_capacity gauge").ok();
    for slot in &usage {
        writeln!(
            output,
            "duorun_worker_capacity{{worker=\"{}\"}} {}",
            slot.worker_id, slot.capacity
        )
        .ok();
    }
}

/// Invocation counts by worker and outcome.
async fn collect_ledger_metrics(ledger: &PerformanceLedger, output: &mut String) {
    let report = ledger.report_all(TimeWindow::all()).await;

    writeln!(output).ok();
    writeln!(
        output,
        "# HELP duorun_stage_executions_total Worker invocations by outcome"
    )
    .ok();
    writeln!(output, "# TYPE duorun_stage_executions_total counter").ok();
    for (worker_id, summary) in &report {
        let success = summary.successful_requests;
        let failure = summary.total_requests - success;
        writeln!(
            output,
            "duorun_stage_executions_total{{worker=\"{worker_id}\",outcome=\"success\"}} {success}"
        )
        .ok();
        writeln!(
            output,
            "duorun_stage_executions_total{{worker=\"{worker_id}\",outcome=\"failure\"}} {failure}"
        )
        .ok();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CapabilityCatalog;
    use duorun_core::{ExecutionRecord, Stage, WorkerId, WorkerProfile};

    #[tokio::test]
    async fn test_collect_metrics_idle() {
        let catalog = CapabilityCatalog::from_profiles([
            WorkerProfile::new("claude").with_max_concurrent_tasks(4)
        ])
        .unwrap();
        let guard = ConcurrencyGuard::new(&catalog);
        let ledger = PerformanceLedger::new();

        let output = collect_metrics(&guard, &ledger).await;

        assert!(output.contains("duorun_worker_in_flight{worker=\"claude\"} 0"));
        assert!(output.contains("duorun_worker_capacity{worker=\"claude\"} 4"));
        assert!(output.contains("# TYPE duorun_stage_executions_total counter"));
    }

    #[tokio::test]
    async fn test_collect_metrics_counts_outcomes() {
        let catalog = CapabilityCatalog::from_profiles([
            WorkerProfile::new("codex").with_max_concurrent_tasks(2)
        ])
        .unwrap();
        let guard = ConcurrencyGuard::new(&catalog);
        let _permit = guard.acquire(&WorkerId::new("codex")).unwrap();

        let ledger = PerformanceLedger::new();
        let id = WorkerId::new("codex");
        ledger
            .append(ExecutionRecord::succeeded(id.clone(), Stage::Secondary, "r", "c", 10, 5, 0.0))
            .await;
        ledger
            .append(ExecutionRecord::succeeded(id.clone(), Stage::Secondary, "r", "c", 10, 5, 0.0))
            .await;
        ledger
            .append(ExecutionRecord::failed(id, Stage::Secondary, "r", "c", 10, "boom"))
            .await;

        let output = collect_metrics(&guard, &ledger).await;

        assert!(output.contains("duorun_worker_in_flight{worker=\"codex\"} 1"));
        assert!(output
            .contains("duorun_stage_executions_total{worker=\"codex\",outcome=\"success\"} 2"));
        assert!(output
            .contains("duorun_stage_executions_total{worker=\"codex\",outcome=\"failure\"} 1"));
    }
}
