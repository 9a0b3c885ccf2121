//! Structured observability hooks for remediation-run lifecycle events.
//!
//! Events are emitted at `info!` level with an `event` field so that
//! JSON log pipelines can filter on `run.started`, `alert.outcome`,
//! `pr.created`, and `run.finished`.

use tracing::info;

use crate::report::{AlertOutcome, SkipReason};

/// RAII guard that enters a run-scoped tracing span for the duration of
/// a remediation run.
pub struct RunSpan {
    _span: tracing::span::EnteredSpan,
}

impl RunSpan {
    /// Create and enter a span tagged with the run id, so every event
    /// inside the run carries it.
    pub fn enter(run_id: &str) -> Self {
        let span = tracing::info_span!("depfix.run", run_id = %run_id);
        Self {
            _span: span.entered(),
        }
    }
}

/// Emit event: run started with the configured severity floor.
pub fn emit_run_started(severity_floor: &str, max_prs: u32, dry_run: bool) {
    info!(
        event = "run.started",
        severity_floor = %severity_floor,
        max_prs = max_prs,
        dry_run = dry_run,
    );
}

/// Emit event: run finished with totals.
pub fn emit_run_finished(duration_ms: u64, alerts_processed: u64, prs_created: u64) {
    info!(
        event = "run.finished",
        duration_ms = duration_ms,
        alerts_processed = alerts_processed,
        prs_created = prs_created,
    );
}

/// Emit event: terminal outcome for one alert.
pub fn emit_alert_outcome(alert_id: u64, outcome: &AlertOutcome) {
    match outcome {
        AlertOutcome::PrCreated { pr_id, branch } => {
            info!(event = "pr.created", alert_id = alert_id, pr_id = pr_id, branch = %branch);
        }
        AlertOutcome::DryRunWouldCreate { branch } => {
            info!(event = "alert.dry_run_would_create", alert_id = alert_id, branch = %branch);
        }
        AlertOutcome::Skipped { reason } => {
            info!(event = "alert.skipped", alert_id = alert_id, reason = %reason);
        }
    }
}

/// Emit event: alert skipped before per-alert processing (filter stage).
pub fn emit_alert_filtered(alert_id: u64, reason: SkipReason) {
    info!(event = "alert.filtered", alert_id = alert_id, reason = %reason);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_span_enter_does_not_panic() {
        let _span = RunSpan::enter("test-run-id");
    }
}
