use uuid::Uuid;

use crate::domain::models::{RunStatus, StageKind, StageStatus};

/// Port for fire-and-forget run telemetry.
///
/// Never influences control flow; implementations must not fail or block.
pub trait Telemetry: Send + Sync {
    fn log_stage(&self, run_id: Uuid, stage: StageKind, status: StageStatus, duration_ms: u64);

    fn log_run(&self, run_id: Uuid, status: RunStatus, duration_ms: u64, error_count: usize);
}

/// Telemetry sink that emits structured tracing events.
#[derive(Debug, Clone, Default)]
pub struct TracingTelemetry;

impl TracingTelemetry {
    pub fn new() -> Self {
        Self
    }
}

impl Telemetry for TracingTelemetry {
    fn log_stage(&self, run_id: Uuid, stage: StageKind, status: StageStatus, duration_ms: u64) {
        match status {
            StageStatus::Completed => {
                tracing::debug!(%run_id, %stage, duration_ms, "stage completed");
            }
            StageStatus::Failed => {
                tracing::warn!(%run_id, %stage, duration_ms, "stage failed");
            }
        }
    }

    fn log_run(&self, run_id: Uuid, status: RunStatus, duration_ms: u64, error_count: usize) {
        tracing::info!(%run_id, ?status, duration_ms, error_count, "run finished");
    }
}

/// A telemetry sink that records nothing.
///
/// Used in tests where log output is noise.
#[derive(Debug, Clone, Default)]
pub struct NullTelemetry;

impl NullTelemetry {
    pub fn new() -> Self {
        Self
    }
}

impl Telemetry for NullTelemetry {
    fn log_stage(&self, _run_id: Uuid, _stage: StageKind, _status: StageStatus, _duration_ms: u64) {
    }

    fn log_run(&self, _run_id: Uuid, _status: RunStatus, _duration_ms: u64, _error_count: usize) {}
}
