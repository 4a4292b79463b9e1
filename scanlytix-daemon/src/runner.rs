//! Sweep loop -- repeated transform runs until shutdown.
//!
//! Each iteration runs one full [`run_transform`] against the snapshot
//! source. Between iterations the loop waits `sweep_interval_secs`,
//! returning early when the shutdown token fires.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio_util::sync::CancellationToken;

use scanlytix_core::config::ScanlytixConfig;
use scanlytix_core::sink::SinkFactory;
use scanlytix_transform::{SweepConfig, SweepSummary, run_transform};

use crate::snapshot::SnapshotSource;

/// Outcome of the sweep loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Sweeps that ran to completion.
    pub sweeps_completed: u64,
    /// Sweeps that stopped with an error.
    pub sweeps_failed: u64,
    /// Summary of the last completed sweep.
    pub last: Option<SweepSummary>,
}

/// Run sweeps until `cancel` fires.
///
/// With `once` set, or `sweep_interval_secs = 0`, exactly one sweep runs and
/// its error (if any) is returned. In loop mode a failed sweep is logged
/// and retried on the next interval.
pub async fn run_sweeps(
    config: &ScanlytixConfig,
    factory: &dyn SinkFactory,
    once: bool,
    cancel: CancellationToken,
) -> Result<RunReport> {
    let sweep_config = SweepConfig::from_core(config);
    let source = Arc::new(SnapshotSource::new(&config.source.snapshot_dir));
    let interval = Duration::from_secs(config.transform.sweep_interval_secs);
    let single = once || interval.is_zero();

    tracing::info!(
        snapshot_dir = %config.source.snapshot_dir,
        state_path = %sweep_config.state_path.display(),
        concurrent_threads = sweep_config.concurrent_threads,
        interval_secs = interval.as_secs(),
        single,
        "sweep loop starting"
    );

    let mut report = RunReport::default();
    loop {
        match run_transform(&sweep_config, Arc::clone(&source), factory, cancel.clone()).await {
            Ok(summary) => {
                report.sweeps_completed += 1;
                report.last = Some(summary);
            }
            Err(e) if e.is_cancelled() => {
                tracing::info!("sweep interrupted by shutdown");
                break;
            }
            Err(e) if single => {
                return Err(anyhow::anyhow!("sweep failed: {}", e));
            }
            Err(e) => {
                tracing::error!(error = %e, "sweep failed, retrying on next interval");
                report.sweeps_failed += 1;
            }
        }

        if single || cancel.is_cancelled() {
            break;
        }

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }
    }

    tracing::info!(
        completed = report.sweeps_completed,
        failed = report.sweeps_failed,
        "sweep loop stopped"
    );
    Ok(report)
}
