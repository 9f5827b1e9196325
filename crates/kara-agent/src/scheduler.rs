// SPDX-FileCopyrightText: 2026 Kara Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Periodic polling with an at-least-once retry policy for failed runs.

use std::sync::Arc;
use std::time::Duration;

use kara_config::model::WorkerConfig;
use kara_core::KaraError;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::intake::{IntakeWorker, RunReport};

#[derive(Debug, Clone, Copy)]
pub struct ScheduleSettings {
    pub poll_interval: Duration,
    /// Extra attempts for a run that failed as a whole.
    pub max_retries: u32,
    /// First retry delay; doubles on each retry.
    pub retry_backoff: Duration,
}

impl From<&WorkerConfig> for ScheduleSettings {
    fn from(config: &WorkerConfig) -> Self {
        Self {
            poll_interval: Duration::from_secs(config.poll_interval_secs),
            max_retries: config.run_max_retries,
            retry_backoff: Duration::from_secs(config.run_retry_backoff_secs),
        }
    }
}

pub struct Scheduler {
    worker: Arc<IntakeWorker>,
    settings: ScheduleSettings,
}

impl Scheduler {
    pub fn new(worker: Arc<IntakeWorker>, settings: ScheduleSettings) -> Self {
        Self { worker, settings }
    }

    /// Polls every `poll_interval` until `cancel` fires.
    pub async fn run(&self, cancel: CancellationToken) {
        info!(
            interval_secs = self.settings.poll_interval.as_secs(),
            "scheduler started"
        );
        loop {
            if cancel.is_cancelled() {
                break;
            }
            if let Err(e) = self.run_with_retry(&cancel).await {
                error!(error = %e, "polling run failed after all retries");
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.settings.poll_interval) => {}
            }
        }
        info!("scheduler stopped");
    }

    /// Runs one poll, retrying a failed run with exponential backoff.
    ///
    /// Cancellation during a backoff wait ends the retries and returns the
    /// last error.
    pub async fn run_with_retry(&self, cancel: &CancellationToken) -> Result<RunReport, KaraError> {
        let mut retry = 0u32;
        loop {
            let error = match self.worker.run_once().await {
                Ok(report) => return Ok(report),
                Err(e) => e,
            };

            if retry >= self.settings.max_retries {
                return Err(error);
            }

            let delay = self
                .settings
                .retry_backoff
                .saturating_mul(2u32.saturating_pow(retry));
            retry += 1;
            warn!(
                retry,
                max_retries = self.settings.max_retries,
                delay_secs = delay.as_secs(),
                error = %error,
                "polling run failed, retrying"
            );

            tokio::select! {
                _ = cancel.cancelled() => return Err(error),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}
