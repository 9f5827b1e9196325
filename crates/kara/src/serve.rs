// SPDX-FileCopyrightText: 2026 Kara Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `kara serve` and `kara poll`.
//!
//! `serve` runs the scheduler until a shutdown signal; `poll` runs a single
//! pass. Both use the same worker, so a pass started by `poll` while
//! `serve` is running is safe: the ledger keeps a message from being
//! answered twice.

use kara_agent::{RunReport, ScheduleSettings, Scheduler, shutdown};
use kara_config::model::KaraConfig;
use kara_core::KaraError;
use tracing::info;

use crate::wiring;

/// Runs the `kara serve` command.
pub async fn run_serve(config: KaraConfig) -> Result<(), KaraError> {
    info!("starting kara serve");

    #[cfg(feature = "prometheus")]
    let _metrics = start_metrics(&config)?;

    let intake = wiring::intake(&config).await?;
    wiring::report_health(intake.storage.as_ref()).await;
    wiring::report_health(intake.mailer.as_ref()).await;

    let cancel = shutdown::install_signal_handler();
    let scheduler = Scheduler::new(intake.worker, ScheduleSettings::from(&config.worker));
    scheduler.run(cancel).await;

    intake.storage.close().await?;
    info!("kara serve shutdown complete");
    Ok(())
}

/// Runs the `kara poll` command.
pub async fn run_poll(config: KaraConfig) -> Result<(), KaraError> {
    let intake = wiring::intake(&config).await?;
    let report = intake.worker.run_once().await?;
    intake.storage.close().await?;
    println!("{}", summarize(&report));
    Ok(())
}

fn summarize(report: &RunReport) -> String {
    format!(
        "seen {}: answered {}, released {}, dead-lettered {}, errored {}",
        report.seen(),
        report.answered(),
        report.released(),
        report.dead_lettered(),
        report.errored()
    )
}

#[cfg(feature = "prometheus")]
fn start_metrics(
    config: &KaraConfig,
) -> Result<Option<kara_prometheus::PrometheusAdapter>, KaraError> {
    if !config.prometheus.enabled {
        return Ok(None);
    }
    let listen = config
        .prometheus
        .listen
        .parse()
        .map_err(|e| KaraError::Config(format!("prometheus.listen: {e}")))?;
    let adapter = kara_prometheus::PrometheusAdapter::install(listen)?;
    info!(listen = %adapter.listen_addr(), "metrics exporter listening");
    Ok(Some(adapter))
}

#[cfg(test)]
mod tests {
    use super::*;
    use kara_agent::MessageOutcome;

    #[test]
    fn summary_counts_outcomes() {
        let report = RunReport {
            outcomes: vec![
                ("1".into(), MessageOutcome::Answered { task_id: 1 }),
                (
                    "2".into(),
                    MessageOutcome::Released {
                        task_id: 2,
                        attempts: 1,
                    },
                ),
                ("3".into(), MessageOutcome::EmptyBody),
            ],
        };
        assert_eq!(
            summarize(&report),
            "seen 3: answered 1, released 1, dead-lettered 0, errored 0"
        );
    }
}
