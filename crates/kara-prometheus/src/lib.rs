// SPDX-FileCopyrightText: 2026 Kara Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prometheus metrics for the Kara email assistant.
//!
//! Uses the metrics-rs facade with the Prometheus exporter. When a listen
//! address is configured the exporter serves the text format over HTTP.

pub mod recording;

use std::net::SocketAddr;

use async_trait::async_trait;
use kara_core::{AdapterType, HealthStatus, KaraError, PluginAdapter};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

pub use recording::{
    record_faq_hit, record_llm_call, record_llm_latency, record_message, record_tokens,
    set_circuit_open,
};

/// Prometheus metrics adapter.
///
/// Installs the Prometheus recorder globally; only one recorder can be
/// installed per process.
pub struct PrometheusAdapter {
    handle: PrometheusHandle,
    listen: SocketAddr,
}

impl PrometheusAdapter {
    /// Installs the recorder and spawns the HTTP exporter on `listen`.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn install(listen: SocketAddr) -> Result<Self, KaraError> {
        let (recorder, exporter) = PrometheusBuilder::new()
            .with_http_listener(listen)
            .build()
            .map_err(|e| KaraError::Internal(format!("failed to build Prometheus exporter: {e}")))?;

        let handle = recorder.handle();
        metrics::set_global_recorder(recorder).map_err(|e| {
            KaraError::Internal(format!("failed to install Prometheus recorder: {e}"))
        })?;

        tokio::spawn(async move {
            if let Err(e) = exporter.await {
                tracing::error!(error = ?e, "prometheus exporter stopped");
            }
        });

        recording::register_metrics();
        tracing::info!(%listen, "prometheus metrics exporter listening");

        Ok(Self { handle, listen })
    }

    pub fn listen_addr(&self) -> SocketAddr {
        self.listen
    }

    /// Render all collected metrics in Prometheus text format.
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

#[async_trait]
impl PluginAdapter for PrometheusAdapter {
    fn name(&self) -> &str {
        "prometheus"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Metrics
    }

    async fn health_check(&self) -> Result<HealthStatus, KaraError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), KaraError> {
        Ok(())
    }
}
