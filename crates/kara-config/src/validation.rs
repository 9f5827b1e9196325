// SPDX-FileCopyrightText: 2026 Kara Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Semantic checks serde cannot express.

use crate::diagnostic::ConfigError;
use crate::model::KaraConfig;

/// Validates a deserialized configuration, collecting every problem.
pub fn validate_config(config: &KaraConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    if config.storage.database_path.trim().is_empty() {
        fail("storage.database_path must not be empty".to_string());
    }

    if config.worker.max_attempts < 1 {
        fail("worker.max_attempts must be at least 1".to_string());
    }

    if config.worker.poll_interval_secs < 1 {
        fail("worker.poll_interval_secs must be at least 1".to_string());
    }

    if config.rate_limit.max_calls_per_minute < 1 {
        fail("rate_limit.max_calls_per_minute must be at least 1".to_string());
    }

    if config.rate_limit.window_secs < 1 {
        fail("rate_limit.window_secs must be at least 1".to_string());
    }

    if config.rate_limit.failure_threshold < 1 {
        fail("rate_limit.failure_threshold must be at least 1".to_string());
    }

    let temperature = config.provider.temperature;
    if !(0.0..=2.0).contains(&temperature) {
        fail(format!(
            "provider.temperature must be between 0.0 and 2.0, got {temperature}"
        ));
    }

    if config.provider.max_tokens < 1 {
        fail("provider.max_tokens must be at least 1".to_string());
    }

    if !config.provider.base_url.starts_with("http://")
        && !config.provider.base_url.starts_with("https://")
    {
        fail(format!(
            "provider.base_url `{}` must be an http(s) URL",
            config.provider.base_url
        ));
    }

    if config.prometheus.enabled
        && config
            .prometheus
            .listen
            .parse::<std::net::SocketAddr>()
            .is_err()
    {
        fail(format!(
            "prometheus.listen `{}` is not a valid socket address",
            config.prometheus.listen
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
