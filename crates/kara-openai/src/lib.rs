// SPDX-FileCopyrightText: 2026 Kara Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! OpenAI-compatible chat-completion provider for Kara.
//!
//! Implements [`ChatProvider`] against any endpoint speaking the
//! `/chat/completions` protocol. The default configuration targets Groq.

pub mod client;
pub mod types;

use std::time::Duration;

use async_trait::async_trait;
use kara_config::model::ProviderConfig;
use kara_core::{
    AdapterType, ChatCompletion, ChatProvider, ChatRequest, HealthStatus, KaraError,
    PluginAdapter, ProviderError,
};
use tracing::{debug, info};

use crate::client::OpenAiClient;
use crate::types::CompletionRequest;

/// Environment variables consulted when `provider.api_key` is unset, in order.
const API_KEY_ENV_VARS: [&str; 2] = ["KARA_PROVIDER_API_KEY", "GROQ_API_KEY"];

/// Chat provider backed by an OpenAI-compatible HTTP API.
pub struct OpenAiProvider {
    client: OpenAiClient,
    model: String,
}

impl OpenAiProvider {
    /// Creates a provider from configuration.
    ///
    /// # API Key Resolution
    /// 1. `provider.api_key` if set and non-empty
    /// 2. `KARA_PROVIDER_API_KEY`
    /// 3. `GROQ_API_KEY`
    pub fn new(config: &ProviderConfig) -> Result<Self, KaraError> {
        let api_key = resolve_api_key(&config.api_key)?;
        let client = OpenAiClient::new(
            &api_key,
            &config.base_url,
            Duration::from_secs(config.request_timeout_secs),
        )?;

        info!(
            model = config.model,
            base_url = config.base_url,
            "chat provider initialized"
        );

        Ok(Self {
            client,
            model: config.model.clone(),
        })
    }

    /// Creates a provider with an existing client (for testing).
    #[cfg(test)]
    fn with_client(client: OpenAiClient, model: &str) -> Self {
        Self {
            client,
            model: model.to_string(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl PluginAdapter for OpenAiProvider {
    fn name(&self) -> &str {
        "openai-compatible"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
    }

    async fn health_check(&self) -> Result<HealthStatus, KaraError> {
        // Probing the API would spend quota.
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), KaraError> {
        debug!("chat provider shutting down");
        Ok(())
    }
}

#[async_trait]
impl ChatProvider for OpenAiProvider {
    async fn complete(&self, request: ChatRequest) -> Result<ChatCompletion, ProviderError> {
        let mut wire = CompletionRequest::from(&request);
        if wire.model.is_empty() {
            wire.model = self.model.clone();
        }

        let response = self.client.complete(&wire).await?;
        let content = response.first_content();
        let model = if response.model.is_empty() {
            wire.model
        } else {
            response.model
        };

        Ok(ChatCompletion {
            content,
            model,
            prompt_tokens: response.usage.as_ref().map(|u| u.prompt_tokens),
            completion_tokens: response.usage.as_ref().map(|u| u.completion_tokens),
        })
    }
}

/// Resolves the API key: config value first, then the environment.
fn resolve_api_key(config_key: &Option<String>) -> Result<String, KaraError> {
    if let Some(key) = config_key
        && !key.is_empty()
    {
        return Ok(key.clone());
    }

    API_KEY_ENV_VARS
        .iter()
        .find_map(|var| std::env::var(var).ok().filter(|v| !v.is_empty()))
        .ok_or_else(|| {
            KaraError::Config(
                "provider API key not found. Set provider.api_key in config or the KARA_PROVIDER_API_KEY / GROQ_API_KEY environment variable.".into(),
            )
        })
}
