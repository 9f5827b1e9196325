// SPDX-FileCopyrightText: 2026 Kara Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scripted chat provider for deterministic testing.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use kara_core::{
    AdapterType, ChatCompletion, ChatProvider, ChatRequest, HealthStatus, KaraError,
    PluginAdapter, ProviderError,
};

/// A chat provider that replays queued outcomes.
///
/// Outcomes are popped from a FIFO queue. When the queue is empty,
/// `"mock response"` is returned.
pub struct MockProvider {
    outcomes: Mutex<VecDeque<Result<String, ProviderError>>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self {
            outcomes: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Creates a provider pre-loaded with successful replies.
    pub fn with_responses(responses: Vec<String>) -> Self {
        let provider = Self::new();
        for response in responses {
            provider.push_response(response);
        }
        provider
    }

    pub fn push_response(&self, text: impl Into<String>) {
        self.lock_outcomes().push_back(Ok(text.into()));
    }

    pub fn push_error(&self, error: ProviderError) {
        self.lock_outcomes().push_back(Err(error));
    }

    /// Number of `complete` calls so far.
    pub fn call_count(&self) -> usize {
        self.lock_requests().len()
    }

    /// Every request received, in order.
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.lock_requests().clone()
    }

    pub fn last_request(&self) -> Option<ChatRequest> {
        self.lock_requests().last().cloned()
    }

    fn lock_outcomes(&self) -> std::sync::MutexGuard<'_, VecDeque<Result<String, ProviderError>>> {
        self.outcomes.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_requests(&self) -> std::sync::MutexGuard<'_, Vec<ChatRequest>> {
        self.requests.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockProvider {
    fn name(&self) -> &str {
        "mock-provider"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
    }

    async fn health_check(&self) -> Result<HealthStatus, KaraError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), KaraError> {
        Ok(())
    }
}

#[async_trait]
impl ChatProvider for MockProvider {
    async fn complete(&self, request: ChatRequest) -> Result<ChatCompletion, ProviderError> {
        let model = request.model.clone();
        self.lock_requests().push(request);
        let outcome = self
            .lock_outcomes()
            .pop_front()
            .unwrap_or_else(|| Ok("mock response".to_string()));
        outcome.map(|content| ChatCompletion {
            content,
            model,
            prompt_tokens: Some(10),
            completion_tokens: Some(20),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kara_core::ChatMessage;

    fn request() -> ChatRequest {
        ChatRequest {
            messages: vec![ChatMessage::user("hola")],
            model: "test-model".into(),
            temperature: 0.7,
            max_tokens: 150,
        }
    }

    #[tokio::test]
    async fn replays_script_then_default() {
        let provider = MockProvider::with_responses(vec!["uno".into()]);
        provider.push_error(ProviderError::Decode("bad".into()));

        assert_eq!(provider.complete(request()).await.unwrap().content, "uno");
        assert!(provider.complete(request()).await.is_err());
        assert_eq!(
            provider.complete(request()).await.unwrap().content,
            "mock response"
        );
        assert_eq!(provider.call_count(), 3);
        assert_eq!(provider.last_request().unwrap().model, "test-model");
    }
}
