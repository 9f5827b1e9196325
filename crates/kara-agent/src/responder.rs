// SPDX-FileCopyrightText: 2026 Kara Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Response generation: FAQ short-circuit, then one guarded provider call.

use std::sync::Arc;
use std::time::Duration;

use kara_config::model::ProviderConfig;
use kara_core::{ChatProvider, ChatRequest, HistoryTurn, ProviderError};
use kara_resilience::{RateLimiter, SlotDecision};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::faq::{FaqCache, FaqTopic};
use crate::prompt::{EMPTY_RESPONSE_FALLBACK, build_messages};

/// Where a generated reply came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplySource {
    Faq(FaqTopic),
    Model,
    /// The provider answered with empty content; the text is the generic apology.
    EmptyFallback,
}

/// A reply ready to be sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
    pub text: String,
    pub source: ReplySource,
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum GenerationError {
    /// The circuit is open or transient retries ran out.
    #[error("service unavailable: {reason}")]
    ServiceUnavailable { reason: String },

    /// The provider rejected the call for a reason retrying will not fix.
    #[error(transparent)]
    Provider(ProviderError),
}

/// Model parameters and retry policy.
#[derive(Debug, Clone)]
pub struct GeneratorSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub max_retries: u32,
    /// First backoff delay; doubles after every failed attempt.
    pub backoff_base: Duration,
}

impl From<&ProviderConfig> for GeneratorSettings {
    fn from(config: &ProviderConfig) -> Self {
        Self {
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            max_retries: config.max_retries,
            backoff_base: Duration::from_secs(config.backoff_base_secs),
        }
    }
}

pub struct ResponseGenerator {
    provider: Arc<dyn ChatProvider>,
    limiter: Arc<RateLimiter>,
    faq: FaqCache,
    settings: GeneratorSettings,
}

impl ResponseGenerator {
    pub fn new(
        provider: Arc<dyn ChatProvider>,
        limiter: Arc<RateLimiter>,
        faq: FaqCache,
        settings: GeneratorSettings,
    ) -> Self {
        Self {
            provider,
            limiter,
            faq,
            settings,
        }
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// Produces a reply for `user_prompt`.
    ///
    /// A FAQ match returns without touching the provider or the limiter.
    /// Otherwise every attempt first reserves a limiter slot; a blocked
    /// reservation ends the call with [`GenerationError::ServiceUnavailable`].
    /// Rate-limited and unavailable responses are retried after
    /// `backoff_base * 2^attempt` (or the provider's `Retry-After`, if longer)
    /// while the circuit stays closed; a failure that opens it ends the call
    /// at once. Any other provider error is returned at once.
    pub async fn generate(
        &self,
        system_prompt: &str,
        catalog_context: &str,
        history: &[HistoryTurn],
        user_prompt: &str,
    ) -> Result<Generation, GenerationError> {
        if let Some(hit) = self.faq.lookup(user_prompt) {
            info!(topic = hit.topic.name(), "answered from FAQ");
            #[cfg(feature = "prometheus")]
            kara_prometheus::record_faq_hit(hit.topic.name());
            return Ok(Generation {
                text: hit.answer,
                source: ReplySource::Faq(hit.topic),
            });
        }

        let request = ChatRequest {
            messages: build_messages(system_prompt, catalog_context, history, user_prompt),
            model: self.settings.model.clone(),
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
        };
        debug!(
            messages = request.messages.len(),
            context_chars = catalog_context.chars().count(),
            "prepared chat request"
        );

        let mut attempt = 0u32;
        loop {
            if let SlotDecision::Blocked { retry_after } = self.limiter.reserve_slot().await {
                warn!(retry_after_secs = retry_after.as_secs(), "circuit open, not calling provider");
                #[cfg(feature = "prometheus")]
                kara_prometheus::set_circuit_open(true);
                return Err(GenerationError::ServiceUnavailable {
                    reason: format!(
                        "circuit breaker open, retry in {}s",
                        retry_after.as_secs()
                    ),
                });
            }

            #[cfg(feature = "prometheus")]
            let started = std::time::Instant::now();
            let result = self.provider.complete(request.clone()).await;
            #[cfg(feature = "prometheus")]
            kara_prometheus::record_llm_latency(started.elapsed().as_secs_f64());

            let error = match result {
                Ok(completion) => {
                    self.limiter.record_success().await;
                    #[cfg(feature = "prometheus")]
                    {
                        kara_prometheus::record_llm_call("ok");
                        kara_prometheus::set_circuit_open(false);
                        if let (Some(input), Some(output)) =
                            (completion.prompt_tokens, completion.completion_tokens)
                        {
                            kara_prometheus::record_tokens(&completion.model, input, output);
                        }
                    }

                    let text = completion.content.trim();
                    if text.is_empty() {
                        warn!("provider returned empty content, using fallback text");
                        return Ok(Generation {
                            text: EMPTY_RESPONSE_FALLBACK.to_string(),
                            source: ReplySource::EmptyFallback,
                        });
                    }
                    return Ok(Generation {
                        text: text.to_string(),
                        source: ReplySource::Model,
                    });
                }
                Err(error) => error,
            };

            self.limiter.record_failure(error.is_rate_limited()).await;
            #[cfg(feature = "prometheus")]
            kara_prometheus::record_llm_call(match &error {
                ProviderError::RateLimited { .. } => "rate_limited",
                ProviderError::Unavailable { .. } => "unavailable",
                _ => "error",
            });

            if !error.is_transient() {
                warn!(error = %error, "provider call failed");
                return Err(GenerationError::Provider(error));
            }

            if attempt >= self.settings.max_retries {
                warn!(attempts = attempt + 1, error = %error, "provider retries exhausted");
                return Err(GenerationError::ServiceUnavailable {
                    reason: format!("{error} (after {} attempts)", attempt + 1),
                });
            }

            // A backoff shorter than the cooldown would only find the slot blocked.
            if self.limiter.snapshot().await.circuit_open {
                warn!(attempts = attempt + 1, error = %error, "circuit opened, not retrying");
                #[cfg(feature = "prometheus")]
                kara_prometheus::set_circuit_open(true);
                return Err(GenerationError::ServiceUnavailable {
                    reason: format!("circuit breaker opened after: {error}"),
                });
            }

            let delay = self.backoff(attempt, &error);
            warn!(
                attempt = attempt + 1,
                delay_secs = delay.as_secs(),
                error = %error,
                "transient provider error, backing off"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    fn backoff(&self, attempt: u32, error: &ProviderError) -> Duration {
        let exponential = self
            .settings
            .backoff_base
            .saturating_mul(2u32.saturating_pow(attempt));
        match error {
            ProviderError::RateLimited {
                retry_after: Some(hint),
                ..
            } => exponential.max(*hint),
            _ => exponential,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use kara_core::{AdapterType, ChatCompletion, HealthStatus, KaraError, PluginAdapter};
    use kara_resilience::LimiterSettings;

    /// Scripted provider; falls back to "ok" once the script runs out.
    struct Scripted {
        script: Mutex<VecDeque<Result<String, ProviderError>>>,
        calls: Mutex<Vec<ChatRequest>>,
    }

    impl Scripted {
        fn new(script: Vec<Result<String, ProviderError>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl PluginAdapter for Scripted {
        fn name(&self) -> &str {
            "scripted"
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
    impl ChatProvider for Scripted {
        async fn complete(&self, request: ChatRequest) -> Result<ChatCompletion, ProviderError> {
            let model = request.model.clone();
            self.calls.lock().unwrap().push(request);
            let next = self
                .script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok("ok".into()));
            next.map(|content| ChatCompletion {
                content,
                model,
                prompt_tokens: None,
                completion_tokens: None,
            })
        }
    }

    fn settings() -> GeneratorSettings {
        GeneratorSettings::from(&ProviderConfig::default())
    }

    fn generator(provider: Arc<Scripted>) -> ResponseGenerator {
        ResponseGenerator::new(
            provider,
            Arc::new(RateLimiter::new(LimiterSettings::default())),
            FaqCache::new("VOID Indumentaria"),
            settings(),
        )
    }

    fn unavailable() -> ProviderError {
        ProviderError::Unavailable {
            status: Some(503),
            message: "overloaded".into(),
        }
    }

    #[tokio::test]
    async fn faq_short_circuits_provider() {
        let provider = Scripted::new(vec![]);
        let generator = generator(provider.clone());

        let reply = generator
            .generate("sys", "ctx", &[], "Email: ¿hacen envíos a todo el país?")
            .await
            .unwrap();

        assert_eq!(reply.source, ReplySource::Faq(FaqTopic::Shipping));
        assert_eq!(provider.call_count(), 0);
        assert_eq!(generator.limiter().snapshot().await.calls_in_window, 0);
    }

    #[tokio::test]
    async fn model_reply_is_trimmed_and_recorded() {
        let provider = Scripted::new(vec![Ok("  Tenemos la Remera Oversize.  \n".into())]);
        let generator = generator(provider.clone());
        let history = vec![
            HistoryTurn::User("hola".into()),
            HistoryTurn::Assistant("¡Hola!".into()),
        ];

        let reply = generator
            .generate("sys", "ctx", &history, "Email: busco remera")
            .await
            .unwrap();

        assert_eq!(reply.text, "Tenemos la Remera Oversize.");
        assert_eq!(reply.source, ReplySource::Model);
        let snapshot = generator.limiter().snapshot().await;
        assert_eq!(snapshot.calls_in_window, 1);
        assert_eq!(snapshot.consecutive_errors, 0);

        let requests = provider.calls.lock().unwrap();
        assert_eq!(requests[0].messages.len(), 4);
        assert_eq!(requests[0].max_tokens, 150);
    }

    #[tokio::test]
    async fn empty_content_yields_fallback_not_error() {
        let provider = Scripted::new(vec![Ok("   ".into())]);
        let reply = generator(provider)
            .generate("sys", "ctx", &[], "Email: busco remera")
            .await
            .unwrap();
        assert_eq!(reply.source, ReplySource::EmptyFallback);
        assert_eq!(reply.text, EMPTY_RESPONSE_FALLBACK);
    }

    #[tokio::test]
    async fn api_error_is_raised_without_retry() {
        let bad = ProviderError::Api {
            status: 400,
            message: "model not found".into(),
        };
        let provider = Scripted::new(vec![Err(bad.clone())]);
        let generator = generator(provider.clone());

        let err = generator
            .generate("sys", "ctx", &[], "Email: busco remera")
            .await
            .unwrap_err();

        assert_eq!(err, GenerationError::Provider(bad));
        assert_eq!(provider.call_count(), 1);
        let snapshot = generator.limiter().snapshot().await;
        assert_eq!(snapshot.consecutive_errors, 1);
        assert!(!snapshot.circuit_open);
    }

    #[tokio::test(start_paused = true)]
    async fn unavailable_is_retried_with_doubling_backoff() {
        let provider = Scripted::new(vec![Err(unavailable()), Err(unavailable())]);
        let generator = generator(provider.clone());

        let started = tokio::time::Instant::now();
        let reply = generator
            .generate("sys", "ctx", &[], "Email: busco remera")
            .await
            .unwrap();

        assert_eq!(reply.text, "ok");
        assert_eq!(provider.call_count(), 3);
        // 30s + 60s of backoff.
        assert_eq!(started.elapsed(), Duration::from_secs(90));
        assert_eq!(generator.limiter().snapshot().await.consecutive_errors, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limit_opens_circuit_and_surfaces_unavailable() {
        let provider = Scripted::new(vec![Err(ProviderError::RateLimited {
            message: "slow down".into(),
            retry_after: None,
        })]);
        let generator = generator(provider.clone());

        let err = generator
            .generate("sys", "ctx", &[], "Email: busco remera")
            .await
            .unwrap_err();

        assert!(matches!(err, GenerationError::ServiceUnavailable { .. }), "got: {err:?}");
        assert_eq!(provider.call_count(), 1);
        assert!(generator.limiter().snapshot().await.circuit_open);
    }

    #[tokio::test(start_paused = true)]
    async fn opened_circuit_returns_without_backing_off() {
        let provider = Scripted::new(vec![Err(ProviderError::RateLimited {
            message: "slow down".into(),
            retry_after: Some(Duration::from_secs(5)),
        })]);
        let generator = generator(provider.clone());

        let started = tokio::time::Instant::now();
        let err = generator
            .generate("sys", "ctx", &[], "Email: busco remera")
            .await
            .unwrap_err();

        assert_eq!(started.elapsed(), Duration::ZERO);
        match err {
            GenerationError::ServiceUnavailable { reason } => {
                assert!(reason.starts_with("circuit breaker opened"), "got: {reason}")
            }
            other => panic!("expected ServiceUnavailable, got {other:?}"),
        }
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn threshold_failure_stops_retrying_early() {
        let provider = Scripted::new(vec![Err(unavailable()); 3]);
        let generator = generator(provider.clone());

        let started = tokio::time::Instant::now();
        let err = generator
            .generate("sys", "ctx", &[], "Email: busco remera")
            .await
            .unwrap_err();

        assert!(matches!(err, GenerationError::ServiceUnavailable { .. }), "got: {err:?}");
        // Three calls, two backoffs (30s + 60s), no third wait.
        assert_eq!(provider.call_count(), 3);
        assert_eq!(started.elapsed(), Duration::from_secs(90));
        assert!(generator.limiter().snapshot().await.circuit_open);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_retries_surface_unavailable() {
        let provider = Scripted::new(vec![Err(unavailable()); 2]);
        let mut settings = settings();
        settings.max_retries = 1;
        let generator = ResponseGenerator::new(
            provider.clone(),
            Arc::new(RateLimiter::new(LimiterSettings::default())),
            FaqCache::new("VOID"),
            settings,
        );

        let err = generator
            .generate("sys", "ctx", &[], "Email: busco remera")
            .await
            .unwrap_err();

        match err {
            GenerationError::ServiceUnavailable { reason } => {
                assert!(reason.contains("after 2 attempts"), "got: {reason}")
            }
            other => panic!("expected ServiceUnavailable, got {other:?}"),
        }
        assert_eq!(provider.call_count(), 2);
    }

    #[test]
    fn backoff_prefers_longer_retry_after() {
        let generator = generator(Scripted::new(vec![]));
        let hinted = ProviderError::RateLimited {
            message: String::new(),
            retry_after: Some(Duration::from_secs(45)),
        };
        assert_eq!(generator.backoff(0, &hinted), Duration::from_secs(45));
        assert_eq!(generator.backoff(1, &hinted), Duration::from_secs(60));
        assert_eq!(generator.backoff(2, &unavailable()), Duration::from_secs(120));
    }
}
