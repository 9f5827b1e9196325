// SPDX-FileCopyrightText: 2026 Kara Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for OpenAI-compatible chat-completion APIs (Groq, OpenAI, vLLM).
//!
//! [`OpenAiClient`] performs exactly one HTTP exchange per call and classifies
//! the outcome into a [`ProviderError`]. Retry and backoff belong to the
//! caller, which also has to consult the rate limiter between attempts.

use std::time::Duration;

use kara_core::{KaraError, ProviderError};
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue, RETRY_AFTER};
use tracing::{debug, warn};

use crate::types::{ApiErrorResponse, CompletionRequest, CompletionResponse};

#[derive(Debug, Clone)]
pub struct OpenAiClient {
    client: reqwest::Client,
    base_url: String,
}

impl OpenAiClient {
    /// Creates a client that authenticates with `Authorization: Bearer <api_key>`.
    ///
    /// `base_url` is the API root, e.g. `https://api.groq.com/openai/v1`.
    pub fn new(api_key: &str, base_url: &str, timeout: Duration) -> Result<Self, KaraError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {api_key}"))
                .map_err(|e| KaraError::Config(format!("invalid API key header value: {e}")))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| KaraError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Overrides the base URL (for testing with wiremock).
    #[cfg(test)]
    pub fn with_base_url(mut self, url: String) -> Self {
        self.base_url = url;
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    /// Sends one completion request.
    pub async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError> {
        let response = self
            .client
            .post(self.endpoint())
            .json(request)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        debug!(status = %status, model = %request.model, "completion response received");

        if status.is_success() {
            let body = response.text().await.map_err(transport_error)?;
            return serde_json::from_str(&body)
                .map_err(|e| ProviderError::Decode(format!("failed to parse API response: {e}")));
        }

        let retry_after = parse_retry_after(response.headers());
        let body = response.text().await.unwrap_or_default();
        let message = error_message(status, &body);

        if status == StatusCode::TOO_MANY_REQUESTS {
            warn!(retry_after = ?retry_after, "provider rate limit hit");
            return Err(ProviderError::RateLimited {
                message,
                retry_after,
            });
        }

        if is_transient_error(status) {
            warn!(status = %status, "provider returned transient error");
            return Err(ProviderError::Unavailable {
                status: Some(status.as_u16()),
                message,
            });
        }

        Err(ProviderError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

/// Returns true for HTTP status codes that indicate a temporarily unavailable service.
fn is_transient_error(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::REQUEST_TIMEOUT
}

fn transport_error(e: reqwest::Error) -> ProviderError {
    ProviderError::Unavailable {
        status: e.status().map(|s| s.as_u16()),
        message: format!("HTTP request failed: {e}"),
    }
}

/// Prefers the structured `error.message` when the body carries one.
fn error_message(status: StatusCode, body: &str) -> String {
    match serde_json::from_str::<ApiErrorResponse>(body) {
        Ok(api_err) => match api_err.error.type_ {
            Some(kind) => format!("{kind}: {}", api_err.error.message),
            None => api_err.error.message,
        },
        Err(_) => format!("API returned {status}: {body}"),
    }
}

/// Reads a `Retry-After` header given in whole seconds.
fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
        .map(Duration::from_secs_f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::WireMessage;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(base_url: &str) -> OpenAiClient {
        OpenAiClient::new("gsk-test", "https://unused.invalid/v1", Duration::from_secs(5))
            .unwrap()
            .with_base_url(base_url.to_string())
    }

    fn test_request() -> CompletionRequest {
        CompletionRequest {
            model: "llama-3.1-8b-instant".into(),
            messages: vec![WireMessage {
                role: "user".into(),
                content: "Email: hola".into(),
            }],
            temperature: 0.7,
            max_tokens: 150,
        }
    }

    fn success_body(content: &str) -> serde_json::Value {
        serde_json::json!({
            "id": "chatcmpl-1",
            "model": "llama-3.1-8b-instant",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": content},
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": 12, "completion_tokens": 8, "total_tokens": 20}
        })
    }

    #[tokio::test]
    async fn complete_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer gsk-test"))
            .and(body_partial_json(serde_json::json!({"max_tokens": 150})))
            .respond_with(ResponseTemplate::new(200).set_body_json(success_body("¡Hola!")))
            .mount(&server)
            .await;

        let response = test_client(&server.uri())
            .complete(&test_request())
            .await
            .unwrap();
        assert_eq!(response.first_content(), "¡Hola!");
        assert_eq!(response.usage.unwrap().completion_tokens, 8);
    }

    #[tokio::test]
    async fn rate_limit_maps_to_rate_limited_with_retry_after() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(429)
                    .insert_header("retry-after", "7")
                    .set_body_json(serde_json::json!({
                        "error": {"type": "tokens", "message": "Rate limit reached"}
                    })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let err = test_client(&server.uri())
            .complete(&test_request())
            .await
            .unwrap_err();
        match err {
            ProviderError::RateLimited {
                message,
                retry_after,
            } => {
                assert!(message.contains("Rate limit reached"), "got: {message}");
                assert_eq!(retry_after, Some(Duration::from_secs(7)));
            }
            other => panic!("expected RateLimited, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn server_error_maps_to_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let err = test_client(&server.uri())
            .complete(&test_request())
            .await
            .unwrap_err();
        assert!(
            matches!(err, ProviderError::Unavailable { status: Some(503), .. }),
            "got: {err:?}"
        );
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn client_error_is_not_transient() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": {"type": "invalid_request_error", "message": "model not found"}
            })))
            .mount(&server)
            .await;

        let err = test_client(&server.uri())
            .complete(&test_request())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ProviderError::Api {
                status: 400,
                message: "invalid_request_error: model not found".into(),
            }
        );
    }

    #[tokio::test]
    async fn malformed_body_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = test_client(&server.uri())
            .complete(&test_request())
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Decode(_)), "got: {err:?}");
    }

    #[test]
    fn retry_after_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(parse_retry_after(&headers), None);
        headers.insert(RETRY_AFTER, HeaderValue::from_static("2.5"));
        assert_eq!(parse_retry_after(&headers), Some(Duration::from_millis(2500)));
        headers.insert(RETRY_AFTER, HeaderValue::from_static("soon"));
        assert_eq!(parse_retry_after(&headers), None);
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client =
            OpenAiClient::new("k", "https://api.groq.com/openai/v1/", Duration::from_secs(1))
                .unwrap();
        assert_eq!(
            client.endpoint(),
            "https://api.groq.com/openai/v1/chat/completions"
        );
    }
}
