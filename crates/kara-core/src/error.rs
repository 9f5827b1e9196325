// SPDX-FileCopyrightText: 2026 Kara Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Kara email assistant.

use std::time::Duration;

use thiserror::Error;

use crate::types::TaskStatus;

/// The primary error type used across Kara adapters and core operations.
#[derive(Debug, Error)]
pub enum KaraError {
    /// Configuration errors (invalid TOML, missing credentials, bad values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Mailbox errors (connect, login, select, fetch, flag).
    #[error("mailbox error: {message}")]
    Mailbox {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Outbound mail errors (message building, SMTP delivery).
    #[error("mail delivery error: {message}")]
    Mail {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// LLM provider errors.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// No task exists with the given id.
    #[error("task {0} not found")]
    TaskNotFound(i64),

    /// A status change that the task lifecycle does not allow.
    #[error("task {task_id}: invalid transition {from} -> {to}")]
    InvalidTransition {
        task_id: i64,
        from: TaskStatus,
        to: TaskStatus,
    },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl KaraError {
    /// Wraps any storage-layer error.
    pub fn storage(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Storage {
            source: Box::new(source),
        }
    }

    /// Builds a mailbox error without an underlying source.
    pub fn mailbox(message: impl Into<String>) -> Self {
        Self::Mailbox {
            message: message.into(),
            source: None,
        }
    }

    /// Builds a mail delivery error without an underlying source.
    pub fn mail(message: impl Into<String>) -> Self {
        Self::Mail {
            message: message.into(),
            source: None,
        }
    }
}

/// Failures reported by a chat-completion backend.
///
/// The variants separate what may be retried (`RateLimited`, `Unavailable`)
/// from what may not (`Api`, `Decode`).
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ProviderError {
    /// The provider refused the call because of its own rate limit (HTTP 429).
    #[error("rate limited by provider: {message}")]
    RateLimited {
        message: String,
        retry_after: Option<Duration>,
    },

    /// Transient server-side or transport failure (5xx, timeout, connection reset).
    #[error("provider unavailable ({status:?}): {message}")]
    Unavailable {
        status: Option<u16>,
        message: String,
    },

    /// Any other non-success response.
    #[error("provider API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The response body could not be understood.
    #[error("failed to decode provider response: {0}")]
    Decode(String),
}

impl ProviderError {
    /// True for provider-side rate limiting only.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }

    /// True for errors worth retrying with backoff.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::RateLimited { .. } | Self::Unavailable { .. })
    }
}
