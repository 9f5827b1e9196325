// SPDX-FileCopyrightText: 2026 Kara Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chat-completion provider trait.

use async_trait::async_trait;

use crate::error::ProviderError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{ChatCompletion, ChatRequest};

/// A hosted LLM reachable through a chat-completion API.
///
/// Implementations must map provider rate limiting to
/// [`ProviderError::RateLimited`] so callers can open the circuit.
#[async_trait]
pub trait ChatProvider: PluginAdapter {
    async fn complete(&self, request: ChatRequest) -> Result<ChatCompletion, ProviderError>;
}
