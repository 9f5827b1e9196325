// SPDX-FileCopyrightText: 2026 Kara Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The query-to-reply pipeline shared by mail intake, manual reprocess and chat.

use std::sync::Arc;

use kara_catalog::{classify_intent, infer_preferences, recommend, search_with_intent};
use kara_config::model::WorkerConfig;
use kara_core::{HistoryTurn, KaraError, StorageAdapter};
use thiserror::Error;
use tracing::{debug, info};

use crate::prompt::{ContextLimits, catalog_context, enhanced_system_prompt};
use crate::responder::{Generation, GenerationError, ResponseGenerator};

/// Why a reply could not be produced.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Generation(#[from] GenerationError),

    /// Storage, mail delivery or any other collaborator failed.
    #[error(transparent)]
    Internal(#[from] KaraError),
}

impl From<PipelineError> for KaraError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Generation(GenerationError::Provider(e)) => KaraError::Provider(e),
            PipelineError::Generation(e @ GenerationError::ServiceUnavailable { .. }) => {
                KaraError::Internal(e.to_string())
            }
            PipelineError::Internal(e) => e,
        }
    }
}

/// Context sizes used when assembling a request.
#[derive(Debug, Clone, Copy)]
pub struct PipelineSettings {
    /// Prior exchanges replayed to the model.
    pub history_turns: usize,
    /// Prior exchanges mined for preferences.
    pub preference_turns: usize,
    pub catalog_context_chars: usize,
    pub search_limit: usize,
    pub recommendation_limit: usize,
}

impl From<&WorkerConfig> for PipelineSettings {
    fn from(config: &WorkerConfig) -> Self {
        Self {
            history_turns: config.history_turns,
            preference_turns: config.preference_turns,
            catalog_context_chars: config.catalog_context_chars,
            search_limit: config.search_limit,
            recommendation_limit: config.recommendation_limit,
        }
    }
}

/// Classifies, searches, personalizes and generates a reply for one query.
pub struct ReplyPipeline {
    storage: Arc<dyn StorageAdapter>,
    generator: ResponseGenerator,
    system_prompt: String,
    settings: PipelineSettings,
}

impl ReplyPipeline {
    pub fn new(
        storage: Arc<dyn StorageAdapter>,
        generator: ResponseGenerator,
        system_prompt: String,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            storage,
            generator,
            system_prompt,
            settings,
        }
    }

    pub fn generator(&self) -> &ResponseGenerator {
        &self.generator
    }

    /// Produces a reply to `query` from `session_id`, given `user_prompt` as the final message.
    ///
    /// Nothing is persisted here; callers record the exchange.
    pub async fn answer(
        &self,
        session_id: &str,
        query: &str,
        user_prompt: &str,
    ) -> Result<Generation, PipelineError> {
        let history_rows = self
            .storage
            .recent_turns(session_id, self.settings.history_turns)
            .await?;
        let preference_rows = self
            .storage
            .recent_turns(session_id, self.settings.preference_turns)
            .await?;
        let catalog = self.storage.list_products().await?;

        let intent = classify_intent(query);
        let preferences = infer_preferences(&preference_rows);
        let ranked = search_with_intent(
            &catalog,
            query,
            Some(intent.primary_intent),
            catalog.len().max(1),
        );
        let recommendations = if preferences.is_empty() {
            Vec::new()
        } else {
            recommend(&catalog, &preferences, self.settings.recommendation_limit)
        };

        info!(
            session = session_id,
            intent = %intent.primary_intent,
            confidence = intent.confidence,
            matches = ranked.len(),
            "query analyzed"
        );
        debug!(
            history = history_rows.len(),
            preferences = ?preferences.summary(),
            recommendations = recommendations.len(),
            "context inputs"
        );

        let context = catalog_context(
            &catalog,
            &ranked,
            intent.primary_intent,
            &recommendations,
            ContextLimits {
                max_chars: self.settings.catalog_context_chars,
                search_limit: self.settings.search_limit,
            },
        );
        let system_prompt = enhanced_system_prompt(&self.system_prompt, &preferences, &intent);
        let history = HistoryTurn::from_turns(&history_rows);

        let generation = self
            .generator
            .generate(&system_prompt, &context, &history, user_prompt)
            .await?;
        Ok(generation)
    }
}
