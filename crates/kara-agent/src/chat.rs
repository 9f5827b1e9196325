// SPDX-FileCopyrightText: 2026 Kara Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Interactive question answering keyed by a chat session id.

use std::sync::Arc;

use kara_core::{ERROR_MARKER, StorageAdapter};
use tracing::{error, warn};

use crate::pipeline::{PipelineError, ReplyPipeline};
use crate::responder::Generation;

pub struct ChatService {
    pipeline: Arc<ReplyPipeline>,
    storage: Arc<dyn StorageAdapter>,
}

impl ChatService {
    pub fn new(pipeline: Arc<ReplyPipeline>, storage: Arc<dyn StorageAdapter>) -> Self {
        Self { pipeline, storage }
    }

    /// Answers `question` and records the exchange under `session_id`.
    ///
    /// A failed exchange is still recorded, with a response starting with
    /// [`ERROR_MARKER`], so the prompt feeds preference inference while the
    /// response is never replayed to the model.
    pub async fn ask(&self, session_id: &str, question: &str) -> Result<Generation, PipelineError> {
        let question = question.trim();
        match self.pipeline.answer(session_id, question, question).await {
            Ok(generation) => {
                self.storage
                    .append_turn(session_id, question, &generation.text)
                    .await?;
                Ok(generation)
            }
            Err(e) => {
                warn!(session = session_id, error = %e, "chat answer failed");
                let marker = format!("{ERROR_MARKER} no se pudo generar la respuesta: {e}");
                if let Err(record_err) = self.storage.append_turn(session_id, question, &marker).await {
                    error!(session = session_id, error = %record_err, "failed to record error turn");
                }
                Err(e)
            }
        }
    }
}
