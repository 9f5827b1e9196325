// SPDX-FileCopyrightText: 2026 Kara Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Manual reprocessing of a single task.
//!
//! Runs the same generate-send-record sequence as the polling cycle but
//! through `reprocessing`, ending in `done` or `failed`. A failed manual
//! attempt is terminal and is not picked up again by polling.

use kara_core::{KaraError, TaskStatus};
use tracing::{error, info, warn};

use crate::intake::{AttemptError, IntakeWorker};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReprocessOutcome {
    Answered { task_id: i64 },
    Failed { task_id: i64, error: String },
}

impl IntakeWorker {
    /// Reprocesses `task_id` outside the polling cycle.
    ///
    /// Fails with [`KaraError::TaskNotFound`] for an unknown id and with
    /// [`KaraError::InvalidTransition`] for a task that is already `done`.
    /// When the reply is sent but cannot be recorded, the storage error is
    /// returned and the task is left in `reprocessing`; no fallback follows.
    pub async fn reprocess(&self, task_id: i64) -> Result<ReprocessOutcome, KaraError> {
        let task = self
            .storage
            .get_task(task_id)
            .await?
            .ok_or(KaraError::TaskNotFound(task_id))?;
        info!(task_id, status = %task.status, attempts = task.attempts, "manual reprocess requested");

        let task = self
            .storage
            .begin_attempt(task.id, TaskStatus::Reprocessing)
            .await?;

        match self.attempt(&task).await {
            Ok(()) => {
                info!(task_id, attempt = task.attempts, "manual reprocess answered");
                Ok(ReprocessOutcome::Answered { task_id })
            }
            Err(AttemptError::Unrecorded(e)) => {
                error!(alert = true, task_id, error = %e, "reply sent but task not recorded");
                Err(e)
            }
            Err(AttemptError::Pipeline(e)) => {
                let detail = e.to_string();
                warn!(task_id, error = %detail, "manual reprocess failed");
                self.storage
                    .fail_task(
                        task_id,
                        &self.fallback_text,
                        &format!("Reprocess Error: {detail}"),
                    )
                    .await?;
                if self.settings.send_fallback_on_dead_letter {
                    self.send_fallback(&task).await;
                }
                Ok(ReprocessOutcome::Failed {
                    task_id,
                    error: detail,
                })
            }
        }
    }
}
