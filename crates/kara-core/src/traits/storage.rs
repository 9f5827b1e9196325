// SPDX-FileCopyrightText: 2026 Kara Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage adapter trait for the task ledger, conversation history and catalog.

use async_trait::async_trait;

use crate::error::KaraError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{ConversationTurn, EmailTask, NewEmailTask, Product, TaskStatus};

/// Persistence backend used by the intake pipeline.
///
/// Every status-changing method validates the transition and applies it
/// atomically, returning [`KaraError::InvalidTransition`] when the current
/// state does not allow it.
#[async_trait]
pub trait StorageAdapter: PluginAdapter {
    /// Opens the backend and applies migrations.
    async fn initialize(&self) -> Result<(), KaraError>;

    /// Flushes pending writes and releases connections.
    async fn close(&self) -> Result<(), KaraError>;

    // --- task ledger ---

    /// Inserts a pending task, or returns the existing one for the same uid.
    async fn create_task(&self, task: &NewEmailTask) -> Result<EmailTask, KaraError>;

    async fn find_task_by_uid(&self, uid: &str) -> Result<Option<EmailTask>, KaraError>;

    async fn get_task(&self, id: i64) -> Result<Option<EmailTask>, KaraError>;

    /// Lists tasks newest first, optionally filtered by status.
    async fn list_tasks(
        &self,
        status: Option<TaskStatus>,
        limit: usize,
    ) -> Result<Vec<EmailTask>, KaraError>;

    /// Moves a task into `processing` or `reprocessing`, incrementing attempts.
    async fn begin_attempt(&self, id: i64, status: TaskStatus) -> Result<EmailTask, KaraError>;

    /// Marks a task done, stores the reply and appends the sender's turn.
    async fn complete_task(&self, id: i64, response: &str) -> Result<EmailTask, KaraError>;

    /// Returns a task to `pending` after a failed attempt.
    async fn release_task(&self, id: i64, error: &str) -> Result<EmailTask, KaraError>;

    /// Abandons a task permanently.
    async fn dead_letter_task(&self, id: i64, reason: &str) -> Result<EmailTask, KaraError>;

    /// Ends a manual reprocess in `failed`.
    async fn fail_task(&self, id: i64, response: &str, error: &str)
    -> Result<EmailTask, KaraError>;

    // --- conversation history ---

    async fn append_turn(
        &self,
        session_id: &str,
        prompt: &str,
        response: &str,
    ) -> Result<ConversationTurn, KaraError>;

    /// The most recent `limit` turns for a session, oldest first.
    async fn recent_turns(
        &self,
        session_id: &str,
        limit: usize,
    ) -> Result<Vec<ConversationTurn>, KaraError>;

    // --- catalog ---

    /// All products with category and variants, in id order.
    async fn list_products(&self) -> Result<Vec<Product>, KaraError>;

    /// Inserts products (and their categories and variants); returns the count.
    async fn import_products(&self, products: &[Product]) -> Result<usize, KaraError>;
}
