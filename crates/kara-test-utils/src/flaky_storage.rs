// SPDX-FileCopyrightText: 2026 Kara Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage wrapper that fails chosen operations on demand.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use kara_core::{
    AdapterType, ConversationTurn, EmailTask, HealthStatus, KaraError, NewEmailTask,
    PluginAdapter, Product, StorageAdapter, TaskStatus,
};

/// Delegates to a real backend, except that the next `n` calls to
/// `complete_task` fail before reaching it.
pub struct FlakyStorage {
    inner: Arc<dyn StorageAdapter>,
    complete_failures: AtomicU32,
    complete_calls: AtomicU32,
}

impl FlakyStorage {
    pub fn new(inner: Arc<dyn StorageAdapter>) -> Self {
        Self {
            inner,
            complete_failures: AtomicU32::new(0),
            complete_calls: AtomicU32::new(0),
        }
    }

    /// Makes the next `n` `complete_task` calls fail.
    pub fn fail_next_completes(&self, n: u32) {
        self.complete_failures.store(n, Ordering::SeqCst);
    }

    /// `complete_task` calls so far, failed ones included.
    pub fn complete_calls(&self) -> u32 {
        self.complete_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PluginAdapter for FlakyStorage {
    fn name(&self) -> &str {
        "flaky-storage"
    }

    fn version(&self) -> semver::Version {
        self.inner.version()
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, KaraError> {
        self.inner.health_check().await
    }

    async fn shutdown(&self) -> Result<(), KaraError> {
        self.inner.shutdown().await
    }
}

#[async_trait]
impl StorageAdapter for FlakyStorage {
    async fn initialize(&self) -> Result<(), KaraError> {
        self.inner.initialize().await
    }

    async fn close(&self) -> Result<(), KaraError> {
        self.inner.close().await
    }

    async fn create_task(&self, task: &NewEmailTask) -> Result<EmailTask, KaraError> {
        self.inner.create_task(task).await
    }

    async fn find_task_by_uid(&self, uid: &str) -> Result<Option<EmailTask>, KaraError> {
        self.inner.find_task_by_uid(uid).await
    }

    async fn get_task(&self, id: i64) -> Result<Option<EmailTask>, KaraError> {
        self.inner.get_task(id).await
    }

    async fn list_tasks(
        &self,
        status: Option<TaskStatus>,
        limit: usize,
    ) -> Result<Vec<EmailTask>, KaraError> {
        self.inner.list_tasks(status, limit).await
    }

    async fn begin_attempt(&self, id: i64, status: TaskStatus) -> Result<EmailTask, KaraError> {
        self.inner.begin_attempt(id, status).await
    }

    async fn complete_task(&self, id: i64, response: &str) -> Result<EmailTask, KaraError> {
        self.complete_calls.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .complete_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(KaraError::Internal("database is locked".into()));
        }
        self.inner.complete_task(id, response).await
    }

    async fn release_task(&self, id: i64, error: &str) -> Result<EmailTask, KaraError> {
        self.inner.release_task(id, error).await
    }

    async fn dead_letter_task(&self, id: i64, reason: &str) -> Result<EmailTask, KaraError> {
        self.inner.dead_letter_task(id, reason).await
    }

    async fn fail_task(
        &self,
        id: i64,
        response: &str,
        error: &str,
    ) -> Result<EmailTask, KaraError> {
        self.inner.fail_task(id, response, error).await
    }

    async fn append_turn(
        &self,
        session_id: &str,
        prompt: &str,
        response: &str,
    ) -> Result<ConversationTurn, KaraError> {
        self.inner.append_turn(session_id, prompt, response).await
    }

    async fn recent_turns(
        &self,
        session_id: &str,
        limit: usize,
    ) -> Result<Vec<ConversationTurn>, KaraError> {
        self.inner.recent_turns(session_id, limit).await
    }

    async fn list_products(&self) -> Result<Vec<Product>, KaraError> {
        self.inner.list_products().await
    }

    async fn import_products(&self, products: &[Product]) -> Result<usize, KaraError> {
        self.inner.import_products(products).await
    }
}
