// SPDX-FileCopyrightText: 2026 Kara Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end intake tests.
//!
//! `TestHarness` assembles the full worker stack over a temp SQLite
//! database seeded with [`sample_catalog`], a scripted provider and an
//! in-memory mailbox. Delays and provider retries default to zero so
//! runs complete immediately.

use std::sync::Arc;

use kara_agent::{
    ChatService, IntakeWorker, ReplyPipeline, RunReport, ScheduleSettings, Scheduler,
    WorkerSettings, build_pipeline,
};
use kara_config::KaraConfig;
use kara_config::model::StorageConfig;
use kara_core::{EmailTask, KaraError, StorageAdapter};
use kara_storage::SqliteStorage;

use crate::fixtures::{inbound, sample_catalog};
use crate::flaky_storage::FlakyStorage;
use crate::mock_mail::{MockMailbox, MockMailer};
use crate::mock_provider::MockProvider;

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    responses: Vec<String>,
    config: KaraConfig,
    seed_catalog: bool,
    flaky_storage: bool,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        let mut config = KaraConfig::default();
        config.provider.max_retries = 0;
        config.worker.success_delay_secs = 0;
        config.worker.failure_delay_secs = 0;
        config.worker.error_delay_secs = 0;
        config.worker.run_retry_backoff_secs = 1;
        Self {
            responses: Vec::new(),
            config,
            seed_catalog: true,
            flaky_storage: false,
        }
    }

    /// Set mock provider responses.
    pub fn with_mock_responses(mut self, responses: Vec<String>) -> Self {
        self.responses = responses;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.config.worker.max_attempts = max_attempts;
        self
    }

    /// Send the apology reply when a task dead-letters or fails.
    pub fn with_fallback_on_dead_letter(mut self) -> Self {
        self.config.worker.send_fallback_on_dead_letter = true;
        self
    }

    /// Arbitrary configuration changes, applied last.
    pub fn with_config(mut self, f: impl FnOnce(&mut KaraConfig)) -> Self {
        f(&mut self.config);
        self
    }

    /// Start from an empty catalog.
    pub fn without_catalog(mut self) -> Self {
        self.seed_catalog = false;
        self
    }

    /// Route storage through a [`FlakyStorage`] exposed as `TestHarness::flaky`.
    pub fn with_flaky_storage(mut self) -> Self {
        self.flaky_storage = true;
        self
    }

    /// Build the test harness, creating all required subsystems.
    pub async fn build(self) -> Result<TestHarness, KaraError> {
        let temp_dir = tempfile::TempDir::new().map_err(KaraError::storage)?;
        let db_path = temp_dir.path().join("kara-test.db");

        let mut config = self.config;
        config.storage = StorageConfig {
            database_path: db_path.to_string_lossy().to_string(),
            wal_mode: true,
        };

        let storage = SqliteStorage::new(config.storage.clone());
        storage.initialize().await?;
        if self.seed_catalog {
            storage.import_products(&sample_catalog()).await?;
        }
        let mut storage: Arc<dyn StorageAdapter> = Arc::new(storage);
        let mut flaky = None;
        if self.flaky_storage {
            let wrapper = Arc::new(FlakyStorage::new(storage));
            storage = wrapper.clone() as Arc<dyn StorageAdapter>;
            flaky = Some(wrapper);
        }

        let provider = Arc::new(MockProvider::with_responses(self.responses));
        let mailbox = MockMailbox::new();
        let mailer = MockMailer::new();

        let pipeline = Arc::new(build_pipeline(&config, storage.clone(), provider.clone()).await);
        let worker = Arc::new(IntakeWorker::new(
            pipeline.clone(),
            storage.clone(),
            Arc::new(mailbox.clone()),
            Arc::new(mailer.clone()),
            WorkerSettings::from(&config.worker),
            &config.agent,
        ));
        let chat = ChatService::new(pipeline.clone(), storage.clone());

        Ok(TestHarness {
            config,
            storage,
            provider,
            mailbox,
            mailer,
            pipeline,
            worker,
            chat,
            flaky,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete worker stack for integration testing.
///
/// Holds the `TempDir` so the database lives as long as the harness.
pub struct TestHarness {
    pub config: KaraConfig,
    pub storage: Arc<dyn StorageAdapter>,
    pub provider: Arc<MockProvider>,
    pub mailbox: MockMailbox,
    pub mailer: MockMailer,
    pub pipeline: Arc<ReplyPipeline>,
    pub worker: Arc<IntakeWorker>,
    pub chat: ChatService,
    /// Fault injection handle, present with `with_flaky_storage`.
    pub flaky: Option<Arc<FlakyStorage>>,
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Drops an unseen message into the mailbox.
    pub fn deliver(&self, uid: &str, sender: &str, subject: &str, body: &str) {
        self.mailbox.deliver(inbound(uid, sender, subject, body));
    }

    pub async fn run_once(&self) -> Result<RunReport, KaraError> {
        self.worker.run_once().await
    }

    pub fn scheduler(&self) -> Scheduler {
        Scheduler::new(
            self.worker.clone(),
            ScheduleSettings::from(&self.config.worker),
        )
    }

    /// The ledger entry for a mailbox UID.
    pub async fn task(&self, uid: &str) -> Result<Option<EmailTask>, KaraError> {
        self.storage.find_task_by_uid(uid).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn harness_seeds_catalog() {
        let harness = TestHarness::builder().build().await.unwrap();
        let products = harness.storage.list_products().await.unwrap();
        assert_eq!(products.len(), sample_catalog().len());
    }

    #[tokio::test]
    async fn harness_without_catalog_is_empty() {
        let harness = TestHarness::builder().without_catalog().build().await.unwrap();
        assert!(harness.storage.list_products().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn run_with_empty_mailbox_sees_nothing() {
        let harness = TestHarness::builder().build().await.unwrap();
        let report = harness.run_once().await.unwrap();
        assert_eq!(report.seen(), 0);
        assert_eq!(harness.provider.call_count(), 0);
    }
}
