// SPDX-FileCopyrightText: 2026 Kara Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of [`StorageAdapter`].

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use kara_config::model::StorageConfig;
use kara_core::{
    AdapterType, ConversationTurn, EmailTask, HealthStatus, KaraError, NewEmailTask,
    PluginAdapter, Product, StorageAdapter, TaskStatus,
};

use crate::database::Database;
use crate::queries;

/// SQLite-backed storage. The database opens on [`StorageAdapter::initialize`].
pub struct SqliteStorage {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    fn db(&self) -> Result<&Database, KaraError> {
        self.db.get().ok_or_else(|| KaraError::Storage {
            source: "storage not initialized, call initialize() first".into(),
        })
    }
}

#[async_trait]
impl PluginAdapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, KaraError> {
        self.db()?
            .connection()
            .call(|conn| -> Result<(), rusqlite::Error> { conn.execute_batch("SELECT 1;") })
            .await
            .map_err(crate::database::map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), KaraError> {
        if let Some(db) = self.db.get() {
            db.checkpoint().await?;
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl StorageAdapter for SqliteStorage {
    async fn initialize(&self) -> Result<(), KaraError> {
        let db = Database::open(&self.config.database_path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| KaraError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), KaraError> {
        self.db()?.checkpoint().await
    }

    async fn create_task(&self, task: &NewEmailTask) -> Result<EmailTask, KaraError> {
        queries::tasks::create_task(self.db()?, task).await
    }

    async fn find_task_by_uid(&self, uid: &str) -> Result<Option<EmailTask>, KaraError> {
        queries::tasks::find_task_by_uid(self.db()?, uid).await
    }

    async fn get_task(&self, id: i64) -> Result<Option<EmailTask>, KaraError> {
        queries::tasks::get_task(self.db()?, id).await
    }

    async fn list_tasks(
        &self,
        status: Option<TaskStatus>,
        limit: usize,
    ) -> Result<Vec<EmailTask>, KaraError> {
        queries::tasks::list_tasks(self.db()?, status, limit).await
    }

    async fn begin_attempt(&self, id: i64, status: TaskStatus) -> Result<EmailTask, KaraError> {
        queries::tasks::begin_attempt(self.db()?, id, status).await
    }

    async fn complete_task(&self, id: i64, response: &str) -> Result<EmailTask, KaraError> {
        queries::tasks::complete_task(self.db()?, id, response).await
    }

    async fn release_task(&self, id: i64, error: &str) -> Result<EmailTask, KaraError> {
        queries::tasks::release_task(self.db()?, id, error).await
    }

    async fn dead_letter_task(&self, id: i64, reason: &str) -> Result<EmailTask, KaraError> {
        queries::tasks::dead_letter_task(self.db()?, id, reason).await
    }

    async fn fail_task(
        &self,
        id: i64,
        response: &str,
        error: &str,
    ) -> Result<EmailTask, KaraError> {
        queries::tasks::fail_task(self.db()?, id, response, error).await
    }

    async fn append_turn(
        &self,
        session_id: &str,
        prompt: &str,
        response: &str,
    ) -> Result<ConversationTurn, KaraError> {
        queries::turns::append_turn(self.db()?, session_id, prompt, response).await
    }

    async fn recent_turns(
        &self,
        session_id: &str,
        limit: usize,
    ) -> Result<Vec<ConversationTurn>, KaraError> {
        queries::turns::recent_turns(self.db()?, session_id, limit).await
    }

    async fn list_products(&self) -> Result<Vec<Product>, KaraError> {
        queries::catalog::list_products(self.db()?).await
    }

    async fn import_products(&self, products: &[Product]) -> Result<usize, KaraError> {
        queries::catalog::import_products(self.db()?, products).await
    }
}
