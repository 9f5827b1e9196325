// SPDX-FileCopyrightText: 2026 Kara Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Builds the runtime objects shared by the commands.

use std::sync::Arc;

use kara_agent::{IntakeWorker, ReplyPipeline, WorkerSettings, build_pipeline};
use kara_config::model::KaraConfig;
use kara_core::{
    ChatProvider, HealthStatus, KaraError, MailSender, MailboxConnector, PluginAdapter,
    StorageAdapter,
};
use kara_email::{ImapConnector, SmtpMailer};
use kara_openai::OpenAiProvider;
use kara_storage::SqliteStorage;
use tracing::{info, warn};

/// Opens and migrates the SQLite database.
pub async fn open_storage(config: &KaraConfig) -> Result<Arc<dyn StorageAdapter>, KaraError> {
    let storage = SqliteStorage::new(config.storage.clone());
    storage.initialize().await?;
    Ok(Arc::new(storage))
}

/// Wires the reply pipeline around the configured provider.
pub async fn pipeline(
    config: &KaraConfig,
    storage: Arc<dyn StorageAdapter>,
) -> Result<Arc<ReplyPipeline>, KaraError> {
    let provider: Arc<dyn ChatProvider> = Arc::new(OpenAiProvider::new(&config.provider)?);
    info!(
        provider = provider.name(),
        model = %config.provider.model,
        "chat provider ready"
    );
    Ok(Arc::new(build_pipeline(config, storage, provider).await))
}

/// Everything the intake worker needs, ready to run.
pub struct Intake {
    pub storage: Arc<dyn StorageAdapter>,
    pub worker: Arc<IntakeWorker>,
    pub mailer: Arc<dyn MailSender>,
}

pub async fn intake(config: &KaraConfig) -> Result<Intake, KaraError> {
    let storage = open_storage(config).await?;
    let pipeline = pipeline(config, storage.clone()).await?;
    let mailbox: Arc<dyn MailboxConnector> = Arc::new(ImapConnector::new(config.imap.clone())?);
    let mailer: Arc<dyn MailSender> = Arc::new(SmtpMailer::new(&config.smtp)?);

    let worker = Arc::new(IntakeWorker::new(
        pipeline,
        storage.clone(),
        mailbox,
        mailer.clone(),
        WorkerSettings::from(&config.worker),
        &config.agent,
    ));
    Ok(Intake {
        storage,
        worker,
        mailer,
    })
}

/// Logs the health of an adapter; an unhealthy adapter is not fatal.
pub async fn report_health<A: PluginAdapter + ?Sized>(adapter: &A) {
    match adapter.health_check().await {
        Ok(HealthStatus::Healthy) => info!(adapter = adapter.name(), "adapter healthy"),
        Ok(HealthStatus::Degraded(reason)) => {
            warn!(adapter = adapter.name(), reason, "adapter degraded")
        }
        Ok(HealthStatus::Unhealthy(reason)) => {
            warn!(adapter = adapter.name(), reason, "adapter unhealthy")
        }
        Err(e) => warn!(adapter = adapter.name(), error = %e, "health check failed"),
    }
}
