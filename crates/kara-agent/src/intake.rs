// SPDX-FileCopyrightText: 2026 Kara Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mailbox intake worker.
//!
//! One [`IntakeWorker::run_once`] call drains the unseen messages of the
//! mailbox strictly one at a time. Per message the task ledger moves
//! `pending -> processing -> {done | pending | dead_letter}`; a message is
//! flagged as seen only once its task is terminal, so a failed attempt is
//! picked up again by the next run.

use std::sync::Arc;
use std::time::Duration;

use kara_config::model::{AgentConfig, WorkerConfig};
use kara_core::{
    EmailTask, InboundEmail, KaraError, MailSender, MailboxConnector, MailboxSession,
    NewEmailTask, OutgoingEmail, StorageAdapter, TaskStatus,
};
use tracing::{debug, error, info, warn};

use crate::pipeline::{PipelineError, ReplyPipeline};
use crate::prompt::{email_prompt, fallback_reply, reply_subject};

/// Extra `complete_task` tries after a reply went out.
const RECORD_RETRIES: u32 = 2;

/// Why an attempt did not finish.
#[derive(Debug)]
pub(crate) enum AttemptError {
    /// Nothing reached the sender; the attempt may be retried.
    Pipeline(PipelineError),
    /// The reply was sent but marking the task done failed.
    Unrecorded(KaraError),
}

/// Pacing and retry limits for the worker.
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    pub max_attempts: u32,
    /// Pause after a message was answered.
    pub success_delay: Duration,
    /// Pause after generation failed and the task was released.
    pub failure_delay: Duration,
    /// Pause after an unexpected per-message error.
    pub error_delay: Duration,
    pub send_fallback_on_dead_letter: bool,
}

impl From<&WorkerConfig> for WorkerSettings {
    fn from(config: &WorkerConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            success_delay: Duration::from_secs(config.success_delay_secs),
            failure_delay: Duration::from_secs(config.failure_delay_secs),
            error_delay: Duration::from_secs(config.error_delay_secs),
            send_fallback_on_dead_letter: config.send_fallback_on_dead_letter,
        }
    }
}

/// What happened to one unseen message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageOutcome {
    /// Reply sent, task done, message flagged.
    Answered { task_id: i64 },
    /// Generation failed; task back to pending, message left unseen.
    Released { task_id: i64, attempts: u32 },
    /// Attempts exhausted; task dead-lettered and message flagged.
    DeadLettered { task_id: i64 },
    /// Task already terminal; message flagged and nothing else done.
    AlreadyTerminal { task_id: i64, status: TaskStatus },
    /// A manual reprocess owns the task right now.
    InFlight { task_id: i64 },
    /// Reply sent but the task could not be marked done; flagged so the
    /// sender is never answered twice.
    Unrecorded { task_id: i64 },
    /// No readable body; flagged without creating a task.
    EmptyBody,
    /// Unexpected failure, logged; the remaining batch continues.
    Errored { message: String },
}

impl MessageOutcome {
    fn label(&self) -> &'static str {
        match self {
            Self::Answered { .. } => "answered",
            Self::Released { .. } => "released",
            Self::DeadLettered { .. } => "dead_letter",
            Self::AlreadyTerminal { .. } => "skipped",
            Self::InFlight { .. } => "in_flight",
            Self::Unrecorded { .. } => "unrecorded",
            Self::EmptyBody => "empty",
            Self::Errored { .. } => "error",
        }
    }

    fn delay(&self, settings: &WorkerSettings) -> Duration {
        match self {
            Self::Answered { .. } | Self::Unrecorded { .. } => settings.success_delay,
            Self::Released { .. } => settings.failure_delay,
            Self::Errored { .. } => settings.error_delay,
            _ => Duration::ZERO,
        }
    }
}

/// Summary of one polling run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub outcomes: Vec<(String, MessageOutcome)>,
}

impl RunReport {
    pub fn seen(&self) -> usize {
        self.outcomes.len()
    }

    pub fn count(&self, predicate: impl Fn(&MessageOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|(_, o)| predicate(o)).count()
    }

    pub fn answered(&self) -> usize {
        self.count(|o| matches!(o, MessageOutcome::Answered { .. }))
    }

    pub fn released(&self) -> usize {
        self.count(|o| matches!(o, MessageOutcome::Released { .. }))
    }

    pub fn dead_lettered(&self) -> usize {
        self.count(|o| matches!(o, MessageOutcome::DeadLettered { .. }))
    }

    pub fn errored(&self) -> usize {
        self.count(|o| matches!(o, MessageOutcome::Errored { .. }))
    }
}

pub struct IntakeWorker {
    pub(crate) pipeline: Arc<ReplyPipeline>,
    pub(crate) storage: Arc<dyn StorageAdapter>,
    mailbox: Arc<dyn MailboxConnector>,
    pub(crate) mailer: Arc<dyn MailSender>,
    pub(crate) settings: WorkerSettings,
    pub(crate) fallback_text: String,
}

impl IntakeWorker {
    pub fn new(
        pipeline: Arc<ReplyPipeline>,
        storage: Arc<dyn StorageAdapter>,
        mailbox: Arc<dyn MailboxConnector>,
        mailer: Arc<dyn MailSender>,
        settings: WorkerSettings,
        agent: &AgentConfig,
    ) -> Self {
        Self {
            pipeline,
            storage,
            mailbox,
            mailer,
            settings,
            fallback_text: fallback_reply(&agent.name, &agent.store_name),
        }
    }

    /// Processes every unseen message once.
    ///
    /// A mailbox connection or listing failure aborts the run and is
    /// returned; per-message failures are recorded in the report.
    pub async fn run_once(&self) -> Result<RunReport, KaraError> {
        let mut session = self.mailbox.connect().await?;
        let unseen = match session.list_unseen().await {
            Ok(unseen) => unseen,
            Err(e) => {
                if let Err(logout_err) = session.logout().await {
                    debug!(error = %logout_err, "logout after failed listing also failed");
                }
                return Err(e);
            }
        };
        info!(count = unseen.len(), "polling run started");

        let mut report = RunReport::default();
        let total = unseen.len();
        for (idx, email) in unseen.iter().enumerate() {
            let outcome = match self.handle_message(session.as_mut(), email).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!(uid = email.uid, sender = email.sender, error = %e, "message processing failed");
                    MessageOutcome::Errored {
                        message: e.to_string(),
                    }
                }
            };
            #[cfg(feature = "prometheus")]
            kara_prometheus::record_message(outcome.label());
            debug!(uid = email.uid, outcome = outcome.label(), "message handled");

            let delay = outcome.delay(&self.settings);
            report.outcomes.push((email.uid.clone(), outcome));
            if idx + 1 < total && !delay.is_zero() {
                debug!(delay_secs = delay.as_secs(), "pacing before next message");
                tokio::time::sleep(delay).await;
            }
        }

        if let Err(e) = session.logout().await {
            warn!(error = %e, "mailbox logout failed");
        }

        info!(
            seen = report.seen(),
            answered = report.answered(),
            released = report.released(),
            dead_lettered = report.dead_lettered(),
            errored = report.errored(),
            "polling run finished"
        );
        Ok(report)
    }

    async fn handle_message(
        &self,
        session: &mut dyn MailboxSession,
        email: &InboundEmail,
    ) -> Result<MessageOutcome, KaraError> {
        let Some(body) = email.body.as_deref().map(str::trim).filter(|b| !b.is_empty()) else {
            info!(uid = email.uid, "message has no text body, marking read");
            session.flag_seen(&email.uid).await?;
            return Ok(MessageOutcome::EmptyBody);
        };

        let task = match self.storage.find_task_by_uid(&email.uid).await? {
            Some(task) => task,
            None => {
                let task = self
                    .storage
                    .create_task(&NewEmailTask {
                        uid: email.uid.clone(),
                        sender_email: email.sender.clone(),
                        subject: email.subject.clone(),
                        body: body.to_string(),
                        max_attempts: self.settings.max_attempts,
                    })
                    .await?;
                info!(task_id = task.id, uid = email.uid, "task created");
                task
            }
        };

        match task.status {
            TaskStatus::Done | TaskStatus::DeadLetter | TaskStatus::Failed => {
                debug!(task_id = task.id, status = %task.status, "task already terminal, marking read");
                session.flag_seen(&email.uid).await?;
                return Ok(MessageOutcome::AlreadyTerminal {
                    task_id: task.id,
                    status: task.status,
                });
            }
            TaskStatus::Reprocessing => {
                warn!(task_id = task.id, "task is being reprocessed, leaving message unread");
                return Ok(MessageOutcome::InFlight { task_id: task.id });
            }
            TaskStatus::Pending | TaskStatus::Processing => {}
        }

        if task.attempts_exhausted() {
            let reason = format!("Max attempts ({}) reached", task.max_attempts);
            self.dead_letter(&task, &reason).await?;
            session.flag_seen(&email.uid).await?;
            return Ok(MessageOutcome::DeadLettered { task_id: task.id });
        }

        let task = self
            .storage
            .begin_attempt(task.id, TaskStatus::Processing)
            .await?;
        info!(
            task_id = task.id,
            uid = email.uid,
            attempt = task.attempts,
            max_attempts = task.max_attempts,
            "processing message"
        );

        match self.attempt(&task).await {
            Ok(()) => {
                session.flag_seen(&email.uid).await?;
                info!(task_id = task.id, "message answered");
                Ok(MessageOutcome::Answered { task_id: task.id })
            }
            Err(AttemptError::Unrecorded(e)) => {
                error!(
                    alert = true,
                    task_id = task.id,
                    uid = email.uid,
                    error = %e,
                    "reply sent but task not recorded, marking read"
                );
                session.flag_seen(&email.uid).await?;
                Ok(MessageOutcome::Unrecorded { task_id: task.id })
            }
            Err(AttemptError::Pipeline(e)) => {
                let detail = e.to_string();
                if task.attempts_exhausted() {
                    let reason = format!("Max attempts ({}) reached: {detail}", task.max_attempts);
                    self.dead_letter(&task, &reason).await?;
                    session.flag_seen(&email.uid).await?;
                    return Ok(MessageOutcome::DeadLettered { task_id: task.id });
                }

                let released = self
                    .storage
                    .release_task(task.id, &format!("Processing Error: {detail}"))
                    .await?;
                warn!(
                    task_id = task.id,
                    attempt = released.attempts,
                    error = %detail,
                    "attempt failed, task released for retry"
                );
                Ok(MessageOutcome::Released {
                    task_id: task.id,
                    attempts: released.attempts,
                })
            }
        }
    }

    /// Generates, sends and records a reply for a task in flight.
    ///
    /// Once the reply is sent the attempt can only end in
    /// [`AttemptError::Unrecorded`], never in a retryable failure.
    pub(crate) async fn attempt(&self, task: &EmailTask) -> Result<(), AttemptError> {
        let generation = self
            .pipeline
            .answer(&task.sender_email, &task.body, &email_prompt(&task.body))
            .await
            .map_err(AttemptError::Pipeline)?;
        debug!(task_id = task.id, source = ?generation.source, "reply generated");

        self.mailer
            .send(&OutgoingEmail {
                to: task.sender_email.clone(),
                subject: reply_subject(&task.subject),
                body: generation.text.clone(),
            })
            .await
            .map_err(|e| AttemptError::Pipeline(e.into()))?;
        self.record_reply(task, &generation.text)
            .await
            .map_err(AttemptError::Unrecorded)
    }

    /// Marks a task done after its reply went out, retrying a failed write.
    async fn record_reply(&self, task: &EmailTask, response: &str) -> Result<(), KaraError> {
        let mut retry = 0;
        loop {
            let error = match self.storage.complete_task(task.id, response).await {
                Ok(_) => return Ok(()),
                Err(e) => e,
            };
            // The write may have committed before the error surfaced.
            if let Ok(Some(current)) = self.storage.get_task(task.id).await {
                if current.status == TaskStatus::Done {
                    return Ok(());
                }
            }
            if retry >= RECORD_RETRIES {
                return Err(error);
            }
            retry += 1;
            warn!(task_id = task.id, retry, error = %error, "recording sent reply failed, retrying");
        }
    }

    async fn dead_letter(&self, task: &EmailTask, reason: &str) -> Result<(), KaraError> {
        self.storage.dead_letter_task(task.id, reason).await?;
        error!(
            alert = true,
            task_id = task.id,
            uid = task.uid,
            sender = task.sender_email,
            attempts = task.attempts,
            reason,
            "task dead-lettered, operator action required"
        );
        if self.settings.send_fallback_on_dead_letter {
            self.send_fallback(task).await;
        }
        Ok(())
    }

    /// Best-effort apology to the sender; failures are only logged.
    pub(crate) async fn send_fallback(&self, task: &EmailTask) {
        let reply = OutgoingEmail {
            to: task.sender_email.clone(),
            subject: reply_subject(&task.subject),
            body: self.fallback_text.clone(),
        };
        if let Err(e) = self.mailer.send(&reply).await {
            warn!(task_id = task.id, error = %e, "fallback reply could not be sent");
        }
    }
}
