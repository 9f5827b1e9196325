// SPDX-FileCopyrightText: 2026 Kara Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reply generation and mailbox intake for the Kara email assistant.
//!
//! - [`ResponseGenerator`] answers from the FAQ table or makes one
//!   rate-limited provider call with bounded retries.
//! - [`ReplyPipeline`] turns a query into a reply: intent, catalog search,
//!   preferences, context assembly, generation.
//! - [`IntakeWorker`] drives the task ledger for unseen mail and exposes
//!   manual [`reprocess`](IntakeWorker::reprocess).
//! - [`ChatService`] answers questions keyed by a chat session.
//! - [`Scheduler`] polls periodically and retries failed runs.

pub mod chat;
pub mod faq;
pub mod intake;
pub mod pipeline;
pub mod prompt;
pub mod reprocess;
pub mod responder;
pub mod scheduler;
pub mod shutdown;

use std::sync::Arc;

use kara_config::KaraConfig;
use kara_core::{ChatProvider, StorageAdapter};
use kara_resilience::{LimiterSettings, RateLimiter};

pub use chat::ChatService;
pub use faq::{FaqCache, FaqHit, FaqTopic};
pub use intake::{IntakeWorker, MessageOutcome, RunReport, WorkerSettings};
pub use pipeline::{PipelineError, PipelineSettings, ReplyPipeline};
pub use reprocess::ReprocessOutcome;
pub use responder::{Generation, GenerationError, GeneratorSettings, ReplySource, ResponseGenerator};
pub use scheduler::{ScheduleSettings, Scheduler};

/// Wires a [`ReplyPipeline`] from configuration.
///
/// The rate limiter is created here, once per process, and shared by every
/// caller of the returned pipeline.
pub async fn build_pipeline(
    config: &KaraConfig,
    storage: Arc<dyn StorageAdapter>,
    provider: Arc<dyn ChatProvider>,
) -> ReplyPipeline {
    let limiter = Arc::new(RateLimiter::new(LimiterSettings::from(&config.rate_limit)));
    let generator = ResponseGenerator::new(
        provider,
        limiter,
        FaqCache::new(config.agent.store_name.clone()),
        GeneratorSettings::from(&config.provider),
    );
    let system_prompt = prompt::load_system_prompt(&config.agent).await;
    ReplyPipeline::new(
        storage,
        generator,
        system_prompt,
        PipelineSettings::from(&config.worker),
    )
}
