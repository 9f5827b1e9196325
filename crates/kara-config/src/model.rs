// SPDX-FileCopyrightText: 2026 Kara Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model.
//!
//! Every struct uses `#[serde(deny_unknown_fields)]` so a misspelled key
//! fails at startup instead of being silently ignored.

use serde::{Deserialize, Serialize};

/// Top-level Kara configuration. All sections are optional.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct KaraConfig {
    /// Persona and logging.
    #[serde(default)]
    pub agent: AgentConfig,

    /// Chat-completion provider.
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Outbound LLM call throttling and circuit breaking.
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// SQLite storage.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Inbound mailbox.
    #[serde(default)]
    pub imap: ImapConfig,

    /// Outbound mail relay.
    #[serde(default)]
    pub smtp: SmtpConfig,

    /// Intake worker behavior.
    #[serde(default)]
    pub worker: WorkerConfig,

    /// Metrics export.
    #[serde(default)]
    pub prometheus: PrometheusConfig,
}

/// Persona and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Name the assistant signs with.
    #[serde(default = "default_agent_name")]
    pub name: String,

    /// Store the assistant speaks for.
    #[serde(default = "default_store_name")]
    pub store_name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Inline persona prompt replacing the built-in one.
    #[serde(default)]
    pub system_prompt: Option<String>,

    /// File holding the persona prompt. Wins over `system_prompt`.
    #[serde(default)]
    pub system_prompt_file: Option<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            store_name: default_store_name(),
            log_level: default_log_level(),
            system_prompt: None,
            system_prompt_file: None,
        }
    }
}

fn default_agent_name() -> String {
    "Kara".to_string()
}

fn default_store_name() -> String {
    "VOID Indumentaria".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// OpenAI-compatible chat-completion provider.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    /// API key. `None` falls back to `KARA_PROVIDER_API_KEY`, then `GROQ_API_KEY`.
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Retries after a rate-limited or unavailable response.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// First backoff delay; doubles on each retry.
    #[serde(default = "default_backoff_base_secs")]
    pub backoff_base_secs: u64,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            max_retries: default_max_retries(),
            backoff_base_secs: default_backoff_base_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.groq.com/openai/v1".to_string()
}

fn default_model() -> String {
    "llama-3.1-8b-instant".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    150
}

fn default_max_retries() -> u32 {
    3
}

fn default_backoff_base_secs() -> u64 {
    30
}

fn default_request_timeout_secs() -> u64 {
    60
}

/// Sliding-window limiter and circuit breaker for LLM calls.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RateLimitConfig {
    /// Calls admitted per window.
    #[serde(default = "default_max_calls_per_minute")]
    pub max_calls_per_minute: u32,

    #[serde(default = "default_window_secs")]
    pub window_secs: u64,

    /// How long the circuit stays open.
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,

    /// Consecutive failures that open the circuit.
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_calls_per_minute: default_max_calls_per_minute(),
            window_secs: default_window_secs(),
            cooldown_secs: default_cooldown_secs(),
            failure_threshold: default_failure_threshold(),
        }
    }
}

fn default_max_calls_per_minute() -> u32 {
    25
}

fn default_window_secs() -> u64 {
    60
}

fn default_cooldown_secs() -> u64 {
    120
}

fn default_failure_threshold() -> u32 {
    3
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL mode.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("kara").join("kara.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("kara.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Inbound IMAP mailbox (implicit TLS).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ImapConfig {
    #[serde(default = "default_imap_host")]
    pub host: String,

    #[serde(default = "default_imap_port")]
    pub port: u16,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    #[serde(default = "default_mailbox")]
    pub mailbox: String,
}

impl Default for ImapConfig {
    fn default() -> Self {
        Self {
            host: default_imap_host(),
            port: default_imap_port(),
            username: None,
            password: None,
            mailbox: default_mailbox(),
        }
    }
}

fn default_imap_host() -> String {
    "imap.gmail.com".to_string()
}

fn default_imap_port() -> u16 {
    993
}

fn default_mailbox() -> String {
    "INBOX".to_string()
}

/// Outbound SMTP relay (STARTTLS).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SmtpConfig {
    #[serde(default = "default_smtp_host")]
    pub host: String,

    #[serde(default = "default_smtp_port")]
    pub port: u16,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    /// Sender address. Defaults to `username`.
    #[serde(default)]
    pub from: Option<String>,

    /// Attach an HTML part rendered from the Markdown reply.
    #[serde(default = "default_html_alternative")]
    pub html_alternative: bool,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: default_smtp_host(),
            port: default_smtp_port(),
            username: None,
            password: None,
            from: None,
            html_alternative: default_html_alternative(),
        }
    }
}

fn default_smtp_host() -> String {
    "smtp.gmail.com".to_string()
}

fn default_smtp_port() -> u16 {
    587
}

fn default_html_alternative() -> bool {
    true
}

/// Intake worker tuning.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WorkerConfig {
    /// Seconds between scheduled polling runs.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Attempts before a task is dead-lettered.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Pause after a successful reply.
    #[serde(default = "default_success_delay_secs")]
    pub success_delay_secs: u64,

    /// Pause after a generation failure.
    #[serde(default = "default_failure_delay_secs")]
    pub failure_delay_secs: u64,

    /// Pause after an unexpected per-message error.
    #[serde(default = "default_error_delay_secs")]
    pub error_delay_secs: u64,

    /// Prior exchanges replayed to the model.
    #[serde(default = "default_history_turns")]
    pub history_turns: usize,

    /// Upper bound for the catalog context, in characters.
    #[serde(default = "default_catalog_context_chars")]
    pub catalog_context_chars: usize,

    #[serde(default = "default_search_limit")]
    pub search_limit: usize,

    #[serde(default = "default_recommendation_limit")]
    pub recommendation_limit: usize,

    /// Turns mined for preferences.
    #[serde(default = "default_preference_turns")]
    pub preference_turns: usize,

    /// Send a "we'll follow up" reply when a task is abandoned.
    #[serde(default = "default_send_fallback")]
    pub send_fallback_on_dead_letter: bool,

    /// Retries of a failed polling run.
    #[serde(default = "default_run_max_retries")]
    pub run_max_retries: u32,

    /// First delay between run retries; doubles each time.
    #[serde(default = "default_run_retry_backoff_secs")]
    pub run_retry_backoff_secs: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            max_attempts: default_max_attempts(),
            success_delay_secs: default_success_delay_secs(),
            failure_delay_secs: default_failure_delay_secs(),
            error_delay_secs: default_error_delay_secs(),
            history_turns: default_history_turns(),
            catalog_context_chars: default_catalog_context_chars(),
            search_limit: default_search_limit(),
            recommendation_limit: default_recommendation_limit(),
            preference_turns: default_preference_turns(),
            send_fallback_on_dead_letter: default_send_fallback(),
            run_max_retries: default_run_max_retries(),
            run_retry_backoff_secs: default_run_retry_backoff_secs(),
        }
    }
}

fn default_poll_interval_secs() -> u64 {
    120
}

fn default_max_attempts() -> u32 {
    5
}

fn default_success_delay_secs() -> u64 {
    10
}

fn default_failure_delay_secs() -> u64 {
    60
}

fn default_error_delay_secs() -> u64 {
    30
}

fn default_history_turns() -> usize {
    3
}

fn default_catalog_context_chars() -> usize {
    2000
}

fn default_search_limit() -> usize {
    3
}

fn default_recommendation_limit() -> usize {
    3
}

fn default_preference_turns() -> usize {
    20
}

fn default_send_fallback() -> bool {
    true
}

fn default_run_max_retries() -> u32 {
    5
}

fn default_run_retry_backoff_secs() -> u64 {
    60
}

/// Prometheus exporter.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PrometheusConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Socket address of the scrape endpoint.
    #[serde(default = "default_prometheus_listen")]
    pub listen: String,
}

impl Default for PrometheusConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen: default_prometheus_listen(),
        }
    }
}

fn default_prometheus_listen() -> String {
    "127.0.0.1:9464".to_string()
}
