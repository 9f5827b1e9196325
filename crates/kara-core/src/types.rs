// SPDX-FileCopyrightText: 2026 Kara Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared across the Kara workspace.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Prefix stored in a turn's response when generation failed.
///
/// Turns carrying it are kept for preference mining but never replayed to
/// the model as assistant context.
pub const ERROR_MARKER: &str = "ERROR:";

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of adapter behind a trait object.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Storage,
    Provider,
    Mailbox,
    Mailer,
    Metrics,
}

// --- Task ledger ---

/// Lifecycle state of an [`EmailTask`].
///
/// Automatic path: `pending -> processing -> {done | pending | dead_letter}`.
/// Manual path: `reprocessing -> {done | failed}`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Processing,
    Reprocessing,
    Done,
    Failed,
    DeadLetter,
}

impl TaskStatus {
    /// States the polling cycle never touches again.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed | Self::DeadLetter)
    }

    /// Whether the lifecycle allows moving from `self` to `next`.
    ///
    /// `processing`/`reprocessing` may be re-entered from themselves so a
    /// task abandoned by a crashed worker can be picked up again.
    pub fn can_transition_to(self, next: TaskStatus) -> bool {
        use TaskStatus::*;
        match (self, next) {
            (Pending | Processing | Reprocessing, Processing) => true,
            (Processing, Done | Pending | DeadLetter) => true,
            (Pending, DeadLetter) => true,
            (Pending | Processing | Reprocessing | Failed | DeadLetter, Reprocessing) => true,
            (Reprocessing, Done | Failed) => true,
            _ => false,
        }
    }
}

/// One inbound message and its processing lifecycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailTask {
    pub id: i64,
    pub uid: String,
    pub sender_email: String,
    pub subject: String,
    pub body: String,
    pub status: TaskStatus,
    pub attempts: u32,
    pub max_attempts: u32,
    pub response: Option<String>,
    pub error_message: Option<String>,
    pub created_at: String,
    pub last_attempt_at: Option<String>,
    pub processed_at: Option<String>,
}

impl EmailTask {
    /// True once the retry budget is spent.
    pub fn attempts_exhausted(&self) -> bool {
        self.attempts >= self.max_attempts
    }
}

/// Fields required to register a newly observed message.
#[derive(Debug, Clone)]
pub struct NewEmailTask {
    pub uid: String,
    pub sender_email: String,
    pub subject: String,
    pub body: String,
    pub max_attempts: u32,
}

// --- Conversation history ---

/// One stored request/response exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub id: i64,
    /// Chat session id, or the sender address for mail-originated turns.
    pub session_id: String,
    pub prompt: String,
    pub response: String,
    pub created_at: String,
}

impl ConversationTurn {
    /// True when the stored response records a failed generation.
    pub fn is_error(&self) -> bool {
        self.response.starts_with(ERROR_MARKER)
    }
}

/// A prior message replayed to the model as context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryTurn {
    User(String),
    Assistant(String),
}

impl HistoryTurn {
    /// Flattens stored turns (oldest first) into alternating messages.
    ///
    /// Responses carrying [`ERROR_MARKER`] are dropped; their prompts stay.
    pub fn from_turns(turns: &[ConversationTurn]) -> Vec<HistoryTurn> {
        let mut history = Vec::with_capacity(turns.len() * 2);
        for turn in turns {
            history.push(HistoryTurn::User(turn.prompt.clone()));
            if !turn.is_error() {
                history.push(HistoryTurn::Assistant(turn.response.clone()));
            }
        }
        history
    }

    pub fn text(&self) -> &str {
        match self {
            HistoryTurn::User(text) | HistoryTurn::Assistant(text) => text,
        }
    }
}

// --- Catalog ---

/// A sellable size/color combination of a product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variant {
    pub size: String,
    pub color: String,
    pub stock: i64,
}

/// A catalog product with its variants, read-only for the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    #[serde(default)]
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: f64,
    #[serde(default)]
    pub material: Option<String>,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub variants: Vec<Variant>,
}

impl Product {
    /// Sum of the variants' stock quantities.
    pub fn total_stock(&self) -> i64 {
        self.variants.iter().map(|v| v.stock.max(0)).sum()
    }

    pub fn is_available(&self) -> bool {
        self.total_stock() > 0
    }
}

// --- Chat completion ---

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

impl From<&HistoryTurn> for ChatMessage {
    fn from(turn: &HistoryTurn) -> Self {
        match turn {
            HistoryTurn::User(text) => ChatMessage::user(text.clone()),
            HistoryTurn::Assistant(text) => ChatMessage::assistant(text.clone()),
        }
    }
}

/// A single chat-completion call.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// The text produced by a chat-completion call.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatCompletion {
    /// Raw content; may be empty or whitespace.
    pub content: String,
    pub model: String,
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
}

// --- Mail ---

/// An unseen message fetched from the mailbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundEmail {
    /// Mailbox-assigned UID, unique within the mailbox.
    pub uid: String,
    pub sender: String,
    pub subject: String,
    /// Plain-text body, `None` when the message had no readable text.
    pub body: Option<String>,
}

/// A reply to be delivered by the mail sender.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn turn(prompt: &str, response: &str) -> ConversationTurn {
        ConversationTurn {
            id: 0,
            session_id: "ana@example.com".into(),
            prompt: prompt.into(),
            response: response.into(),
            created_at: "2026-01-01T00:00:00.000Z".into(),
        }
    }

    #[test]
    fn status_strings_are_snake_case() {
        assert_eq!(TaskStatus::DeadLetter.to_string(), "dead_letter");
        assert_eq!(TaskStatus::from_str("reprocessing").unwrap(), TaskStatus::Reprocessing);
        assert!(TaskStatus::from_str("archived").is_err());
    }

    #[test]
    fn done_and_dead_letter_are_absorbing_for_the_automatic_path() {
        for terminal in [TaskStatus::Done, TaskStatus::DeadLetter] {
            for next in [TaskStatus::Pending, TaskStatus::Processing, TaskStatus::Done] {
                assert!(!terminal.can_transition_to(next), "{terminal} -> {next}");
            }
        }
    }

    #[test]
    fn automatic_and_manual_paths_are_allowed() {
        use TaskStatus::*;
        assert!(Pending.can_transition_to(Processing));
        assert!(Processing.can_transition_to(Done));
        assert!(Processing.can_transition_to(Pending));
        assert!(Processing.can_transition_to(DeadLetter));
        assert!(DeadLetter.can_transition_to(Reprocessing));
        assert!(Reprocessing.can_transition_to(Failed));
        assert!(!Reprocessing.can_transition_to(Pending));
        assert!(!Failed.can_transition_to(Processing));
    }

    #[test]
    fn history_drops_error_responses_but_keeps_prompts() {
        let turns = vec![
            turn("hola", "¡Hola! ¿En qué te ayudo?"),
            turn("tienen remeras?", "ERROR: Failed to get response: timeout"),
            turn("y buzos?", "Sí, tenemos buzos."),
        ];
        let history = HistoryTurn::from_turns(&turns);
        assert_eq!(
            history,
            vec![
                HistoryTurn::User("hola".into()),
                HistoryTurn::Assistant("¡Hola! ¿En qué te ayudo?".into()),
                HistoryTurn::User("tienen remeras?".into()),
                HistoryTurn::User("y buzos?".into()),
                HistoryTurn::Assistant("Sí, tenemos buzos.".into()),
            ]
        );
    }

    #[test]
    fn availability_sums_variant_stock() {
        let mut product = Product {
            id: 1,
            name: "Remera negra".into(),
            description: None,
            price: 15000.0,
            material: None,
            size: None,
            color: Some("negro".into()),
            category: Some("Remeras".into()),
            variants: vec![],
        };
        assert!(!product.is_available());
        product.variants.push(Variant {
            size: "M".into(),
            color: "negro".into(),
            stock: 0,
        });
        assert!(!product.is_available());
        product.variants.push(Variant {
            size: "L".into(),
            color: "negro".into(),
            stock: 4,
        });
        assert_eq!(product.total_stock(), 4);
        assert!(product.is_available());
    }

    #[test]
    fn chat_roles_serialize_lowercase() {
        let json = serde_json::to_string(&ChatMessage::system("x")).unwrap();
        assert_eq!(json, r#"{"role":"system","content":"x"}"#);
    }
}
