// SPDX-FileCopyrightText: 2026 Kara Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Kara email assistant.
//!
//! This crate holds the error taxonomy, the domain types shared by the
//! intake pipeline (tasks, conversation turns, catalog products, chat
//! messages) and the adapter traits implemented by storage, LLM provider
//! and mail transport backends.

pub mod error;
pub mod traits;
pub mod types;

pub use error::{KaraError, ProviderError};
pub use types::{
    AdapterType, ChatCompletion, ChatMessage, ChatRequest, ChatRole, ConversationTurn,
    ERROR_MARKER, EmailTask, HealthStatus, HistoryTurn, InboundEmail, NewEmailTask,
    OutgoingEmail, Product, TaskStatus, Variant,
};

pub use traits::{
    ChatProvider, MailSender, MailboxConnector, MailboxSession, PluginAdapter, StorageAdapter,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adapter_type_round_trips_through_strings() {
        use std::str::FromStr;

        for variant in [
            AdapterType::Storage,
            AdapterType::Provider,
            AdapterType::Mailbox,
            AdapterType::Mailer,
            AdapterType::Metrics,
        ] {
            let parsed = AdapterType::from_str(&variant.to_string()).expect("should parse back");
            assert_eq!(variant, parsed);
        }
    }

    #[test]
    fn health_status_variants() {
        assert_eq!(HealthStatus::Healthy, HealthStatus::Healthy);
        assert_ne!(HealthStatus::Degraded("slow".into()), HealthStatus::Healthy);
        assert_ne!(HealthStatus::Unhealthy("down".into()), HealthStatus::Healthy);
    }

    #[test]
    fn all_traits_are_exported() {
        fn _assert_plugin<T: PluginAdapter>() {}
        fn _assert_storage<T: StorageAdapter>() {}
        fn _assert_provider<T: ChatProvider>() {}
        fn _assert_connector<T: MailboxConnector>() {}
        fn _assert_sender<T: MailSender>() {}
        fn _assert_session<T: MailboxSession>() {}
    }
}
