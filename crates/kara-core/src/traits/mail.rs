// SPDX-FileCopyrightText: 2026 Kara Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mailbox and outbound mail traits.

use async_trait::async_trait;

use crate::error::KaraError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{InboundEmail, OutgoingEmail};

/// Opens authenticated mailbox sessions.
#[async_trait]
pub trait MailboxConnector: PluginAdapter {
    /// Connects, logs in and selects the configured mailbox.
    ///
    /// Any failure here aborts the whole polling run.
    async fn connect(&self) -> Result<Box<dyn MailboxSession>, KaraError>;
}

/// A live mailbox connection reused across one polling run.
#[async_trait]
pub trait MailboxSession: Send {
    /// Lists unseen messages in mailbox order with their bodies.
    ///
    /// Must not set the `\Seen` flag.
    async fn list_unseen(&mut self) -> Result<Vec<InboundEmail>, KaraError>;

    /// Marks one message as read.
    async fn flag_seen(&mut self, uid: &str) -> Result<(), KaraError>;

    /// Ends the session.
    async fn logout(self: Box<Self>) -> Result<(), KaraError>;
}

/// Delivers replies.
#[async_trait]
pub trait MailSender: PluginAdapter {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), KaraError>;
}
