// SPDX-FileCopyrightText: 2026 Kara Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory mailbox and mail sender.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use kara_core::{
    AdapterType, HealthStatus, InboundEmail, KaraError, MailSender, MailboxConnector,
    MailboxSession, OutgoingEmail, PluginAdapter,
};

#[derive(Debug, Default)]
struct MailboxState {
    messages: Vec<(InboundEmail, bool)>,
    connect_failures: u32,
    connects: u32,
    flag_failures: Vec<String>,
}

/// A mailbox whose messages live in memory.
///
/// Cloning shares the same state, so a test can keep a handle while the
/// worker owns another.
#[derive(Clone, Default)]
pub struct MockMailbox {
    state: Arc<Mutex<MailboxState>>,
}

impl MockMailbox {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MailboxState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Adds an unseen message.
    pub fn deliver(&self, email: InboundEmail) {
        self.state().messages.push((email, false));
    }

    pub fn is_seen(&self, uid: &str) -> bool {
        self.state()
            .messages
            .iter()
            .any(|(email, seen)| email.uid == uid && *seen)
    }

    /// Clears the `\Seen` flag, as a user marking a message unread would.
    pub fn mark_unseen(&self, uid: &str) {
        for (email, seen) in self.state().messages.iter_mut() {
            if email.uid == uid {
                *seen = false;
            }
        }
    }

    pub fn unseen_count(&self) -> usize {
        self.state().messages.iter().filter(|(_, seen)| !seen).count()
    }

    /// Makes the next `n` connection attempts fail.
    pub fn fail_next_connects(&self, n: u32) {
        self.state().connect_failures = n;
    }

    /// Makes every `flag_seen` for `uid` fail.
    pub fn fail_flagging(&self, uid: &str) {
        self.state().flag_failures.push(uid.to_string());
    }

    /// Number of connection attempts, failed ones included.
    pub fn connect_count(&self) -> u32 {
        self.state().connects
    }
}

#[async_trait]
impl PluginAdapter for MockMailbox {
    fn name(&self) -> &str {
        "mock-mailbox"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Mailbox
    }

    async fn health_check(&self) -> Result<HealthStatus, KaraError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), KaraError> {
        Ok(())
    }
}

#[async_trait]
impl MailboxConnector for MockMailbox {
    async fn connect(&self) -> Result<Box<dyn MailboxSession>, KaraError> {
        let mut state = self.state();
        state.connects += 1;
        if state.connect_failures > 0 {
            state.connect_failures -= 1;
            return Err(KaraError::mailbox("connection refused"));
        }
        Ok(Box::new(MockSession {
            mailbox: self.clone(),
        }))
    }
}

struct MockSession {
    mailbox: MockMailbox,
}

#[async_trait]
impl MailboxSession for MockSession {
    async fn list_unseen(&mut self) -> Result<Vec<InboundEmail>, KaraError> {
        Ok(self
            .mailbox
            .state()
            .messages
            .iter()
            .filter(|(_, seen)| !seen)
            .map(|(email, _)| email.clone())
            .collect())
    }

    async fn flag_seen(&mut self, uid: &str) -> Result<(), KaraError> {
        let mut state = self.mailbox.state();
        if state.flag_failures.iter().any(|u| u == uid) {
            return Err(KaraError::mailbox(format!("cannot flag {uid}")));
        }
        for (email, seen) in state.messages.iter_mut() {
            if email.uid == uid {
                *seen = true;
            }
        }
        Ok(())
    }

    async fn logout(self: Box<Self>) -> Result<(), KaraError> {
        Ok(())
    }
}

/// Captures outbound replies instead of delivering them.
#[derive(Clone, Default)]
pub struct MockMailer {
    sent: Arc<Mutex<Vec<OutgoingEmail>>>,
    failing: Arc<Mutex<bool>>,
}

impl MockMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn sent_to(&self, address: &str) -> Vec<OutgoingEmail> {
        self.sent()
            .into_iter()
            .filter(|email| email.to == address)
            .collect()
    }

    /// Makes every following `send` fail until reset.
    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock().unwrap_or_else(|e| e.into_inner()) = failing;
    }
}

#[async_trait]
impl PluginAdapter for MockMailer {
    fn name(&self) -> &str {
        "mock-mailer"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Mailer
    }

    async fn health_check(&self) -> Result<HealthStatus, KaraError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), KaraError> {
        Ok(())
    }
}

#[async_trait]
impl MailSender for MockMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), KaraError> {
        if *self.failing.lock().unwrap_or_else(|e| e.into_inner()) {
            return Err(KaraError::mail("SMTP relay unavailable"));
        }
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(email.clone());
        Ok(())
    }
}
