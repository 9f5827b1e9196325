// SPDX-FileCopyrightText: 2026 Kara Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions.
//!
//! Every backend extends the [`PluginAdapter`] base trait and uses
//! `#[async_trait]` so it can live behind an `Arc<dyn ...>`.

pub mod adapter;
pub mod mail;
pub mod provider;
pub mod storage;

pub use adapter::PluginAdapter;
pub use mail::{MailSender, MailboxConnector, MailboxSession};
pub use provider::ChatProvider;
pub use storage::StorageAdapter;
