// SPDX-FileCopyrightText: 2026 Kara Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Kara integration tests.
//!
//! Provides mock adapters and a harness for fast, deterministic tests
//! without a mail server or an LLM endpoint.
//!
//! # Components
//!
//! - [`MockProvider`] - scripted chat provider that counts and captures calls
//! - [`MockMailbox`] - in-memory mailbox with seen flags and injectable connection failures
//! - [`MockMailer`] - captures outbound replies
//! - [`FlakyStorage`] - storage wrapper with injectable write failures
//! - [`TestHarness`] - temp database, seeded catalog and a wired worker

pub mod fixtures;
pub mod flaky_storage;
pub mod harness;
pub mod mock_mail;
pub mod mock_provider;

pub use fixtures::{inbound, sample_catalog};
pub use flaky_storage::FlakyStorage;
pub use harness::{TestHarness, TestHarnessBuilder};
pub use mock_mail::{MockMailbox, MockMailer};
pub use mock_provider::MockProvider;
