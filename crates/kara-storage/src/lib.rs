// SPDX-FileCopyrightText: 2026 Kara Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence for the Kara email assistant.
//!
//! WAL-mode SQLite with embedded migrations. Every statement runs on
//! `tokio-rusqlite`'s single background thread, and each task state change
//! is validated and applied inside one transaction.

pub mod adapter;
pub mod database;
pub mod migrations;
pub mod queries;

pub use adapter::SqliteStorage;
pub use database::Database;
