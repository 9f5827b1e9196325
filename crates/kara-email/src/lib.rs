// SPDX-FileCopyrightText: 2026 Kara Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mail transport adapters for Kara.
//!
//! - [`ImapConnector`] reads unseen messages over IMAPS and flags them as seen.
//! - [`SmtpMailer`] delivers replies over SMTP with STARTTLS (or implicit TLS on 465).
//! - [`parse`] turns raw RFC 5322 bytes into an [`InboundEmail`](kara_core::InboundEmail).

pub mod imap;
pub mod parse;
pub mod smtp;

pub use imap::ImapConnector;
pub use smtp::{SmtpMailer, render_html};

use kara_core::KaraError;

/// Returns the configured credential or a configuration error naming the key.
pub(crate) fn require(value: &Option<String>, key: &str) -> Result<String, KaraError> {
    value
        .as_deref()
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| KaraError::Config(format!("{key} is required to reach the mail server")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn require_rejects_missing_and_empty() {
        assert!(require(&None, "imap.username").is_err());
        let err = require(&Some(String::new()), "imap.password").unwrap_err();
        assert!(err.to_string().contains("imap.password"));
        assert_eq!(require(&Some("kara".into()), "x").unwrap(), "kara");
    }
}
