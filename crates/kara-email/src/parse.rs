// SPDX-FileCopyrightText: 2026 Kara Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! RFC 5322 message parsing.

use kara_core::InboundEmail;
use mail_parser::{Message, MessageParser, PartType};

/// Wrap width for HTML-to-text conversion.
const HTML_TEXT_WIDTH: usize = 100;

/// Parses a raw message fetched under `uid`.
///
/// Returns `None` only when the bytes are not a message at all. A message
/// without a readable text part yields `body: None`, and a missing `From`
/// or `Subject` yields an empty string.
pub fn parse_message(uid: &str, raw: &[u8]) -> Option<InboundEmail> {
    let message = MessageParser::default().parse(raw)?;

    let sender = message
        .from()
        .and_then(|from| from.first())
        .and_then(|addr| addr.address())
        .unwrap_or_default()
        .trim()
        .to_string();

    let subject = message.subject().unwrap_or_default().trim().to_string();

    Some(InboundEmail {
        uid: uid.to_string(),
        sender,
        subject,
        body: extract_body(&message),
    })
}

/// The message for a fetched `uid`, readable or not.
///
/// Missing body bytes, or bytes that do not parse as a message, give
/// `body: None` so the worker flags the message instead of fetching it on
/// every run.
pub fn inbound_from_fetch(uid: &str, raw: Option<&[u8]>) -> InboundEmail {
    raw.and_then(|raw| parse_message(uid, raw))
        .unwrap_or_else(|| InboundEmail {
            uid: uid.to_string(),
            sender: String::new(),
            subject: String::new(),
            body: None,
        })
}

/// Plain text wins; an HTML-only message is converted to text.
fn extract_body(message: &Message<'_>) -> Option<String> {
    let text = body_from_parts(message, &message.text_body)
        .or_else(|| body_from_parts(message, &message.html_body))?;
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn body_from_parts(message: &Message<'_>, ids: &[u32]) -> Option<String> {
    ids.iter().find_map(|id| match &message.part(*id)?.body {
        PartType::Text(text) => Some(text.to_string()),
        PartType::Html(html) => html_to_text(html),
        _ => None,
    })
}

fn html_to_text(html: &str) -> Option<String> {
    html2text::from_read(html.as_bytes(), HTML_TEXT_WIDTH).ok()
}
