// SPDX-FileCopyrightText: 2026 Kara Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SMTP reply delivery.

use async_trait::async_trait;
use kara_config::model::SmtpConfig;
use kara_core::{AdapterType, HealthStatus, KaraError, MailSender, OutgoingEmail, PluginAdapter};
use lettre::message::header::ContentType;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{debug, info};

use crate::require;

/// Port on which SMTP expects TLS from the first byte instead of STARTTLS.
const IMPLICIT_TLS_PORT: u16 = 465;

/// Renders a Markdown reply to HTML for the alternative part.
pub fn render_html(markdown: &str) -> String {
    comrak::markdown_to_html(markdown, &comrak::Options::default())
}

/// Sends replies through an authenticated SMTP relay.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    html_alternative: bool,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> Result<Self, KaraError> {
        let username = require(&config.username, "smtp.username")?;
        let password = require(&config.password, "smtp.password")?;
        let from = config.from.clone().unwrap_or_else(|| username.clone());
        let from: Mailbox = from
            .parse()
            .map_err(|e| KaraError::Config(format!("invalid smtp.from address {from}: {e}")))?;

        let relay = if config.port == IMPLICIT_TLS_PORT {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
        }
        .map_err(|e| KaraError::Mail {
            message: format!("failed to configure SMTP relay {}", config.host),
            source: Some(Box::new(e)),
        })?;

        let transport = relay
            .port(config.port)
            .credentials(Credentials::new(username, password))
            .build();

        info!(host = config.host, port = config.port, "SMTP mailer initialized");

        Ok(Self {
            transport,
            from,
            html_alternative: config.html_alternative,
        })
    }

    fn build_message(&self, email: &OutgoingEmail) -> Result<Message, KaraError> {
        build_message(&self.from, email, self.html_alternative)
    }
}

/// Builds the MIME message: plain text, plus an HTML alternative when enabled.
fn build_message(
    from: &Mailbox,
    email: &OutgoingEmail,
    html_alternative: bool,
) -> Result<Message, KaraError> {
    let to: Mailbox = email
        .to
        .parse()
        .map_err(|e| KaraError::mail(format!("invalid recipient {}: {e}", email.to)))?;

    let builder = Message::builder()
        .from(from.clone())
        .to(to)
        .subject(email.subject.as_str());

    let message = if html_alternative {
        builder.multipart(MultiPart::alternative_plain_html(
            email.body.clone(),
            render_html(&email.body),
        ))
    } else {
        builder
            .header(ContentType::TEXT_PLAIN)
            .body(email.body.clone())
    };

    message.map_err(|e| KaraError::Mail {
        message: "failed to build reply".into(),
        source: Some(Box::new(e)),
    })
}

#[async_trait]
impl PluginAdapter for SmtpMailer {
    fn name(&self) -> &str {
        "smtp"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Mailer
    }

    async fn health_check(&self) -> Result<HealthStatus, KaraError> {
        match self.transport.test_connection().await {
            Ok(true) => Ok(HealthStatus::Healthy),
            Ok(false) => Ok(HealthStatus::Degraded("SMTP server did not answer NOOP".into())),
            Err(e) => Ok(HealthStatus::Unhealthy(format!("SMTP connection failed: {e}"))),
        }
    }

    async fn shutdown(&self) -> Result<(), KaraError> {
        Ok(())
    }
}

#[async_trait]
impl MailSender for SmtpMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), KaraError> {
        let message = self.build_message(email)?;
        self.transport
            .send(message)
            .await
            .map_err(|e| KaraError::Mail {
                message: format!("failed to deliver reply to {}", email.to),
                source: Some(Box::new(e)),
            })?;
        debug!(to = email.to, subject = email.subject, "reply delivered");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reply() -> OutgoingEmail {
        OutgoingEmail {
            to: "ana@example.com".into(),
            subject: "Re: Consulta remeras".into(),
            body: "Hola Ana,\n\n**Remera Oversize** disponible en talle M.".into(),
        }
    }

    fn sender() -> Mailbox {
        "Kara <tienda@example.com>".parse().unwrap()
    }

    #[test]
    fn markdown_is_rendered_to_html() {
        let html = render_html("**Remera** en stock");
        assert!(html.contains("<strong>Remera</strong>"), "got: {html}");
    }

    #[test]
    fn html_alternative_builds_multipart() {
        let message = build_message(&sender(), &reply(), true).unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("multipart/alternative"), "got: {raw}");
        assert!(raw.contains("Subject: Re: Consulta remeras"));
        assert!(raw.contains("<strong>Remera Oversize</strong>"));
    }

    #[test]
    fn plain_only_when_html_disabled() {
        let message = build_message(&sender(), &reply(), false).unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(!raw.contains("multipart"));
        assert!(raw.contains("text/plain"));
    }

    #[test]
    fn invalid_recipient_is_mail_error() {
        let mut email = reply();
        email.to = "not an address".into();
        let err = build_message(&sender(), &email, true).unwrap_err();
        assert!(matches!(err, KaraError::Mail { .. }), "got: {err:?}");
    }

    #[test]
    fn missing_credentials_are_rejected() {
        let err = SmtpMailer::new(&SmtpConfig::default()).err().unwrap();
        assert!(err.to_string().contains("smtp.username"));
    }
}
