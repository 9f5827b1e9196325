// SPDX-FileCopyrightText: 2026 Kara Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! IMAPS mailbox connector.

use std::sync::Arc;

use async_imap::Session;
use async_trait::async_trait;
use futures::TryStreamExt;
use kara_config::model::ImapConfig;
use kara_core::{
    AdapterType, HealthStatus, InboundEmail, KaraError, MailboxConnector, MailboxSession,
    PluginAdapter,
};
use rustls_pki_types::ServerName;
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tokio_rustls::client::TlsStream;
use tracing::{debug, info, warn};

use crate::parse::inbound_from_fetch;
use crate::require;

/// Fetch attributes. `BODY.PEEK` leaves the `\Seen` flag untouched.
const FETCH_ATTRS: &str = "(UID BODY.PEEK[])";

type ImapStream = TlsStream<TcpStream>;

/// Opens IMAPS sessions against the configured server.
pub struct ImapConnector {
    config: ImapConfig,
    tls: TlsConnector,
}

impl ImapConnector {
    pub fn new(config: ImapConfig) -> Result<Self, KaraError> {
        let mut roots = rustls::RootCertStore::empty();
        roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        let provider = Arc::new(rustls::crypto::aws_lc_rs::default_provider());
        let tls_config = rustls::ClientConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()
            .map_err(|e| KaraError::Config(format!("unsupported TLS configuration: {e}")))?
            .with_root_certificates(roots)
            .with_no_client_auth();

        Ok(Self {
            config,
            tls: TlsConnector::from(Arc::new(tls_config)),
        })
    }

    async fn open_stream(&self) -> Result<ImapStream, KaraError> {
        let addr = (self.config.host.as_str(), self.config.port);
        let tcp = TcpStream::connect(addr).await.map_err(|e| KaraError::Mailbox {
            message: format!(
                "failed to connect to {}:{}",
                self.config.host, self.config.port
            ),
            source: Some(Box::new(e)),
        })?;

        let server_name = ServerName::try_from(self.config.host.clone()).map_err(|e| {
            KaraError::Config(format!("invalid IMAP host {}: {e}", self.config.host))
        })?;

        self.tls
            .connect(server_name, tcp)
            .await
            .map_err(|e| KaraError::Mailbox {
                message: "TLS handshake with IMAP server failed".into(),
                source: Some(Box::new(e)),
            })
    }
}

#[async_trait]
impl PluginAdapter for ImapConnector {
    fn name(&self) -> &str {
        "imap"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Mailbox
    }

    async fn health_check(&self) -> Result<HealthStatus, KaraError> {
        if self.config.username.is_none() || self.config.password.is_none() {
            return Ok(HealthStatus::Unhealthy(
                "imap credentials are not configured".into(),
            ));
        }
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), KaraError> {
        Ok(())
    }
}

#[async_trait]
impl MailboxConnector for ImapConnector {
    async fn connect(&self) -> Result<Box<dyn MailboxSession>, KaraError> {
        let username = require(&self.config.username, "imap.username")?;
        let password = require(&self.config.password, "imap.password")?;

        let stream = self.open_stream().await?;
        let mut client = async_imap::Client::new(stream);
        check_greeting(client.read_response().await, &self.config.host)?;

        let mut session = client
            .login(&username, &password)
            .await
            .map_err(|(e, _client)| KaraError::Mailbox {
                message: format!("IMAP login failed for {username}"),
                source: Some(Box::new(e)),
            })?;

        session
            .select(&self.config.mailbox)
            .await
            .map_err(|e| imap_error(format!("failed to select {}", self.config.mailbox), e))?;

        info!(
            host = self.config.host,
            mailbox = self.config.mailbox,
            "mailbox session opened"
        );

        Ok(Box::new(ImapSession { session }))
    }
}

struct ImapSession {
    session: Session<ImapStream>,
}

#[async_trait]
impl MailboxSession for ImapSession {
    async fn list_unseen(&mut self) -> Result<Vec<InboundEmail>, KaraError> {
        let mut uids: Vec<u32> = self
            .session
            .uid_search("UNSEEN")
            .await
            .map_err(|e| imap_error("UNSEEN search failed", e))?
            .into_iter()
            .collect();
        uids.sort_unstable();
        debug!(count = uids.len(), "unseen messages found");

        let mut emails = Vec::with_capacity(uids.len());
        for uid in uids {
            let fetches: Vec<_> = self
                .session
                .uid_fetch(uid.to_string(), FETCH_ATTRS)
                .await
                .map_err(|e| imap_error(format!("failed to fetch uid {uid}"), e))?
                .try_collect()
                .await
                .map_err(|e| imap_error(format!("failed to read uid {uid}"), e))?;

            let raw = fetches.iter().find_map(|fetch| fetch.body());
            let email = inbound_from_fetch(&uid.to_string(), raw);
            if email.body.is_none() {
                warn!(uid, has_bytes = raw.is_some(), "message has no readable body");
            }
            emails.push(email);
        }

        Ok(emails)
    }

    async fn flag_seen(&mut self, uid: &str) -> Result<(), KaraError> {
        let _updates: Vec<_> = self
            .session
            .uid_store(uid, "+FLAGS (\\Seen)")
            .await
            .map_err(|e| imap_error(format!("failed to flag uid {uid}"), e))?
            .try_collect()
            .await
            .map_err(|e| imap_error(format!("failed to flag uid {uid}"), e))?;
        Ok(())
    }

    async fn logout(mut self: Box<Self>) -> Result<(), KaraError> {
        self.session
            .logout()
            .await
            .map_err(|e| imap_error("logout failed", e))
    }
}

/// The server must greet before anything else is sent.
fn check_greeting<T>(greeting: std::io::Result<Option<T>>, host: &str) -> Result<(), KaraError> {
    match greeting {
        Ok(Some(_)) => Ok(()),
        Ok(None) => Err(KaraError::mailbox(format!(
            "{host} closed the connection before greeting"
        ))),
        Err(e) => Err(KaraError::Mailbox {
            message: format!("failed to read IMAP greeting from {host}"),
            source: Some(Box::new(e)),
        }),
    }
}

fn imap_error(message: impl Into<String>, e: async_imap::error::Error) -> KaraError {
    KaraError::Mailbox {
        message: message.into(),
        source: Some(Box::new(e)),
    }
}
