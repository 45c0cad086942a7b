//! SMTP transport to a resolved mail host.
//!
//! One [`MailSession`] is one SMTP connection. The production
//! implementation speaks SMTP through lettre's low-level connection so that
//! each recipient gets its own `MAIL FROM` / `RCPT TO` envelope and a refused
//! recipient is followed by `RSET` instead of a dropped connection. Every
//! exchange with the server, greeting included, is bounded by the transport
//! timeout.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use lettre::address::{Address, Envelope};
use lettre::transport::smtp::client::{AsyncSmtpConnection, TlsParameters};
use lettre::transport::smtp::commands::{Data, Mail, Rcpt, Rset};
use lettre::transport::smtp::extension::ClientId;
use tracing::{debug, warn};

use super::error::TransportError;

/// Opens SMTP sessions to mail hosts.
#[async_trait]
pub trait MailTransport: Send + Sync {
    type Session: MailSession;

    /// Connect to `host`, read the greeting, say EHLO and upgrade to TLS when
    /// offered.
    async fn connect(&self, host: &str) -> Result<Self::Session, TransportError>;
}

/// An open SMTP connection.
#[async_trait]
pub trait MailSession: Send {
    /// Send `body` with an envelope of exactly one recipient.
    async fn send(&mut self, sender: &str, recipient: &str, body: &[u8])
        -> Result<(), TransportError>;

    /// Close politely with QUIT.
    async fn quit(&mut self);

    /// Drop the connection without waiting for the server.
    async fn abort(&mut self);
}

/// Direct SMTP transport on a fixed port.
#[derive(Debug, Clone)]
pub struct SmtpTransport {
    port: u16,
    timeout: Duration,
    hello: ClientId,
}

impl SmtpTransport {
    pub fn new(port: u16, timeout: Duration, hello_name: impl Into<String>) -> Self {
        Self {
            port,
            timeout,
            hello: ClientId::Domain(hello_name.into()),
        }
    }
}

#[async_trait]
impl MailTransport for SmtpTransport {
    type Session = SmtpSession;

    async fn connect(&self, host: &str) -> Result<SmtpSession, TransportError> {
        debug!(host, port = self.port, "Connecting to mail exchange");
        // connect_tokio1 only bounds the TCP connect; the greeting and EHLO need their own bound
        let mut conn = bounded(
            self.timeout,
            "connect",
            TransportError::Connect,
            AsyncSmtpConnection::connect_tokio1(
                (host, self.port),
                Some(self.timeout),
                &self.hello,
                None,
                None,
            ),
        )
        .await?;

        if conn.can_starttls() {
            let params = TlsParameters::new(host.to_string())
                .map_err(|e| TransportError::Tls(e.to_string()))?;
            bounded(
                self.timeout,
                "STARTTLS",
                TransportError::Tls,
                conn.starttls(params, &self.hello),
            )
            .await?;
            debug!(host, "STARTTLS established");
        }

        Ok(SmtpSession {
            conn,
            timeout: self.timeout,
        })
    }
}

/// Await one SMTP exchange, failing with `wrap` on error or after `limit`.
async fn bounded<T, F>(
    limit: Duration,
    step: &str,
    wrap: fn(String) -> TransportError,
    fut: F,
) -> Result<T, TransportError>
where
    F: Future<Output = Result<T, lettre::transport::smtp::Error>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result.map_err(|e| wrap(e.to_string())),
        Err(_) => Err(wrap(format!("{step} timed out after {limit:?}"))),
    }
}

/// Session over a lettre connection.
pub struct SmtpSession {
    conn: AsyncSmtpConnection,
    timeout: Duration,
}

impl SmtpSession {
    /// MAIL, RCPT and DATA for one envelope; a refusal leaves the connection open.
    async fn transaction(&mut self, envelope: &Envelope, body: &[u8]) -> Result<(), TransportError> {
        let limit = self.timeout;
        let rejected = TransportError::Rejected;

        bounded(
            limit,
            "MAIL FROM",
            rejected,
            self.conn.command(Mail::new(envelope.from().cloned(), vec![])),
        )
        .await?;
        for to in envelope.to() {
            bounded(
                limit,
                "RCPT TO",
                rejected,
                self.conn.command(Rcpt::new(to.clone(), vec![])),
            )
            .await?;
        }
        bounded(limit, "DATA", rejected, self.conn.command(Data)).await?;
        bounded(limit, "message", rejected, self.conn.message(body)).await?;
        Ok(())
    }
}

#[async_trait]
impl MailSession for SmtpSession {
    async fn send(
        &mut self,
        sender: &str,
        recipient: &str,
        body: &[u8],
    ) -> Result<(), TransportError> {
        let envelope = envelope_for(sender, recipient)?;
        let result = self.transaction(&envelope, body).await;
        if result.is_err() {
            // Keep the connection usable for the next recipient
            let reset = bounded(
                self.timeout,
                "RSET",
                TransportError::Rejected,
                self.conn.command(Rset),
            )
            .await;
            if let Err(e) = reset {
                debug!("RSET failed: {e}");
            }
        }
        result
    }

    async fn quit(&mut self) {
        let quit = bounded(
            self.timeout,
            "QUIT",
            TransportError::Rejected,
            self.conn.quit(),
        )
        .await;
        if let Err(e) = quit {
            warn!("QUIT failed: {e}");
        }
    }

    async fn abort(&mut self) {
        self.conn.abort().await;
    }
}

/// Build a single-recipient envelope. An empty sender is the null reverse path.
fn envelope_for(sender: &str, recipient: &str) -> Result<Envelope, TransportError> {
    let from = if sender.is_empty() {
        None
    } else {
        Some(parse_address(sender)?)
    };
    let to = parse_address(recipient)?;
    Envelope::new(from, vec![to]).map_err(|e| TransportError::Address(e.to_string()))
}

fn parse_address(addr: &str) -> Result<Address, TransportError> {
    addr.parse()
        .map_err(|_| TransportError::Address(addr.to_string()))
}
