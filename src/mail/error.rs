//! Error types for outbound mail delivery.

use thiserror::Error;

/// Why a recipient domain could not be mapped to a mail host.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolveError {
    /// The domain exists but publishes no MX records.
    #[error("no MX records found for {0}")]
    NoRecordsFound(String),

    /// The domain does not exist (NXDOMAIN, or an empty domain).
    #[error("domain does not exist: {0}")]
    DomainNotFound(String),

    /// Any other DNS failure (timeout, SERVFAIL, network).
    #[error("DNS lookup failed: {0}")]
    Lookup(String),
}

/// Failure talking SMTP to a mail host.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// TCP connect, greeting or EHLO failed.
    #[error("connection failed: {0}")]
    Connect(String),

    /// The server offered STARTTLS but the upgrade failed.
    #[error("TLS upgrade failed: {0}")]
    Tls(String),

    /// The sender or recipient is not a valid address.
    #[error("invalid address: {0}")]
    Address(String),

    /// The server rejected a command during the transaction.
    #[error("rejected: {0}")]
    Rejected(String),
}

/// Errors surfaced by [`Mailer::send_all`](super::Mailer::send_all) when
/// not failing silently.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MailError {
    /// The recipient domain could not be resolved to a mail host.
    #[error("could not resolve mail exchange for domain '{domain}': {source}")]
    DomainResolution {
        domain: String,
        #[source]
        source: ResolveError,
    },

    /// The connection to the domain's mail host failed.
    #[error("delivery to domain '{domain}' via {host} failed: {source}")]
    Transport {
        domain: String,
        host: String,
        #[source]
        source: TransportError,
    },

    /// A single recipient was refused.
    #[error("delivery to {recipient} (domain '{domain}') failed: {source}")]
    Recipient {
        domain: String,
        recipient: String,
        #[source]
        source: TransportError,
    },
}

impl MailError {
    /// The recipient domain the failure belongs to.
    pub fn domain(&self) -> &str {
        match self {
            MailError::DomainResolution { domain, .. }
            | MailError::Transport { domain, .. }
            | MailError::Recipient { domain, .. } => domain,
        }
    }
}

/// Errors building an [`OutboundMessage`](super::OutboundMessage) from parts.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ComposeError {
    /// An address could not be parsed.
    #[error("invalid address '{0}'")]
    InvalidAddress(String),

    /// No recipient was given.
    #[error("at least one recipient is required")]
    NoRecipients,

    /// The message could not be assembled.
    #[error("could not build message: {0}")]
    Build(String),
}
