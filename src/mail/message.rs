//! Outbound message representation.

use lettre::message::{header::ContentType, Mailbox};
use lettre::Message;

use super::error::ComposeError;

/// A fully encoded message ready for delivery.
///
/// The recipient list drives delivery; the body is sent verbatim, so Bcc
/// recipients appear in `recipients` but not in the body headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    sender: String,
    recipients: Vec<String>,
    body: Vec<u8>,
}

impl OutboundMessage {
    /// Wrap an already encoded message.
    pub fn new(sender: impl Into<String>, recipients: Vec<String>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            sender: sender.into(),
            recipients,
            body: body.into(),
        }
    }

    /// Compose a plain-text RFC 5322 message.
    ///
    /// Recipients are `to`, then `cc`, then `bcc`, in the given order.
    pub fn compose(
        from: &str,
        to: &[String],
        cc: &[String],
        bcc: &[String],
        subject: &str,
        text: &str,
    ) -> Result<Self, ComposeError> {
        if to.is_empty() && cc.is_empty() && bcc.is_empty() {
            return Err(ComposeError::NoRecipients);
        }

        let mut builder = Message::builder()
            .from(parse_mailbox(from)?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN);
        for addr in to {
            builder = builder.to(parse_mailbox(addr)?);
        }
        for addr in cc {
            builder = builder.cc(parse_mailbox(addr)?);
        }
        for addr in bcc {
            builder = builder.bcc(parse_mailbox(addr)?);
        }

        let message = builder
            .body(text.to_string())
            .map_err(|e| ComposeError::Build(e.to_string()))?;

        let recipients = to.iter().chain(cc).chain(bcc).cloned().collect();
        Ok(Self::new(from, recipients, message.formatted()))
    }

    /// Envelope sender.
    pub fn sender(&self) -> &str {
        &self.sender
    }

    /// Envelope recipients in delivery order.
    pub fn recipients(&self) -> &[String] {
        &self.recipients
    }

    /// Encoded message bytes.
    pub fn body(&self) -> &[u8] {
        &self.body
    }
}

fn parse_mailbox(addr: &str) -> Result<Mailbox, ComposeError> {
    addr.parse()
        .map_err(|_| ComposeError::InvalidAddress(addr.to_string()))
}
