//! Outbound mail for servdesk.
//!
//! Messages are delivered straight to each recipient domain's mail exchange
//! instead of through a relay:
//! - recipients are grouped by domain
//! - each domain's MX host is looked up per call (no caching)
//! - one SMTP connection per domain, STARTTLS when offered
//! - one envelope per recipient
//! - `fail_silently` decides between log-and-skip and returning the first error

mod backend;
mod error;
mod grouping;
mod message;
mod resolver;
mod transport;

pub use backend::{DeliveryOutcome, DirectMxMailer, DomainOutcome, Mailer};
pub use error::{ComposeError, MailError, ResolveError, TransportError};
pub use grouping::{domain_of, group_by_domain, Delivery, DomainBatch};
pub use message::OutboundMessage;
pub use resolver::{resolve, select_exchange, HickoryMxLookup, MailExchangeLookup, MailExchangeRecord};
pub use transport::{MailSession, MailTransport, SmtpSession, SmtpTransport};

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::config::MailConfig;
use crate::{Result, ServdeskError};

/// Build the production mailer from configuration.
pub fn build_mailer(config: &MailConfig) -> Result<Arc<dyn Mailer>> {
    let lookup = HickoryMxLookup::new(Duration::from_secs(config.dns_timeout_secs))
        .map_err(|e| ServdeskError::Config(format!("DNS resolver: {e}")))?;
    let transport = SmtpTransport::new(
        config.port,
        Duration::from_secs(config.timeout_secs),
        config.hello_name.clone(),
    );

    info!(
        port = config.port,
        fail_silently = config.fail_silently,
        "Direct MX mailer ready"
    );
    Ok(Arc::new(DirectMxMailer::new(
        lookup,
        transport,
        config.fail_silently,
    )))
}
