//! Grouping of (message, recipient) pairs by recipient domain.

use std::collections::HashMap;

use super::message::OutboundMessage;

/// One message addressed to one recipient.
#[derive(Debug, Clone, Copy)]
pub struct Delivery<'a> {
    pub message: &'a OutboundMessage,
    pub recipient: &'a str,
}

/// All deliveries for one recipient domain, sent over one connection.
#[derive(Debug)]
pub struct DomainBatch<'a> {
    pub domain: &'a str,
    pub deliveries: Vec<Delivery<'a>>,
}

/// The domain part of an address: everything after the last `@`.
///
/// An address without `@` has the empty domain.
pub fn domain_of(address: &str) -> &str {
    address
        .rsplit_once('@')
        .map(|(_, domain)| domain)
        .unwrap_or("")
}

/// Partition every recipient of every message by domain.
///
/// Batches come out in order of first appearance; within a batch each
/// message's recipient order is preserved.
pub fn group_by_domain(messages: &[OutboundMessage]) -> Vec<DomainBatch<'_>> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut batches: Vec<DomainBatch<'_>> = Vec::new();

    for message in messages {
        for recipient in message.recipients() {
            let domain = domain_of(recipient);
            let slot = *index.entry(domain).or_insert_with(|| {
                batches.push(DomainBatch {
                    domain,
                    deliveries: Vec::new(),
                });
                batches.len() - 1
            });
            batches[slot].deliveries.push(Delivery {
                message,
                recipient: recipient.as_str(),
            });
        }
    }

    batches
}
