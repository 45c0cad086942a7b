//! Direct-to-MX delivery: group, resolve, connect, deliver, aggregate.

use async_trait::async_trait;
use tracing::{info, warn};

use super::error::{MailError, TransportError};
use super::grouping::{group_by_domain, Delivery, DomainBatch};
use super::message::OutboundMessage;
use super::resolver::{resolve, MailExchangeLookup};
use super::transport::{MailSession, MailTransport};

/// Sends batches of outbound messages.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Deliver every recipient of every message and return how many
    /// (message, recipient) pairs were accepted.
    async fn send_all(&self, messages: &[OutboundMessage]) -> Result<usize, MailError>;
}

/// Result of one (message, recipient) attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered,
    Failed(TransportError),
}

/// Result of one domain batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainOutcome {
    /// Every pair was attempted; `sent` were accepted.
    Completed { sent: usize },
    /// The batch stopped early; `sent` pairs were accepted before `error`.
    Aborted { sent: usize, error: MailError },
}

/// Mailer that looks up each recipient domain's MX host and talks SMTP to
/// it directly.
///
/// Domains are processed one after another over one connection each. With
/// `fail_silently`, failed recipients and failed domains are logged and
/// skipped; otherwise the first failure is returned. Nothing is retried
/// and nothing already accepted is rolled back.
pub struct DirectMxMailer<L, T> {
    lookup: L,
    transport: T,
    fail_silently: bool,
}

impl<L, T> DirectMxMailer<L, T>
where
    L: MailExchangeLookup,
    T: MailTransport,
{
    pub fn new(lookup: L, transport: T, fail_silently: bool) -> Self {
        Self {
            lookup,
            transport,
            fail_silently,
        }
    }

    pub fn fail_silently(&self) -> bool {
        self.fail_silently
    }

    /// Resolve, connect and deliver one domain batch.
    pub async fn deliver_domain(&self, batch: &DomainBatch<'_>) -> DomainOutcome {
        let domain = batch.domain;

        let host = match resolve(&self.lookup, domain).await {
            Ok(host) => host,
            Err(source) => {
                return DomainOutcome::Aborted {
                    sent: 0,
                    error: MailError::DomainResolution {
                        domain: domain.to_string(),
                        source,
                    },
                }
            }
        };

        let mut session = match self.transport.connect(&host).await {
            Ok(session) => session,
            Err(source) => {
                return DomainOutcome::Aborted {
                    sent: 0,
                    error: MailError::Transport {
                        domain: domain.to_string(),
                        host,
                        source,
                    },
                }
            }
        };

        let mut sent = 0;
        for delivery in &batch.deliveries {
            match deliver_one(&mut session, delivery).await {
                DeliveryOutcome::Delivered => sent += 1,
                DeliveryOutcome::Failed(source) => {
                    let error = MailError::Recipient {
                        domain: domain.to_string(),
                        recipient: delivery.recipient.to_string(),
                        source,
                    };
                    if self.fail_silently {
                        warn!("{error}");
                        continue;
                    }
                    session.abort().await;
                    return DomainOutcome::Aborted { sent, error };
                }
            }
        }

        session.quit().await;
        DomainOutcome::Completed { sent }
    }
}

async fn deliver_one<S: MailSession>(session: &mut S, delivery: &Delivery<'_>) -> DeliveryOutcome {
    let message = delivery.message;
    match session
        .send(message.sender(), delivery.recipient, message.body())
        .await
    {
        Ok(()) => DeliveryOutcome::Delivered,
        Err(e) => DeliveryOutcome::Failed(e),
    }
}

#[async_trait]
impl<L, T> Mailer for DirectMxMailer<L, T>
where
    L: MailExchangeLookup,
    T: MailTransport,
{
    async fn send_all(&self, messages: &[OutboundMessage]) -> Result<usize, MailError> {
        if messages.is_empty() {
            return Ok(0);
        }

        let mut total = 0;
        for batch in group_by_domain(messages) {
            match self.deliver_domain(&batch).await {
                DomainOutcome::Completed { sent } => total += sent,
                DomainOutcome::Aborted { sent, error } => {
                    total += sent;
                    if !self.fail_silently {
                        return Err(error);
                    }
                    warn!("Skipping domain: {error}");
                }
            }
        }

        info!(sent = total, messages = messages.len(), "Outbound mail run finished");
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mail::error::ResolveError;
    use crate::mail::resolver::MailExchangeRecord;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Journal {
        events: Vec<String>,
    }

    struct FakeLookup(HashMap<String, Result<Vec<MailExchangeRecord>, ResolveError>>);

    impl FakeLookup {
        fn with(entries: &[(&str, Result<&str, ResolveError>)]) -> Self {
            Self(
                entries
                    .iter()
                    .map(|(d, r)| {
                        let value = r
                            .clone()
                            .map(|host| vec![MailExchangeRecord::new(host, 10)]);
                        (d.to_string(), value)
                    })
                    .collect(),
            )
        }
    }

    #[async_trait]
    impl MailExchangeLookup for FakeLookup {
        async fn lookup(&self, domain: &str) -> Result<Vec<MailExchangeRecord>, ResolveError> {
            self.0
                .get(domain)
                .cloned()
                .unwrap_or_else(|| Err(ResolveError::DomainNotFound(domain.to_string())))
        }
    }

    struct FakeTransport {
        journal: Arc<Mutex<Journal>>,
        refuse_hosts: Vec<String>,
        reject_recipients: Vec<String>,
    }

    struct FakeSession {
        host: String,
        journal: Arc<Mutex<Journal>>,
        reject_recipients: Vec<String>,
    }

    #[async_trait]
    impl MailTransport for FakeTransport {
        type Session = FakeSession;

        async fn connect(&self, host: &str) -> Result<FakeSession, TransportError> {
            self.journal
                .lock()
                .unwrap()
                .events
                .push(format!("connect {host}"));
            if self.refuse_hosts.iter().any(|h| h == host) {
                return Err(TransportError::Connect("refused".to_string()));
            }
            Ok(FakeSession {
                host: host.to_string(),
                journal: self.journal.clone(),
                reject_recipients: self.reject_recipients.clone(),
            })
        }
    }

    #[async_trait]
    impl MailSession for FakeSession {
        async fn send(&mut self, _: &str, recipient: &str, _: &[u8]) -> Result<(), TransportError> {
            self.journal
                .lock()
                .unwrap()
                .events
                .push(format!("send {recipient} via {}", self.host));
            if self.reject_recipients.iter().any(|r| r == recipient) {
                return Err(TransportError::Rejected("550 no such user".to_string()));
            }
            Ok(())
        }

        async fn quit(&mut self) {
            self.journal
                .lock()
                .unwrap()
                .events
                .push(format!("quit {}", self.host));
        }

        async fn abort(&mut self) {
            self.journal
                .lock()
                .unwrap()
                .events
                .push(format!("abort {}", self.host));
        }
    }

    fn mailer(
        lookup: FakeLookup,
        refuse_hosts: &[&str],
        reject_recipients: &[&str],
        fail_silently: bool,
    ) -> (DirectMxMailer<FakeLookup, FakeTransport>, Arc<Mutex<Journal>>) {
        let journal = Arc::new(Mutex::new(Journal::default()));
        let transport = FakeTransport {
            journal: journal.clone(),
            refuse_hosts: refuse_hosts.iter().map(|s| s.to_string()).collect(),
            reject_recipients: reject_recipients.iter().map(|s| s.to_string()).collect(),
        };
        (DirectMxMailer::new(lookup, transport, fail_silently), journal)
    }

    fn msg(recipients: &[&str]) -> OutboundMessage {
        OutboundMessage::new(
            "desk@example.com",
            recipients.iter().map(|r| r.to_string()).collect(),
            b"body".to_vec(),
        )
    }

    fn events(journal: &Arc<Mutex<Journal>>) -> Vec<String> {
        journal.lock().unwrap().events.clone()
    }

    #[tokio::test]
    async fn test_empty_input_sends_nothing() {
        let (mailer, journal) = mailer(FakeLookup::with(&[]), &[], &[], false);
        assert_eq!(mailer.send_all(&[]).await.unwrap(), 0);
        assert!(events(&journal).is_empty());
    }

    #[tokio::test]
    async fn test_split_message_goes_to_each_host_once() {
        let lookup = FakeLookup::with(&[("x.com", Ok("mx.x.com")), ("y.com", Ok("mx.y.com"))]);
        let (mailer, journal) = mailer(lookup, &[], &[], false);

        let sent = mailer.send_all(&[msg(&["a@x.com", "b@y.com"])]).await.unwrap();
        assert_eq!(sent, 2);
        assert_eq!(
            events(&journal),
            vec![
                "connect mx.x.com",
                "send a@x.com via mx.x.com",
                "quit mx.x.com",
                "connect mx.y.com",
                "send b@y.com via mx.y.com",
                "quit mx.y.com",
            ]
        );
    }

    #[tokio::test]
    async fn test_one_connection_per_domain() {
        let lookup = FakeLookup::with(&[("x.com", Ok("mx.x.com"))]);
        let (mailer, journal) = mailer(lookup, &[], &[], false);

        let sent = mailer
            .send_all(&[msg(&["a@x.com", "b@x.com"]), msg(&["c@x.com"])])
            .await
            .unwrap();
        assert_eq!(sent, 3);
        let connects = events(&journal)
            .iter()
            .filter(|e| e.starts_with("connect"))
            .count();
        assert_eq!(connects, 1);
    }

    #[tokio::test]
    async fn test_unresolvable_domain_silently_skipped() {
        let lookup = FakeLookup::with(&[
            ("x.com", Err(ResolveError::NoRecordsFound("x.com".to_string()))),
            ("y.com", Ok("mx.y.com")),
        ]);
        let (mailer, _) = mailer(lookup, &[], &[], true);

        let sent = mailer
            .send_all(&[msg(&["a@x.com"]), msg(&["b@y.com"])])
            .await
            .unwrap();
        assert_eq!(sent, 1);
    }

    #[tokio::test]
    async fn test_unresolvable_domain_is_reported() {
        let lookup = FakeLookup::with(&[
            ("x.com", Err(ResolveError::NoRecordsFound("x.com".to_string()))),
            ("y.com", Ok("mx.y.com")),
        ]);
        let (mailer, journal) = mailer(lookup, &[], &[], false);

        let err = mailer
            .send_all(&[msg(&["a@x.com"]), msg(&["b@y.com"])])
            .await
            .unwrap_err();
        assert_eq!(err.domain(), "x.com");
        assert!(matches!(err, MailError::DomainResolution { .. }));
        // y.com is never attempted.
        assert!(events(&journal).is_empty());
    }

    #[tokio::test]
    async fn test_recipient_without_at_sign_fails_as_domain() {
        let lookup = FakeLookup::with(&[("y.com", Ok("mx.y.com"))]);
        let (mailer, _) = mailer(lookup, &[], &[], true);

        let sent = mailer.send_all(&[msg(&["nobody", "b@y.com"])]).await.unwrap();
        assert_eq!(sent, 1);
    }

    #[tokio::test]
    async fn test_connection_failure_aborts_domain() {
        let lookup = FakeLookup::with(&[("x.com", Ok("mx.x.com")), ("y.com", Ok("mx.y.com"))]);
        let (mailer, _) = mailer(lookup, &["mx.x.com"], &[], false);

        let err = mailer
            .send_all(&[msg(&["a@x.com", "b@y.com"])])
            .await
            .unwrap_err();
        assert_eq!(
            err,
            MailError::Transport {
                domain: "x.com".to_string(),
                host: "mx.x.com".to_string(),
                source: TransportError::Connect("refused".to_string()),
            }
        );
    }

    #[tokio::test]
    async fn test_rejected_recipient_silently_skipped() {
        let lookup = FakeLookup::with(&[("x.com", Ok("mx.x.com"))]);
        let (mailer, journal) = mailer(lookup, &[], &["b@x.com"], true);

        let sent = mailer
            .send_all(&[msg(&["a@x.com", "b@x.com", "c@x.com"])])
            .await
            .unwrap();
        assert_eq!(sent, 2);
        assert_eq!(events(&journal).last().unwrap(), "quit mx.x.com");
    }

    #[tokio::test]
    async fn test_rejected_recipient_aborts_batch() {
        let lookup = FakeLookup::with(&[("x.com", Ok("mx.x.com"))]);
        let (mailer, journal) = mailer(lookup, &[], &["b@x.com"], false);

        let err = mailer
            .send_all(&[msg(&["a@x.com", "b@x.com", "c@x.com"])])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            MailError::Recipient { ref recipient, .. } if recipient == "b@x.com"
        ));
        assert_eq!(
            events(&journal),
            vec![
                "connect mx.x.com",
                "send a@x.com via mx.x.com",
                "send b@x.com via mx.x.com",
                "abort mx.x.com",
            ]
        );
    }

    #[tokio::test]
    async fn test_deliver_domain_counts_before_abort() {
        let lookup = FakeLookup::with(&[("x.com", Ok("mx.x.com"))]);
        let (mailer, _) = mailer(lookup, &[], &["c@x.com"], false);

        let messages = vec![msg(&["a@x.com", "b@x.com", "c@x.com", "d@x.com"])];
        let batches = group_by_domain(&messages);
        match mailer.deliver_domain(&batches[0]).await {
            DomainOutcome::Aborted { sent, .. } => assert_eq!(sent, 2),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
}
