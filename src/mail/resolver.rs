//! Mail-exchange resolution.
//!
//! Maps a recipient domain to the host with the lowest MX preference. The
//! lookup itself sits behind [`MailExchangeLookup`]; production code uses
//! [`HickoryMxLookup`].

use std::time::Duration;

use async_trait::async_trait;
use hickory_resolver::config::ResolverOpts;
use hickory_resolver::name_server::TokioConnectionProvider;
use hickory_resolver::TokioResolver;
use tracing::debug;

use super::error::ResolveError;

/// One MX record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailExchangeRecord {
    /// Exchange hostname, without the trailing root dot.
    pub host: String,
    /// Lower is preferred.
    pub preference: u16,
}

impl MailExchangeRecord {
    pub fn new(host: impl Into<String>, preference: u16) -> Self {
        Self {
            host: host.into(),
            preference,
        }
    }
}

/// Source of MX records for a domain.
#[async_trait]
pub trait MailExchangeLookup: Send + Sync {
    /// Fetch the MX records of `domain` in the order the resolver returned them.
    async fn lookup(&self, domain: &str) -> Result<Vec<MailExchangeRecord>, ResolveError>;
}

/// Pick the record with the lowest preference; ties go to the first one.
pub fn select_exchange(records: &[MailExchangeRecord]) -> Option<&MailExchangeRecord> {
    records.iter().min_by_key(|r| r.preference)
}

/// Resolve `domain` to the hostname of its preferred mail exchange.
pub async fn resolve<L>(lookup: &L, domain: &str) -> Result<String, ResolveError>
where
    L: MailExchangeLookup + ?Sized,
{
    if domain.is_empty() {
        return Err(ResolveError::DomainNotFound(String::new()));
    }

    let records = lookup.lookup(domain).await?;
    let chosen = select_exchange(&records)
        .ok_or_else(|| ResolveError::NoRecordsFound(domain.to_string()))?;

    debug!(domain, host = %chosen.host, preference = chosen.preference, "Resolved MX");
    Ok(chosen.host.clone())
}

/// MX lookup through the system resolver configuration.
pub struct HickoryMxLookup {
    resolver: TokioResolver,
}

impl HickoryMxLookup {
    /// Build a resolver from the system configuration with the given query timeout.
    pub fn new(timeout: Duration) -> Result<Self, ResolveError> {
        let mut opts = ResolverOpts::default();
        opts.timeout = timeout;

        let resolver = TokioResolver::builder(TokioConnectionProvider::default())
            .map_err(|e| ResolveError::Lookup(e.to_string()))?
            .with_options(opts)
            .build();

        Ok(Self { resolver })
    }
}

#[async_trait]
impl MailExchangeLookup for HickoryMxLookup {
    async fn lookup(&self, domain: &str) -> Result<Vec<MailExchangeRecord>, ResolveError> {
        match self.resolver.mx_lookup(domain).await {
            Ok(lookup) => Ok(lookup
                .iter()
                .map(|mx| {
                    let host = mx.exchange().to_utf8();
                    MailExchangeRecord::new(host.trim_end_matches('.'), mx.preference())
                })
                // A null MX ("." per RFC 7505) means the domain accepts no mail.
                .filter(|r| !r.host.is_empty())
                .collect()),
            // NXDOMAIN is also reported as "no records", so check it first.
            Err(err) if err.is_nx_domain() => Err(ResolveError::DomainNotFound(domain.to_string())),
            Err(err) if err.is_no_records_found() => {
                Err(ResolveError::NoRecordsFound(domain.to_string()))
            }
            Err(err) => Err(ResolveError::Lookup(err.to_string())),
        }
    }
}
