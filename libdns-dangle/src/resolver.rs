use crate::types::ResolutionResult;
use async_trait::async_trait;
use hickory_resolver::{
    config::{ResolverConfig, ResolverOpts},
    error::ResolveErrorKind,
    system_conf::read_system_conf,
    TokioAsyncResolver,
};
use std::time::Duration;
use tracing::{debug, warn};

#[async_trait]
pub trait Resolve: Send + Sync {
    async fn resolve(&self, host: &str) -> ResolutionResult;
}

/// A-record resolver backed by the system nameservers.
pub struct DnsResolver {
    resolver: TokioAsyncResolver,
}

impl DnsResolver {
    pub fn new(timeout: Duration) -> Self {
        let (config, mut opts) = match read_system_conf() {
            Ok(conf) => conf,
            Err(e) => {
                warn!(error = %e, "Could not read system resolver config, using defaults");
                (ResolverConfig::default(), ResolverOpts::default())
            }
        };
        opts.timeout = timeout;
        opts.attempts = 1;

        Self {
            resolver: TokioAsyncResolver::tokio(config, opts),
        }
    }
}

#[async_trait]
impl Resolve for DnsResolver {
    async fn resolve(&self, host: &str) -> ResolutionResult {
        match self.resolver.ipv4_lookup(host).await {
            Ok(lookup) => ResolutionResult::from_addresses(lookup.iter().map(|a| a.0).collect()),
            Err(e) => {
                // NXDOMAIN and resolver trouble collapse into the same outcome.
                if matches!(e.kind(), ResolveErrorKind::NoRecordsFound { .. }) {
                    debug!(host, "No A records");
                } else {
                    debug!(host, error = %e, "DNS lookup failed");
                }
                ResolutionResult::Unresolved
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reserved_tld_is_unresolved() {
        let resolver = DnsResolver::new(Duration::from_secs(2));
        let result = resolver.resolve("nothing-here.invalid").await;
        assert_eq!(result, ResolutionResult::Unresolved);
    }
}
