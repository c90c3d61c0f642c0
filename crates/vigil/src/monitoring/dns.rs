//! DNS resolution checker.
//!
//! Every configured `(name, record type)` pair is resolved against a single
//! nameserver; the check is up only when every query returns answers.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use anyhow::{Result, anyhow};
use hickory_resolver::config::{NameServerConfigGroup, ResolverConfig, ResolverOpts};
use hickory_resolver::name_server::TokioConnectionProvider;
use hickory_resolver::proto::rr::RecordType;
use hickory_resolver::{ResolveError, TokioResolver};
use tokio::time::timeout;

use super::checker::{Checker, ProbeError, Reading, elapsed_ms};

pub struct DnsChecker {
    server: SocketAddr,
    server_label: String,
    queries: Vec<(String, RecordType)>,
    timeout: Duration,
}

impl DnsChecker {
    pub fn new(server: SocketAddr, queries: Vec<(String, RecordType)>, timeout: Duration) -> Result<Self> {
        if queries.is_empty() {
            return Err(anyhow!("DNS check needs at least one query"));
        }
        Ok(Self { server, server_label: server.to_string(), queries, timeout })
    }

    fn resolver(&self) -> TokioResolver {
        let nameservers =
            NameServerConfigGroup::from_ips_clear(&[self.server.ip()], self.server.port(), true);
        let config = ResolverConfig::from_parts(None, vec![], nameservers);

        let mut opts = ResolverOpts::default();
        opts.timeout = self.timeout;
        opts.attempts = 1;
        opts.cache_size = 0;

        TokioResolver::builder_with_config(config, TokioConnectionProvider::default())
            .with_options(opts)
            .build()
    }

    fn classify(query: &str, error: ResolveError) -> ProbeError {
        if error.is_no_records_found() {
            ProbeError::NoRecords(query.to_string())
        } else {
            ProbeError::Resolve(format!("{query}: {error}"))
        }
    }
}

#[async_trait::async_trait]
impl Checker for DnsChecker {
    fn target(&self) -> &str {
        &self.server_label
    }

    async fn check(&self) -> Result<Reading, ProbeError> {
        let start = Instant::now();
        let resolver = self.resolver();
        let mut answers = Vec::with_capacity(self.queries.len());

        for (name, record_type) in &self.queries {
            let query = format!("{name} {record_type}");
            let lookup = timeout(self.timeout, resolver.lookup(name.as_str(), *record_type))
                .await
                .map_err(|_| ProbeError::Timeout(self.timeout))?
                .map_err(|e| Self::classify(&query, e))?;

            let records: Vec<String> = lookup.iter().map(ToString::to_string).collect();
            if records.is_empty() {
                return Err(ProbeError::NoRecords(query));
            }
            answers.push(format!("{query} -> {}", records.join(", ")));
        }

        Ok(Reading {
            latency_ms: elapsed_ms(start),
            status_code: None,
            detail: Some(answers.join("; ")),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_queries() {
        let server: SocketAddr = "8.8.8.8:53".parse().unwrap();
        assert!(DnsChecker::new(server, vec![], Duration::from_secs(1)).is_err());

        let checker = DnsChecker::new(
            server,
            vec![("example.com".into(), RecordType::A)],
            Duration::from_secs(1),
        )
        .unwrap();
        assert_eq!(checker.target(), "8.8.8.8:53");
    }

    #[tokio::test]
    async fn test_unreachable_server_fails_within_timeout() {
        // Nothing answers DNS on the discard port of loopback
        let server: SocketAddr = "127.0.0.1:9".parse().unwrap();
        let checker = DnsChecker::new(
            server,
            vec![("example.com".into(), RecordType::A)],
            Duration::from_millis(300),
        )
        .unwrap();

        let started = Instant::now();
        let result = checker.check().await;

        assert!(result.is_err());
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
