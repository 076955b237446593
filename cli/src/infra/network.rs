//! Network infrastructure: implements `DnsResolver` with the system resolver.

use std::net::IpAddr;

use anyhow::Result;

use crate::application::ports::DnsResolver;

/// Production implementation backed by `tokio::net::lookup_host`.
pub struct TokioDnsResolver;

impl DnsResolver for TokioDnsResolver {
    async fn resolve(&self, hostname: &str) -> Result<Vec<IpAddr>> {
        match tokio::net::lookup_host((hostname, 443)).await {
            Ok(addrs) => {
                let mut ips: Vec<IpAddr> = addrs.map(|a| a.ip()).collect();
                ips.sort();
                ips.dedup();
                Ok(ips)
            }
            Err(err) => {
                tracing::debug!(hostname, "does not resolve: {err}");
                Ok(Vec::new())
            }
        }
    }
}
