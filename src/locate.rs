//! Service locator.
//!
//! Resolves the configuration service hostname to its full set of backing
//! addresses and picks one at random, so repeated syncs spread across the
//! service replicas. The endpoint is never cached: addresses may rotate
//! between runs.

use std::fmt;
use std::net::IpAddr;

use hickory_resolver::TokioAsyncResolver;
use log::{debug, info};
use rand::seq::SliceRandom;
use rand::Rng;

use crate::error::SyncError;

/// A resolved base URL for the configuration service, valid for one run.
#[derive(Debug, Clone)]
pub struct Endpoint {
    base: String,
}

impl Endpoint {
    pub fn new(ip: IpAddr, port: u16) -> Self {
        let base = match ip {
            IpAddr::V4(v4) => format!("http://{}:{}/", v4, port),
            IpAddr::V6(v6) => format!("http://[{}]:{}/", v6, port),
        };
        Self { base }
    }

    /// Renders a URL for a path relative to the service root.
    pub fn join(&self, path: &str) -> String {
        format!("{}{}", self.base, path.trim_start_matches('/'))
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.base)
    }
}

/// Picks one address uniformly at random from the candidate set.
pub fn select_address(addrs: &[IpAddr], rng: &mut impl Rng) -> Option<IpAddr> {
    addrs.choose(rng).copied()
}

/// Resolves `host` and renders a fresh endpoint for this run.
pub async fn resolve_endpoint(host: &str, port: u16) -> Result<Endpoint, SyncError> {
    let fail = |detail: String| SyncError::Resolution {
        host: host.to_string(),
        detail,
    };

    // An address literal in the configuration short-circuits resolution.
    let addrs: Vec<IpAddr> = if let Ok(ip) = host.parse::<IpAddr>() {
        vec![ip]
    } else {
        let resolver =
            TokioAsyncResolver::tokio_from_system_conf().map_err(|e| fail(e.to_string()))?;
        let lookup = resolver
            .lookup_ip(host)
            .await
            .map_err(|e| fail(e.to_string()))?;
        lookup.iter().collect()
    };
    debug!("Resolved {} to {} address(es)", host, addrs.len());

    let ip = select_address(&addrs, &mut rand::thread_rng())
        .ok_or_else(|| fail("name resolved to zero addresses".to_string()))?;

    let endpoint = Endpoint::new(ip, port);
    info!("Using configuration service endpoint {}", endpoint);
    Ok(endpoint)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;
    use std::net::Ipv4Addr;

    fn candidates() -> Vec<IpAddr> {
        vec![
            IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)),
            IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2)),
            IpAddr::V4(Ipv4Addr::new(10, 0, 0, 3)),
        ]
    }

    #[test]
    fn selection_reaches_every_candidate() {
        let addrs = candidates();
        let mut seen = HashSet::new();
        for seed in 0..64u64 {
            let mut rng = StdRng::seed_from_u64(seed);
            seen.insert(select_address(&addrs, &mut rng).unwrap());
        }
        assert_eq!(seen.len(), addrs.len());
    }

    #[test]
    fn selected_address_appears_in_endpoint() {
        let addrs = candidates();
        for seed in 0..16u64 {
            let mut rng = StdRng::seed_from_u64(seed);
            let ip = select_address(&addrs, &mut rng).unwrap();
            let endpoint = Endpoint::new(ip, 8080);
            assert!(endpoint.to_string().contains(&ip.to_string()));
        }
    }

    #[test]
    fn selection_from_empty_set_is_none() {
        let mut rng = StdRng::seed_from_u64(0);
        assert!(select_address(&[], &mut rng).is_none());
    }

    #[test]
    fn endpoint_renders_ipv4() {
        let endpoint = Endpoint::new("10.1.2.3".parse().unwrap(), 8080);
        assert_eq!(endpoint.to_string(), "http://10.1.2.3:8080/");
    }

    #[test]
    fn endpoint_brackets_ipv6() {
        let endpoint = Endpoint::new("fd00::7".parse().unwrap(), 9000);
        assert_eq!(endpoint.to_string(), "http://[fd00::7]:9000/");
    }

    #[test]
    fn join_normalizes_leading_slash() {
        let endpoint = Endpoint::new("10.1.2.3".parse().unwrap(), 8080);
        assert_eq!(
            endpoint.join("/tarballs/v7.tar.gz"),
            "http://10.1.2.3:8080/tarballs/v7.tar.gz"
        );
        assert_eq!(
            endpoint.join("configuration/generate"),
            "http://10.1.2.3:8080/configuration/generate"
        );
    }
}
