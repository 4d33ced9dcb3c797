//! `NO_PROXY` bypass rules.
//!
//! Entries are comma-separated. An entry is `*` (bypass everything), an IP
//! address, a CIDR range, or a domain that matches itself and its subdomains
//! (a leading dot is optional).

use std::net::IpAddr;
use url::Url;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProxyMatcher {
    match_all: bool,
    domains: Vec<String>,
    networks: Vec<(IpAddr, u8)>,
}

impl ProxyMatcher {
    /// Rules from `NO_PROXY`, falling back to `no_proxy`.
    pub fn from_env() -> Self {
        let raw = std::env::var("NO_PROXY")
            .or_else(|_| std::env::var("no_proxy"))
            .unwrap_or_default();
        Self::from_string(&raw)
    }

    pub fn from_string(no_proxy: &str) -> Self {
        let mut matcher = ProxyMatcher::default();

        for entry in no_proxy.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            if entry == "*" {
                matcher.match_all = true;
            } else if let Some(network) = parse_network(entry) {
                matcher.networks.push(network);
            } else {
                matcher
                    .domains
                    .push(entry.trim_start_matches('.').to_ascii_lowercase());
            }
        }
        matcher
    }

    pub fn should_bypass(&self, host: &str) -> bool {
        if self.match_all {
            return true;
        }

        let host = host.trim_start_matches('[').trim_end_matches(']');
        if let Ok(ip) = host.parse::<IpAddr>() {
            return self
                .networks
                .iter()
                .any(|(net, prefix)| cidr_contains(*net, *prefix, ip));
        }

        let host = host.to_ascii_lowercase();
        self.domains.iter().any(|domain| {
            host == *domain
                || (host.len() > domain.len()
                    && host.ends_with(domain.as_str())
                    && host.as_bytes()[host.len() - domain.len() - 1] == b'.')
        })
    }

    pub fn should_bypass_url(&self, url: &Url) -> bool {
        url.host_str().is_some_and(|h| self.should_bypass(h))
    }
}

/// `10.0.0.0/8` or a bare address (full-length prefix).
fn parse_network(entry: &str) -> Option<(IpAddr, u8)> {
    match entry.split_once('/') {
        Some((ip, prefix)) => Some((ip.parse().ok()?, prefix.parse().ok()?)),
        None => {
            let ip: IpAddr = entry.trim_start_matches('[').trim_end_matches(']').parse().ok()?;
            let full = if ip.is_ipv4() { 32 } else { 128 };
            Some((ip, full))
        }
    }
}

fn cidr_contains(network: IpAddr, prefix: u8, addr: IpAddr) -> bool {
    match (network, addr) {
        (IpAddr::V4(net), IpAddr::V4(ip)) if prefix <= 32 => {
            let mask = u32::MAX.checked_shl(32 - prefix as u32).unwrap_or(0);
            u32::from(net) & mask == u32::from(ip) & mask
        }
        (IpAddr::V6(net), IpAddr::V6(ip)) if prefix <= 128 => {
            let mask = u128::MAX.checked_shl(128 - prefix as u32).unwrap_or(0);
            u128::from(net) & mask == u128::from(ip) & mask
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wildcard() {
        let m = ProxyMatcher::from_string("*");
        assert!(m.should_bypass("anything.com"));
        assert!(m.should_bypass("192.168.1.1"));
    }

    #[test]
    fn test_domain_and_subdomain() {
        let m = ProxyMatcher::from_string(".example.com");
        assert!(m.should_bypass("example.com"));
        assert!(m.should_bypass("WWW.Example.com"));
        assert!(!m.should_bypass("notexample.com"));
    }

    #[test]
    fn test_ip_and_cidr() {
        let m = ProxyMatcher::from_string("127.0.0.1, 10.0.0.0/8, ::1");
        assert!(m.should_bypass("127.0.0.1"));
        assert!(m.should_bypass("10.20.30.40"));
        assert!(m.should_bypass("[::1]"));
        assert!(!m.should_bypass("192.168.0.1"));
    }

    #[test]
    fn test_zero_prefix_matches_family() {
        let m = ProxyMatcher::from_string("0.0.0.0/0");
        assert!(m.should_bypass("8.8.8.8"));
        assert!(!m.should_bypass("2001:db8::1"));
    }

    #[test]
    fn test_empty_rules() {
        let m = ProxyMatcher::from_string(" , ");
        assert!(!m.should_bypass("localhost"));
    }
}
