//! Public suffix checks for the `Domain` cookie attribute.
//!
//! A response may only widen a cookie to a parent domain of its own host,
//! and never to a public suffix such as `com` or `co.uk`.

use psl::{List, Psl};

/// True when `domain` is itself a public suffix.
pub fn is_public_suffix(domain: &str) -> bool {
    let lower = domain.to_ascii_lowercase();
    List.suffix(lower.as_bytes())
        .is_some_and(|suffix| suffix.as_bytes() == lower.as_bytes())
}

/// True when a cookie carrying `Domain=cookie_domain` may be stored for a
/// response from `host`.
pub fn is_valid_cookie_domain(cookie_domain: &str, host: &str) -> bool {
    let domain = cookie_domain.trim_start_matches('.').to_ascii_lowercase();
    let host = host.to_ascii_lowercase();

    if domain.is_empty() {
        return false;
    }

    // An IP host can only set a cookie for exactly itself.
    if host.trim_start_matches('[').trim_end_matches(']').parse::<std::net::IpAddr>().is_ok() {
        return domain == host;
    }

    if host == domain {
        // Single-label and public-suffix hosts may still set host cookies on themselves.
        return true;
    }

    if is_public_suffix(&domain) {
        return false;
    }

    host.len() > domain.len()
        && host.ends_with(&domain)
        && host.as_bytes()[host.len() - domain.len() - 1] == b'.'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_suffixes() {
        assert!(is_public_suffix("com"));
        assert!(is_public_suffix("CO.UK"));
        assert!(is_public_suffix("github.io"));
        assert!(!is_public_suffix("example.com"));
    }

    #[test]
    fn test_parent_domain_allowed() {
        assert!(is_valid_cookie_domain("example.com", "example.com"));
        assert!(is_valid_cookie_domain(".example.com", "api.example.com"));
    }

    #[test]
    fn test_public_suffix_rejected() {
        assert!(!is_valid_cookie_domain(".com", "example.com"));
        assert!(!is_valid_cookie_domain("co.uk", "shop.example.co.uk"));
    }

    #[test]
    fn test_unrelated_domain_rejected() {
        assert!(!is_valid_cookie_domain("other.com", "example.com"));
        assert!(!is_valid_cookie_domain("ample.com", "example.com"));
    }

    #[test]
    fn test_ip_host() {
        assert!(is_valid_cookie_domain("127.0.0.1", "127.0.0.1"));
        assert!(!is_valid_cookie_domain("0.0.1", "127.0.0.1"));
    }
}
