//! Session-level request options.
//!
//! Options live on the connection handle for the lifetime of an engine and are
//! snapshotted when a transfer starts; a running transfer never observes a
//! later change.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// User agent sent when none is configured.
pub const DEFAULT_USER_AGENT: &str = concat!("slimnet/", env!("CARGO_PKG_VERSION"));

/// A desktop browser user agent (`navigator.userAgent`).
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
    (KHTML, like Gecko) Chrome/93.0.4577.25 Safari/537.36 Edg/93.0.961.18";

/// A command-line tool user agent.
pub const TOOL_USER_AGENT: &str = "curl/7.78.0";

/// HTTP protocol version to negotiate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HttpVersionPref {
    #[serde(rename = "http/1.1")]
    Http11,
    /// HTTP/2 over TLS when the server agrees, HTTP/1.1 otherwise.
    #[default]
    #[serde(rename = "h2")]
    Http2,
}

impl HttpVersionPref {
    /// ALPN protocol identifiers offered in the TLS handshake.
    pub fn alpn_protocols(self) -> &'static [&'static str] {
        match self {
            HttpVersionPref::Http11 => &["http/1.1"],
            HttpVersionPref::Http2 => &["h2", "http/1.1"],
        }
    }
}

/// Proxy selection.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProxyMode {
    /// Use the proxy named by the environment (`HTTPS_PROXY`, `HTTP_PROXY`,
    /// `ALL_PROXY`, honouring `NO_PROXY`).
    #[default]
    System,
    /// Send every request through this proxy URL.
    Explicit(String),
    /// Never use a proxy, whatever the environment says.
    Disabled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestOptions {
    pub protocol_version: HttpVersionPref,
    pub follow_redirects: bool,
    pub proxy: ProxyMode,
    pub user_agent: String,
    /// Bound on a whole call, all hops included. `None` waits forever.
    pub timeout_seconds: Option<u64>,
    /// Bound on each connection establishment. `None` waits forever.
    pub connect_timeout_seconds: Option<u64>,
    pub verbose: bool,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            protocol_version: HttpVersionPref::Http2,
            follow_redirects: true,
            proxy: ProxyMode::System,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_seconds: None,
            connect_timeout_seconds: None,
            verbose: false,
        }
    }
}

impl RequestOptions {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_seconds.map(Duration::from_secs)
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout_seconds.map(Duration::from_secs)
    }

    /// Parse options from a JSON document. Missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let opts = RequestOptions::default();
        assert_eq!(opts.protocol_version, HttpVersionPref::Http2);
        assert!(opts.follow_redirects);
        assert_eq!(opts.proxy, ProxyMode::System);
        assert!(opts.user_agent.starts_with("slimnet/"));
        assert!(opts.timeout().is_none());
        assert!(opts.connect_timeout().is_none());
        assert!(!opts.verbose);
    }

    #[test]
    fn test_from_json_partial() {
        let opts = RequestOptions::from_json(
            r#"{"protocol_version": "http/1.1", "timeout_seconds": 30, "proxy": "disabled"}"#,
        )
        .unwrap();

        assert_eq!(opts.protocol_version, HttpVersionPref::Http11);
        assert_eq!(opts.timeout(), Some(Duration::from_secs(30)));
        assert_eq!(opts.proxy, ProxyMode::Disabled);
        assert!(opts.follow_redirects);
    }

    #[test]
    fn test_explicit_proxy_from_json() {
        let opts =
            RequestOptions::from_json(r#"{"proxy": {"explicit": "http://127.0.0.1:3128"}}"#).unwrap();
        assert_eq!(opts.proxy, ProxyMode::Explicit("http://127.0.0.1:3128".into()));
    }

    #[test]
    fn test_alpn() {
        assert_eq!(HttpVersionPref::Http11.alpn_protocols(), ["http/1.1"]);
        assert_eq!(HttpVersionPref::Http2.alpn_protocols(), ["h2", "http/1.1"]);
    }
}
