use super::matcher::ProxyMatcher;
use crate::base::neterror::{NetError, TransportCode};
use crate::http::options::ProxyMode;
use url::Url;
use zeroize::Zeroizing;

/// Proxy protocol type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyType {
    /// HTTP proxy: absolute-form requests for `http://`, CONNECT for `https://`.
    Http,
    /// SOCKS5 with local name resolution.
    Socks5,
    /// SOCKS5 with the proxy resolving host names.
    Socks5h,
}

/// A resolved proxy endpoint.
#[derive(Debug, Clone)]
pub struct ProxySettings {
    pub url: Url,
    pub username: Option<String>,
    /// Zeroized on drop.
    pub password: Option<Zeroizing<String>>,
    kind: ProxyType,
}

impl ProxySettings {
    /// Parse a proxy URL. A string without a scheme is an HTTP proxy.
    pub fn parse(proxy: &str) -> Result<Self, NetError> {
        let proxy = proxy.trim();
        let with_scheme = if proxy.contains("://") {
            proxy.to_string()
        } else {
            format!("http://{}", proxy)
        };

        let url = Url::parse(&with_scheme).map_err(|e| {
            NetError::transport(
                TransportCode::CouldntResolveProxy,
                format!("Could not parse proxy {:?}: {}", proxy, e),
            )
        })?;

        let kind = match url.scheme() {
            "http" => ProxyType::Http,
            "socks5" => ProxyType::Socks5,
            "socks5h" => ProxyType::Socks5h,
            other => {
                return Err(NetError::transport(
                    TransportCode::UnsupportedProtocol,
                    format!("Unsupported proxy scheme '{}'", other),
                ))
            }
        };

        if url.host_str().is_none() {
            return Err(NetError::transport(
                TransportCode::CouldntResolveProxy,
                format!("Proxy {:?} has no host", proxy),
            ));
        }

        let username = (!url.username().is_empty()).then(|| url.username().to_string());
        let password = url.password().map(|p| Zeroizing::new(p.to_string()));

        Ok(Self {
            url,
            username,
            password,
            kind,
        })
    }

    /// The proxy the environment names for `target`, if any.
    ///
    /// `https://` targets read `HTTPS_PROXY`, `http://` targets read
    /// `HTTP_PROXY`; both fall back to `ALL_PROXY`. Lower-case spellings are
    /// accepted. `NO_PROXY` is honoured.
    pub fn from_env(target: &Url) -> Option<Self> {
        let scheme_vars: &[&str] = match target.scheme() {
            "https" => &["HTTPS_PROXY", "https_proxy"],
            _ => &["http_proxy", "HTTP_PROXY"],
        };

        let raw = scheme_vars
            .iter()
            .chain(["ALL_PROXY", "all_proxy"].iter())
            .find_map(|var| std::env::var(var).ok().filter(|v| !v.trim().is_empty()))?;

        if ProxyMatcher::from_env().should_bypass_url(target) {
            return None;
        }

        match Self::parse(&raw) {
            Ok(settings) => Some(settings),
            Err(e) => {
                tracing::warn!(proxy = %raw, error = %e, "ignoring unusable proxy from environment");
                None
            }
        }
    }

    /// Resolve a [`ProxyMode`] for one hop.
    pub fn resolve(mode: &ProxyMode, target: &Url) -> Result<Option<Self>, NetError> {
        match mode {
            ProxyMode::Disabled => Ok(None),
            ProxyMode::System => Ok(Self::from_env(target)),
            ProxyMode::Explicit(url) => Self::parse(url).map(Some),
        }
    }

    pub fn proxy_type(&self) -> ProxyType {
        self.kind
    }

    /// Proxy host and port. A missing port means 1080.
    pub fn host_port(&self) -> (&str, u16) {
        let host = self.url.host_str().unwrap_or_default();
        (host, self.url.port().unwrap_or(1080))
    }

    /// `Proxy-Authorization` header value for HTTP proxies.
    pub fn get_auth_header(&self) -> Option<String> {
        use base64::{engine::general_purpose, Engine as _};

        let user = self.username.as_deref()?;
        let pass = self.password.as_ref().map(|p| p.as_str()).unwrap_or("");
        let creds = Zeroizing::new(format!("{}:{}", user, pass));
        Some(format!("Basic {}", general_purpose::STANDARD.encode(creds.as_bytes())))
    }

    /// Username/password pair for SOCKS5 authentication.
    pub fn get_socks5_auth(&self) -> Option<(&str, &str)> {
        let user = self.username.as_deref()?;
        let pass = self.password.as_ref().map(|p| p.as_str()).unwrap_or("");
        Some((user, pass))
    }

    /// Identity used to decide whether an idle connection can be reused.
    pub fn key(&self) -> String {
        let (host, port) = self.host_port();
        format!("{}://{}:{}", self.url.scheme(), host, port)
    }
}
