use crate::cookies::canonicalcookie::CanonicalCookie;
use dashmap::DashMap;
use std::sync::Arc;
use time::OffsetDateTime;
use url::Url;

/// Maximum cookies kept per domain; the oldest is evicted first.
const MAX_COOKIES_PER_DOMAIN: usize = 50;

/// Prefix marking HttpOnly cookies in Netscape cookie files.
const HTTP_ONLY_PREFIX: &str = "#HttpOnly_";

/// In-memory cookie store shared between an engine and its running transfer.
///
/// Cloning is cheap and yields a handle onto the same store.
#[derive(Clone, Default)]
pub struct CookieJar {
    // Map<Domain, List<Cookie>>
    store: Arc<DashMap<String, Vec<CanonicalCookie>>>,
}

impl std::fmt::Debug for CookieJar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CookieJar")
            .field("cookies", &self.total_cookie_count())
            .finish()
    }
}

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a cookie, replacing any cookie with the same domain, path and name.
    ///
    /// An already-expired cookie only deletes its predecessor.
    pub fn set_canonical_cookie(&self, cookie: CanonicalCookie) {
        let mut entry = self.store.entry(cookie.domain.clone()).or_default();
        entry.retain(|c| c.name != cookie.name || c.path != cookie.path);

        if cookie.is_expired(OffsetDateTime::now_utc()) {
            return;
        }

        while entry.len() >= MAX_COOKIES_PER_DOMAIN {
            let Some(oldest) = entry
                .iter()
                .enumerate()
                .min_by_key(|(_, c)| c.creation_time)
                .map(|(i, _)| i)
            else {
                break;
            };
            entry.remove(oldest);
        }

        entry.push(cookie);
    }

    /// Cookies to send to `url`, longest path first, then oldest first.
    pub fn get_cookies_for_url(&self, url: &Url) -> Vec<CanonicalCookie> {
        let host = url.host_str().unwrap_or("").to_ascii_lowercase();
        let now = OffsetDateTime::now_utc();
        let secure_channel = url.scheme() == "https";
        let mut result = Vec::new();

        for domain in matching_domains(&host) {
            let Some(entry) = self.store.get(&domain) else {
                continue;
            };
            for cookie in entry.iter() {
                if !domain_matches(&cookie.domain, &host, cookie.host_only)
                    || !path_matches(&cookie.path, url.path())
                    || (cookie.secure && !secure_channel)
                    || cookie.is_expired(now)
                {
                    continue;
                }
                result.push(cookie.clone());
            }
        }

        result.sort_by(|a, b| {
            b.path
                .len()
                .cmp(&a.path.len())
                .then_with(|| a.creation_time.cmp(&b.creation_time))
        });
        result
    }

    /// The `Cookie` request header value for `url`, if any cookie matches.
    pub fn cookie_header(&self, url: &Url) -> Option<String> {
        let cookies = self.get_cookies_for_url(url);
        if cookies.is_empty() {
            return None;
        }
        Some(
            cookies
                .iter()
                .map(|c| format!("{}={}", c.name, c.value))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }

    /// Parse one `Set-Cookie` value received from `url` and store it.
    ///
    /// Returns false when the line is malformed or its domain is rejected.
    pub fn parse_and_save_cookie(&self, url: &Url, cookie_line: &str) -> bool {
        let parsed = match cookie::Cookie::parse(cookie_line) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::debug!(error = %e, line = %cookie_line, "ignoring malformed Set-Cookie");
                return false;
            }
        };

        let host = url.host_str().unwrap_or("").to_ascii_lowercase();
        let (domain, host_only) = match parsed.domain() {
            Some(d) if !d.trim_start_matches('.').is_empty() => {
                let d = d.trim_start_matches('.').to_ascii_lowercase();
                if !crate::cookies::psl::is_valid_cookie_domain(&d, &host) {
                    tracing::debug!(domain = %d, host = %host, "rejecting cookie domain");
                    return false;
                }
                (d, false)
            }
            _ => (host, true),
        };

        let path = match parsed.path() {
            Some(p) if p.starts_with('/') => p.to_string(),
            _ => default_path(url),
        };

        let now = OffsetDateTime::now_utc();
        let expiration_time = match parsed.max_age() {
            Some(max_age) => Some(now + max_age),
            None => parsed.expires().and_then(|e| e.datetime()),
        };

        self.set_canonical_cookie(CanonicalCookie {
            name: parsed.name().to_string(),
            value: parsed.value().to_string(),
            domain,
            path,
            creation_time: now,
            expiration_time,
            secure: parsed.secure().unwrap_or(false),
            http_only: parsed.http_only().unwrap_or(false),
            host_only,
        });
        true
    }

    pub fn total_cookie_count(&self) -> usize {
        self.store.iter().map(|e| e.value().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total_cookie_count() == 0
    }

    pub fn iter_all_cookies(&self) -> impl Iterator<Item = CanonicalCookie> + '_ {
        self.store.iter().flat_map(|entry| entry.value().clone())
    }

    /// Render the jar in Netscape cookie-file format.
    ///
    /// Each line is
    /// `domain\tinclude_subdomains\tpath\tsecure\texpiry\tname\tvalue`; session
    /// cookies carry expiry `0`.
    pub fn export_netscape(&self) -> String {
        let mut lines = vec![
            "# Netscape HTTP Cookie File".to_string(),
            "# https://curl.se/docs/http-cookies.html".to_string(),
            "# This file was generated by slimnet! Edit at your own risk.".to_string(),
            String::new(),
        ];

        let now = OffsetDateTime::now_utc();
        for cookie in self.iter_all_cookies() {
            if cookie.is_expired(now) {
                continue;
            }
            let domain = if cookie.host_only {
                cookie.domain.clone()
            } else {
                format!(".{}", cookie.domain)
            };
            let prefix = if cookie.http_only { HTTP_ONLY_PREFIX } else { "" };
            let expiry = cookie
                .expiration_time
                .map(|t| t.unix_timestamp())
                .unwrap_or(0);

            lines.push(format!(
                "{}{}\t{}\t{}\t{}\t{}\t{}\t{}",
                prefix,
                domain,
                bool_field(!cookie.host_only),
                cookie.path,
                bool_field(cookie.secure),
                expiry,
                cookie.name,
                cookie.value
            ));
        }

        let mut out = lines.join("\n");
        out.push('\n');
        out
    }

    /// Load cookies from Netscape cookie-file content; returns how many were stored.
    ///
    /// Expired entries are skipped.
    pub fn import_netscape(&self, content: &str) -> usize {
        let now = OffsetDateTime::now_utc();
        let mut count = 0;

        for raw in content.lines() {
            let mut line = raw.trim_end_matches('\r');
            let mut http_only = false;

            if let Some(rest) = line.strip_prefix(HTTP_ONLY_PREFIX) {
                line = rest;
                http_only = true;
            } else if line.trim().is_empty() || line.starts_with('#') {
                continue;
            }

            let parts: Vec<&str> = line.split('\t').collect();
            if parts.len() < 6 {
                continue;
            }

            let expiry: i64 = parts[4].trim().parse().unwrap_or(0);
            let expiration_time = if expiry > 0 {
                OffsetDateTime::from_unix_timestamp(expiry).ok()
            } else {
                None
            };

            let cookie = CanonicalCookie {
                name: parts[5].to_string(),
                value: parts.get(6).copied().unwrap_or("").to_string(),
                domain: parts[0].trim_start_matches('.').to_ascii_lowercase(),
                path: parts[2].to_string(),
                creation_time: now,
                expiration_time,
                secure: parts[3].eq_ignore_ascii_case("TRUE"),
                http_only,
                host_only: !parts[1].eq_ignore_ascii_case("TRUE"),
            };

            if cookie.is_expired(now) {
                continue;
            }

            self.set_canonical_cookie(cookie);
            count += 1;
        }

        count
    }
}

fn bool_field(flag: bool) -> &'static str {
    if flag {
        "TRUE"
    } else {
        "FALSE"
    }
}

/// RFC 6265 domain matching.
fn domain_matches(cookie_domain: &str, request_host: &str, host_only: bool) -> bool {
    if request_host.eq_ignore_ascii_case(cookie_domain) {
        return true;
    }
    if host_only || request_host.len() <= cookie_domain.len() {
        return false;
    }

    let split = request_host.len() - cookie_domain.len();
    request_host[split..].eq_ignore_ascii_case(cookie_domain)
        && request_host.as_bytes()[split - 1] == b'.'
}

/// RFC 6265 path matching.
fn path_matches(cookie_path: &str, request_path: &str) -> bool {
    if request_path == cookie_path {
        return true;
    }
    request_path.starts_with(cookie_path)
        && (cookie_path.ends_with('/')
            || request_path.as_bytes().get(cookie_path.len()) == Some(&b'/'))
}

/// The host itself and every parent domain, e.g. `a.b.example.com`,
/// `b.example.com`, `example.com`, `com`.
fn matching_domains(host: &str) -> Vec<String> {
    let mut domains = vec![host.to_string()];
    let mut rest = host;
    while let Some((_, parent)) = rest.split_once('.') {
        if parent.is_empty() {
            break;
        }
        domains.push(parent.to_string());
        rest = parent;
    }
    domains
}

/// RFC 6265 default-path: the request path up to, not including, its last `/`.
fn default_path(url: &Url) -> String {
    let path = url.path();
    match path.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(idx) => path[..idx].to_string(),
    }
}
