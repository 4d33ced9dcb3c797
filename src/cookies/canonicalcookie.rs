use time::OffsetDateTime;

/// A single stored cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalCookie {
    pub name: String,
    pub value: String,
    /// Lower-cased domain without a leading dot.
    pub domain: String,
    pub path: String,
    pub creation_time: OffsetDateTime,
    /// `None` for session cookies.
    pub expiration_time: Option<OffsetDateTime>,
    pub secure: bool,
    pub http_only: bool,
    /// Host-only cookies match their exact host, never subdomains.
    pub host_only: bool,
}

impl CanonicalCookie {
    pub fn new(
        name: impl Into<String>,
        value: impl Into<String>,
        domain: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: domain.into(),
            path: path.into(),
            creation_time: OffsetDateTime::now_utc(),
            expiration_time: None,
            secure: false,
            http_only: false,
            host_only: true,
        }
    }

    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        self.expiration_time.is_some_and(|expiry| expiry <= now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_cookie_never_expires() {
        let cookie = CanonicalCookie::new("sid", "1", "example.com", "/");
        assert!(cookie.expiration_time.is_none());
        assert!(!cookie.is_expired(OffsetDateTime::now_utc() + time::Duration::days(3650)));
    }

    #[test]
    fn test_expiry() {
        let now = OffsetDateTime::now_utc();
        let mut cookie = CanonicalCookie::new("sid", "1", "example.com", "/");
        cookie.expiration_time = Some(now - time::Duration::seconds(1));
        assert!(cookie.is_expired(now));
    }
}
