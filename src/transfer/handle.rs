use crate::base::neterror::{NetError, TransportCode};
use crate::cookies::monster::CookieJar;
use crate::http::options::{HttpVersionPref, ProxyMode, RequestOptions};
use crate::http::orderedheaders::OrderedHeaderMap;
use crate::http::requestbody::RequestBody;
use crate::http::streamfactory::Transport;
use crate::http::transaction::{HttpNetworkTransaction, TransactionEvent};
use crate::socket::proxy::ProxySettings;
use crate::transfer::runtime::TransportRuntime;
use bytes::Bytes;
use http::{HeaderValue, Method};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::task::JoinHandle;
use url::Url;

/// Default cookie jar: `cookies.txt` in the system temp directory.
pub fn default_cookie_jar_path() -> PathBuf {
    std::env::temp_dir().join("cookies.txt")
}

/// Persistent per-engine transfer state.
///
/// Holds the session options, the cookie store, and whatever the current
/// call has attached (target, method, header list, payload). Not reentrant:
/// one transfer at a time.
pub struct ConnectionHandle {
    options: RequestOptions,
    transport: Arc<dyn Transport>,
    cookies: CookieJar,
    cookie_jar_path: PathBuf,
    pub(crate) cookie_file: Option<PathBuf>,
    url: Option<Url>,
    method: Method,
    pub(crate) headers: Option<OrderedHeaderMap>,
    pub(crate) body: RequestBody,
    last_status: u16,
    // Dropped last so the runtime outlives everything above.
    runtime: Arc<TransportRuntime>,
}

impl std::fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("options", &self.options)
            .field("cookie_jar_path", &self.cookie_jar_path)
            .field("url", &self.url.as_ref().map(Url::as_str))
            .field("method", &self.method)
            .field("last_status", &self.last_status)
            .finish_non_exhaustive()
    }
}

impl ConnectionHandle {
    pub fn new(
        runtime: Arc<TransportRuntime>,
        transport: Arc<dyn Transport>,
        options: RequestOptions,
        cookie_jar_path: PathBuf,
    ) -> Result<Self, NetError> {
        if cookie_jar_path.as_os_str().is_empty() {
            return Err(NetError::HandleCreate("cookie jar path is empty".into()));
        }
        let mut handle = Self {
            options: RequestOptions::default(),
            transport,
            cookies: CookieJar::new(),
            cookie_jar_path,
            cookie_file: None,
            url: None,
            method: Method::GET,
            headers: None,
            body: RequestBody::Empty,
            last_status: 0,
            runtime,
        };
        handle
            .apply_options(options)
            .map_err(|e| NetError::HandleCreate(e.to_string()))?;
        Ok(handle)
    }

    /// Replace every option at once, validating like the individual setters.
    pub fn apply_options(&mut self, options: RequestOptions) -> Result<(), NetError> {
        if let ProxyMode::Explicit(ref proxy) = options.proxy {
            ProxySettings::parse(proxy)?;
        }
        validate_user_agent(&options.user_agent)?;
        self.options = options;
        Ok(())
    }

    pub fn options(&self) -> &RequestOptions {
        &self.options
    }

    pub fn cookies(&self) -> &CookieJar {
        &self.cookies
    }

    pub fn cookie_jar_path(&self) -> &Path {
        &self.cookie_jar_path
    }

    pub fn set_verbose(&mut self, verbose: bool) {
        self.options.verbose = verbose;
    }

    pub fn set_follow_location(&mut self, follow: bool) {
        self.options.follow_redirects = follow;
    }

    pub fn set_http_version(&mut self, version: HttpVersionPref) {
        self.options.protocol_version = version;
    }

    pub fn set_proxy(&mut self, proxy: &str) -> Result<(), NetError> {
        ProxySettings::parse(proxy)?;
        self.options.proxy = ProxyMode::Explicit(proxy.to_string());
        Ok(())
    }

    pub fn set_no_proxy(&mut self) {
        self.options.proxy = ProxyMode::Disabled;
    }

    pub fn set_user_agent(&mut self, user_agent: &str) -> Result<(), NetError> {
        validate_user_agent(user_agent)?;
        self.options.user_agent = user_agent.to_string();
        Ok(())
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.options.timeout_seconds = Some(timeout.as_secs());
    }

    pub fn set_connect_timeout(&mut self, timeout: Duration) {
        self.options.connect_timeout_seconds = Some(timeout.as_secs());
    }

    pub fn set_url(&mut self, url: &str) -> Result<(), NetError> {
        let parsed = Url::parse(url).map_err(|e| {
            NetError::transport(
                TransportCode::UrlMalformed,
                format!("URL using bad/illegal format or missing URL: {} ({})", url, e),
            )
        })?;
        self.url = Some(parsed);
        Ok(())
    }

    /// Plain GET with no payload.
    pub fn set_get(&mut self) {
        self.method = Method::GET;
        self.body = RequestBody::Empty;
    }

    /// POST with whatever payload is attached (a form, or bytes set with
    /// [`set_post_fields`](Self::set_post_fields)).
    pub fn set_post(&mut self) {
        self.method = Method::POST;
    }

    /// POST `data` verbatim.
    pub fn set_post_fields(&mut self, data: Bytes) {
        self.method = Method::POST;
        self.body = RequestBody::Bytes(data);
    }

    /// Status of the last hop seen by the most recent transfer, 0 if none.
    pub fn response_code(&self) -> u16 {
        self.last_status
    }

    pub(crate) fn set_response_code(&mut self, status: u16) {
        self.last_status = status;
    }

    pub(crate) fn runtime(&self) -> &Arc<TransportRuntime> {
        &self.runtime
    }

    /// Spawn the transfer described by the current state.
    pub(crate) fn start_transfer(
        &mut self,
    ) -> Result<(JoinHandle<()>, UnboundedReceiver<TransactionEvent>), NetError> {
        let url = self.url.clone().ok_or_else(|| {
            NetError::transport(TransportCode::UrlMalformed, "No URL set")
        })?;

        self.last_status = 0;
        let (tx, rx) = mpsc::unbounded_channel();
        let transaction = HttpNetworkTransaction::new(
            self.transport.clone(),
            Arc::new(self.options.clone()),
            self.cookies.clone(),
            self.method.clone(),
            url,
            self.headers.clone().unwrap_or_default(),
            self.body.clone(),
            tx,
        );

        tracing::debug!(method = %self.method, url = ?self.url.as_ref().map(Url::as_str), "starting transfer");
        let task = self.runtime.spawn(transaction.run())?;
        Ok((task, rx))
    }
}

fn validate_user_agent(user_agent: &str) -> Result<(), NetError> {
    HeaderValue::from_str(user_agent)
        .map(|_| ())
        .map_err(|_| NetError::bad_argument(format!("invalid user agent {:?}", user_agent)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::streamfactory::HttpStreamFactory;

    fn handle() -> ConnectionHandle {
        ConnectionHandle::new(
            TransportRuntime::acquire().unwrap(),
            Arc::new(HttpStreamFactory::new()),
            RequestOptions::default(),
            default_cookie_jar_path(),
        )
        .unwrap()
    }

    #[test]
    fn test_option_setters() {
        let mut h = handle();
        h.set_verbose(true);
        h.set_follow_location(false);
        h.set_http_version(HttpVersionPref::Http11);
        h.set_timeout(Duration::from_secs(5));
        h.set_connect_timeout(Duration::from_secs(2));

        let o = h.options();
        assert!(o.verbose);
        assert!(!o.follow_redirects);
        assert_eq!(o.protocol_version, HttpVersionPref::Http11);
        assert_eq!(o.timeout_seconds, Some(5));
        assert_eq!(o.connect_timeout_seconds, Some(2));
    }

    #[test]
    fn test_proxy_states() {
        let mut h = handle();
        assert_eq!(h.options().proxy, ProxyMode::System);
        h.set_proxy("http://127.0.0.1:3128").unwrap();
        assert_eq!(
            h.options().proxy,
            ProxyMode::Explicit("http://127.0.0.1:3128".into())
        );
        h.set_no_proxy();
        assert_eq!(h.options().proxy, ProxyMode::Disabled);

        assert!(h.set_proxy("ftp://nope:21").is_err());
        assert_eq!(h.options().proxy, ProxyMode::Disabled);
    }

    #[test]
    fn test_rejects_bad_user_agent() {
        let mut h = handle();
        assert!(h.set_user_agent("bad\r\nagent").is_err());
        h.set_user_agent("custom/1.0").unwrap();
        assert_eq!(h.options().user_agent, "custom/1.0");
    }

    #[test]
    fn test_bad_url() {
        let mut h = handle();
        let err = h.set_url("not a url").unwrap_err();
        assert_eq!(err.code(), Some(TransportCode::UrlMalformed));
    }

    #[test]
    fn test_empty_jar_path_fails_creation() {
        let err = ConnectionHandle::new(
            TransportRuntime::acquire().unwrap(),
            Arc::new(HttpStreamFactory::new()),
            RequestOptions::default(),
            PathBuf::new(),
        )
        .unwrap_err();
        assert!(matches!(err, NetError::HandleCreate(_)));
    }
}
