//! Blocking request façade.
//!
//! # Example
//!
//! ```rust,ignore
//! use slimnet::TransferEngine;
//!
//! let mut engine = TransferEngine::new()?;
//! engine.set_timeout(30);
//!
//! let resp = engine.get("https://example.com/search", &[("q", "rust")], &[])?;
//! println!("{} {}", resp.status_code(), resp.headers_map().at("content-type")?);
//! ```

use crate::base::neterror::NetError;
use crate::cookies::monster::CookieJar;
use crate::http::multipart::Form;
use crate::http::options::{HttpVersionPref, RequestOptions, BROWSER_USER_AGENT, TOOL_USER_AGENT};
use crate::http::orderedheaders::OrderedHeaderMap;
use crate::http::query::splice_url;
use crate::http::response::Response;
use crate::http::streamfactory::{HttpStreamFactory, Transport};
use crate::transfer::attach::{CookieFile, HeaderList, MimeForm, ScopedAttachment};
use crate::transfer::group::{TransferGroup, POLL_CEILING};
use crate::transfer::handle::{default_cookie_jar_path, ConnectionHandle};
use crate::transfer::runtime::TransportRuntime;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Single-handle HTTP client.
///
/// Every call blocks the calling thread until the exchange completes or
/// fails, and must not be made from inside an async context. Calls take
/// `&mut self`, so one engine runs one transfer at a time; cookies set by one
/// call are sent by the next.
#[derive(Debug)]
pub struct TransferEngine {
    handle: ConnectionHandle,
}

impl TransferEngine {
    /// Engine with default options and the default cookie jar.
    pub fn new() -> Result<Self, NetError> {
        Self::builder().build()
    }

    pub fn builder() -> TransferEngineBuilder {
        TransferEngineBuilder::default()
    }

    pub fn options(&self) -> &RequestOptions {
        self.handle.options()
    }

    pub fn cookies(&self) -> &CookieJar {
        self.handle.cookies()
    }

    pub fn cookie_jar_path(&self) -> &Path {
        self.handle.cookie_jar_path()
    }

    /// Log request and response lines at INFO instead of TRACE.
    pub fn set_verbose(&mut self, verbose: bool) {
        self.handle.set_verbose(verbose);
    }

    pub fn set_allow_redirects(&mut self, allow: bool) {
        self.handle.set_follow_location(allow);
    }

    pub fn use_http_1_1(&mut self) {
        self.handle.set_http_version(HttpVersionPref::Http11);
    }

    pub fn use_http_2(&mut self) {
        self.handle.set_http_version(HttpVersionPref::Http2);
    }

    /// Route every request through `proxy` (`host:port`, `http://`,
    /// `socks5://` or `socks5h://`, optionally with user-info).
    pub fn set_proxy(&mut self, proxy: &str) -> Result<(), NetError> {
        self.handle.set_proxy(proxy)
    }

    /// Never use a proxy, including one named by the environment.
    pub fn clear_proxy(&mut self) {
        self.handle.set_no_proxy();
    }

    pub fn set_user_agent(&mut self, user_agent: &str) -> Result<(), NetError> {
        self.handle.set_user_agent(user_agent)
    }

    /// Identify as a desktop browser.
    pub fn set_browser_user_agent(&mut self) -> Result<(), NetError> {
        self.set_user_agent(BROWSER_USER_AGENT)
    }

    /// Identify as a command-line tool.
    pub fn set_tool_user_agent(&mut self) -> Result<(), NetError> {
        self.set_user_agent(TOOL_USER_AGENT)
    }

    /// Bound each whole call, redirects and body included.
    pub fn set_timeout(&mut self, seconds: u64) {
        self.handle.set_timeout(Duration::from_secs(seconds));
    }

    /// Bound each connection establishment.
    pub fn set_connect_timeout(&mut self, seconds: u64) {
        self.handle.set_connect_timeout(Duration::from_secs(seconds));
    }

    /// GET `url` with `params` appended as a query string.
    ///
    /// Non-ASCII bytes in keys and values are percent-escaped; ASCII passes
    /// through as-is. Repeated keys keep the last value.
    pub fn get(
        &mut self,
        url: &str,
        params: &[(&str, &str)],
        headers: &[(&str, &str)],
    ) -> Result<Response, NetError> {
        let target = splice_url(url, params);
        let headers = OrderedHeaderMap::from_pairs(headers)?;

        let mut cookies = ScopedAttachment::new(&mut self.handle, CookieFile)?;
        cookies.set_get();
        let mut handle = ScopedAttachment::new(&mut *cookies, HeaderList(headers))?;
        handle.set_url(&target)?;

        do_get(&mut handle)
    }

    /// Multipart POST of text fields and files.
    ///
    /// Fails with [`NetError::MissingFile`] before any network activity when
    /// a path is not an existing regular file.
    pub fn post(
        &mut self,
        url: &str,
        data: &[(&str, &str)],
        files: &[(&str, &Path)],
        headers: &[(&str, &str)],
    ) -> Result<Response, NetError> {
        let form = Form::from_fields(data, files)?;
        let headers = OrderedHeaderMap::from_pairs(headers)?;

        let mut cookies = ScopedAttachment::new(&mut self.handle, CookieFile)?;
        let mut form = ScopedAttachment::new(&mut *cookies, MimeForm(form))?;
        let mut handle = ScopedAttachment::new(&mut *form, HeaderList(headers))?;
        handle.set_url(url)?;

        do_post(&mut handle)
    }

    /// POST `body` verbatim.
    pub fn post_raw(
        &mut self,
        url: &str,
        body: impl Into<Bytes>,
        headers: &[(&str, &str)],
    ) -> Result<Response, NetError> {
        let headers = OrderedHeaderMap::from_pairs(headers)?;

        let mut cookies = ScopedAttachment::new(&mut self.handle, CookieFile)?;
        let mut handle = ScopedAttachment::new(&mut *cookies, HeaderList(headers))?;
        handle.set_url(url)?;
        handle.set_post_fields(body.into());

        let result = do_post(&mut handle);
        handle.set_get();
        result
    }
}

/// Spin progress/poll until the transfer is gone; group errors propagate.
fn do_get(handle: &mut ConnectionHandle) -> Result<Response, NetError> {
    let mut response = Response::new();

    let outcome = {
        let mut group = TransferGroup::register(handle)?;
        loop {
            let still_running = group.perform(&mut response)?;
            group.poll(POLL_CEILING)?;
            if still_running == 0 {
                break;
            }
        }
        group.take_outcome()
    };

    response.set_status_code(handle.response_code());
    outcome.map(|()| response)
}

/// Like [`do_get`], but a group error ends the loop quietly and the partial
/// response is returned.
fn do_post(handle: &mut ConnectionHandle) -> Result<Response, NetError> {
    let mut response = Response::new();

    let outcome = {
        let mut group = TransferGroup::register(handle)?;
        let mut stopped_early = false;
        loop {
            let step = group.perform(&mut response).and_then(|still_running| {
                if still_running > 0 {
                    group.poll(POLL_CEILING)?;
                }
                Ok(still_running)
            });
            match step {
                Ok(0) => break,
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(error = %e, "transfer group error, returning partial response");
                    stopped_early = true;
                    break;
                }
            }
        }
        if stopped_early {
            Ok(())
        } else {
            group.take_outcome()
        }
    };

    response.set_status_code(handle.response_code());
    outcome.map(|()| response)
}

/// Builder for [`TransferEngine`].
#[derive(Default)]
pub struct TransferEngineBuilder {
    options: Option<RequestOptions>,
    cookie_jar: Option<PathBuf>,
    transport: Option<Arc<dyn Transport>>,
}

impl TransferEngineBuilder {
    pub fn options(mut self, options: RequestOptions) -> Self {
        self.options = Some(options);
        self
    }

    /// Cookie-jar file; defaults to `cookies.txt` in the temp directory.
    pub fn cookie_jar(mut self, path: impl Into<PathBuf>) -> Self {
        self.cookie_jar = Some(path.into());
        self
    }

    /// Replace the network transport.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn build(self) -> Result<TransferEngine, NetError> {
        let runtime = TransportRuntime::acquire()?;
        let transport = self
            .transport
            .unwrap_or_else(|| Arc::new(HttpStreamFactory::new()));
        let handle = ConnectionHandle::new(
            runtime,
            transport,
            self.options.unwrap_or_default(),
            self.cookie_jar.unwrap_or_else(default_cookie_jar_path),
        )?;
        Ok(TransferEngine { handle })
    }
}
