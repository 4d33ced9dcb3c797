//! One call's exchange: hops, redirects, cookies and output events.

use crate::base::neterror::{NetError, TransportCode};
use crate::cookies::monster::CookieJar;
use crate::http::options::RequestOptions;
use crate::http::orderedheaders::OrderedHeaderMap;
use crate::http::requestbody::RequestBody;
use crate::http::streamfactory::{HopRequest, HopResponse, Transport};
use bytes::Bytes;
use http::{Method, StatusCode, Version};
use http_body_util::BodyExt;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use url::Url;

/// Redirects followed before giving up.
pub const MAX_REDIRECTS: usize = 20;

/// Output of a running transaction, in wire order.
#[derive(Debug)]
pub enum TransactionEvent {
    /// Status of a hop, sent before its header lines.
    Status(u16),
    /// One header line including its CRLF: a status line, a `name: value`
    /// line, or the blank line closing a hop.
    Header(String),
    /// A chunk of the final hop's body.
    Body(Bytes),
    /// The transaction finished; always the last event.
    Done(Result<(), NetError>),
}

/// Log one request (`> `) or response (`< `) line.
pub(crate) fn wire_log(verbose: bool, line: &str) {
    if verbose {
        tracing::info!("{}", line);
    } else {
        tracing::trace!("{}", line);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    SendRequest,
    ReadHeaders,
    FollowRedirect,
    ReadBody,
    Done,
}

/// Drives one call from the first request to the end of the final body.
pub struct HttpNetworkTransaction {
    transport: Arc<dyn Transport>,
    options: Arc<RequestOptions>,
    cookie_store: CookieJar,
    method: Method,
    url: Url,
    request_headers: OrderedHeaderMap,
    body: RequestBody,
    events: UnboundedSender<TransactionEvent>,
    state: State,
    response: Option<HopResponse>,
    redirects: usize,
}

impl HttpNetworkTransaction {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        transport: Arc<dyn Transport>,
        options: Arc<RequestOptions>,
        cookie_store: CookieJar,
        method: Method,
        url: Url,
        request_headers: OrderedHeaderMap,
        body: RequestBody,
        events: UnboundedSender<TransactionEvent>,
    ) -> Self {
        Self {
            transport,
            options,
            cookie_store,
            method,
            url,
            request_headers,
            body,
            events,
            state: State::Idle,
            response: None,
            redirects: 0,
        }
    }

    /// Run to completion and report the outcome as the final event.
    pub async fn run(mut self) {
        let outcome = match self.options.timeout() {
            Some(limit) if limit.is_zero() => Err(NetError::timed_out(limit, "Operation")),
            Some(limit) => tokio::time::timeout(limit, self.do_loop())
                .await
                .unwrap_or_else(|_| Err(NetError::timed_out(limit, "Operation"))),
            None => self.do_loop().await,
        };

        if let Err(ref e) = outcome {
            tracing::debug!(url = %self.url, error = %e, "transfer failed");
        }
        let _ = self.events.send(TransactionEvent::Done(outcome));
    }

    async fn do_loop(&mut self) -> Result<(), NetError> {
        self.apply_default_headers()?;
        let mut payload = std::mem::take(&mut self.body).into_bytes().await?;
        self.state = State::SendRequest;

        loop {
            match self.state {
                State::Idle | State::Done => return Ok(()),
                State::SendRequest => {
                    check_scheme(&self.url)?;
                    let hop = HopRequest {
                        method: self.method.clone(),
                        url: self.url.clone(),
                        headers: self.hop_headers()?,
                        body: payload.clone(),
                    };
                    self.response = Some(self.transport.exchange(hop, self.options.clone()).await?);
                    self.state = State::ReadHeaders;
                }
                State::ReadHeaders => {
                    let location = self
                        .emit_headers()?
                        .filter(|_| self.options.follow_redirects);
                    self.state = match location {
                        Some(location) => {
                            self.prepare_redirect(&location, &mut payload)?;
                            State::FollowRedirect
                        }
                        None => State::ReadBody,
                    };
                }
                State::FollowRedirect => {
                    // Drain so the connection can be reused.
                    if let Some(resp) = self.response.take() {
                        let _ = resp.into_body().collect().await;
                    }
                    self.state = State::SendRequest;
                }
                State::ReadBody => {
                    if let Some(resp) = self.response.take() {
                        let mut body = resp.into_body();
                        while let Some(frame) = body.frame().await {
                            if let Ok(data) = frame?.into_data() {
                                if !data.is_empty() {
                                    self.send(TransactionEvent::Body(data))?;
                                }
                            }
                        }
                    }
                    self.state = State::Done;
                }
            }
        }
    }

    fn apply_default_headers(&mut self) -> Result<(), NetError> {
        if !self.options.user_agent.is_empty() {
            let ua = self.options.user_agent.clone();
            self.request_headers.insert_default("User-Agent", &ua)?;
        }
        self.request_headers.insert_default("Accept", "*/*")?;
        if let Some(content_type) = self.body.default_content_type() {
            self.request_headers
                .insert_default("Content-Type", &content_type)?;
        }
        Ok(())
    }

    /// Caller headers plus the jar's cookies for the current URL.
    fn hop_headers(&self) -> Result<OrderedHeaderMap, NetError> {
        let mut headers = self.request_headers.clone();
        if let Some(jar_cookies) = self.cookie_store.cookie_header(&self.url) {
            let merged = match headers.get("Cookie").and_then(|v| v.to_str().ok()) {
                Some(existing) => format!("{}; {}", existing, jar_cookies),
                None => jar_cookies,
            };
            headers.insert("Cookie", &merged)?;
        }
        Ok(headers)
    }

    /// Emit the status and header lines of the current hop and store its
    /// cookies. Returns the redirect target when the hop is a redirect.
    fn emit_headers(&mut self) -> Result<Option<String>, NetError> {
        let Some(resp) = self.response.as_ref() else {
            return Ok(None);
        };
        let status = resp.status();
        let mut lines = Vec::with_capacity(resp.headers().len() + 2);

        let reason = resp
            .extensions()
            .get::<hyper::ext::ReasonPhrase>()
            .map(|r| String::from_utf8_lossy(r.as_bytes()).into_owned())
            .or_else(|| status.canonical_reason().map(str::to_string))
            .unwrap_or_default();
        lines.push(format!(
            "{} {} {}\r\n",
            version_label(resp.version()),
            status.as_u16(),
            reason
        ));
        for (name, value) in resp.headers() {
            lines.push(format!(
                "{}: {}\r\n",
                name,
                String::from_utf8_lossy(value.as_bytes())
            ));
        }
        lines.push("\r\n".to_string());

        for cookie_line in resp.headers().get_all(http::header::SET_COOKIE) {
            if let Ok(line) = cookie_line.to_str() {
                if !self.cookie_store.parse_and_save_cookie(&self.url, line) {
                    tracing::debug!(url = %self.url, cookie = %line, "cookie rejected");
                }
            }
        }

        let location = is_redirect(status)
            .then(|| resp.headers().get(http::header::LOCATION))
            .flatten()
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        self.send(TransactionEvent::Status(status.as_u16()))?;
        for line in lines {
            wire_log(self.options.verbose, &format!("< {}", line.trim_end()));
            self.send(TransactionEvent::Header(line))?;
        }
        Ok(location)
    }

    fn prepare_redirect(&mut self, location: &str, payload: &mut Bytes) -> Result<(), NetError> {
        self.redirects += 1;
        if self.redirects > MAX_REDIRECTS {
            return Err(NetError::transport(
                TransportCode::TooManyRedirects,
                format!("Maximum ({}) redirects followed", MAX_REDIRECTS),
            ));
        }

        let next = self.url.join(location).map_err(|e| {
            NetError::transport(
                TransportCode::UrlMalformed,
                format!("Bad redirect target {:?}: {}", location, e),
            )
        })?;

        let status = self
            .response
            .as_ref()
            .map(|r| r.status())
            .unwrap_or(StatusCode::FOUND);
        let to_get = match status {
            StatusCode::SEE_OTHER => self.method != Method::HEAD,
            StatusCode::MOVED_PERMANENTLY | StatusCode::FOUND => self.method == Method::POST,
            _ => false,
        };
        if to_get {
            self.method = Method::GET;
            *payload = Bytes::new();
            self.request_headers.remove("Content-Type");
            self.request_headers.remove("Content-Length");
        }

        let same_origin = next.host_str() == self.url.host_str()
            && next.port_or_known_default() == self.url.port_or_known_default();
        if !same_origin {
            self.request_headers.remove("Authorization");
            self.request_headers.remove("Cookie");
        }

        tracing::debug!(from = %self.url, to = %next, status = status.as_u16(), "following redirect");
        self.url = next;
        Ok(())
    }

    fn send(&self, event: TransactionEvent) -> Result<(), NetError> {
        self.events.send(event).map_err(|_| {
            NetError::transport(
                TransportCode::WriteError,
                "Failure writing output to destination",
            )
        })
    }
}

fn is_redirect(status: StatusCode) -> bool {
    matches!(status.as_u16(), 301 | 302 | 303 | 307 | 308)
}

fn version_label(version: Version) -> &'static str {
    match version {
        Version::HTTP_2 => "HTTP/2",
        Version::HTTP_10 => "HTTP/1.0",
        Version::HTTP_3 => "HTTP/3",
        _ => "HTTP/1.1",
    }
}

fn check_scheme(url: &Url) -> Result<(), NetError> {
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(NetError::transport(
            TransportCode::UnsupportedProtocol,
            format!("Protocol \"{}\" not supported", other),
        )),
    }
}
