//! The network transport: one request/response exchange per call.
//!
//! [`HttpStreamFactory`] establishes connections through
//! [`ConnectJob`](crate::socket::connectjob::ConnectJob), performs the HTTP/1.1
//! or HTTP/2 handshake depending on what ALPN settled on, and keeps the last
//! connection around for the next hop or call.

use crate::base::neterror::{NetError, TransportCode};
use crate::http::options::{HttpVersionPref, RequestOptions};
use crate::http::orderedheaders::OrderedHeaderMap;
use crate::http::transaction::wire_log;
use crate::socket::client::SocketType;
use crate::socket::connectjob::{host_and_port, ConnectJob};
use crate::socket::proxy::{ProxySettings, ProxyType};
use bytes::Bytes;
use futures::future::BoxFuture;
use http::{Method, Request, Response, Version};
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::client::conn::{http1, http2};
use hyper_util::rt::{TokioExecutor, TokioIo};
use std::sync::{Arc, Mutex};
use url::Url;

/// Streaming response body handed back by a [`Transport`].
pub type ResponseBody = UnsyncBoxBody<Bytes, NetError>;

/// Response to one hop.
pub type HopResponse = Response<ResponseBody>;

/// One request on the wire.
#[derive(Debug, Clone)]
pub struct HopRequest {
    pub method: Method,
    pub url: Url,
    pub headers: OrderedHeaderMap,
    pub body: Bytes,
}

/// Performs exactly one HTTP exchange.
///
/// Redirects, cookies and timeouts are handled by the caller; an
/// implementation only moves bytes.
pub trait Transport: Send + Sync + 'static {
    fn exchange(
        &self,
        request: HopRequest,
        options: Arc<RequestOptions>,
    ) -> BoxFuture<'static, Result<HopResponse, NetError>>;
}

/// Wrap an in-memory payload as a [`ResponseBody`].
pub fn full_body(data: impl Into<Bytes>) -> ResponseBody {
    Full::new(data.into())
        .map_err(|never| match never {})
        .boxed_unsync()
}

enum Connection {
    H1(http1::SendRequest<Full<Bytes>>),
    H2(http2::SendRequest<Full<Bytes>>),
}

impl Connection {
    async fn handshake(socket: SocketType) -> Result<Self, NetError> {
        let h2 = socket.negotiated_h2();
        let io = TokioIo::new(socket);

        if h2 {
            let (sender, conn) = http2::handshake(TokioExecutor::new(), io)
                .await
                .map_err(|e| handshake_error("HTTP/2", e))?;
            tokio::spawn(async move {
                if let Err(e) = conn.await {
                    tracing::debug!(error = %e, "HTTP/2 connection ended");
                }
            });
            Ok(Connection::H2(sender))
        } else {
            let (sender, conn) = http1::handshake(io)
                .await
                .map_err(|e| handshake_error("HTTP/1.1", e))?;
            tokio::spawn(async move {
                if let Err(e) = conn.await {
                    tracing::debug!(error = %e, "HTTP/1.1 connection ended");
                }
            });
            Ok(Connection::H1(sender))
        }
    }

    fn is_h2(&self) -> bool {
        matches!(self, Connection::H2(_))
    }

    async fn ready(&mut self) -> Result<(), hyper::Error> {
        match self {
            Connection::H1(s) => s.ready().await,
            Connection::H2(s) => s.ready().await,
        }
    }

    async fn send(&mut self, req: Request<Full<Bytes>>) -> Result<Response<Incoming>, hyper::Error> {
        match self {
            Connection::H1(s) => s.send_request(req).await,
            Connection::H2(s) => s.send_request(req).await,
        }
    }
}

struct IdleConnection {
    key: String,
    conn: Connection,
}

/// Network [`Transport`] with a single idle-connection slot.
#[derive(Clone, Default)]
pub struct HttpStreamFactory {
    idle: Arc<Mutex<Option<IdleConnection>>>,
}

impl std::fmt::Debug for HttpStreamFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpStreamFactory").finish_non_exhaustive()
    }
}

impl HttpStreamFactory {
    pub fn new() -> Self {
        Self::default()
    }

    fn take_idle(&self, key: &str) -> Option<Connection> {
        let mut slot = self.idle.lock().ok()?;
        match slot.take() {
            Some(idle) if idle.key == key => Some(idle.conn),
            // A connection to somewhere else is closed by dropping it.
            _ => None,
        }
    }

    fn put_idle(&self, key: String, conn: Connection) {
        if let Ok(mut slot) = self.idle.lock() {
            *slot = Some(IdleConnection { key, conn });
        }
    }

    async fn send(
        self,
        hop: HopRequest,
        options: Arc<RequestOptions>,
    ) -> Result<HopResponse, NetError> {
        let proxy = ProxySettings::resolve(&options.proxy, &hop.url)?;
        let key = connection_key(&hop.url, proxy.as_ref(), options.protocol_version)?;

        if let Some(mut conn) = self.take_idle(&key) {
            if conn.ready().await.is_ok() {
                tracing::debug!(key = %key, "reusing connection");
                let req = build_request(&hop, proxy.as_ref(), conn.is_h2(), options.verbose)?;
                match conn.send(req).await {
                    Ok(resp) => {
                        self.put_idle(key, conn);
                        return Ok(into_hop_response(resp));
                    }
                    Err(e) if e.is_canceled() || e.is_closed() || e.is_incomplete_message() => {
                        tracing::debug!(error = %e, "reused connection failed, retrying with a fresh one");
                    }
                    Err(e) => return Err(exchange_error(e)),
                }
            }
        }

        let socket = ConnectJob::new(&hop.url, proxy.as_ref(), &options)
            .connect()
            .await?;
        let mut conn = Connection::handshake(socket).await?;

        let req = build_request(&hop, proxy.as_ref(), conn.is_h2(), options.verbose)?;
        let resp = conn.send(req).await.map_err(exchange_error)?;
        self.put_idle(key, conn);
        Ok(into_hop_response(resp))
    }
}

impl Transport for HttpStreamFactory {
    fn exchange(
        &self,
        request: HopRequest,
        options: Arc<RequestOptions>,
    ) -> BoxFuture<'static, Result<HopResponse, NetError>> {
        Box::pin(self.clone().send(request, options))
    }
}

fn connection_key(
    url: &Url,
    proxy: Option<&ProxySettings>,
    version: HttpVersionPref,
) -> Result<String, NetError> {
    let (host, port) = host_and_port(url)?;
    let via = proxy.map(|p| p.key()).unwrap_or_else(|| "direct".to_string());
    Ok(format!(
        "{}://{}:{}|{}|{:?}",
        url.scheme(),
        host,
        port,
        via,
        version
    ))
}

/// `Host` header value: host plus any non-default port.
fn host_header(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    Some(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}

fn build_request(
    hop: &HopRequest,
    proxy: Option<&ProxySettings>,
    h2: bool,
    verbose: bool,
) -> Result<Request<Full<Bytes>>, NetError> {
    let via_http_proxy = hop.url.scheme() == "http"
        && proxy.is_some_and(|p| p.proxy_type() == ProxyType::Http);

    let uri = if h2 || via_http_proxy {
        let mut absolute = hop.url.clone();
        absolute.set_fragment(None);
        absolute.to_string()
    } else {
        match hop.url.query() {
            Some(q) => format!("{}?{}", hop.url.path(), q),
            None => hop.url.path().to_string(),
        }
    };

    let mut headers = hop.headers.clone();
    if h2 {
        headers.remove("host");
    } else if let Some(host) = host_header(&hop.url) {
        headers.insert_default("Host", &host)?;
    }
    if via_http_proxy {
        if let Some(auth) = proxy.and_then(|p| p.get_auth_header()) {
            headers.insert_default("Proxy-Authorization", &auth)?;
        }
    }

    let version = if h2 { Version::HTTP_2 } else { Version::HTTP_11 };
    wire_log(
        verbose,
        &format!("> {} {} {}", hop.method, uri, if h2 { "HTTP/2" } else { "HTTP/1.1" }),
    );
    for (name, value) in headers.iter() {
        wire_log(
            verbose,
            &format!("> {}: {}", name, String::from_utf8_lossy(value.as_bytes())),
        );
    }

    let mut req = Request::builder()
        .method(hop.method.clone())
        .uri(uri)
        .version(version)
        .body(Full::new(hop.body.clone()))
        .map_err(|e| {
            NetError::transport(
                TransportCode::UrlMalformed,
                format!("Malformed request target {}: {}", hop.url, e),
            )
        })?;
    *req.headers_mut() = headers.to_header_map();
    Ok(req)
}

fn into_hop_response(resp: Response<Incoming>) -> HopResponse {
    resp.map(|body| {
        body.map_err(|e| {
            NetError::transport(
                TransportCode::RecvError,
                format!("Failure when receiving data from the peer: {}", e),
            )
        })
        .boxed_unsync()
    })
}

fn handshake_error(protocol: &str, e: hyper::Error) -> NetError {
    NetError::transport(
        TransportCode::CouldntConnect,
        format!("{} handshake failed: {}", protocol, e),
    )
}

fn exchange_error(e: hyper::Error) -> NetError {
    let code = if e.is_parse() {
        TransportCode::WeirdServerReply
    } else if e.is_timeout() {
        TransportCode::OperationTimedOut
    } else if e.is_user() {
        TransportCode::SendError
    } else {
        TransportCode::RecvError
    };
    NetError::transport(code, e.to_string())
}
