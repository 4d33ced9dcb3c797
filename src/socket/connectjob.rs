use crate::base::context::IoResultExt;
use crate::base::neterror::{NetError, TransportCode};
use crate::http::options::RequestOptions;
use crate::socket::client::SocketType;
use crate::socket::proxy::{ProxySettings, ProxyType};
use crate::socket::tls::TlsConfig;
use std::net::{IpAddr, SocketAddr};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use url::{Host, Url};

/// Largest CONNECT response header block accepted from a proxy.
const MAX_TUNNEL_RESPONSE: usize = 8 * 1024;

/// Connection establishment: DNS -> TCP -> proxy handshake -> TLS.
///
/// The whole sequence runs under `connect_timeout`.
pub struct ConnectJob<'a> {
    url: &'a Url,
    proxy: Option<&'a ProxySettings>,
    options: &'a RequestOptions,
}

impl<'a> ConnectJob<'a> {
    pub fn new(url: &'a Url, proxy: Option<&'a ProxySettings>, options: &'a RequestOptions) -> Self {
        Self {
            url,
            proxy,
            options,
        }
    }

    pub async fn connect(self) -> Result<SocketType, NetError> {
        match self.options.connect_timeout() {
            Some(limit) if limit.is_zero() => Err(NetError::timed_out(limit, "Connection")),
            Some(limit) => tokio::time::timeout(limit, self.do_connect())
                .await
                .map_err(|_| NetError::timed_out(limit, "Connection"))?,
            None => self.do_connect().await,
        }
    }

    async fn do_connect(&self) -> Result<SocketType, NetError> {
        let (target_host, target_port) = host_and_port(self.url)?;

        let stream = match self.proxy {
            None => tcp_connect(&target_host, target_port).await?,
            Some(proxy) => {
                let (proxy_host, proxy_port) = proxy.host_port();
                let proxy_host = proxy_host.trim_start_matches('[').trim_end_matches(']');
                let mut stream = tcp_connect(proxy_host, proxy_port).await.map_err(|e| {
                    match e.code() {
                        Some(TransportCode::CouldntResolveHost) => NetError::transport(
                            TransportCode::CouldntResolveProxy,
                            format!("Could not resolve proxy: {}", proxy_host),
                        ),
                        _ => e,
                    }
                })?;

                match proxy.proxy_type() {
                    // Plain http goes out in absolute-form; only TLS targets need a tunnel.
                    ProxyType::Http if self.url.scheme() == "https" => {
                        http_tunnel(&mut stream, &target_host, target_port, proxy).await?;
                    }
                    ProxyType::Http => {}
                    ProxyType::Socks5 | ProxyType::Socks5h => {
                        socks5_handshake(&mut stream, &target_host, target_port, proxy).await?;
                    }
                }
                stream
            }
        };

        if self.url.scheme() != "https" {
            return Ok(SocketType::Tcp(stream));
        }

        let config = TlsConfig::for_version(self.options.protocol_version).configure(&target_host)?;
        let tls = tokio_boring::connect(config, &target_host, stream)
            .await
            .map_err(|e| {
                tracing::debug!(host = %target_host, error = %e, "TLS handshake failed");
                NetError::transport(
                    TransportCode::SslConnectError,
                    format!("SSL connect error with {}: {}", target_host, e),
                )
            })?;
        Ok(SocketType::Ssl(tls))
    }
}

/// Host (brackets stripped) and effective port of `url`.
pub fn host_and_port(url: &Url) -> Result<(String, u16), NetError> {
    let host = match url.host() {
        Some(Host::Domain(d)) => d.to_string(),
        Some(Host::Ipv4(ip)) => ip.to_string(),
        Some(Host::Ipv6(ip)) => ip.to_string(),
        None => {
            return Err(NetError::transport(
                TransportCode::UrlMalformed,
                format!("URL has no host: {}", url),
            ))
        }
    };
    let port = url.port_or_known_default().ok_or_else(|| {
        NetError::transport(
            TransportCode::UnsupportedProtocol,
            format!("Protocol \"{}\" not supported", url.scheme()),
        )
    })?;
    Ok((host, port))
}

async fn tcp_connect(host: &str, port: u16) -> Result<TcpStream, NetError> {
    let addrs: Vec<SocketAddr> = tokio::net::lookup_host((host, port))
        .await
        .dns_context(host)?
        .collect();

    let mut last_err = None;
    for addr in addrs {
        match TcpStream::connect(addr).await {
            Ok(stream) => {
                let _ = stream.set_nodelay(true);
                tracing::debug!(host = %host, %addr, "connected");
                return Ok(stream);
            }
            Err(e) => last_err = Some(e),
        }
    }

    let err = last_err
        .unwrap_or_else(|| std::io::Error::new(std::io::ErrorKind::NotFound, "no addresses"));
    Err::<TcpStream, _>(err).connection_context(host, port)
}

async fn http_tunnel<S>(
    stream: &mut S,
    host: &str,
    port: u16,
    proxy: &ProxySettings,
) -> Result<(), NetError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let authority = if host.contains(':') {
        format!("[{}]:{}", host, port)
    } else {
        format!("{}:{}", host, port)
    };

    let mut request = format!("CONNECT {0} HTTP/1.1\r\nHost: {0}\r\n", authority);
    if let Some(auth) = proxy.get_auth_header() {
        request.push_str(&format!("Proxy-Authorization: {}\r\n", auth));
    }
    request.push_str("\r\n");

    stream
        .write_all(request.as_bytes())
        .await
        .io_context(TransportCode::SendError, "Failed sending CONNECT to proxy")?;

    let mut buf = Vec::with_capacity(512);
    let mut chunk = [0u8; 512];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = stream
            .read(&mut chunk)
            .await
            .io_context(TransportCode::RecvError, "Failed reading CONNECT response")?;
        if n == 0 {
            return Err(proxy_error("Proxy closed the connection during CONNECT"));
        }
        buf.extend_from_slice(&chunk[..n]);
        if buf.len() > MAX_TUNNEL_RESPONSE {
            return Err(proxy_error("CONNECT response headers too large"));
        }
    }

    let head = String::from_utf8_lossy(&buf);
    let status = head
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|code| code.parse::<u16>().ok())
        .ok_or_else(|| proxy_error("Malformed CONNECT response from proxy"))?;

    tracing::debug!(tunnel = %authority, status, "CONNECT tunnel response");
    if !(200..300).contains(&status) {
        return Err(proxy_error(&format!(
            "CONNECT tunnel failed, response {}",
            status
        )));
    }
    Ok(())
}

async fn socks5_handshake<S>(
    stream: &mut S,
    host: &str,
    port: u16,
    proxy: &ProxySettings,
) -> Result<(), NetError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let auth = proxy.get_socks5_auth();

    // Greeting: no-auth, plus username/password when credentials exist.
    let greeting: &[u8] = if auth.is_some() {
        &[0x05, 0x02, 0x00, 0x02]
    } else {
        &[0x05, 0x01, 0x00]
    };
    stream
        .write_all(greeting)
        .await
        .io_context(TransportCode::SendError, "Failed sending SOCKS5 greeting")?;

    let mut reply = [0u8; 2];
    read_exact(stream, &mut reply).await?;
    if reply[0] != 0x05 {
        return Err(proxy_error("Proxy is not a SOCKS5 server"));
    }

    match (reply[1], auth) {
        (0x00, _) => {}
        (0x02, Some((user, pass))) => {
            if user.len() > 255 || pass.len() > 255 {
                return Err(proxy_error("SOCKS5 credentials too long"));
            }
            let mut msg = Vec::with_capacity(3 + user.len() + pass.len());
            msg.push(0x01);
            msg.push(user.len() as u8);
            msg.extend_from_slice(user.as_bytes());
            msg.push(pass.len() as u8);
            msg.extend_from_slice(pass.as_bytes());
            stream
                .write_all(&msg)
                .await
                .io_context(TransportCode::SendError, "Failed sending SOCKS5 credentials")?;

            let mut status = [0u8; 2];
            read_exact(stream, &mut status).await?;
            if status[1] != 0x00 {
                return Err(proxy_error("SOCKS5 authentication failed"));
            }
        }
        _ => return Err(proxy_error("No acceptable SOCKS5 authentication method")),
    }

    let mut request = vec![0x05, 0x01, 0x00];
    let literal = host.parse::<IpAddr>().ok();
    let address = match (literal, proxy.proxy_type()) {
        (Some(ip), _) => Some(ip),
        (None, ProxyType::Socks5) => Some(
            tokio::net::lookup_host((host, port))
                .await
                .dns_context(host)?
                .next()
                .map(|a| a.ip())
                .ok_or_else(|| {
                    NetError::transport(
                        TransportCode::CouldntResolveHost,
                        format!("Could not resolve host: {}", host),
                    )
                })?,
        ),
        (None, _) => None,
    };

    match address {
        Some(IpAddr::V4(ip)) => {
            request.push(0x01);
            request.extend_from_slice(&ip.octets());
        }
        Some(IpAddr::V6(ip)) => {
            request.push(0x04);
            request.extend_from_slice(&ip.octets());
        }
        None => {
            if host.len() > 255 {
                return Err(proxy_error("Host name too long for SOCKS5"));
            }
            request.push(0x03);
            request.push(host.len() as u8);
            request.extend_from_slice(host.as_bytes());
        }
    }
    request.extend_from_slice(&port.to_be_bytes());

    stream
        .write_all(&request)
        .await
        .io_context(TransportCode::SendError, "Failed sending SOCKS5 connect request")?;

    let mut head = [0u8; 4];
    read_exact(stream, &mut head).await?;
    if head[1] != 0x00 {
        return Err(proxy_error(&format!(
            "SOCKS5 connect to {}:{} failed with reply {}",
            host, port, head[1]
        )));
    }

    // Drain the bound address.
    let remaining = match head[3] {
        0x01 => 4 + 2,
        0x04 => 16 + 2,
        0x03 => {
            let mut len = [0u8; 1];
            read_exact(stream, &mut len).await?;
            len[0] as usize + 2
        }
        _ => return Err(proxy_error("SOCKS5 reply with unknown address type")),
    };
    let mut bound = vec![0u8; remaining];
    read_exact(stream, &mut bound).await?;

    tracing::debug!(host = %host, port, "SOCKS5 tunnel established");
    Ok(())
}

async fn read_exact<S>(stream: &mut S, buf: &mut [u8]) -> Result<(), NetError>
where
    S: AsyncRead + Unpin,
{
    stream
        .read_exact(buf)
        .await
        .map(|_| ())
        .io_context(TransportCode::ProxyError, "Proxy handshake read failed")
}

fn proxy_error(message: &str) -> NetError {
    NetError::transport(TransportCode::ProxyError, message)
}
