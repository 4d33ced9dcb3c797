use crate::base::neterror::{NetError, TransportCode};
use crate::http::options::HttpVersionPref;
use boring::ssl::{ConnectConfiguration, SslConnector, SslMethod, SslVerifyMode, SslVersion};
use std::path::{Path, PathBuf};

/// System CA bundle used when it exists.
pub const CA_BUNDLE_PATH: &str = "/etc/ssl/certs/ca-certificates.crt";

/// Client TLS settings. Peer and host verification cannot be turned off.
#[derive(Debug, Clone)]
pub struct TlsConfig {
    pub min_version: SslVersion,
    pub alpn_protos: Vec<&'static str>,
    /// CA bundle; `None` falls back to the library's default verify paths.
    pub ca_file: Option<PathBuf>,
}

impl TlsConfig {
    /// Trust store from the system paths, ALPN from the protocol preference.
    pub fn for_version(version: HttpVersionPref) -> Self {
        let ca_file = Path::new(CA_BUNDLE_PATH);
        Self {
            min_version: SslVersion::TLS1_2,
            alpn_protos: version.alpn_protocols().to_vec(),
            ca_file: ca_file.is_file().then(|| ca_file.to_path_buf()),
        }
    }

    /// ALPN protocol list in wire format (length-prefixed).
    pub fn alpn_wire(&self) -> Result<Vec<u8>, NetError> {
        let mut wire = Vec::new();
        for proto in &self.alpn_protos {
            let len = u8::try_from(proto.len())
                .map_err(|_| ssl_error(format!("ALPN protocol {:?} too long", proto)))?;
            wire.push(len);
            wire.extend_from_slice(proto.as_bytes());
        }
        Ok(wire)
    }

    /// Build a per-connection configuration for `host`.
    pub fn configure(&self, host: &str) -> Result<ConnectConfiguration, NetError> {
        let mut builder = SslConnector::builder(SslMethod::tls())
            .map_err(|e| ssl_error(format!("SSL context setup failed: {}", e)))?;

        builder
            .set_min_proto_version(Some(self.min_version))
            .map_err(|e| ssl_error(e.to_string()))?;

        if let Some(ref file) = self.ca_file {
            builder.set_ca_file(file).map_err(|e| {
                ssl_error(format!("error setting certificate file {}: {}", file.display(), e))
            })?;
        } else {
            builder
                .set_default_verify_paths()
                .map_err(|e| ssl_error(e.to_string()))?;
        }

        if !self.alpn_protos.is_empty() {
            builder
                .set_alpn_protos(&self.alpn_wire()?)
                .map_err(|e| ssl_error(e.to_string()))?;
        }

        builder.set_verify(SslVerifyMode::PEER);

        let mut config = builder
            .build()
            .configure()
            .map_err(|e| ssl_error(e.to_string()))?;
        // RFC 6066: no SNI for literal addresses.
        config.set_use_server_name_indication(Self::should_set_sni(host));
        Ok(config)
    }

    pub fn should_set_sni(host: &str) -> bool {
        host.trim_start_matches('[')
            .trim_end_matches(']')
            .parse::<std::net::IpAddr>()
            .is_err()
    }
}

fn ssl_error(message: String) -> NetError {
    NetError::transport(TransportCode::SslConnectError, message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alpn_follows_version_pref() {
        let h2 = TlsConfig::for_version(HttpVersionPref::Http2);
        assert_eq!(h2.alpn_wire().unwrap(), b"\x02h2\x08http/1.1");

        let h1 = TlsConfig::for_version(HttpVersionPref::Http11);
        assert_eq!(h1.alpn_wire().unwrap(), b"\x08http/1.1");
    }

    #[test]
    fn test_sni_skipped_for_addresses() {
        assert!(TlsConfig::should_set_sni("example.com"));
        assert!(!TlsConfig::should_set_sni("127.0.0.1"));
        assert!(!TlsConfig::should_set_sni("[::1]"));
    }

    #[test]
    fn test_configure_builds() {
        let config = TlsConfig::for_version(HttpVersionPref::Http2);
        assert!(config.configure("example.com").is_ok());
    }
}
