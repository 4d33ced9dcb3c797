//! Ergonomic error context helpers.
//!
//! Provides extension traits for adding context to `Result` types,
//! converting IO errors into context-rich transport errors.

use crate::base::neterror::{NetError, TransportCode};
use std::io;

/// Extension trait for adding context to IO Results.
pub trait IoResultExt<T> {
    /// Add connection context to an IO error.
    ///
    /// # Example
    /// ```ignore
    /// use slimnet::base::context::IoResultExt;
    ///
    /// let stream = TcpStream::connect(addr).await
    ///     .connection_context("example.com", 443)?;
    /// // Error: "Failed to connect to example.com port 443: connection refused"
    /// ```
    fn connection_context(self, host: &str, port: u16) -> Result<T, NetError>;

    /// Add DNS resolution context to an IO error.
    fn dns_context(self, domain: &str) -> Result<T, NetError>;

    /// Add send/receive context for an established connection.
    fn io_context(self, code: TransportCode, what: &str) -> Result<T, NetError>;
}

impl<T> IoResultExt<T> for Result<T, io::Error> {
    fn connection_context(self, host: &str, port: u16) -> Result<T, NetError> {
        self.map_err(|e| {
            NetError::transport(
                TransportCode::CouldntConnect,
                format!("Failed to connect to {} port {}: {}", host, port, e),
            )
        })
    }

    fn dns_context(self, domain: &str) -> Result<T, NetError> {
        self.map_err(|e| {
            tracing::debug!(domain = %domain, error = %e, "DNS resolution failed");
            NetError::transport(
                TransportCode::CouldntResolveHost,
                format!("Could not resolve host: {}", domain),
            )
        })
    }

    fn io_context(self, code: TransportCode, what: &str) -> Result<T, NetError> {
        self.map_err(|e| NetError::transport(code, format!("{}: {}", what, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Error, ErrorKind};

    #[test]
    fn test_connection_context() {
        let result: Result<(), io::Error> =
            Err(Error::new(ErrorKind::ConnectionRefused, "refused"));
        let err = result.connection_context("example.com", 443).unwrap_err();

        assert_eq!(err.code(), Some(TransportCode::CouldntConnect));
        let text = err.to_string();
        assert!(text.contains("example.com port 443"));
        assert!(text.contains("refused"));
    }

    #[test]
    fn test_dns_context() {
        let result: Result<(), io::Error> = Err(Error::new(ErrorKind::NotFound, "no such host"));
        let err = result.dns_context("unknown.example.com").unwrap_err();

        assert_eq!(err.code(), Some(TransportCode::CouldntResolveHost));
        assert_eq!(err.to_string(), "Could not resolve host: unknown.example.com");
    }

    #[test]
    fn test_io_context() {
        let result: Result<(), io::Error> = Err(Error::new(ErrorKind::BrokenPipe, "pipe"));
        let err = result
            .io_context(TransportCode::SendError, "Failure when sending data")
            .unwrap_err();
        assert_eq!(err.code(), Some(TransportCode::SendError));
    }
}
