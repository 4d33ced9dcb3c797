//! Socket and connection establishment.
//!
//! - [`connectjob`]: DNS → TCP → proxy handshake → TLS under a connect deadline
//! - [`proxy`]: HTTP and SOCKS5 proxy settings, environment discovery
//! - [`matcher`]: `NO_PROXY` bypass rules
//! - [`tls`]: TLS configuration with BoringSSL

pub mod client;
pub mod connectjob;
pub mod matcher;
pub mod proxy;
pub mod tls;
