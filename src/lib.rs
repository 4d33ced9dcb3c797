//! # slimnet
//!
//! A blocking, single-handle HTTP client.
//!
//! One [`TransferEngine`] owns one persistent connection handle and issues
//! GET, multipart POST and raw POST requests, following redirects, keeping
//! cookies in a jar file between calls, and honouring proxy and timeout
//! settings. Each call returns a [`Response`] whose raw header blob holds
//! every hop of the redirect chain; [`HeaderSet::from_raw`] isolates the final
//! hop.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use slimnet::TransferEngine;
//!
//! let mut engine = TransferEngine::new()?;
//! let resp = engine.get("https://example.com/", &[], &[("Accept", "text/html")])?;
//! assert_eq!(resp.status_code(), 200);
//! let headers = resp.headers_map();
//! println!("{}", headers.at("content-type")?);
//! resp.save_to_file("/tmp/index.html", false)?;
//! ```
//!
//! ## Modules
//!
//! - [`base`] - Error taxonomy and I/O helpers
//! - [`cookies`] - Cookie store, Netscape jar files, public suffix checks
//! - [`http`] - Headers, bodies, options, transport and per-call transaction
//! - [`socket`] - Connection establishment, proxies, TLS
//! - [`transfer`] - Runtime, connection handle, attachments, the engine

pub mod base;
pub mod cookies;
pub mod http;
pub mod socket;
pub mod transfer;

pub use base::neterror::{NetError, TransportCode};
pub use http::headerset::HeaderSet;
pub use http::options::{HttpVersionPref, ProxyMode, RequestOptions};
pub use http::response::Response;
pub use http::streamfactory::{HopRequest, HopResponse, Transport};
pub use transfer::engine::{TransferEngine, TransferEngineBuilder};
