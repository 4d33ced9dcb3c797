//! Blocking transfer engine over the async transport.
//!
//! - [`runtime`]: reference-counted process-wide runtime
//! - [`handle`]: persistent per-engine connection state
//! - [`attach`]: scoped per-call attachments
//! - [`group`]: progress step and bounded poll
//! - [`engine`]: the public [`TransferEngine`](engine::TransferEngine)

pub mod attach;
pub mod engine;
pub mod group;
pub mod handle;
pub mod runtime;

pub use engine::{TransferEngine, TransferEngineBuilder};
