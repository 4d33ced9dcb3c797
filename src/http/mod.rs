//! HTTP request/response model and the per-call transaction.

pub mod headerset;
pub mod multipart;
pub mod options;
pub mod orderedheaders;
pub mod query;
pub mod requestbody;
pub mod response;
pub mod streamfactory;
pub mod transaction;

// Re-exports for convenience
pub use headerset::HeaderSet;
pub use options::{HttpVersionPref, ProxyMode, RequestOptions};
pub use requestbody::RequestBody;
pub use response::Response;
pub use streamfactory::{HopRequest, HopResponse, HttpStreamFactory, Transport};
