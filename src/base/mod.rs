//! Base types and error handling.
//!
//! - [`NetError`](neterror::NetError): the error taxonomy shared by every module
//! - [`TransportCode`](neterror::TransportCode): numeric transport failure classes
//! - [`file`]: byte persistence for saved response bodies

pub mod context;
pub mod file;
pub mod neterror;
