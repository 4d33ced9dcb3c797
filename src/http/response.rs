//! Response produced by one engine call.

use crate::base::file::write_file;
use crate::base::neterror::NetError;
use crate::http::headerset::HeaderSet;
use crate::transfer::group::TransferSink;
use std::borrow::Cow;
use std::path::Path;

/// Status, raw header blob and body of a completed call.
///
/// Filled incrementally while the transfer runs and handed to the caller once
/// it completes; the public API is read-only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Response {
    status_code: u16,
    raw_headers: String,
    body: Vec<u8>,
}

impl Response {
    pub fn new() -> Self {
        Self::default()
    }

    /// Status of the final response in the redirect chain, or 0 when no
    /// response was received.
    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    /// Every header block received, one per hop, each starting with its
    /// status line.
    pub fn headers(&self) -> &str {
        &self.raw_headers
    }

    /// Header map of the final hop.
    pub fn headers_map(&self) -> HeaderSet {
        HeaderSet::from_raw(&self.raw_headers)
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Body decoded as UTF-8, invalid sequences replaced.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    pub fn into_body(self) -> Vec<u8> {
        self.body
    }

    /// Write the body verbatim to `path`.
    pub fn save_to_file(&self, path: impl AsRef<Path>, binary_mode: bool) -> Result<(), NetError> {
        write_file(path, binary_mode, &self.body)
    }

    pub(crate) fn set_status_code(&mut self, code: u16) {
        self.status_code = code;
    }
}

impl TransferSink for Response {
    fn write_header(&mut self, line: &str) {
        self.raw_headers.push_str(line);
    }

    fn write_body(&mut self, chunk: &[u8]) {
        self.body.extend_from_slice(chunk);
    }
}
