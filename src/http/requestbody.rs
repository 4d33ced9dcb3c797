//! Request payload attached to a connection handle.

use crate::base::neterror::NetError;
use crate::http::multipart::Form;
use bytes::Bytes;

/// Request body for a transfer.
#[derive(Debug, Clone, Default)]
pub enum RequestBody {
    /// No body (GET).
    #[default]
    Empty,
    /// Literal bytes, sent as-is.
    Bytes(Bytes),
    /// A multipart form, encoded when the transfer starts.
    Form(Form),
}

impl From<String> for RequestBody {
    fn from(s: String) -> Self {
        RequestBody::Bytes(Bytes::from(s))
    }
}

impl From<&str> for RequestBody {
    fn from(s: &str) -> Self {
        RequestBody::Bytes(Bytes::from(s.to_owned()))
    }
}

impl From<Vec<u8>> for RequestBody {
    fn from(v: Vec<u8>) -> Self {
        RequestBody::Bytes(Bytes::from(v))
    }
}

impl From<Bytes> for RequestBody {
    fn from(b: Bytes) -> Self {
        RequestBody::Bytes(b)
    }
}

impl From<Form> for RequestBody {
    fn from(form: Form) -> Self {
        RequestBody::Form(form)
    }
}

impl RequestBody {
    pub fn is_empty(&self) -> bool {
        match self {
            RequestBody::Empty => true,
            RequestBody::Bytes(b) => b.is_empty(),
            RequestBody::Form(f) => f.is_empty(),
        }
    }

    /// `Content-Type` implied by the body, used when the caller sets none.
    pub fn default_content_type(&self) -> Option<String> {
        match self {
            RequestBody::Empty => None,
            RequestBody::Bytes(_) => Some("application/x-www-form-urlencoded".to_string()),
            RequestBody::Form(form) => Some(form.content_type()),
        }
    }

    /// Produce the wire bytes.
    pub async fn into_bytes(self) -> Result<Bytes, NetError> {
        match self {
            RequestBody::Empty => Ok(Bytes::new()),
            RequestBody::Bytes(b) => Ok(b),
            RequestBody::Form(form) => form.encode().await,
        }
    }
}
