//! Multipart form data support.
//!
//! RFC 7578 `multipart/form-data` encoding with text fields and file fields
//! whose content is read from disk when the request body is produced.
//!
//! # Example
//! ```ignore
//! use slimnet::http::multipart::Form;
//!
//! let form = Form::new()
//!     .text("username", "user123")
//!     .file("upload", "/tmp/report.pdf")?;
//! ```

use crate::base::context::IoResultExt;
use crate::base::neterror::{NetError, TransportCode};
use bytes::Bytes;
use std::path::{Path, PathBuf};

/// A multipart form.
#[derive(Debug, Clone)]
pub struct Form {
    boundary: String,
    fields: Vec<(String, Part)>,
}

impl Default for Form {
    fn default() -> Self {
        Self::new()
    }
}

impl Form {
    pub fn new() -> Self {
        Self {
            boundary: generate_boundary(),
            fields: Vec::new(),
        }
    }

    /// Build a form from text fields and file fields.
    ///
    /// Every name, value and path must be non-empty, and every path must be an
    /// existing regular file. A repeated name keeps the last entry at the
    /// position of its first occurrence.
    pub fn from_fields<K, V, F, P>(data: &[(K, V)], files: &[(F, P)]) -> Result<Self, NetError>
    where
        K: AsRef<str>,
        V: AsRef<str>,
        F: AsRef<str>,
        P: AsRef<Path>,
    {
        let mut form = Form::new();
        for (name, value) in data {
            let (name, value) = (name.as_ref(), value.as_ref());
            if name.is_empty() || value.is_empty() {
                return Err(NetError::bad_argument(format!(
                    "form field {:?} needs a non-empty name and value",
                    name
                )));
            }
            form.push(name, Part::text(value));
        }
        for (name, path) in files {
            let (name, path) = (name.as_ref(), path.as_ref());
            if name.is_empty() || path.as_os_str().is_empty() {
                return Err(NetError::bad_argument(format!(
                    "form file {:?} needs a non-empty name and path",
                    name
                )));
            }
            form.push(name, Part::file(path)?);
        }
        Ok(form)
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Add a text field.
    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(&name.into(), Part::text(value));
        self
    }

    /// Add a file field; fails if `path` is not a regular file.
    pub fn file(mut self, name: impl Into<String>, path: impl AsRef<Path>) -> Result<Self, NetError> {
        let part = Part::file(path.as_ref())?;
        self.push(&name.into(), part);
        Ok(self)
    }

    fn push(&mut self, name: &str, part: Part) {
        match self.fields.iter_mut().find(|(n, _)| n == name) {
            Some(slot) => slot.1 = part,
            None => self.fields.push((name.to_string(), part)),
        }
    }

    /// The `Content-Type` header value.
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Encode the form, reading file parts from disk.
    pub async fn encode(&self) -> Result<Bytes, NetError> {
        if self.fields.is_empty() {
            return Ok(Bytes::new());
        }

        let mut output = Vec::new();
        for (name, part) in &self.fields {
            output.extend_from_slice(b"--");
            output.extend_from_slice(self.boundary.as_bytes());
            output.extend_from_slice(b"\r\n");

            output.extend_from_slice(part.format_headers(name).as_bytes());
            output.extend_from_slice(b"\r\n\r\n");

            match &part.source {
                PartSource::Text(data) => output.extend_from_slice(data),
                PartSource::File(path) => {
                    let data = tokio::fs::read(path).await.io_context(
                        TransportCode::ReadError,
                        &format!("Failed to open/read local data from file {}", path.display()),
                    )?;
                    output.extend_from_slice(&data);
                }
            }
            output.extend_from_slice(b"\r\n");
        }

        output.extend_from_slice(b"--");
        output.extend_from_slice(self.boundary.as_bytes());
        output.extend_from_slice(b"--\r\n");

        Ok(Bytes::from(output))
    }
}

#[derive(Debug, Clone)]
enum PartSource {
    Text(Bytes),
    File(PathBuf),
}

/// One field of a multipart form.
#[derive(Debug, Clone)]
pub struct Part {
    source: PartSource,
    content_type: Option<String>,
    file_name: Option<String>,
}

impl Part {
    pub fn text(value: impl Into<String>) -> Self {
        Self {
            source: PartSource::Text(Bytes::from(value.into())),
            content_type: None,
            file_name: None,
        }
    }

    /// A file field named after the last component of `path`.
    pub fn file(path: &Path) -> Result<Self, NetError> {
        if !path.is_file() {
            return Err(NetError::MissingFile(path.to_path_buf()));
        }
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self {
            source: PartSource::File(path.to_path_buf()),
            content_type: Some("application/octet-stream".to_string()),
            file_name: Some(file_name),
        })
    }

    pub fn content_type(mut self, mime: impl Into<String>) -> Self {
        self.content_type = Some(mime.into());
        self
    }

    fn format_headers(&self, name: &str) -> String {
        let mut header = format!(
            "Content-Disposition: form-data; name=\"{}\"",
            escape_quotes(name)
        );
        if let Some(ref filename) = self.file_name {
            header.push_str(&format!("; filename=\"{}\"", escape_quotes(filename)));
        }
        if let Some(ref mime) = self.content_type {
            header.push_str(&format!("\r\nContent-Type: {}", mime));
        }
        header
    }
}

fn escape_quotes(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\r', "\\r")
        .replace('\n', "\\n")
}

fn generate_boundary() -> String {
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::{SystemTime, UNIX_EPOCH};

    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();

    format!(
        "------------------------slimnet{:012x}{:04x}",
        nanos & 0xffff_ffff_ffff,
        COUNTER.fetch_add(1, Ordering::Relaxed) & 0xffff
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_text_and_file_fields() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"file data").unwrap();

        let form = Form::from_fields(&[("name", "value")], &[("upload", file.path())]).unwrap();
        let body = form.encode().await.unwrap();
        let text = String::from_utf8_lossy(&body);

        assert!(text.starts_with(&format!("--{}\r\n", form.boundary())));
        assert!(text.contains("Content-Disposition: form-data; name=\"name\"\r\n\r\nvalue\r\n"));
        assert!(text.contains("name=\"upload\"; filename=\""));
        assert!(text.contains("Content-Type: application/octet-stream\r\n\r\nfile data\r\n"));
        assert!(text.ends_with(&format!("--{}--\r\n", form.boundary())));
    }

    #[test]
    fn test_missing_file_is_rejected_up_front() {
        let err = Form::from_fields(&[("name", "value")], &[("upload", "/definitely/not/here.bin")])
            .unwrap_err();
        match err {
            NetError::MissingFile(path) => assert_eq!(path, Path::new("/definitely/not/here.bin")),
            other => panic!("expected MissingFile, got {other:?}"),
        }
    }

    #[test]
    fn test_directory_is_not_a_regular_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Form::new().file("upload", dir.path()).unwrap_err();
        assert!(matches!(err, NetError::MissingFile(_)));
    }

    #[test]
    fn test_empty_name_rejected() {
        let files: [(&str, &str); 0] = [];
        assert!(Form::from_fields(&[("", "v")], &files).is_err());
        assert!(Form::from_fields(&[("k", "")], &files).is_err());
    }

    #[test]
    fn test_repeated_field_name_keeps_last() {
        let form = Form::new().text("a", "1").text("b", "2").text("a", "3");
        assert_eq!(form.len(), 2);
    }

    #[tokio::test]
    async fn test_empty_form_encodes_to_nothing() {
        assert!(Form::new().encode().await.unwrap().is_empty());
    }

    #[test]
    fn test_escape_quotes() {
        assert_eq!(escape_quotes("normal"), "normal");
        assert_eq!(escape_quotes("with\"quote"), "with\\\"quote");
    }

    #[test]
    fn test_boundaries_differ() {
        assert_ne!(Form::new().boundary(), Form::new().boundary());
        assert!(Form::new().content_type().starts_with("multipart/form-data; boundary="));
    }
}
