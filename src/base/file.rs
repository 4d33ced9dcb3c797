//! Byte persistence used to save response bodies.

use crate::base::neterror::NetError;
use std::borrow::Cow;
use std::fs;
use std::path::Path;

/// Write `data` to `path`, replacing any existing file.
///
/// In text mode newlines are translated to the platform convention; on
/// Unix both modes write the bytes unchanged.
pub fn write_file(path: impl AsRef<Path>, binary_mode: bool, data: &[u8]) -> Result<(), NetError> {
    let path = path.as_ref();
    let bytes = if binary_mode {
        Cow::Borrowed(data)
    } else {
        to_platform_newlines(data)
    };

    fs::write(path, bytes.as_ref()).map_err(|source| NetError::FileWrite {
        path: path.to_path_buf(),
        source,
    })?;

    tracing::debug!(path = %path.display(), bytes = bytes.len(), binary_mode, "wrote file");
    Ok(())
}

#[cfg(windows)]
fn to_platform_newlines(data: &[u8]) -> Cow<'_, [u8]> {
    if !data.contains(&b'\n') {
        return Cow::Borrowed(data);
    }
    let mut out = Vec::with_capacity(data.len() + data.len() / 16);
    for &b in data {
        if b == b'\n' {
            out.push(b'\r');
        }
        out.push(b);
    }
    Cow::Owned(out)
}

#[cfg(not(windows))]
fn to_platform_newlines(data: &[u8]) -> Cow<'_, [u8]> {
    Cow::Borrowed(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_binary_write_is_verbatim() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("blob.bin");
        let data = [0u8, 159, 146, 150, b'\n', 255];

        write_file(&path, true, &data).unwrap();
        assert_eq!(fs::read(&path).unwrap(), data);
    }

    #[test]
    fn test_write_into_missing_directory_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing").join("out.txt");

        let err = write_file(&path, false, b"x").unwrap_err();
        assert!(matches!(err, NetError::FileWrite { .. }));
    }
}
