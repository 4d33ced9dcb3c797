//! Cookie-jar file persistence.
//!
//! Files use the Netscape cookie format understood by curl and wget.

use crate::cookies::monster::CookieJar;
use std::fs;
use std::io;
use std::path::Path;

/// Merge the cookies stored in `path` into `jar`.
///
/// Returns the number of cookies loaded.
pub fn load_cookies(jar: &CookieJar, path: &Path) -> io::Result<usize> {
    let content = fs::read_to_string(path)?;
    let count = jar.import_netscape(&content);
    tracing::debug!(path = %path.display(), count, "loaded cookie jar");
    Ok(count)
}

/// Write every live cookie in `jar` to `path`.
pub fn save_cookies(jar: &CookieJar, path: &Path) -> io::Result<()> {
    fs::write(path, jar.export_netscape())?;
    tracing::debug!(path = %path.display(), count = jar.total_cookie_count(), "saved cookie jar");
    Ok(())
}
