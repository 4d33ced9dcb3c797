//! Cookie storage and cookie-jar files.
//!
//! | Type | Responsibility |
//! |------|----------------|
//! | [`CookieJar`](monster::CookieJar) | In-memory store with RFC 6265 matching |
//! | [`CanonicalCookie`](canonicalcookie::CanonicalCookie) | Single cookie |
//! | [`persistence`] | Netscape-format cookie file load/save |
//! | [`psl`] | Public suffix validation of `Domain=` |
//!
//! # Example
//!
//! ```rust,no_run
//! use slimnet::cookies::monster::CookieJar;
//! use url::Url;
//!
//! let jar = CookieJar::new();
//! let url = Url::parse("https://example.com/").unwrap();
//! jar.parse_and_save_cookie(&url, "sid=abc; Path=/; Secure");
//! assert_eq!(jar.cookie_header(&url).as_deref(), Some("sid=abc"));
//! std::fs::write("cookies.txt", jar.export_netscape())?;
//! # Ok::<(), std::io::Error>(())
//! ```

pub mod canonicalcookie;
pub mod monster;
pub mod persistence;
pub mod psl;
