//! Query-string splicing.
//!
//! Only non-ASCII characters are escaped: each of their UTF-8 bytes becomes
//! `%XX`. ASCII passes through untouched, reserved characters included, so
//! callers that need `&` or `=` inside a value must escape it themselves.

use std::fmt::Write;

/// Percent-escape every non-ASCII character of `input`.
pub fn escape_non_ascii(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut buf = [0u8; 4];
    for c in input.chars() {
        if c.is_ascii() {
            out.push(c);
        } else {
            for b in c.encode_utf8(&mut buf).bytes() {
                // Writing into a String cannot fail.
                let _ = write!(out, "%{:02X}", b);
            }
        }
    }
    out
}

/// Append `?k=v&k=v…` to `url`.
///
/// A repeated key keeps the last value at the position of its first
/// occurrence. An empty parameter list returns `url` unchanged.
pub fn splice_url<K, V>(url: &str, params: &[(K, V)]) -> String
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut merged: Vec<(&str, &str)> = Vec::with_capacity(params.len());
    for (key, value) in params {
        let (key, value) = (key.as_ref(), value.as_ref());
        match merged.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => merged.push((key, value)),
        }
    }

    if merged.is_empty() {
        return url.to_string();
    }

    let query = merged
        .iter()
        .map(|(k, v)| format!("{}={}", escape_non_ascii(k), escape_non_ascii(v)))
        .collect::<Vec<_>>()
        .join("&");

    format!("{}?{}", url, query)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_passes_through() {
        assert_eq!(escape_non_ascii("a b?&=/"), "a b?&=/");
    }

    #[test]
    fn test_non_ascii_escaped_per_byte() {
        assert_eq!(escape_non_ascii("café"), "caf%C3%A9");
        assert_eq!(escape_non_ascii("中"), "%E4%B8%AD");
        assert_eq!(escape_non_ascii("🦀"), "%F0%9F%A6%80");
    }

    #[test]
    fn test_splice_keeps_order() {
        let url = splice_url("http://example.com/search", &[("q", "a b"), ("k", "v")]);
        assert_eq!(url, "http://example.com/search?q=a b&k=v");
    }

    #[test]
    fn test_splice_escapes_keys_and_values() {
        let url = splice_url("http://example.com/s", &[("名", "é")]);
        assert_eq!(url, "http://example.com/s?%E5%90%8D=%C3%A9");
    }

    #[test]
    fn test_splice_empty_params() {
        let params: [(&str, &str); 0] = [];
        assert_eq!(splice_url("http://example.com/", &params), "http://example.com/");
    }

    #[test]
    fn test_duplicate_key_last_write_wins() {
        let url = splice_url("http://h/", &[("a", "1"), ("b", "2"), ("a", "3")]);
        assert_eq!(url, "http://h/?a=3&b=2");
    }
}
