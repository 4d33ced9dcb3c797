//! Response header map built from a raw header blob.
//!
//! A transfer that follows redirects records the header block of every hop.
//! [`HeaderSet::from_raw`] keeps only the block of the final hop: it drops the
//! first status line, finds the last remaining line that starts with `HTTP/`,
//! and builds the map from the lines after it.
//!
//! Keys and values are lower-cased on insertion and repeated keys are merged
//! with `", "`.

use crate::base::neterror::NetError;

const STATUS_LINE_PREFIX: &str = "HTTP/";

/// Case-insensitive, insertion-ordered header map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderSet {
    entries: Vec<(String, String)>,
}

impl HeaderSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the header map of the final hop recorded in `raw`.
    pub fn from_raw(raw: &str) -> Self {
        let mut lines = raw.split("\r\n");
        // e.g. HTTP/1.1 200 OK
        lines.next();
        let lines: Vec<&str> = lines.collect();

        let start = lines
            .iter()
            .rposition(|line| line.starts_with(STATUS_LINE_PREFIX))
            .map_or(0, |idx| idx + 1);

        let mut result = HeaderSet::new();
        for line in &lines[start..] {
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let value = value.strip_prefix(' ').unwrap_or(value);
            result.add(key, value);
        }
        result
    }

    /// Look up `key` case-insensitively.
    pub fn at(&self, key: &str) -> Result<&str, NetError> {
        self.get(key)
            .ok_or_else(|| NetError::HeaderNotFound(key.to_string()))
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Insert `key: value`, both ASCII-lower-cased, appending `", " + value` when
    /// the key is already present.
    pub fn add(&mut self, key: &str, value: &str) {
        let key = key.to_ascii_lowercase();
        let value = value.to_ascii_lowercase();

        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => {
                existing.push_str(", ");
                existing.push_str(&value);
            }
            None => self.entries.push((key, value)),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<'a> IntoIterator for &'a HeaderSet {
    type Item = (&'a str, &'a str);
    type IntoIter = Box<dyn Iterator<Item = (&'a str, &'a str)> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn naive_split(raw: &str) -> HeaderSet {
        let mut set = HeaderSet::new();
        for line in raw.split("\r\n").skip(1) {
            if let Some((k, v)) = line.split_once(':') {
                set.add(k, v.strip_prefix(' ').unwrap_or(v));
            }
        }
        set
    }

    #[test]
    fn test_single_hop_matches_naive_split() {
        let raw = "HTTP/1.1 200 OK\r\n\
                   Content-Type: text/html\r\n\
                   Content-Length: 12\r\n\
                   Set-Cookie: a=1\r\n\
                   Set-Cookie: b=2\r\n\
                   \r\n";

        let set = HeaderSet::from_raw(raw);
        assert_eq!(set, naive_split(raw));
        assert_eq!(set.len(), 3);
        assert_eq!(set.at("set-cookie").unwrap(), "a=1, b=2");
    }

    #[test]
    fn test_only_final_hop_is_kept() {
        let raw = "HTTP/1.1 301 Moved Permanently\r\n\
                   Location: /a\r\n\
                   X-Hop: one\r\n\
                   \r\n\
                   HTTP/1.1 302 Found\r\n\
                   Location: /b\r\n\
                   X-Hop: two\r\n\
                   \r\n\
                   HTTP/1.1 200 OK\r\n\
                   X-Final: yes\r\n\
                   \r\n";

        let set = HeaderSet::from_raw(raw);
        assert_eq!(set.at("x-final").unwrap(), "yes");
        assert!(!set.contains("x-hop"));
        assert!(!set.contains("location"));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_repeated_add_merges_in_order() {
        let mut set = HeaderSet::new();
        set.add("Vary", "a");
        set.add("vary", "b");
        set.add("VARY", "c");
        assert_eq!(set.at("vary").unwrap(), "a, b, c");
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let mut set = HeaderSet::new();
        set.add("Content-Type", "text/plain");
        assert_eq!(set.at("content-type").unwrap(), "text/plain");
        assert_eq!(set.at("CONTENT-TYPE").unwrap(), "text/plain");
    }

    #[test]
    fn test_values_are_lower_cased() {
        let mut set = HeaderSet::new();
        set.add("ETag", "\"AbC\"");
        assert_eq!(set.at("etag").unwrap(), "\"abc\"");
    }

    #[test]
    fn test_non_ascii_key_found_with_original_casing() {
        let mut set = HeaderSet::new();
        set.add("X-Ä", "Ünïcode");
        assert_eq!(set.at("X-Ä").unwrap(), "Ünïcode");
        assert_eq!(set.at("x-Ä").unwrap(), "Ünïcode");
    }

    #[test]
    fn test_missing_key() {
        let set = HeaderSet::from_raw("HTTP/1.1 204 No Content\r\n\r\n");
        let err = set.at("x-missing").unwrap_err();
        assert!(matches!(err, NetError::HeaderNotFound(ref k) if k == "x-missing"));
    }

    #[test]
    fn test_only_one_leading_space_trimmed() {
        let set = HeaderSet::from_raw("HTTP/1.1 200 OK\r\nX-Pad:   padded\r\nX-Tight:tight\r\n\r\n");
        assert_eq!(set.at("x-pad").unwrap(), "  padded");
        assert_eq!(set.at("x-tight").unwrap(), "tight");
    }

    #[test]
    fn test_value_keeps_later_colons() {
        let set = HeaderSet::from_raw("HTTP/2 301 \r\nlocation: https://example.com:8443/x\r\n\r\n");
        assert_eq!(set.at("location").unwrap(), "https://example.com:8443/x");
    }

    #[test]
    fn test_lines_without_colon_are_skipped() {
        let set = HeaderSet::from_raw("HTTP/1.1 200 OK\r\ngarbage\r\nA: 1\r\n\r\n\r\n");
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_empty_blob() {
        assert!(HeaderSet::from_raw("").is_empty());
    }
}
