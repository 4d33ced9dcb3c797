use crate::base::neterror::NetError;
use http::header::{HeaderName, HeaderValue};
use http::HeaderMap;
use std::str::FromStr;

/// Request header list that preserves insertion order.
///
/// Names are matched case-insensitively. Inserting an existing name replaces
/// its value in place, so a list built from pairs with repeated keys keeps the
/// last value at the position of the first occurrence.
#[derive(Debug, Clone, Default)]
pub struct OrderedHeaderMap {
    headers: Vec<(HeaderName, HeaderValue)>,
}

impl OrderedHeaderMap {
    pub fn new() -> Self {
        Self {
            headers: Vec::new(),
        }
    }

    /// Build from `(name, value)` pairs.
    pub fn from_pairs<K, V>(pairs: &[(K, V)]) -> Result<Self, NetError>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut map = Self::new();
        for (name, value) in pairs {
            map.insert(name.as_ref(), value.as_ref())?;
        }
        Ok(map)
    }

    pub fn insert(&mut self, name: &str, value: &str) -> Result<(), NetError> {
        if name.is_empty() || value.is_empty() {
            return Err(NetError::bad_argument(format!(
                "header {:?} needs a non-empty name and value",
                name
            )));
        }
        let name_header = HeaderName::from_str(name)
            .map_err(|_| NetError::bad_argument(format!("invalid header name {:?}", name)))?;
        let value_header = HeaderValue::from_str(value)
            .map_err(|_| NetError::bad_argument(format!("invalid value for header {:?}", name)))?;

        // HeaderName is already lowercase, so equality is case-insensitive.
        if let Some((_, v)) = self.headers.iter_mut().find(|(n, _)| *n == name_header) {
            *v = value_header;
        } else {
            self.headers.push((name_header, value_header));
        }
        Ok(())
    }

    /// Insert only when `name` is absent.
    pub fn insert_default(&mut self, name: &str, value: &str) -> Result<(), NetError> {
        if self.contains(name) {
            return Ok(());
        }
        self.insert(name, value)
    }

    pub fn remove(&mut self, name: &str) {
        if let Ok(target) = HeaderName::from_str(name) {
            self.headers.retain(|(n, _)| *n != target);
        }
    }

    pub fn get(&self, name: &str) -> Option<&HeaderValue> {
        let target = HeaderName::from_str(name).ok()?;
        self.headers
            .iter()
            .find(|(n, _)| *n == target)
            .map(|(_, v)| v)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&HeaderName, &HeaderValue)> {
        self.headers.iter().map(|(n, v)| (n, v))
    }

    /// Consumes the map and returns a standard `http::HeaderMap`.
    pub fn to_header_map(self) -> HeaderMap {
        let mut map = HeaderMap::with_capacity(self.headers.len());
        for (name, value) in self.headers {
            map.append(name, value);
        }
        map
    }
}
