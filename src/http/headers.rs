//! Ordered header list.
//!
//! Keys keep the case they were received or set with. Setting an existing
//! key replaces its value in place, so the first-seen position wins.

/// An ordered mapping of header names to values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `name` to `value`, keeping the position of an existing entry.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Exact, case-sensitive lookup.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Case-insensitive lookup, for protocol headers such as `Content-Length`.
    pub fn get_ignore_case(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn contains_ignore_case(&self, name: &str) -> bool {
        self.get_ignore_case(name).is_some()
    }

    /// Remove every entry whose name matches case-insensitively.
    pub fn remove_ignore_case(&mut self, name: &str) {
        self.entries.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (k, v) in iter {
            headers.insert(k, v);
        }
        headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_preserves_first_position() {
        let mut headers = Headers::new();
        headers.insert("Host", "a");
        headers.insert("Accept", "*/*");
        headers.insert("Host", "b");
        let entries: Vec<_> = headers.iter().collect();
        assert_eq!(entries, [("Host", "b"), ("Accept", "*/*")]);
    }

    #[test]
    fn lookup_case_rules() {
        let headers: Headers = [("Content-Length", "5")].into_iter().collect();
        assert_eq!(headers.get("content-length"), None);
        assert_eq!(headers.get_ignore_case("content-length"), Some("5"));
    }

    #[test]
    fn remove_ignore_case_drops_all_spellings() {
        let mut headers: Headers = [("content-length", "1"), ("Content-Length", "2"), ("X", "y")]
            .into_iter()
            .collect();
        headers.remove_ignore_case("CONTENT-LENGTH");
        assert_eq!(headers.len(), 1);
        assert_eq!(headers.get("X"), Some("y"));
    }
}
