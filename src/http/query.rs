//! Query string and form decoding.
//!
//! # Design Decisions
//! - Items split on `&`, then on the first `=`
//! - A bare key has an absent value (`None`), distinct from `key=`
//! - Repeated keys accumulate in arrival order
//! - `+` decodes to a space in query components, never in paths

use std::borrow::Cow;

/// Decoded query parameters, in first-seen key order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    entries: Vec<(String, Vec<Option<String>>)>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value under `key`.
    pub fn push(&mut self, key: impl Into<String>, value: Option<String>) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, values)) => values.push(value),
            None => self.entries.push((key, vec![value])),
        }
    }

    /// First value for `key`; `None` when the key is missing or bare.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.get_all(key)
            .first()
            .and_then(|value| value.as_deref())
    }

    /// Every value recorded for `key`.
    pub fn get_all(&self, key: &str) -> &[Option<String>] {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, values)| values.as_slice())
            .unwrap_or(&[])
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Option<String>])> {
        self.entries
            .iter()
            .map(|(k, values)| (k.as_str(), values.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Parse `a=1&b&a=2` style text.
pub fn parse(text: &str) -> Query {
    let mut query = Query::new();
    for item in text.split('&').filter(|item| !item.is_empty()) {
        match item.split_once('=') {
            Some((key, value)) => query.push(decode_component(key), Some(decode_component(value))),
            None => query.push(decode_component(item), None),
        }
    }
    query
}

/// Decode one query component: `+` becomes a space, then percent escapes.
pub fn decode_component(text: &str) -> String {
    let spaced: Cow<'_, str> = if text.contains('+') {
        Cow::Owned(text.replace('+', " "))
    } else {
        Cow::Borrowed(text)
    };
    decode_path(&spaced)
}

/// Percent-decode a path. Invalid UTF-8 is replaced, not rejected.
pub fn decode_path(text: &str) -> String {
    if !text.contains('%') {
        return text.to_string();
    }
    String::from_utf8_lossy(&urlencoding::decode_binary(text.as_bytes())).into_owned()
}
