//! Path pattern matching.
//!
//! # Responsibilities
//! - Compile route patterns into regular expressions
//! - Match a request path and capture its groups
//!
//! # Design Decisions
//! - Patterns are anchored at the start of the path only, so `/static/`
//!   matches `/static/app.css`; add `$` to a pattern to anchor the end
//! - Path matching is case-sensitive
//! - Group 0 is the matched prefix

use std::collections::HashMap;

use regex::Regex;

use crate::routing::RouteError;

/// A compiled, start-anchored path pattern.
#[derive(Debug, Clone)]
pub struct PathPattern {
    source: String,
    regex: Regex,
}

impl PathPattern {
    pub fn new(pattern: &str) -> Result<Self, RouteError> {
        let regex = Regex::new(&format!("^(?:{pattern})")).map_err(|source| {
            RouteError::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            }
        })?;
        Ok(Self {
            source: pattern.to_string(),
            regex,
        })
    }

    /// The pattern as registered, without the anchor.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn matches(&self, path: &str) -> Option<RouteMatch> {
        let captures = self.regex.captures(path)?;
        let groups = captures
            .iter()
            .map(|group| group.map(|m| m.as_str().to_string()))
            .collect();
        let named = self
            .regex
            .capture_names()
            .flatten()
            .filter_map(|name| {
                captures
                    .name(name)
                    .map(|m| (name.to_string(), m.as_str().to_string()))
            })
            .collect();
        Some(RouteMatch { groups, named })
    }
}

/// Groups captured by a pattern route.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteMatch {
    groups: Vec<Option<String>>,
    named: HashMap<String, String>,
}

impl RouteMatch {
    /// Positional group; `0` is the whole match.
    pub fn group(&self, index: usize) -> Option<&str> {
        self.groups.get(index)?.as_deref()
    }

    pub fn name(&self, name: &str) -> Option<&str> {
        self.named.get(name).map(String::as_str)
    }

    pub fn groups(&self) -> &[Option<String>] {
        &self.groups
    }
}
