//! Fully buffered template.
//!
//! Tags are located once at construction; every `render` reuses the
//! recorded spans. Tags without a registered value are copied through
//! verbatim, markers included.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use super::scanner::{scan_all, Tag};
use super::TemplateError;

/// An in-memory template rendered in a single pass.
#[derive(Debug, Clone)]
pub struct Template {
    text: String,
    tags: Vec<Tag>,
    replacements: HashMap<String, String>,
}

impl Template {
    /// Scan `text` for tags and build a template with no replacements.
    pub fn new(text: impl Into<String>) -> Result<Self, TemplateError> {
        let text = text.into();
        let tags = scan_all(&text)?;
        Ok(Self {
            text,
            tags,
            replacements: HashMap::new(),
        })
    }

    /// Read a whole file into a template.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, TemplateError> {
        Self::new(std::fs::read_to_string(path)?)
    }

    /// Replace the active mapping. Values are stringified immediately.
    pub fn format<I, K, V>(&mut self, replacements: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: ToString,
    {
        self.replacements = replacements
            .into_iter()
            .map(|(k, v)| (k.into(), v.to_string()))
            .collect();
        self
    }

    /// Tag locations recorded at construction.
    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    /// Render the template with the active mapping.
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(self.text.len());
        let mut at = 0;
        for tag in &self.tags {
            match self.replacements.get(&tag.name) {
                Some(value) => {
                    out.push_str(&self.text[at..tag.start]);
                    out.push_str(value);
                }
                None => out.push_str(&self.text[at..tag.end]),
            }
            at = tag.end;
        }
        out.push_str(&self.text[at..]);
        out
    }

    /// Render and split into lines, each keeping its newline.
    pub fn lines(&self) -> std::vec::IntoIter<String> {
        self.render()
            .split_inclusive('\n')
            .map(str::to_string)
            .collect::<Vec<_>>()
            .into_iter()
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}
