//! Tag location.
//!
//! # Responsibilities
//! - Find the next `{{ name }}` marker at or after an offset
//! - Validate the tag grammar (`\s*[A-Za-z0-9_]+\s*` between the markers)
//! - Report the exact byte span, markers inclusive, so callers can splice
//!
//! # Design Decisions
//! - Pure and stateless; callers advance the offset themselves
//! - Plain substring search instead of a regex, the grammar is tiny

use super::TemplateError;

/// Opening tag marker.
pub const TAG_OPEN: &str = "{{";
/// Closing tag marker.
pub const TAG_CLOSE: &str = "}}";

/// A located tag: byte span (markers inclusive) and identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub start: usize,
    pub end: usize,
    pub name: String,
}

/// Find the next tag in `text` at or after byte offset `from`.
///
/// Returns `Ok(None)` when no opening marker remains.
pub fn scan(text: &str, from: usize) -> Result<Option<Tag>, TemplateError> {
    let Some(rest) = text.get(from..) else {
        return Ok(None);
    };
    let Some(open) = rest.find(TAG_OPEN) else {
        return Ok(None);
    };
    let start = from + open;
    let inner_start = start + TAG_OPEN.len();

    let close = text[inner_start..]
        .find(TAG_CLOSE)
        .ok_or(TemplateError::UnterminatedTag { pos: start })?;
    let inner_end = inner_start + close;
    let end = inner_end + TAG_CLOSE.len();

    let name = text[inner_start..inner_end].trim();
    if !is_identifier(name) {
        return Err(TemplateError::MalformedTag {
            pos: start,
            tag: text[start..end].to_string(),
        });
    }

    Ok(Some(Tag {
        start,
        end,
        name: name.to_string(),
    }))
}

/// Enumerate every tag in `text`, left to right, without overlap.
pub fn scan_all(text: &str) -> Result<Vec<Tag>, TemplateError> {
    let mut tags = Vec::new();
    let mut at = 0;
    while let Some(tag) = scan(text, at)? {
        at = tag.end;
        tags.push(tag);
    }
    Ok(tags)
}

fn is_identifier(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
}
