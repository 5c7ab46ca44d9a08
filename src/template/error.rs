//! Template error types.

use thiserror::Error;

/// Errors raised while scanning or rendering a template.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// An opening `{{` marker has no closing `}}`.
    #[error("@pos {pos}: missing closing marker '}}}}'")]
    UnterminatedTag { pos: usize },

    /// The text between the markers is not a single identifier.
    #[error("@pos {pos}: malformed tag '{tag}', expected '{{{{ identifier }}}}'")]
    MalformedTag { pos: usize, tag: String },

    /// Reading the template source failed.
    #[error("template source error: {0}")]
    Io(#[from] std::io::Error),

    /// A spliced producer failed while yielding lines.
    #[error("nested producer for tag '{tag}' failed: {source}")]
    Nested {
        tag: String,
        #[source]
        source: Box<TemplateError>,
    },
}
