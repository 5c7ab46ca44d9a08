//! Response bodies.
//!
//! A body is either fully rendered (framed with `Content-Length`) or a
//! stream of chunks (framed with `Transfer-Encoding: chunked`). Handlers
//! pick the variant explicitly.

use std::fmt;
use std::fs::File;
use std::io::{self, Read};

use crate::template::{LazyTemplate, Template};

/// Error carried by a failing body stream.
pub type BodyError = Box<dyn std::error::Error + Send + Sync>;

/// A boxed stream of body chunks.
pub type ChunkStream = Box<dyn Iterator<Item = Result<Vec<u8>, BodyError>>>;

pub enum Body {
    Buffered(String),
    Streaming(ChunkStream),
}

impl Body {
    pub fn empty() -> Self {
        Body::Buffered(String::new())
    }

    pub fn buffered(content: impl Into<String>) -> Self {
        Body::Buffered(content.into())
    }

    /// Stream any fallible producer of text or bytes.
    pub fn streaming<I, T, E>(chunks: I) -> Self
    where
        I: IntoIterator<Item = Result<T, E>>,
        I::IntoIter: 'static,
        T: Into<Vec<u8>>,
        E: Into<BodyError>,
    {
        Body::Streaming(Box::new(
            chunks
                .into_iter()
                .map(|chunk| chunk.map(Into::into).map_err(Into::into)),
        ))
    }

    /// Stream an infallible sequence of lines.
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        I::IntoIter: 'static,
        S: Into<Vec<u8>>,
    {
        Body::Streaming(Box::new(lines.into_iter().map(|line| Ok(line.into()))))
    }

    pub fn is_streaming(&self) -> bool {
        matches!(self, Body::Streaming(_))
    }

    /// Drain the body into memory.
    pub fn into_bytes(self) -> Result<Vec<u8>, BodyError> {
        match self {
            Body::Buffered(content) => Ok(content.into_bytes()),
            Body::Streaming(chunks) => {
                let mut out = Vec::new();
                for chunk in chunks {
                    out.extend_from_slice(&chunk?);
                }
                Ok(out)
            }
        }
    }
}

impl From<String> for Body {
    fn from(content: String) -> Self {
        Body::Buffered(content)
    }
}

impl From<&str> for Body {
    fn from(content: &str) -> Self {
        Body::Buffered(content.to_string())
    }
}

impl From<&Template> for Body {
    fn from(template: &Template) -> Self {
        Body::Buffered(template.render())
    }
}

impl From<Template> for Body {
    fn from(template: Template) -> Self {
        Body::from(&template)
    }
}

impl From<LazyTemplate> for Body {
    fn from(template: LazyTemplate) -> Self {
        Body::streaming(template)
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Body::Buffered(content) => f.debug_tuple("Buffered").field(&content.len()).finish(),
            Body::Streaming(_) => f.write_str("Streaming(..)"),
        }
    }
}

/// Reads a file in fixed-size chunks; the file closes when the stream ends
/// or is dropped.
pub struct FileChunks {
    file: Option<File>,
    chunk_size: usize,
}

impl FileChunks {
    pub fn new(file: File, chunk_size: usize) -> Self {
        Self {
            file: Some(file),
            chunk_size: chunk_size.max(1),
        }
    }
}

impl Iterator for FileChunks {
    type Item = io::Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        let file = self.file.as_mut()?;
        let mut buf = vec![0; self.chunk_size];
        match file.read(&mut buf) {
            Ok(0) => {
                self.file = None;
                None
            }
            Ok(n) => {
                buf.truncate(n);
                Some(Ok(buf))
            }
            Err(err) => {
                self.file = None;
                Some(Err(err))
            }
        }
    }
}
