//! Response value returned by handlers.
//!
//! # Responsibilities
//! - Carry status, ordered headers and a [`Body`]
//! - Offer shortcuts for the common shapes: rendered HTML, streamed
//!   templates, JSON documents, static files and the stock 404 page
//!
//! # Design Decisions
//! - Framing headers (`Content-Length`, `Transfer-Encoding`) are left to the
//!   writer, which derives them from the body variant
//! - Header names keep the case they were set with

use std::fs::File;
use std::io;
use std::path::Path;

use http::StatusCode;
use serde::Serialize;

use crate::http::body::{Body, FileChunks};
use crate::http::headers::Headers;
use crate::http::mime;
use crate::template::{LazyTemplate, Template};

#[derive(Debug)]
pub struct Response {
    status: StatusCode,
    headers: Headers,
    body: Body,
}

impl Response {
    pub fn new(status: StatusCode, body: impl Into<Body>) -> Self {
        Self {
            status,
            headers: Headers::new(),
            body: body.into(),
        }
    }

    /// `200 OK` with the given body.
    pub fn ok(body: impl Into<Body>) -> Self {
        Self::new(StatusCode::OK, body)
    }

    /// Render an eager template into a buffered HTML body.
    pub fn html(template: &Template) -> Self {
        Self::ok(template).with_header("Content-Type", "text/html")
    }

    /// Stream a lazy template line by line.
    pub fn template(template: LazyTemplate) -> Self {
        Self::ok(template).with_header("Content-Type", "text/html")
    }

    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self, serde_json::Error> {
        let text = serde_json::to_string(value)?;
        Ok(Self::ok(text).with_header("Content-Type", "application/json"))
    }

    /// Stream a file in `chunk_size` byte pieces, typed by its extension.
    pub fn file(path: impl AsRef<Path>, chunk_size: usize) -> io::Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let chunks = FileChunks::new(file, chunk_size);
        Ok(Self::ok(Body::streaming(chunks)).with_header("Content-Type", mime::mime_type(path)))
    }

    pub fn not_found() -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            "<html><body><h1>404 Not Found</h1></body></html>",
        )
        .with_header("Content-Type", "text/html")
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    pub fn into_parts(self) -> (StatusCode, Headers, Body) {
        (self.status, self.headers, self.body)
    }
}
