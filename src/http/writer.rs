//! Response serialization onto a connection.
//!
//! # Responsibilities
//! - Write the status line and headers with explicit CRLF
//! - Frame buffered bodies with `Content-Length`
//! - Frame streaming bodies with `Transfer-Encoding: chunked`
//!
//! # Design Decisions
//! - The body variant alone decides the framing; handlers never set
//!   framing headers themselves
//! - Empty chunks are skipped since a zero-size chunk ends the body
//! - A flush is attempted after every logical write; a transport that
//!   reports `Unsupported` stops being flushed for the rest of the writer's
//!   life
//! - A panicking chunk producer is caught and reported as
//!   `WriteError::Panicked`; the response is cut short

use std::io;
use std::panic::{self, AssertUnwindSafe};

use thiserror::Error;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, trace};

use crate::http::body::{Body, BodyError};
use crate::http::headers::Headers;
use crate::http::response::Response;
use crate::http::server::panic_message;

const CRLF: &str = "\r\n";

#[derive(Debug, Error)]
pub enum WriteError {
    #[error("connection write failed: {0}")]
    Io(#[from] io::Error),

    #[error("response body stream failed: {0}")]
    Body(#[source] BodyError),

    #[error("response body stream panicked: {0}")]
    Panicked(String),
}

pub struct ConnectionWriter<W> {
    writer: W,
    flush_supported: bool,
}

impl<W> ConnectionWriter<W>
where
    W: AsyncWrite + Unpin,
{
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            flush_supported: true,
        }
    }

    /// Serialize `response`, draining a streaming body to the end.
    pub async fn write_response(&mut self, response: Response) -> Result<(), WriteError> {
        let (status, mut headers, body) = response.into_parts();
        if !headers.contains_ignore_case("Content-Type") {
            headers.insert("Content-Type", "text/html");
        }
        headers.remove_ignore_case("Connection");
        headers.insert("Connection", "close");
        headers.remove_ignore_case("Content-Length");
        headers.remove_ignore_case("Transfer-Encoding");

        let status_line = format!(
            "HTTP/1.1 {} {}",
            status.as_u16(),
            status.canonical_reason().unwrap_or("")
        );

        match body {
            Body::Buffered(content) => {
                headers.insert("Content-Length", content.len().to_string());
                self.write_head(&status_line, &headers).await?;
                if !content.is_empty() {
                    self.write_flushed(content.as_bytes()).await?;
                }
                trace!(status = status.as_u16(), bytes = content.len(), "Wrote buffered response");
            }
            Body::Streaming(chunks) => {
                headers.insert("Transfer-Encoding", "chunked");
                self.write_head(&status_line, &headers).await?;
                let mut count = 0usize;
                let mut chunks = chunks;
                loop {
                    let next = panic::catch_unwind(AssertUnwindSafe(|| chunks.next()))
                        .map_err(|payload| WriteError::Panicked(panic_message(&*payload)))?;
                    let Some(chunk) = next else { break };
                    let chunk = chunk.map_err(WriteError::Body)?;
                    if chunk.is_empty() {
                        continue;
                    }
                    let mut frame = format!("{:X}{CRLF}", chunk.len()).into_bytes();
                    frame.extend_from_slice(&chunk);
                    frame.extend_from_slice(CRLF.as_bytes());
                    self.write_flushed(&frame).await?;
                    count += 1;
                }
                self.write_flushed(format!("0{CRLF}{CRLF}").as_bytes()).await?;
                trace!(status = status.as_u16(), chunks = count, "Wrote chunked response");
            }
        }
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    async fn write_head(&mut self, status_line: &str, headers: &Headers) -> Result<(), WriteError> {
        let mut head = String::with_capacity(128);
        head.push_str(status_line);
        head.push_str(CRLF);
        for (name, value) in headers.iter() {
            head.push_str(name.trim());
            head.push_str(": ");
            head.push_str(value.trim());
            head.push_str(CRLF);
        }
        head.push_str(CRLF);
        self.write_flushed(head.as_bytes()).await
    }

    async fn write_flushed(&mut self, bytes: &[u8]) -> Result<(), WriteError> {
        self.writer.write_all(bytes).await?;
        if !self.flush_supported {
            return Ok(());
        }
        match self.writer.flush().await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::Unsupported => {
                debug!("Transport cannot flush, flushing disabled");
                self.flush_supported = false;
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }
}
