//! Request parsing off a buffered connection.
//!
//! # Responsibilities
//! - Read the request line, headers and an optional POST body
//! - Decode the request target into a path and a query
//! - Enforce line, header count and body size limits
//!
//! # Design Decisions
//! - A malformed request line is not an error: the reader reports it to a
//!   hook and yields `Ok(None)` so the caller can drop the connection
//! - Bytes past `Content-Length` stay in the stream
//! - Lines are read through `take` so an endless line cannot grow the
//!   buffer past the configured limit

use std::net::SocketAddr;
use std::string::FromUtf8Error;

use http::Method;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};
use tracing::{debug, warn};

use crate::http::headers::Headers;
use crate::http::query;
use crate::http::request::Request;

#[derive(Debug, Error)]
pub enum ReadError {
    #[error("connection read failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed header line {line:?}: missing ':'")]
    MalformedHeader { line: String },

    #[error("invalid Content-Length {value:?}")]
    InvalidContentLength { value: String },

    #[error("request body is not valid UTF-8: {0}")]
    Encoding(#[from] FromUtf8Error),

    #[error("{what} exceeds limit of {limit}")]
    TooLarge { what: &'static str, limit: usize },
}

/// Size limits applied while reading one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadLimits {
    pub max_line_bytes: usize,
    pub max_header_lines: usize,
    pub max_body_bytes: usize,
}

impl Default for ReadLimits {
    fn default() -> Self {
        Self {
            max_line_bytes: 8 * 1024,
            max_header_lines: 100,
            max_body_bytes: 1024 * 1024,
        }
    }
}

type MalformedHook<'h> = Box<dyn FnMut(&str) + 'h>;

/// Parses a single request from `reader`.
pub struct ConnectionReader<'h, R> {
    reader: R,
    client_address: SocketAddr,
    limits: ReadLimits,
    on_malformed: MalformedHook<'h>,
}

impl<'h, R> ConnectionReader<'h, R>
where
    R: AsyncBufRead + Unpin,
{
    pub fn new(reader: R, client_address: SocketAddr) -> Self {
        Self {
            reader,
            client_address,
            limits: ReadLimits::default(),
            on_malformed: Box::new(move |line: &str| {
                warn!(peer = %client_address, line, "Malformed request line");
            }),
        }
    }

    pub fn with_limits(mut self, limits: ReadLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Replace the default warning emitted for a malformed request line.
    pub fn with_malformed_hook(mut self, hook: impl FnMut(&str) + 'h) -> Self {
        self.on_malformed = Box::new(hook);
        self
    }

    /// Read one request. `Ok(None)` means the request line was unusable and
    /// the hook has been told.
    pub async fn parse(&mut self) -> Result<Option<Request>, ReadError> {
        let line = self.read_line("request line").await?;
        let Some((method, target)) = parse_request_line(&line) else {
            (self.on_malformed)(&line);
            return Ok(None);
        };

        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (query::decode_path(path), query::parse(query)),
            None => (query::decode_path(target), query::Query::new()),
        };

        let headers = self.read_headers().await?;
        let mut request = Request::new(method, path, self.client_address).with_query(query);

        if request.method() == Method::POST {
            if let Some(value) = headers.get_ignore_case("Content-Length") {
                let length = value
                    .trim()
                    .parse::<usize>()
                    .map_err(|_| ReadError::InvalidContentLength {
                        value: value.to_string(),
                    })?;
                request = request.with_body(self.read_body(length).await?);
            }
        }

        let request = request.with_headers(headers);
        debug!(
            peer = %self.client_address,
            method = %request.method(),
            path = request.path(),
            "Parsed request"
        );
        Ok(Some(request))
    }

    pub fn into_inner(self) -> R {
        self.reader
    }

    async fn read_line(&mut self, what: &'static str) -> Result<String, ReadError> {
        let limit = self.limits.max_line_bytes;
        let mut buf = Vec::new();
        let read = (&mut self.reader)
            .take(limit as u64)
            .read_until(b'\n', &mut buf)
            .await?;
        if read == limit && buf.last() != Some(&b'\n') {
            return Err(ReadError::TooLarge { what, limit });
        }
        while matches!(buf.last(), Some(b'\n' | b'\r')) {
            buf.pop();
        }
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    async fn read_headers(&mut self) -> Result<Headers, ReadError> {
        let mut headers = Headers::new();
        let mut count = 0;
        loop {
            let line = self.read_line("header line").await?;
            if line.is_empty() {
                return Ok(headers);
            }
            count += 1;
            if count > self.limits.max_header_lines {
                return Err(ReadError::TooLarge {
                    what: "header count",
                    limit: self.limits.max_header_lines,
                });
            }
            let Some((key, value)) = line.split_once(':') else {
                return Err(ReadError::MalformedHeader { line });
            };
            headers.insert(key.trim(), value.trim());
        }
    }

    async fn read_body(&mut self, length: usize) -> Result<String, ReadError> {
        if length > self.limits.max_body_bytes {
            return Err(ReadError::TooLarge {
                what: "request body",
                limit: self.limits.max_body_bytes,
            });
        }
        let mut buf = vec![0; length];
        self.reader.read_exact(&mut buf).await?;
        Ok(String::from_utf8(buf)?)
    }
}

/// Split `METHOD TARGET VERSION`; anything else is malformed.
fn parse_request_line(line: &str) -> Option<(Method, &str)> {
    let mut tokens = line.split_whitespace();
    let (method, target, _version) = (tokens.next()?, tokens.next()?, tokens.next()?);
    if tokens.next().is_some() {
        return None;
    }
    let method = Method::from_bytes(method.as_bytes()).ok()?;
    Some((method, target))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer() -> SocketAddr {
        "192.168.4.2:50000".parse().unwrap()
    }

    #[tokio::test]
    async fn parses_get_with_query_and_headers() {
        let input: &[u8] = b"GET /foo?x=1&y=2 HTTP/1.1\r\nHost: a\r\n\r\n";
        let mut reader = ConnectionReader::new(input, peer());
        let request = reader.parse().await.unwrap().unwrap();
        assert_eq!(request.method(), Method::GET);
        assert_eq!(request.path(), "/foo");
        assert_eq!(request.query().get_all("x"), [Some("1".to_string())]);
        assert_eq!(request.query().get_all("y"), [Some("2".to_string())]);
        assert_eq!(request.headers().iter().collect::<Vec<_>>(), [("Host", "a")]);
        assert_eq!(request.body(), None);
        assert_eq!(request.client_address(), peer());
    }

    #[tokio::test]
    async fn post_body_stops_at_content_length() {
        let input: &[u8] = b"POST /pins HTTP/1.1\r\nContent-Length: 5\r\n\r\nhello!";
        let mut reader = ConnectionReader::new(input, peer());
        let request = reader.parse().await.unwrap().unwrap();
        assert_eq!(request.body(), Some("hello"));
        assert_eq!(reader.into_inner(), b"!");
    }

    #[tokio::test]
    async fn content_length_lookup_ignores_case() {
        let input: &[u8] = b"POST / HTTP/1.1\r\ncontent-length: 3\r\n\r\na=1";
        let mut reader = ConnectionReader::new(input, peer());
        let request = reader.parse().await.unwrap().unwrap();
        assert_eq!(request.body(), Some("a=1"));
    }

    #[tokio::test]
    async fn get_ignores_content_length() {
        let input: &[u8] = b"GET / HTTP/1.1\r\nContent-Length: 3\r\n\r\nabc";
        let mut reader = ConnectionReader::new(input, peer());
        let request = reader.parse().await.unwrap().unwrap();
        assert_eq!(request.body(), None);
        assert_eq!(reader.into_inner(), b"abc");
    }

    #[tokio::test]
    async fn malformed_request_line_calls_hook() {
        let mut seen = Vec::new();
        let input: &[u8] = b"GARBAGE\r\n\r\n";
        let mut reader =
            ConnectionReader::new(input, peer()).with_malformed_hook(|line| seen.push(line.to_string()));
        assert!(reader.parse().await.unwrap().is_none());
        drop(reader);
        assert_eq!(seen, ["GARBAGE"]);
    }

    #[tokio::test]
    async fn extra_tokens_are_malformed() {
        let input: &[u8] = b"GET / HTTP/1.1 extra\r\n\r\n";
        let mut reader = ConnectionReader::new(input, peer());
        assert!(reader.parse().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn header_without_colon_is_error() {
        let input: &[u8] = b"GET / HTTP/1.1\r\nHost a\r\n\r\n";
        let mut reader = ConnectionReader::new(input, peer());
        let err = reader.parse().await.unwrap_err();
        assert!(matches!(err, ReadError::MalformedHeader { line } if line == "Host a"));
    }

    #[tokio::test]
    async fn header_values_are_trimmed_and_split_on_first_colon() {
        let input: &[u8] = b"GET / HTTP/1.1\r\nReferer :  http://board/x  \r\n\r\n";
        let mut reader = ConnectionReader::new(input, peer());
        let request = reader.parse().await.unwrap().unwrap();
        assert_eq!(request.headers().get("Referer"), Some("http://board/x"));
    }

    #[tokio::test]
    async fn bad_content_length_is_error() {
        let input: &[u8] = b"POST / HTTP/1.1\r\nContent-Length: five\r\n\r\n";
        let mut reader = ConnectionReader::new(input, peer());
        assert!(matches!(
            reader.parse().await,
            Err(ReadError::InvalidContentLength { .. })
        ));
    }

    #[tokio::test]
    async fn invalid_utf8_body_is_error() {
        let input: &[u8] = b"POST / HTTP/1.1\r\nContent-Length: 2\r\n\r\n\xff\xfe";
        let mut reader = ConnectionReader::new(input, peer());
        assert!(matches!(reader.parse().await, Err(ReadError::Encoding(_))));
    }

    #[tokio::test]
    async fn percent_decodes_path() {
        let input: &[u8] = b"GET /static/my%20file.txt HTTP/1.1\r\n\r\n";
        let mut reader = ConnectionReader::new(input, peer());
        let request = reader.parse().await.unwrap().unwrap();
        assert_eq!(request.path(), "/static/my file.txt");
    }

    #[tokio::test]
    async fn long_line_exceeds_limit() {
        let input: &[u8] = b"GET /aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa HTTP/1.1\r\n\r\n";
        let limits = ReadLimits {
            max_line_bytes: 16,
            ..ReadLimits::default()
        };
        let mut reader = ConnectionReader::new(input, peer()).with_limits(limits);
        assert!(matches!(
            reader.parse().await,
            Err(ReadError::TooLarge { what: "request line", .. })
        ));
    }

    #[tokio::test]
    async fn too_many_headers() {
        let input: &[u8] = b"GET / HTTP/1.1\r\nA: 1\r\nB: 2\r\nC: 3\r\n\r\n";
        let limits = ReadLimits {
            max_header_lines: 2,
            ..ReadLimits::default()
        };
        let mut reader = ConnectionReader::new(input, peer()).with_limits(limits);
        assert!(matches!(reader.parse().await, Err(ReadError::TooLarge { .. })));
    }
}
