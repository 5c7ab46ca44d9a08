//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → reader.rs (request line, headers, optional body → Request)
//!     → [routing layer picks a handler]
//!     → handler builds a Response (response.rs) with a Body (body.rs)
//!     → writer.rs (Content-Length or chunked framing)
//!     → server.rs closes the connection and loops
//! ```
//!
//! # Design Decisions
//! - HTTP/1.1 only, one request per connection (`Connection: close`)
//! - Buffered and streaming bodies are distinct variants; the writer never
//!   inspects a body at runtime to pick its framing

pub mod body;
pub mod headers;
pub mod mime;
pub mod query;
pub mod reader;
pub mod request;
pub mod response;
pub mod server;
pub mod writer;

pub use body::{Body, BodyError, ChunkStream, FileChunks};
pub use headers::Headers;
pub use query::Query;
pub use reader::{ConnectionReader, ReadError, ReadLimits};
pub use request::Request;
pub use response::Response;
pub use server::{HttpServer, Outcome, ServerError};
pub use writer::{ConnectionWriter, WriteError};
