//! Single-threaded HTTP/1.1 server with a line-streaming template engine.

// Core subsystems
pub mod config;
pub mod http;
pub mod net;
pub mod routing;
pub mod template;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

// Demo application
pub mod app;

pub use crate::config::ServerConfig;
pub use crate::http::{Body, HttpServer, Request, Response};
pub use crate::lifecycle::Shutdown;
pub use crate::routing::{HandlerError, Router};
pub use crate::template::{LazyTemplate, Replacement, Template};
