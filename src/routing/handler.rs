//! Handler contract.

use thiserror::Error;

use crate::http::{Request, Response};
use crate::template::TemplateError;

/// A request handler. Handlers run on the server thread and need not be
/// `Send`.
pub type Handler = Box<dyn Fn(&Request) -> Result<Response, HandlerError>>;

/// Failure raised by a handler before any byte of its response is written.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("template failed: {0}")]
    Template(#[from] TemplateError),

    #[error("i/o failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("json failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}
