//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Request (method, path)
//!     → router.rs (exact table lookup)
//!     → matcher.rs (ordered pattern scan, captures)
//!     → default handler when nothing matched
//!     → handler.rs contract: Fn(&Request) -> Result<Response, HandlerError>
//! ```
//!
//! # Design Decisions
//! - Routes registered on an explicit `Router` value before serving
//! - Immutable while serving
//! - Deterministic: exact, then patterns in order, then default

use thiserror::Error;

pub mod handler;
pub mod matcher;
pub mod router;

pub use handler::{Handler, HandlerError};
pub use matcher::{PathPattern, RouteMatch};
pub use router::{Resolution, RouteKind, Router};

#[derive(Debug, Error)]
pub enum RouteError {
    #[error("invalid route pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}
