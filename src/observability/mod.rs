//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured tracing events to stdout)
//!
//! Request failures additionally go to:
//!     → error_log.rs (YAML documents in a size-limited file)
//! ```
//!
//! # Design Decisions
//! - Connection id, peer and phase flow through every failure event
//! - The error log outlives the process output, so it carries the request
//!   snapshot and the full error chain

pub mod error_log;
pub mod logging;

pub use error_log::{ErrorLog, LogEntry};
