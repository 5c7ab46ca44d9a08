//! Templating subsystem.
//!
//! # Data Flow
//! ```text
//! Eager:
//!     text → scanner.rs (all tag spans, once)
//!     → eager.rs render(mapping) → String (Content-Length body)
//!
//! Lazy:
//!     line source (file / buffer)
//!     → lazy.rs (one line at a time, scanner.rs per line)
//!         → Text replacement: substituted in place
//!         → Lines replacement: nested producer spliced with indentation
//!     → stream of lines (chunked body)
//!
//! tree.rs: JSON tree → YAML / HTML form lines (splice-ready)
//! ```
//!
//! # Design Decisions
//! - Explicit `Replacement::{Text, Lines}` instead of probing values
//! - Unknown tags: literal in eager output, erased in lazy output
//! - Lazy templates are single pass and own their sources

pub mod eager;
pub mod error;
pub mod lazy;
pub mod scanner;
pub mod tree;

pub use eager::Template;
pub use error::TemplateError;
pub use lazy::{LazyTemplate, LineStream, Replacement};
pub use scanner::{scan, scan_all, Tag};
pub use tree::{parse_form, TreeLines};
