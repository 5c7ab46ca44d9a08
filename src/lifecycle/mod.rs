//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Shutdown (shutdown.rs):
//!     trigger() → flag latched → server loop exits before next accept
//!
//! Signals (signals.rs):
//!     SIGINT → trigger()
//! ```
//!
//! # Design Decisions
//! - Ordered shutdown: finish the current request, stop accepting, exit

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
pub use signals::shutdown_on_ctrl_c;
