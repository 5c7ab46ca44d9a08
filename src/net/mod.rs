//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (bind with reuse, backlog, accept with timeout)
//!     → connection.rs (id, state machine, reclaim)
//!     → Hand off to HTTP layer
//!
//! Connection States:
//!     Listening → Accepted → Reading → Dispatching → Responding → Closing
//! ```
//!
//! # Design Decisions
//! - One connection at a time; the next accept waits for reclaim
//! - Every state may fall through to Closing on failure

pub mod connection;
pub mod listener;

pub use connection::{Connection, ConnectionId, ConnectionState};
pub use listener::{Accepted, Listener, ListenerError};
