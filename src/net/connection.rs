//! Connection state machine and lifecycle tracking.
//!
//! # Responsibilities
//! - Track per-request state (Listening → Accepted → Reading → Dispatching
//!   → Responding → Closing)
//! - Generate unique connection IDs for tracing
//! - Time each connection from accept to reclaim

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Global atomic counter for connection IDs.
/// Using relaxed ordering is sufficient since we only need uniqueness, not synchronization.
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Generate a new unique connection ID.
    pub fn new() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Where the server is in handling one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Waiting for a client.
    Listening,
    /// A client connected.
    Accepted,
    /// Parsing the request.
    Reading,
    /// Looking up and running the handler.
    Dispatching,
    /// Writing the response.
    Responding,
    /// Releasing the connection.
    Closing,
}

impl ConnectionState {
    /// Whether `self → next` is a legal step. Any state may jump to
    /// `Closing`; `Closing` only leads back to `Listening`.
    pub fn can_advance_to(self, next: ConnectionState) -> bool {
        use ConnectionState::*;
        matches!(
            (self, next),
            (Listening, Accepted)
                | (Accepted, Reading)
                | (Reading, Dispatching)
                | (Dispatching, Responding)
                | (Closing, Listening)
        ) || (next == Closing && self != Listening && self != Closing)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ConnectionState::Listening => "listening",
            ConnectionState::Accepted => "accepted",
            ConnectionState::Reading => "reading",
            ConnectionState::Dispatching => "dispatching",
            ConnectionState::Responding => "responding",
            ConnectionState::Closing => "closing",
        };
        f.write_str(name)
    }
}

/// Bookkeeping for the connection currently being served.
#[derive(Debug)]
pub struct Connection {
    id: ConnectionId,
    peer: SocketAddr,
    state: ConnectionState,
    opened: Instant,
}

impl Connection {
    /// Start tracking a freshly accepted client.
    pub fn accepted(peer: SocketAddr) -> Self {
        let id = ConnectionId::new();
        tracing::trace!(connection_id = %id, peer = %peer, "Connection accepted");
        Self {
            id,
            peer,
            state: ConnectionState::Accepted,
            opened: Instant::now(),
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Move to `next`, logging the step. Illegal steps are logged and kept
    /// out of the recorded state.
    pub fn advance(&mut self, next: ConnectionState) -> bool {
        if !self.state.can_advance_to(next) {
            tracing::warn!(
                connection_id = %self.id,
                from = %self.state,
                to = %next,
                "Illegal connection state transition"
            );
            return false;
        }
        tracing::trace!(connection_id = %self.id, from = %self.state, to = %next, "Connection state");
        self.state = next;
        true
    }

    /// Final step after the socket is released; returns how long the
    /// connection lived.
    pub fn reclaim(mut self) -> Duration {
        let elapsed = self.opened.elapsed();
        self.advance(ConnectionState::Listening);
        tracing::trace!(
            connection_id = %self.id,
            elapsed_ms = elapsed.as_millis() as u64,
            "Connection reclaimed"
        );
        elapsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_id_unique() {
        let id1 = ConnectionId::new();
        let id2 = ConnectionId::new();
        assert_ne!(id1, id2);
        assert!(id1.to_string().starts_with("conn-"));
    }

    #[test]
    fn happy_path_transitions() {
        let mut conn = Connection::accepted("127.0.0.1:4000".parse().unwrap());
        for next in [
            ConnectionState::Reading,
            ConnectionState::Dispatching,
            ConnectionState::Responding,
            ConnectionState::Closing,
        ] {
            assert!(conn.advance(next));
        }
        assert_eq!(conn.state(), ConnectionState::Closing);
        conn.reclaim();
    }

    #[test]
    fn early_close_is_allowed() {
        let mut conn = Connection::accepted("127.0.0.1:4000".parse().unwrap());
        assert!(conn.advance(ConnectionState::Reading));
        assert!(conn.advance(ConnectionState::Closing));
    }

    #[test]
    fn skipping_states_is_rejected() {
        let mut conn = Connection::accepted("127.0.0.1:4000".parse().unwrap());
        assert!(!conn.advance(ConnectionState::Responding));
        assert_eq!(conn.state(), ConnectionState::Accepted);
        assert!(!ConnectionState::Listening.can_advance_to(ConnectionState::Closing));
    }
}
