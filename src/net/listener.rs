//! TCP listener setup and accept.
//!
//! # Responsibilities
//! - Bind to the configured address with address reuse
//! - Listen with a fixed backlog
//! - Accept one connection, optionally bounded by a timeout
//!
//! # Design Decisions
//! - Address reuse lets the server restart without waiting out TIME_WAIT
//! - An accept timeout is an outcome, not an error

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;
use tokio::net::{TcpListener, TcpSocket, TcpStream};

use crate::config::ListenerConfig;

/// Error type for listener operations.
#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("invalid bind address {address:?}: {source}")]
    Address {
        address: String,
        #[source]
        source: std::net::AddrParseError,
    },

    #[error("Failed to bind: {0}")]
    Bind(#[source] std::io::Error),

    #[error("Failed to accept: {0}")]
    Accept(#[source] std::io::Error),
}

/// Result of waiting for a client.
#[derive(Debug)]
pub enum Accepted {
    Connection(TcpStream, SocketAddr),
    TimedOut,
}

pub struct Listener {
    inner: TcpListener,
}

impl Listener {
    /// Bind to the configured address.
    pub fn bind(config: &ListenerConfig) -> Result<Self, ListenerError> {
        let addr: SocketAddr =
            config
                .bind_address
                .parse()
                .map_err(|source| ListenerError::Address {
                    address: config.bind_address.clone(),
                    source,
                })?;
        Self::bind_addr(addr, config.backlog)
    }

    pub fn bind_addr(addr: SocketAddr, backlog: u32) -> Result<Self, ListenerError> {
        let socket = if addr.is_ipv4() {
            TcpSocket::new_v4()
        } else {
            TcpSocket::new_v6()
        }
        .map_err(ListenerError::Bind)?;
        socket.set_reuseaddr(true).map_err(ListenerError::Bind)?;
        socket.bind(addr).map_err(ListenerError::Bind)?;
        let inner = socket.listen(backlog).map_err(ListenerError::Bind)?;

        if let Ok(local) = inner.local_addr() {
            tracing::info!(address = %local, backlog, "Listener bound");
        }
        Ok(Self { inner })
    }

    /// Wait for the next client, for at most `timeout` when given.
    pub async fn accept(&self, timeout: Option<Duration>) -> Result<Accepted, ListenerError> {
        let accepted = match timeout {
            Some(limit) => match tokio::time::timeout(limit, self.inner.accept()).await {
                Ok(result) => result,
                Err(_) => return Ok(Accepted::TimedOut),
            },
            None => self.inner.accept().await,
        };
        let (stream, peer) = accepted.map_err(ListenerError::Accept)?;
        tracing::debug!(peer_addr = %peer, "Connection accepted");
        Ok(Accepted::Connection(stream, peer))
    }

    pub fn local_addr(&self) -> Result<SocketAddr, std::io::Error> {
        self.inner.local_addr()
    }
}
