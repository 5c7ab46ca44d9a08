//! The serving loop.
//!
//! # Responsibilities
//! - Accept one connection at a time
//! - Drive reader → router → writer for its single request
//! - Report failures to tracing and the error log, then keep serving
//! - Release the connection in reverse order of acquisition on every path
//!
//! # Design Decisions
//! - No task is spawned; handlers and bodies need not be `Send`
//! - Timeouts are outcomes, not errors
//! - A malformed request line gets no response at all
//! - A panicking handler or body stream is caught, reported like any other
//!   failure, and the loop keeps serving
//! - The shutdown flag is checked between requests and races a pending
//!   accept, never an in-flight request

use std::any::Any;
use std::cell::RefCell;
use std::panic::{self, AssertUnwindSafe};

use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::{debug, error, info, trace, warn};

use crate::config::ListenerConfig;
use crate::http::reader::{ConnectionReader, ReadError};
use crate::http::request::Request;
use crate::http::writer::{ConnectionWriter, WriteError};
use crate::lifecycle::Shutdown;
use crate::net::{Accepted, Connection, ConnectionState, Listener, ListenerError};
use crate::observability::ErrorLog;
use crate::routing::{HandlerError, Router};

/// A failure while serving one connection, tagged by phase.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Accept(#[from] ListenerError),

    #[error(transparent)]
    Read(#[from] ReadError),

    #[error(transparent)]
    Handler(#[from] HandlerError),

    #[error(transparent)]
    Write(WriteError),

    #[error("panicked while {phase}: {message}")]
    Panic {
        phase: ConnectionState,
        message: String,
    },
}

impl From<WriteError> for ServerError {
    fn from(err: WriteError) -> Self {
        match err {
            WriteError::Panicked(message) => ServerError::Panic {
                phase: ConnectionState::Responding,
                message,
            },
            other => ServerError::Write(other),
        }
    }
}

impl ServerError {
    pub fn phase(&self) -> ConnectionState {
        match self {
            ServerError::Accept(_) => ConnectionState::Listening,
            ServerError::Read(_) => ConnectionState::Reading,
            ServerError::Handler(_) => ConnectionState::Dispatching,
            ServerError::Write(_) => ConnectionState::Responding,
            ServerError::Panic { phase, .. } => *phase,
        }
    }
}

/// How one turn of the loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A response was written.
    Handled,
    /// No client arrived, or the client sent nothing in time.
    TimedOut,
    /// The request line was unusable; the connection was closed silently.
    Dropped,
    /// A failure was reported and the connection closed.
    Failed,
    /// Shutdown was triggered while waiting for a client.
    Stopped,
}

pub struct HttpServer {
    router: Router,
    config: ListenerConfig,
    error_log: Option<ErrorLog>,
}

impl HttpServer {
    pub fn new(router: Router, config: ListenerConfig) -> Self {
        Self {
            router,
            config,
            error_log: None,
        }
    }

    pub fn with_error_log(mut self, error_log: ErrorLog) -> Self {
        self.error_log = Some(error_log);
        self
    }

    /// Serve until `shutdown` is triggered.
    pub async fn run(&self, listener: &Listener, shutdown: &Shutdown) {
        match listener.local_addr() {
            Ok(addr) => info!(address = %addr, "Server listening"),
            Err(err) => warn!(error = %err, "Server listening on unknown address"),
        }
        while !shutdown.is_triggered() {
            let outcome = self.handle_request(listener, shutdown).await;
            trace!(?outcome, "Loop iteration finished");
        }
        info!("Server stopped");
    }

    /// Accept and serve exactly one connection.
    pub async fn handle_request(&self, listener: &Listener, shutdown: &Shutdown) -> Outcome {
        let accepted = tokio::select! {
            biased;
            _ = shutdown.wait() => return Outcome::Stopped,
            accepted = listener.accept(self.config.accept_timeout()) => accepted,
        };
        let (stream, peer) = match accepted {
            Ok(Accepted::Connection(stream, peer)) => (stream, peer),
            Ok(Accepted::TimedOut) => {
                trace!("Accept timed out");
                return Outcome::TimedOut;
            }
            Err(err) => {
                self.report(None, None, &ServerError::from(err));
                return Outcome::Failed;
            }
        };

        let mut connection = Connection::accepted(peer);
        let outcome = self.serve(&mut connection, stream).await;
        connection.reclaim();
        outcome
    }

    async fn serve(&self, connection: &mut Connection, mut stream: TcpStream) -> Outcome {
        let outcome = {
            let malformed = RefCell::new(None::<String>);
            let (read_half, write_half) = stream.split();
            let (id, peer) = (connection.id(), connection.peer());
            let mut reader = ConnectionReader::new(BufReader::new(read_half), peer)
                .with_limits(self.config.read_limits())
                .with_malformed_hook(|line| {
                    warn!(connection_id = %id, peer = %peer, line, "Malformed request line, dropping connection");
                    *malformed.borrow_mut() = Some(line.to_string());
                });
            let mut writer = ConnectionWriter::new(write_half);

            let outcome = self
                .exchange(connection, &mut reader, &mut writer, &malformed)
                .await;
            connection.advance(ConnectionState::Closing);
            drop(writer);
            drop(reader);
            outcome
        };
        if let Err(err) = stream.shutdown().await {
            trace!(connection_id = %connection.id(), error = %err, "Socket shutdown failed");
        }
        drop(stream);
        outcome
    }

    async fn exchange<R, W>(
        &self,
        connection: &mut Connection,
        reader: &mut ConnectionReader<'_, R>,
        writer: &mut ConnectionWriter<W>,
        malformed: &RefCell<Option<String>>,
    ) -> Outcome
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        connection.advance(ConnectionState::Reading);
        let parsed = match self.config.read_timeout() {
            Some(limit) => match tokio::time::timeout(limit, reader.parse()).await {
                Ok(parsed) => parsed,
                Err(_) => {
                    debug!(connection_id = %connection.id(), "Read timed out");
                    return Outcome::TimedOut;
                }
            },
            None => reader.parse().await,
        };
        let mut request = match parsed {
            Ok(Some(request)) => request,
            Ok(None) => {
                let line = malformed.borrow_mut().take().unwrap_or_default();
                self.record_malformed(connection, &line);
                return Outcome::Dropped;
            }
            Err(err) => {
                self.report(Some(connection), None, &ServerError::from(err));
                return Outcome::Failed;
            }
        };

        connection.advance(ConnectionState::Dispatching);
        let dispatched =
            panic::catch_unwind(AssertUnwindSafe(|| self.router.dispatch(&mut request)));
        let response = match dispatched {
            Ok(Ok(response)) => response,
            Ok(Err(err)) => {
                self.report(Some(connection), Some(&request), &ServerError::from(err));
                return Outcome::Failed;
            }
            Err(payload) => {
                let err = ServerError::Panic {
                    phase: ConnectionState::Dispatching,
                    message: panic_message(&*payload),
                };
                self.report(Some(connection), Some(&request), &err);
                return Outcome::Failed;
            }
        };

        connection.advance(ConnectionState::Responding);
        let status = response.status();
        if let Err(err) = writer.write_response(response).await {
            self.report(Some(connection), Some(&request), &ServerError::from(err));
            return Outcome::Failed;
        }
        info!(
            connection_id = %connection.id(),
            peer = %connection.peer(),
            method = %request.method(),
            path = request.path(),
            status = status.as_u16(),
            "Request handled"
        );
        Outcome::Handled
    }

    fn report(&self, connection: Option<&Connection>, request: Option<&Request>, err: &ServerError) {
        let phase = err.phase();
        match connection {
            Some(conn) => error!(
                connection_id = %conn.id(),
                peer = %conn.peer(),
                phase = %phase,
                error = %err,
                "Request failed"
            ),
            None => error!(phase = %phase, error = %err, "Request failed"),
        }
        if let Some(request) = request {
            debug!(snapshot = ?request.snapshot(), "Failed request");
        }

        let Some(log) = &self.error_log else { return };
        let mut entry = log.entry();
        if let Some(conn) = connection {
            entry
                .write_line(&format!("Connection: {}", conn.id()))
                .write_line(&format!("Peer: {}", conn.peer()));
        }
        entry.write_line(&format!("Phase: {phase}"));
        if let Some(request) = request {
            entry.write_line("Request:");
            for line in request.snapshot() {
                entry.write_line(&format!("    {line}"));
            }
        }
        entry.write_failure(err);
        if let Err(io_err) = entry.close() {
            warn!(error = %io_err, "Failed to write error log entry");
        }
    }

    fn record_malformed(&self, connection: &Connection, line: &str) {
        let Some(log) = &self.error_log else { return };
        let mut entry = log.entry();
        entry
            .write_line(&format!("Connection: {}", connection.id()))
            .write_line(&format!("Peer: {}", connection.peer()))
            .write_line("Warning: malformed request line, connection dropped")
            .write_line(&format!("Line: {line:?}"));
        if let Err(io_err) = entry.close() {
            warn!(error = %io_err, "Failed to write error log entry");
        }
    }
}

/// Text of a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

impl std::fmt::Debug for HttpServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpServer")
            .field("router", &self.router)
            .field("config", &self.config)
            .field("error_log", &self.error_log)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panic_payloads_become_messages() {
        let payload = panic::catch_unwind(|| panic!("pin {} missing", 7)).unwrap_err();
        assert_eq!(panic_message(&*payload), "pin 7 missing");
        let payload = panic::catch_unwind(|| panic!("static text")).unwrap_err();
        assert_eq!(panic_message(&*payload), "static text");
        let payload = panic::catch_unwind(|| std::panic::panic_any(42u8)).unwrap_err();
        assert_eq!(panic_message(&*payload), "non-string panic payload");
    }

    #[test]
    fn stream_panic_maps_to_responding_phase() {
        let err = ServerError::from(WriteError::Panicked("boom".to_string()));
        assert_eq!(err.phase(), ConnectionState::Responding);
        assert_eq!(err.to_string(), "panicked while responding: boom");
        let err = ServerError::from(WriteError::Io(std::io::ErrorKind::BrokenPipe.into()));
        assert_eq!(err.phase(), ConnectionState::Responding);
        assert!(matches!(err, ServerError::Write(_)));
    }
}
