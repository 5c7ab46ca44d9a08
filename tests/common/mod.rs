//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::time::Duration;

use embedded_httpd::config::ListenerConfig;
use embedded_httpd::http::HttpServer;
use embedded_httpd::lifecycle::Shutdown;
use embedded_httpd::net::Listener;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;

/// A server running on the current `LocalSet`.
pub struct TestServer {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    handle: JoinHandle<()>,
}

impl TestServer {
    /// Trigger shutdown and wait for the loop to exit.
    pub async fn stop(self) {
        self.shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(5), self.handle)
            .await
            .expect("server did not stop")
            .expect("server task panicked");
    }
}

/// Listener settings for tests: ephemeral port, short read timeout.
pub fn test_config() -> ListenerConfig {
    ListenerConfig {
        bind_address: "127.0.0.1:0".to_string(),
        read_timeout_secs: Some(2),
        ..ListenerConfig::default()
    }
}

/// Bind and start `server` with `spawn_local`. Must run inside a `LocalSet`.
pub fn start(server: HttpServer, config: &ListenerConfig) -> TestServer {
    let listener = Listener::bind(config).expect("bind test listener");
    let addr = listener.local_addr().expect("local addr");
    let shutdown = Shutdown::new();
    let stop = shutdown.clone();
    let handle = tokio::task::spawn_local(async move {
        server.run(&listener, &stop).await;
    });
    TestServer {
        addr,
        shutdown,
        handle,
    }
}

/// Send raw bytes, half-close, and read until the server closes.
pub async fn send_raw(addr: SocketAddr, raw: &[u8]) -> String {
    let mut stream = TcpStream::connect(addr).await.expect("connect");
    stream.write_all(raw).await.expect("write request");
    let mut out = Vec::new();
    tokio::time::timeout(Duration::from_secs(5), stream.read_to_end(&mut out))
        .await
        .expect("response timed out")
        .expect("read response");
    String::from_utf8_lossy(&out).into_owned()
}

/// `GET path` with a Host header.
pub async fn get(addr: SocketAddr, path: &str) -> String {
    send_raw(
        addr,
        format!("GET {path} HTTP/1.1\r\nHost: test.local\r\n\r\n").as_bytes(),
    )
    .await
}

/// Split a raw response into its head and body.
pub fn split_response(raw: &str) -> (&str, &str) {
    raw.split_once("\r\n\r\n").expect("response has a head")
}

/// Reassemble a chunked body, checking the terminating chunk.
pub fn decode_chunked(mut body: &str) -> String {
    let mut out = String::new();
    loop {
        let (size, rest) = body.split_once("\r\n").expect("chunk size line");
        let size = usize::from_str_radix(size, 16).expect("hex chunk size");
        if size == 0 {
            assert_eq!(rest, "\r\n", "trailer after last chunk");
            return out;
        }
        out.push_str(&rest[..size]);
        assert_eq!(&rest[size..size + 2], "\r\n");
        body = &rest[size + 2..];
    }
}
