//! embedded-httpd
//!
//! Serves the pin board application on one thread, one connection at a
//! time.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ─────────────▶ net::listener ─▶ http::reader ─▶ routing::router ─▶ app handler
//!                                                                           │
//!                                                        template::{eager, lazy}
//!                                                                           │
//!     Client Response                                                       ▼
//!     ◀───────────── http::writer (Content-Length | chunked) ◀──── http::response
//!
//!     Cross-cutting: config, lifecycle (shutdown, signals),
//!                    observability (tracing, YAML error log)
//! ```

use std::error::Error;
use std::path::PathBuf;
use std::rc::Rc;

use clap::Parser;

use embedded_httpd::app::{self, AppState};
use embedded_httpd::config::{self, ConfigError, ServerConfig};
use embedded_httpd::http::HttpServer;
use embedded_httpd::lifecycle::{self, Shutdown};
use embedded_httpd::net::Listener;
use embedded_httpd::observability::{logging, ErrorLog};

#[derive(Debug, Parser)]
#[command(name = "embedded-httpd", version, about = "Pin board HTTP server")]
struct Cli {
    /// TOML configuration file; defaults apply when omitted.
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Override `listener.bind_address`.
    #[arg(long)]
    bind: Option<String>,

    /// Override `observability.log_level`.
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => config::load_config(path)?,
        None => ServerConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }
    if let Some(level) = cli.log_level {
        config.observability.log_level = level;
    }
    config::validate_config(&config).map_err(ConfigError::Validation)?;

    logging::init(&config.observability.log_level)?;
    tracing::info!("Starting embedded-httpd v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        backlog = config.listener.backlog,
        templates = %config.templates.dir.display(),
        static_files = %config.static_files.dir.display(),
        "Configuration loaded"
    );

    let router = app::build_router(Rc::new(AppState::new(&config)))?;
    let listener = Listener::bind(&config.listener)?;

    let mut server = HttpServer::new(router, config.listener.clone());
    if let Some(path) = &config.observability.error_log_path {
        server = server.with_error_log(ErrorLog::new(path, config.observability.error_log_limit));
    }

    let shutdown = Shutdown::new();
    tokio::join!(
        server.run(&listener, &shutdown),
        lifecycle::shutdown_on_ctrl_c(shutdown.clone()),
    );

    tracing::info!("Shutdown complete");
    Ok(())
}
