//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the server.
//! All types derive Serde traits for deserialization from config files.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::http::ReadLimits;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket and request limits.
    pub listener: ListenerConfig,

    /// Where page templates live.
    pub templates: TemplateConfig,

    /// Static file serving.
    pub static_files: StaticFilesConfig,

    /// Logging and the error log.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:80").
    pub bind_address: String,

    /// Pending connection queue length.
    pub backlog: u32,

    /// Give up waiting for a client after this long and loop again.
    pub accept_timeout_secs: Option<u64>,

    /// Drop a connection whose request does not arrive in time.
    pub read_timeout_secs: Option<u64>,

    pub max_line_bytes: usize,
    pub max_header_lines: usize,
    pub max_body_bytes: usize,
}

impl ListenerConfig {
    pub fn accept_timeout(&self) -> Option<Duration> {
        self.accept_timeout_secs.map(Duration::from_secs)
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout_secs.map(Duration::from_secs)
    }

    pub fn read_limits(&self) -> ReadLimits {
        ReadLimits {
            max_line_bytes: self.max_line_bytes,
            max_header_lines: self.max_header_lines,
            max_body_bytes: self.max_body_bytes,
        }
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        let limits = ReadLimits::default();
        Self {
            bind_address: "0.0.0.0:80".to_string(),
            backlog: 5,
            accept_timeout_secs: None,
            read_timeout_secs: Some(10),
            max_line_bytes: limits.max_line_bytes,
            max_header_lines: limits.max_header_lines,
            max_body_bytes: limits.max_body_bytes,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TemplateConfig {
    pub dir: PathBuf,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("templates"),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StaticFilesConfig {
    /// Directory served under `/static/`.
    pub dir: PathBuf,

    /// Bytes per chunk when streaming a file.
    pub chunk_size: usize,
}

impl Default for StaticFilesConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("html"),
            chunk_size: 64,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// YAML failure log; disabled when unset.
    pub error_log_path: Option<PathBuf>,

    /// The error log wraps to its start once it would grow past this.
    pub error_log_limit: u64,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            error_log_path: Some(PathBuf::from("logs/server.yaml")),
            error_log_limit: 1024 * 1024,
        }
    }
}
