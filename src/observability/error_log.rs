//! Persistent failure log in YAML.
//!
//! # Responsibilities
//! - Collect one entry per failure: timestamp, context lines, the error
//!   chain as a literal block
//! - Append each entry as its own YAML document (`---` … `...`)
//! - Keep the file under a size limit
//!
//! # Design Decisions
//! - Entries are buffered and written in one go on close, so a partial
//!   entry never reaches the file
//! - When an entry would push the file past the limit, the file is
//!   truncated and the entry starts it afresh
//! - Dropping an open entry closes it

use std::error::Error;
use std::fs::{self, OpenOptions};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

const BLOCK_INDENT: &str = "    ";

/// A size-limited YAML log file.
#[derive(Debug, Clone)]
pub struct ErrorLog {
    path: PathBuf,
    limit: u64,
}

impl ErrorLog {
    pub fn new(path: impl Into<PathBuf>, limit: u64) -> Self {
        Self {
            path: path.into(),
            limit,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open a new entry stamped with the current time.
    pub fn entry(&self) -> LogEntry<'_> {
        let mut buffer = String::from("---\n");
        buffer.push_str(&format!("Time: {}\n", httpdate::fmt_http_date(SystemTime::now())));
        LogEntry {
            log: self,
            buffer,
            closed: false,
        }
    }

    fn append(&self, entry: &str) -> io::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&self.path)?;
        let size = file.seek(SeekFrom::End(0))?;
        if size + entry.len() as u64 > self.limit {
            tracing::debug!(path = %self.path.display(), size, "Error log full, wrapping");
            file.set_len(0)?;
            file.seek(SeekFrom::Start(0))?;
        }
        file.write_all(entry.as_bytes())?;
        file.flush()
    }
}

/// One YAML document being assembled.
pub struct LogEntry<'a> {
    log: &'a ErrorLog,
    buffer: String,
    closed: bool,
}

impl LogEntry<'_> {
    /// Add a line of context; a newline is appended when missing.
    pub fn write_line(&mut self, text: &str) -> &mut Self {
        self.buffer.push_str(text);
        if !text.ends_with('\n') {
            self.buffer.push('\n');
        }
        self
    }

    /// Add the error and its source chain as a `Failure` literal block.
    pub fn write_failure(&mut self, error: &dyn Error) -> &mut Self {
        self.buffer.push_str("Failure: |\n");
        self.push_block(&error.to_string());
        let mut source = error.source();
        while let Some(cause) = source {
            self.push_block(&format!("caused by: {cause}"));
            source = cause.source();
        }
        self
    }

    fn push_block(&mut self, text: &str) {
        for line in text.lines() {
            self.buffer.push_str(BLOCK_INDENT);
            self.buffer.push_str(line);
            self.buffer.push('\n');
        }
    }

    /// Terminate the document and write it out.
    pub fn close(mut self) -> io::Result<()> {
        self.finish()
    }

    fn finish(&mut self) -> io::Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.buffer.push_str("...\n");
        self.log.append(&self.buffer)
    }
}

impl Drop for LogEntry<'_> {
    fn drop(&mut self) {
        if let Err(err) = self.finish() {
            tracing::warn!(path = %self.log.path.display(), error = %err, "Failed to write error log entry");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("handler failed")]
    struct Outer(#[source] io::Error);

    #[test]
    fn entry_is_a_yaml_document() {
        let dir = tempfile::tempdir().unwrap();
        let log = ErrorLog::new(dir.path().join("logs/server.yaml"), 4096);

        let mut entry = log.entry();
        entry.write_line("phase: responding");
        entry.write_failure(&Outer(io::Error::other("disk\nfull")));
        entry.close().unwrap();

        let text = fs::read_to_string(log.path()).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[0], "---");
        assert!(lines[1].starts_with("Time: "));
        assert_eq!(
            &lines[2..],
            [
                "phase: responding",
                "Failure: |",
                "    handler failed",
                "    caused by: disk",
                "    full",
                "...",
            ]
        );
    }

    #[test]
    fn dropped_entry_is_written() {
        let dir = tempfile::tempdir().unwrap();
        let log = ErrorLog::new(dir.path().join("server.yaml"), 4096);
        {
            let mut entry = log.entry();
            entry.write_line("dropped: true");
        }
        let text = fs::read_to_string(log.path()).unwrap();
        assert!(text.contains("dropped: true\n...\n"));
    }

    #[test]
    fn entries_append_then_wrap() {
        let dir = tempfile::tempdir().unwrap();
        let log = ErrorLog::new(dir.path().join("server.yaml"), 200);

        for n in 1..=3 {
            log.entry().write_line(&format!("n: {n}"));
        }
        let text = fs::read_to_string(log.path()).unwrap();
        assert_eq!(text.matches("---\n").count(), 3);
        let before = text.len();

        let big = "x".repeat(60);
        log.entry().write_line(&big);
        let text = fs::read_to_string(log.path()).unwrap();
        assert!(text.len() < before);
        assert!(text.starts_with("---\n"));
        assert!(text.ends_with("...\n"));
        assert_eq!(text.matches("---\n").count(), 1);
        assert_eq!(text.matches("...\n").count(), 1);
        assert!(text.contains(&big));
        assert!(!text.contains("n: 3"));
    }
}
