//! Per-invocation trace of a workflow operation.
//!
//! The reporter is owned by the engine and passed explicitly; it is reset
//! when an operation begins and flushed when it ends, whatever the outcome.
//! Every entry is also emitted as a `tracing` event.

use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::Result;

/// Severity of a trace entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TraceLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// One line of the trace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TraceEntry {
    /// When the entry was recorded.
    pub at: DateTime<Utc>,
    /// Severity.
    pub level: TraceLevel,
    /// Operation that was running, e.g. `release-finish`.
    pub operation: String,
    /// Message.
    pub message: String,
}

/// Append-only trace buffer for one operation.
#[derive(Debug, Default)]
pub struct Reporter {
    operation: String,
    entries: Vec<TraceEntry>,
    log_file: Option<PathBuf>,
}

impl Reporter {
    /// A reporter that only emits `tracing` events.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A reporter that also appends each flushed trace to `path` as JSON lines.
    #[must_use]
    pub fn with_log_file(path: impl Into<PathBuf>) -> Self {
        Self {
            log_file: Some(path.into()),
            ..Self::default()
        }
    }

    /// Reset the buffer for a new top-level operation.
    pub fn begin(&mut self, operation: &str) {
        self.operation = operation.to_string();
        self.entries.clear();
        self.info(format!("begin {operation}"));
    }

    /// Operation the current trace belongs to.
    #[must_use]
    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Entries recorded since [`Reporter::begin`].
    #[must_use]
    pub fn entries(&self) -> &[TraceEntry] {
        &self.entries
    }

    /// Entries at or above `level`.
    pub fn at_least(&self, level: TraceLevel) -> impl Iterator<Item = &TraceEntry> {
        self.entries.iter().filter(move |e| e.level >= level)
    }

    pub fn debug(&mut self, message: impl Into<String>) {
        self.record(TraceLevel::Debug, message.into());
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.record(TraceLevel::Info, message.into());
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.record(TraceLevel::Warn, message.into());
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.record(TraceLevel::Error, message.into());
    }

    fn record(&mut self, level: TraceLevel, message: String) {
        let operation = self.operation.as_str();
        match level {
            TraceLevel::Debug => tracing::debug!(operation, "{message}"),
            TraceLevel::Info => tracing::info!(operation, "{message}"),
            TraceLevel::Warn => tracing::warn!(operation, "{message}"),
            TraceLevel::Error => tracing::error!(operation, "{message}"),
        }

        self.entries.push(TraceEntry {
            at: Utc::now(),
            level,
            operation: self.operation.clone(),
            message,
        });
    }

    /// Write the buffered trace out. Returns the number of entries written;
    /// zero when no log file is configured.
    ///
    /// The buffer is kept so callers can still inspect it after the flush.
    ///
    /// # Errors
    /// Returns error if the log file cannot be written.
    pub fn flush(&self) -> Result<usize> {
        let Some(path) = &self.log_file else {
            return Ok(0);
        };
        write_json_lines(path, &self.entries)?;
        Ok(self.entries.len())
    }
}

fn write_json_lines(path: &Path, entries: &[TraceEntry]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut out = BufWriter::new(file);
    for entry in entries {
        serde_json::to_writer(&mut out, entry)?;
        out.write_all(b"\n")?;
    }
    out.flush()?;
    Ok(())
}
