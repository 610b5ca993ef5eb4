// crates/gamestat-core/src/runtime/log.rs
// ============================================================================
// Module: DDL Event Log
// Description: Structured events emitted by the DDL runtime.
// Purpose: Report log-and-continue conditions without hard dependencies.
// Dependencies: crate::core, serde, serde_json
// ============================================================================

//! ## Overview
//! The runtime never aborts on conditions designed as "log and continue"
//! (duplicate registration, failed insert/update/delete statements, ambiguous
//! table probes). Those conditions are reported as [`DdlLogEvent`]s through a
//! [`DdlLogSink`]. Sinks write JSON lines so deployments can route events to
//! their preferred logging pipeline.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;

use crate::core::LogicalDb;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Event severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    /// Informational progress.
    Info,
    /// Recoverable anomaly.
    Warning,
    /// Failed operation that was swallowed or reported to the caller.
    Error,
}

/// Structured DDL runtime event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DdlLogEvent {
    /// Stable event label (for example `table_created`).
    pub event: &'static str,
    /// Event severity.
    pub level: LogLevel,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Physical or logical table involved, if any.
    pub table: Option<String>,
    /// Logical database involved, if any.
    pub database: Option<LogicalDb>,
    /// Human readable description.
    pub message: String,
    /// Full statement text with parameters rendered, when relevant.
    pub sql: Option<String>,
}

impl DdlLogEvent {
    /// Creates an event stamped with the current time.
    #[must_use]
    pub fn new(level: LogLevel, event: &'static str, message: impl Into<String>) -> Self {
        let timestamp_ms =
            SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
        Self {
            event,
            level,
            timestamp_ms,
            table: None,
            database: None,
            message: message.into(),
            sql: None,
        }
    }

    /// Shorthand for an info event.
    #[must_use]
    pub fn info(event: &'static str, message: impl Into<String>) -> Self {
        Self::new(LogLevel::Info, event, message)
    }

    /// Shorthand for a warning event.
    #[must_use]
    pub fn warning(event: &'static str, message: impl Into<String>) -> Self {
        Self::new(LogLevel::Warning, event, message)
    }

    /// Shorthand for an error event.
    #[must_use]
    pub fn error(event: &'static str, message: impl Into<String>) -> Self {
        Self::new(LogLevel::Error, event, message)
    }

    /// Attaches the table name.
    #[must_use]
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    /// Attaches the logical database.
    #[must_use]
    pub const fn with_database(mut self, database: LogicalDb) -> Self {
        self.database = Some(database);
        self
    }

    /// Attaches the statement text.
    #[must_use]
    pub fn with_sql(mut self, sql: impl Into<String>) -> Self {
        self.sql = Some(sql.into());
        self
    }
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Sink for DDL runtime events.
pub trait DdlLogSink: Send + Sync {
    /// Record an event.
    fn record(&self, event: &DdlLogEvent);
}

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Sink that logs JSON lines to stderr.
pub struct StderrLogSink;

impl DdlLogSink for StderrLogSink {
    fn record(&self, event: &DdlLogEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// Sink that appends JSON lines to a file.
pub struct FileLogSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileLogSink {
    /// Opens the log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl DdlLogSink for FileLogSink {
    fn record(&self, event: &DdlLogEvent) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

/// Sink that keeps events in memory for inspection.
#[derive(Default)]
pub struct MemoryLogSink {
    /// Captured events in arrival order.
    events: Mutex<Vec<DdlLogEvent>>,
}

impl MemoryLogSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of all captured events.
    #[must_use]
    pub fn events(&self) -> Vec<DdlLogEvent> {
        self.events.lock().map(|events| events.clone()).unwrap_or_default()
    }

    /// Returns captured events with the given label.
    #[must_use]
    pub fn events_named(&self, event: &str) -> Vec<DdlLogEvent> {
        self.events().into_iter().filter(|captured| captured.event == event).collect()
    }
}

impl DdlLogSink for MemoryLogSink {
    fn record(&self, event: &DdlLogEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

/// No-op sink.
pub struct NoopLogSink;

impl DdlLogSink for NoopLogSink {
    fn record(&self, _event: &DdlLogEvent) {}
}

// ============================================================================
// SECTION: Tests
// ============================================================================
