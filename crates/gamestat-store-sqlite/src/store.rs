// crates/gamestat-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Connection Backend
// Description: Connection and ConnectionFactory backed by SQLite.
// Purpose: Run the DDL runtime against embedded SQLite databases.
// Dependencies: gamestat-core, rusqlite, serde, thiserror
// ============================================================================

//! ## Overview
//! Each logical database maps to one `SQLite` file `{root}/{db}.sqlite3`, or
//! to a private in-memory database when no root is configured. A
//! [`SqliteConnection`] serializes statements through a mutex-guarded
//! `rusqlite::Connection`. Creation bodies are translated from the catalog's
//! server dialect by [`crate::translate`]; the existence probe reads
//! `sqlite_master`, so it answers definitively.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use gamestat_core::LogicalDb;
use gamestat_core::Record;
use gamestat_core::Value;
use gamestat_core::core::validate_identifier;
use gamestat_core::interfaces::Connection;
use gamestat_core::interfaces::ConnectionError;
use gamestat_core::interfaces::ConnectionFactory;
use gamestat_core::interfaces::Credentials;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::params_from_iter;
use rusqlite::types::ValueRef;
use serde::Deserialize;
use thiserror::Error;

use crate::translate::translate_create_table;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// File extension of per-database files.
const DATABASE_FILE_EXTENSION: &str = "sqlite3";

// ============================================================================
// SECTION: Config
// ============================================================================

/// `SQLite` journal mode configuration.
///
/// # Invariants
/// - Values map 1:1 to `SQLite` `journal_mode` pragma settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteStoreMode {
    /// WAL journal mode (recommended).
    #[default]
    Wal,
    /// Delete journal mode (legacy).
    Delete,
}

impl SqliteStoreMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// `SQLite` sync mode configuration.
///
/// # Invariants
/// - Values map 1:1 to `SQLite` `synchronous` pragma settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteSyncMode {
    /// Full synchronous mode (safest).
    #[default]
    Full,
    /// Normal synchronous mode (balanced).
    Normal,
}

impl SqliteSyncMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Normal => "normal",
        }
    }
}

/// Configuration for the `SQLite` backend.
///
/// # Invariants
/// - `root`, when set, must be a directory path (it is created on demand).
/// - `busy_timeout_ms` is interpreted as milliseconds and must be non-zero.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SqliteBackendConfig {
    /// Directory holding one file per logical database; `None` keeps every
    /// database in memory.
    #[serde(default)]
    pub root: Option<PathBuf>,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

impl Default for SqliteBackendConfig {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl SqliteBackendConfig {
    /// In-memory databases with default pragmas.
    #[must_use]
    pub const fn in_memory() -> Self {
        Self {
            root: None,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: SqliteStoreMode::Wal,
            sync_mode: SqliteSyncMode::Full,
        }
    }

    /// On-disk databases under `root` with default pragmas.
    #[must_use]
    pub fn on_disk(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
            ..Self::in_memory()
        }
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError::Invalid`] when a value is out of range.
    pub fn validate(&self) -> Result<(), SqliteStoreError> {
        if self.busy_timeout_ms == 0 {
            return Err(SqliteStoreError::Invalid(
                "busy_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if let Some(root) = &self.root {
            validate_store_path(root)?;
            if root.exists() && !root.is_dir() {
                return Err(SqliteStoreError::Invalid(
                    "sqlite root must be a directory".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Returns the database file for physical database `db`, if on disk.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError::Invalid`] when `db` is not a plain name.
    pub fn database_path(&self, db: &str) -> Result<Option<PathBuf>, SqliteStoreError> {
        validate_identifier("database", db)
            .map_err(|err| SqliteStoreError::Invalid(err.to_string()))?;
        let Some(root) = &self.root else {
            return Ok(None);
        };
        let path = root.join(format!("{db}.{DATABASE_FILE_EXTENSION}"));
        validate_store_path(&path)?;
        if path.is_dir() {
            return Err(SqliteStoreError::Invalid(
                "database path must be a file, not a directory".to_string(),
            ));
        }
        Ok(Some(path))
    }
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// `SQLite` backend errors.
///
/// # Invariants
/// - Error messages avoid embedding bound row values.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SqliteStoreError {
    /// Backend I/O error.
    #[error("sqlite store io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite store db error: {0}")]
    Db(String),
    /// Invalid configuration or input.
    #[error("sqlite store invalid data: {0}")]
    Invalid(String),
}

impl From<SqliteStoreError> for ConnectionError {
    fn from(error: SqliteStoreError) -> Self {
        match error {
            SqliteStoreError::Db(message) | SqliteStoreError::Invalid(message) => {
                Self::Statement(message)
            }
            SqliteStoreError::Io(message) => Self::Unavailable(message),
        }
    }
}

// ============================================================================
// SECTION: Connection
// ============================================================================

/// One `SQLite` database used as a logical database.
pub struct SqliteConnection {
    /// Serialized engine handle.
    connection: Mutex<rusqlite::Connection>,
}

impl SqliteConnection {
    /// Opens the database at `path`, or an in-memory one when `None`.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the file cannot be opened or the
    /// pragmas cannot be applied.
    pub fn open(
        path: Option<&Path>,
        config: &SqliteBackendConfig,
    ) -> Result<Self, SqliteStoreError> {
        let connection = match path {
            Some(path) => {
                ensure_parent_dir(path)?;
                let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
                    | OpenFlags::SQLITE_OPEN_CREATE
                    | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
                let connection = rusqlite::Connection::open_with_flags(path, flags)
                    .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
                connection
                    .execute_batch(&format!(
                        "PRAGMA journal_mode = {};",
                        config.journal_mode.pragma_value()
                    ))
                    .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
                connection
            }
            None => rusqlite::Connection::open_in_memory()
                .map_err(|err| SqliteStoreError::Db(err.to_string()))?,
        };
        apply_pragmas(&connection, config)?;
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    /// Opens a private in-memory database.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the database cannot be opened.
    pub fn open_in_memory() -> Result<Self, SqliteStoreError> {
        Self::open(None, &SqliteBackendConfig::in_memory())
    }

    /// Runs `f` with the locked engine handle.
    fn with_connection<T>(
        &self,
        f: impl FnOnce(&rusqlite::Connection) -> rusqlite::Result<T>,
    ) -> Result<T, ConnectionError> {
        let guard = self
            .connection
            .lock()
            .map_err(|_| ConnectionError::Unavailable("sqlite connection mutex poisoned".into()))?;
        f(&guard).map_err(|err| ConnectionError::Statement(err.to_string()))
    }
}

impl Connection for SqliteConnection {
    fn table_exists(&self, table: &str) -> Result<bool, ConnectionError> {
        self.with_connection(|connection| {
            connection
                .query_row(
                    "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
                    [table],
                    |_| Ok(()),
                )
                .optional()
                .map(|found| found.is_some())
        })
    }

    fn create_table(&self, table: &str, create_sql: &str) -> Result<(), ConnectionError> {
        let statement = translate_create_table(table, create_sql)?;
        self.with_connection(|connection| connection.execute_batch(&statement))
    }

    fn execute(&self, sql: &str, params: &[Value]) -> Result<u64, ConnectionError> {
        let affected = self.with_connection(|connection| {
            connection.execute(sql, params_from_iter(params.iter().map(to_sqlite_value)))
        })?;
        Ok(u64::try_from(affected).unwrap_or(u64::MAX))
    }

    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Record>, ConnectionError> {
        self.with_connection(|connection| {
            let mut statement = connection.prepare(sql)?;
            let columns: Vec<String> =
                statement.column_names().into_iter().map(str::to_string).collect();
            let rows = statement.query_map(
                params_from_iter(params.iter().map(to_sqlite_value)),
                |row| {
                    let mut record = Record::new();
                    for (index, column) in columns.iter().enumerate() {
                        record.insert(column.clone(), from_sqlite_value(row.get_ref(index)?));
                    }
                    Ok(record)
                },
            )?;
            rows.collect()
        })
    }
}

// ============================================================================
// SECTION: Factory
// ============================================================================

/// Opens one [`SqliteConnection`] per logical database.
#[derive(Debug, Clone)]
pub struct SqliteConnectionFactory {
    /// Backend configuration.
    config: SqliteBackendConfig,
}

impl SqliteConnectionFactory {
    /// Creates a factory after validating `config`.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError::Invalid`] when the configuration is invalid.
    pub fn new(config: SqliteBackendConfig) -> Result<Self, SqliteStoreError> {
        config.validate()?;
        Ok(Self {
            config,
        })
    }

    /// Factory for private in-memory databases.
    #[must_use]
    pub const fn in_memory() -> Self {
        Self {
            config: SqliteBackendConfig::in_memory(),
        }
    }

    /// Returns the backend configuration.
    #[must_use]
    pub const fn config(&self) -> &SqliteBackendConfig {
        &self.config
    }
}

impl ConnectionFactory for SqliteConnectionFactory {
    fn connect(
        &self,
        database: LogicalDb,
        credentials: &Credentials,
    ) -> Result<Arc<dyn Connection>, ConnectionError> {
        let unavailable =
            |err: SqliteStoreError| ConnectionError::Unavailable(format!("{database}: {err}"));
        let path = self.config.database_path(&credentials.db).map_err(unavailable)?;
        let connection =
            SqliteConnection::open(path.as_deref(), &self.config).map_err(unavailable)?;
        Ok(Arc::new(connection))
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Converts a record value into an owned `SQLite` value.
fn to_sqlite_value(value: &Value) -> rusqlite::types::Value {
    match value {
        Value::Null => rusqlite::types::Value::Null,
        Value::Int(value) => rusqlite::types::Value::Integer(*value),
        Value::Float(value) => rusqlite::types::Value::Real(*value),
        Value::Text(value) => rusqlite::types::Value::Text(value.clone()),
    }
}

/// Converts a column value read from `SQLite` into a record value.
fn from_sqlite_value(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(value) => Value::Int(value),
        ValueRef::Real(value) => Value::Float(value),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            Value::Text(String::from_utf8_lossy(bytes).into_owned())
        }
    }
}

/// Ensures the parent directory for a database file exists.
fn ensure_parent_dir(path: &Path) -> Result<(), SqliteStoreError> {
    let Some(parent) = path.parent() else {
        return Err(SqliteStoreError::Io("database path missing parent directory".to_string()));
    };
    std::fs::create_dir_all(parent).map_err(|err| SqliteStoreError::Io(err.to_string()))
}

/// Validates store paths for safety limits.
fn validate_store_path(path: &Path) -> Result<(), SqliteStoreError> {
    if path.as_os_str().is_empty() {
        return Err(SqliteStoreError::Invalid("store path must not be empty".to_string()));
    }
    let path_string = path.display().to_string();
    if path_string.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(SqliteStoreError::Invalid("store path exceeds length limit".to_string()));
    }
    for component in path.components() {
        let name = component.as_os_str().to_string_lossy();
        if name.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(SqliteStoreError::Invalid(
                "store path contains an overlong component".to_string(),
            ));
        }
    }
    Ok(())
}

/// Applies connection pragmas shared by file and memory databases.
fn apply_pragmas(
    connection: &rusqlite::Connection,
    config: &SqliteBackendConfig,
) -> Result<(), SqliteStoreError> {
    connection
        .execute_batch(&format!("PRAGMA synchronous = {};", config.sync_mode.pragma_value()))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .busy_timeout(Duration::from_millis(config.busy_timeout_ms))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::expect_used,
        clippy::unwrap_used,
        reason = "Test assertions use expect/unwrap for clarity."
    )]

    use gamestat_core::Value;

    use super::SqliteBackendConfig;
    use super::SqliteStoreError;
    use super::from_sqlite_value;
    use super::to_sqlite_value;

    #[test]
    fn database_path_rejects_non_identifier_names() {
        let config = SqliteBackendConfig::on_disk("/tmp/gamestat");
        assert!(matches!(config.database_path("../etc"), Err(SqliteStoreError::Invalid(_))));
        assert_eq!(
            config.database_path("bi_store").unwrap(),
            Some("/tmp/gamestat/bi_store.sqlite3".into())
        );
        assert_eq!(SqliteBackendConfig::in_memory().database_path("bi_store").unwrap(), None);
    }

    #[test]
    fn zero_busy_timeout_is_rejected() {
        let config = SqliteBackendConfig {
            busy_timeout_ms: 0,
            ..SqliteBackendConfig::in_memory()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn values_convert_both_ways() {
        for value in [Value::Null, Value::Int(7), Value::Float(1.5), Value::Text("x".into())] {
            let owned = to_sqlite_value(&value);
            let back = from_sqlite_value(rusqlite::types::ValueRef::from(&owned));
            assert_eq!(back, value);
        }
    }
}
