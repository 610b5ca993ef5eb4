// crates/gamestat-config/src/config.rs
// ============================================================================
// Module: Gamestat Config
// Description: TOML configuration for databases, embedded store and logging.
// Purpose: Load, validate and wire the DDL runtime from one config file.
// Dependencies: gamestat-core, gamestat-store-sqlite, serde, thiserror, toml
// ============================================================================

//! ## Overview
//! [`GamestatConfig::load`] resolves the config path (explicit argument, then
//! `GAMESTAT_CONFIG`, then `gamestat.toml`), enforces path and size limits,
//! parses TOML and validates the result. Loading fails closed: unknown keys,
//! missing databases and malformed names are all errors.
//!
//! The loaded config is the credential source for the runtime: it answers
//! `(logical database, attribute)` lookups for connections and load
//! commands.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::env;
use std::fmt;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use gamestat_core::Ddl;
use gamestat_core::LogicalDb;
use gamestat_core::core::validate_identifier;
use gamestat_core::interfaces::CredentialField;
use gamestat_core::interfaces::CredentialSource;
use gamestat_core::runtime::DdlLogSink;
use gamestat_core::runtime::FileLogSink;
use gamestat_core::runtime::NoopLogSink;
use gamestat_core::runtime::SchemaRegistry;
use gamestat_core::runtime::StderrLogSink;
use gamestat_core::runtime::is_shell_safe;
use gamestat_store_sqlite::SqliteBackendConfig;
use gamestat_store_sqlite::SqliteConnectionFactory;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default config filename.
const DEFAULT_CONFIG_NAME: &str = "gamestat.toml";
/// Environment variable override for config path.
const CONFIG_ENV_VAR: &str = "GAMESTAT_CONFIG";
/// Maximum allowed config file size in bytes.
const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum total path length for config-related paths.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Gamestat configuration file.
///
/// # Invariants
/// - After [`GamestatConfig::validate`], every [`LogicalDb`] has an entry in
///   `databases`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GamestatConfig {
    /// Connection settings per logical database.
    #[serde(default)]
    pub databases: BTreeMap<LogicalDb, DatabaseConfig>,
    /// Embedded `SQLite` backend settings.
    #[serde(default)]
    pub sqlite: SqliteBackendConfig,
    /// Event log settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Connection settings for one logical database.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Server host.
    pub host: String,
    /// Login user.
    pub user: String,
    /// Login password; empty means none.
    #[serde(default)]
    pub password: String,
    /// Physical database name.
    pub db: String,
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("host", &self.host)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("db", &self.db)
            .finish()
    }
}

/// Event log sink selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogSinkKind {
    /// JSON lines on stderr.
    #[default]
    Stderr,
    /// JSON lines appended to `logging.path`.
    File,
    /// Discard events.
    None,
}

/// Event log configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Sink kind.
    #[serde(default)]
    pub sink: LogSinkKind,
    /// Log file path, required for the file sink.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Config errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O error.
    #[error("config io error: {0}")]
    Io(String),
    /// Parse error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration.
    #[error("config invalid: {0}")]
    Invalid(String),
    /// Backend wiring error.
    #[error("config storage error: {0}")]
    Storage(String),
}

// ============================================================================
// SECTION: Loading
// ============================================================================

impl GamestatConfig {
    /// Loads configuration from disk.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::from_toml(content)
    }

    /// Parses and validates configuration text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for database in LogicalDb::ALL {
            let Some(entry) = self.databases.get(&database) else {
                return Err(ConfigError::Invalid(format!("databases.{database} is required")));
            };
            entry.validate(database)?;
        }
        self.sqlite.validate().map_err(|err| ConfigError::Invalid(err.to_string()))?;
        match (self.logging.sink, &self.logging.path) {
            (LogSinkKind::File, None) => {
                return Err(ConfigError::Invalid("file log sink requires logging.path".to_string()));
            }
            (_, Some(path)) => validate_path(path)?,
            (_, None) => {}
        }
        Ok(())
    }

    /// Builds the configured event sink.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] when the log file cannot be opened.
    pub fn build_log_sink(&self) -> Result<Arc<dyn DdlLogSink>, ConfigError> {
        let sink: Arc<dyn DdlLogSink> = match (self.logging.sink, &self.logging.path) {
            (LogSinkKind::Stderr, _) => Arc::new(StderrLogSink),
            (LogSinkKind::None, _) => Arc::new(NoopLogSink),
            (LogSinkKind::File, Some(path)) => {
                Arc::new(FileLogSink::new(path).map_err(|err| ConfigError::Io(err.to_string()))?)
            }
            (LogSinkKind::File, None) => {
                return Err(ConfigError::Invalid("file log sink requires logging.path".to_string()));
            }
        };
        Ok(sink)
    }

    /// Builds the embedded `SQLite` connection factory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Storage`] when the backend settings are invalid.
    pub fn connection_factory(&self) -> Result<SqliteConnectionFactory, ConfigError> {
        SqliteConnectionFactory::new(self.sqlite.clone())
            .map_err(|err| ConfigError::Storage(err.to_string()))
    }

    /// Wires a [`Ddl`] handle over `registry` using the embedded backend.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the sink or backend cannot be built.
    pub fn build_ddl(&self, registry: Arc<SchemaRegistry>) -> Result<Ddl, ConfigError> {
        let sink = self.build_log_sink()?;
        let factory = Arc::new(self.connection_factory()?);
        Ok(Ddl::new(registry, factory, Arc::new(self.clone()), sink))
    }
}

impl DatabaseConfig {
    /// Validates one database entry.
    fn validate(&self, database: LogicalDb) -> Result<(), ConfigError> {
        let prefix = format!("databases.{database}");
        if self.host.trim().is_empty() {
            return Err(ConfigError::Invalid(format!("{prefix}.host must not be empty")));
        }
        if !is_shell_safe(&self.user) {
            return Err(ConfigError::Invalid(format!(
                "{prefix}.user must be non-empty and free of shell metacharacters"
            )));
        }
        validate_identifier("database", &self.db)
            .map_err(|err| ConfigError::Invalid(format!("{prefix}: {err}")))?;
        Ok(())
    }
}

impl CredentialSource for GamestatConfig {
    fn credential(&self, database: LogicalDb, field: CredentialField) -> Option<String> {
        let entry = self.databases.get(&database)?;
        let value = match field {
            CredentialField::Host => &entry.host,
            CredentialField::User => &entry.user,
            CredentialField::Password => &entry.password,
            CredentialField::Db => &entry.db,
        };
        Some(value.clone())
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from explicit input or environment.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates a path's total length and component lengths.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}
