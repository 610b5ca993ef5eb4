// crates/gamestat-core/src/interfaces/mod.rs
// ============================================================================
// Module: Gamestat Interfaces
// Description: Backend-agnostic contracts for SQL execution and collaborators.
// Purpose: Define the surfaces the DDL runtime consumes from its environment.
// Dependencies: crate::core, thiserror
// ============================================================================

//! ## Overview
//! The DDL runtime never talks to a database driver directly. It executes SQL
//! through a [`Connection`] built by a [`ConnectionFactory`] from credentials
//! supplied by a [`CredentialSource`]. Destructive operations ask a
//! [`Confirmation`] collaborator before running.
//!
//! Statements use `?` positional placeholders and backtick-quoted
//! identifiers; every value is bound, never interpolated.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::core::LogicalDb;
use crate::core::Record;
use crate::core::Value;

// ============================================================================
// SECTION: Connection
// ============================================================================

/// Connection-level errors.
///
/// # Invariants
/// - `Unavailable` is reserved for connect/authentication failures.
/// - `Statement` covers failures of an individual statement.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConnectionError {
    /// The database could not be reached or authenticated against.
    #[error("connection unavailable: {0}")]
    Unavailable(String),
    /// A statement failed to execute.
    #[error("statement failed: {0}")]
    Statement(String),
}

/// Live handle to one logical database.
///
/// Implementations serialize access internally; the runtime shares one
/// connection per logical database across callers.
pub trait Connection: Send + Sync {
    /// Reports whether `table` exists.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError`] when existence cannot be determined.
    fn table_exists(&self, table: &str) -> Result<bool, ConnectionError>;

    /// Issues `CREATE TABLE IF NOT EXISTS` for `table` using a creation DDL
    /// body, rendered in the backend's dialect.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError`] when the statement fails.
    fn create_table(&self, table: &str, create_sql: &str) -> Result<(), ConnectionError>;

    /// Executes a statement and returns the number of affected rows.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError`] when the statement fails.
    fn execute(&self, sql: &str, params: &[Value]) -> Result<u64, ConnectionError>;

    /// Runs a query and returns its rows keyed by column name.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError`] when the query fails.
    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Record>, ConnectionError>;

    /// Runs a query and returns how many rows it produced.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError`] when the query fails.
    fn row_count(&self, sql: &str, params: &[Value]) -> Result<u64, ConnectionError> {
        let rows = self.query(sql, params)?;
        Ok(u64::try_from(rows.len()).unwrap_or(u64::MAX))
    }
}

/// Builds connections for logical databases.
pub trait ConnectionFactory: Send + Sync {
    /// Opens a new connection using resolved credentials.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError::Unavailable`] when the database cannot be
    /// reached or authenticated against.
    fn connect(
        &self,
        database: LogicalDb,
        credentials: &Credentials,
    ) -> Result<Arc<dyn Connection>, ConnectionError>;
}

// ============================================================================
// SECTION: Credentials
// ============================================================================

/// Credential attribute looked up per logical database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CredentialField {
    /// Server host.
    Host,
    /// Login user.
    User,
    /// Login password (may be empty).
    Password,
    /// Physical database name.
    Db,
}

impl CredentialField {
    /// Returns the stable attribute label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Host => "host",
            Self::User => "user",
            Self::Password => "password",
            Self::Db => "db",
        }
    }
}

/// External credential lookup: `(logical database, attribute) -> value`.
pub trait CredentialSource: Send + Sync {
    /// Returns the attribute value, or `None` when it is not configured.
    fn credential(&self, database: LogicalDb, field: CredentialField) -> Option<String>;
}

/// Resolved credentials for one logical database.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Server host.
    pub host: String,
    /// Login user.
    pub user: String,
    /// Login password (empty when none).
    pub password: String,
    /// Physical database name.
    pub db: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("host", &self.host)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("db", &self.db)
            .finish()
    }
}

/// In-memory credential table, for embedding and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials {
    /// Credentials keyed by logical database.
    entries: BTreeMap<LogicalDb, Credentials>,
}

impl StaticCredentials {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the credentials for `database`.
    #[must_use]
    pub fn with(mut self, database: LogicalDb, credentials: Credentials) -> Self {
        self.entries.insert(database, credentials);
        self
    }
}

impl CredentialSource for StaticCredentials {
    fn credential(&self, database: LogicalDb, field: CredentialField) -> Option<String> {
        let entry = self.entries.get(&database)?;
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
// SECTION: Confirmation
// ============================================================================

/// Collaborator consulted before destructive operations run.
pub trait Confirmation {
    /// Returns true when the described operation may proceed.
    fn confirm(&self, prompt: &str) -> bool;
}

/// Confirmation granted up front (for example an explicit `--yes` flag).
pub struct Confirmed;

impl Confirmation for Confirmed {
    fn confirm(&self, _prompt: &str) -> bool {
        true
    }
}

/// Confirmation that always declines.
pub struct Declined;

impl Confirmation for Declined {
    fn confirm(&self, _prompt: &str) -> bool {
        false
    }
}
