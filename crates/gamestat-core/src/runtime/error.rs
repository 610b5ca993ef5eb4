// crates/gamestat-core/src/runtime/error.rs
// ============================================================================
// Module: DDL Runtime Errors
// Description: Error taxonomy surfaced to callers of the DDL runtime.
// Purpose: Separate fatal conditions from log-and-continue conditions.
// Dependencies: crate::{core, interfaces}, thiserror
// ============================================================================

//! ## Overview
//! Only conditions the caller must act on become a [`DdlError`]: unknown
//! tables, unsafe identifiers, missing credentials, unreachable databases and
//! failed table creation. Failed insert/update/delete statements are logged
//! and swallowed instead; see [`crate::runtime::log`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::core::IdentifierError;
use crate::core::LogicalDb;
use crate::interfaces::ConnectionError;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// DDL runtime errors.
///
/// # Invariants
/// - Messages never include credential values.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DdlError {
    /// No schema is registered under the logical table name.
    #[error("unknown table: {0}")]
    UnknownTable(String),
    /// An identifier cannot be spliced into SQL safely.
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(#[from] IdentifierError),
    /// A credential attribute is not configured for the logical database.
    #[error("missing credential {field} for database {database}")]
    MissingCredential {
        /// Logical database being connected.
        database: LogicalDb,
        /// Missing attribute label.
        field: &'static str,
    },
    /// Connection construction or statement execution failed fatally.
    #[error("database {database}: {source}")]
    Connection {
        /// Logical database involved.
        database: LogicalDb,
        /// Underlying connection error.
        source: ConnectionError,
    },
    /// Table creation failed.
    #[error("create table {table} failed: {message}")]
    CreateTable {
        /// Physical table name.
        table: String,
        /// Backend error message.
        message: String,
    },
    /// Bulk-load command inputs are malformed.
    #[error("invalid load command: {0}")]
    InvalidLoadCommand(String),
    /// The schema declares no timestamp column and none can be inferred.
    #[error("table {0} has no timestamp column")]
    MissingTimestampColumn(String),
    /// Shared runtime state is unusable (poisoned lock).
    #[error("ddl runtime state error: {0}")]
    State(String),
}

impl DdlError {
    /// Wraps a connection error with the database it came from.
    #[must_use]
    pub const fn connection(database: LogicalDb, source: ConnectionError) -> Self {
        Self::Connection {
            database,
            source,
        }
    }
}
