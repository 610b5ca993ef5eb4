// crates/gamestat-core/src/core/identifiers.rs
// ============================================================================
// Module: Gamestat Identifiers
// Description: Tenant, shard-date and logical database identifiers.
// Purpose: Provide strongly typed identifiers that are safe to splice into SQL.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! Physical table names are built from identifiers supplied by the calling
//! pipeline (tenant ids, shard dates) and from declared schema names. SQL
//! identifiers cannot be bound as statement parameters, so every identifier
//! is checked against a conservative character set before it reaches SQL
//! text. Values are still bound through placeholders; see
//! [`crate::core::record`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum identifier length accepted for any SQL name component.
pub const MAX_IDENTIFIER_LENGTH: usize = 64;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Identifier validation errors.
///
/// # Invariants
/// - `kind` names the identifier role (`tenant`, `table`, `column`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentifierError {
    /// Identifier is empty.
    #[error("{kind} identifier must not be empty")]
    Empty {
        /// Identifier role.
        kind: &'static str,
    },
    /// Identifier is longer than [`MAX_IDENTIFIER_LENGTH`].
    #[error("{kind} identifier exceeds {MAX_IDENTIFIER_LENGTH} characters: {value}")]
    TooLong {
        /// Identifier role.
        kind: &'static str,
        /// Offending value.
        value: String,
    },
    /// Identifier contains a character outside `[A-Za-z0-9_]`.
    #[error("{kind} identifier contains invalid characters: {value}")]
    InvalidCharacters {
        /// Identifier role.
        kind: &'static str,
        /// Offending value.
        value: String,
    },
}

/// Checks that `value` only uses `[A-Za-z0-9_]` and fits the length limit.
///
/// # Errors
///
/// Returns [`IdentifierError`] when the value is empty, too long, or contains
/// characters that would need quoting.
pub fn validate_identifier(kind: &'static str, value: &str) -> Result<(), IdentifierError> {
    if value.is_empty() {
        return Err(IdentifierError::Empty {
            kind,
        });
    }
    if value.len() > MAX_IDENTIFIER_LENGTH {
        return Err(IdentifierError::TooLong {
            kind,
            value: value.to_string(),
        });
    }
    if !value.bytes().all(|byte| byte.is_ascii_alphanumeric() || byte == b'_') {
        return Err(IdentifierError::InvalidCharacters {
            kind,
            value: value.to_string(),
        });
    }
    Ok(())
}

// ============================================================================
// SECTION: Identifier Types
// ============================================================================

/// Tenant (game) identifier used to shard tables.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(String);

impl TenantId {
    /// Creates a new tenant identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Validates the identifier for use inside a table name.
    ///
    /// # Errors
    ///
    /// Returns [`IdentifierError`] when the tenant id is not a plain identifier.
    pub fn validate(&self) -> Result<(), IdentifierError> {
        validate_identifier("tenant", &self.0)
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for TenantId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for TenantId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Date suffix for per-day shard tables (for example `20240101`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShardDate(String);

impl ShardDate {
    /// Creates a new shard date.
    #[must_use]
    pub fn new(date: impl Into<String>) -> Self {
        Self(date.into())
    }

    /// Returns the date as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Validates the date for use inside a table name.
    ///
    /// # Errors
    ///
    /// Returns [`IdentifierError`] when the date is not a plain identifier.
    pub fn validate(&self) -> Result<(), IdentifierError> {
        validate_identifier("date", &self.0)
    }
}

impl fmt::Display for ShardDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for ShardDate {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ShardDate {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Logical database a schema lives in.
///
/// # Invariants
/// - The set is closed; credentials are looked up per variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogicalDb {
    /// Raw ingestion store (per-tenant tables).
    Store,
    /// Aggregated analysis store (merge tables).
    Analyse,
}

impl LogicalDb {
    /// All logical databases, in declaration order.
    pub const ALL: [Self; 2] = [Self::Store, Self::Analyse];

    /// Returns the stable label for the database.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Store => "store",
            Self::Analyse => "analyse",
        }
    }
}

impl fmt::Display for LogicalDb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogicalDb {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "store" => Ok(Self::Store),
            "analyse" => Ok(Self::Analyse),
            other => Err(format!("unknown logical database: {other}")),
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::IdentifierError;
    use super::LogicalDb;
    use super::TenantId;
    use super::validate_identifier;

    #[test]
    fn plain_identifiers_pass() {
        assert_eq!(validate_identifier("table", "props_get_day"), Ok(()));
        assert_eq!(TenantId::new("2100007").validate(), Ok(()));
    }

    #[test]
    fn quoting_characters_are_rejected() {
        let result = validate_identifier("tenant", "42`; drop table x");
        assert!(matches!(result, Err(IdentifierError::InvalidCharacters { kind: "tenant", .. })));
        assert!(matches!(validate_identifier("date", ""), Err(IdentifierError::Empty { .. })));
    }

    #[test]
    fn logical_db_labels_round_trip() {
        for db in LogicalDb::ALL {
            assert_eq!(db.as_str().parse::<LogicalDb>(), Ok(db));
        }
        assert!("warehouse".parse::<LogicalDb>().is_err());
    }
}
