// crates/gamestat-core/src/core/schema.rs
// ============================================================================
// Module: Gamestat Schema Definitions
// Description: Declarative logical table definitions and field extraction.
// Purpose: Describe one logical table and derive its insertable column order.
// Dependencies: crate::core::{identifiers, record}
// ============================================================================

//! ## Overview
//! A [`SchemaDefinition`] couples a logical table name with the body of its
//! creation DDL (everything after `CREATE TABLE name (`). The insertable field
//! list is derived from that body once, at construction, by
//! [`extract_fields`]; the derived order is the column order used by the
//! insert path and by generated bulk-load commands.
//!
//! Two flavours exist, mirroring how the ingestion pipeline stores data:
//! per-tenant "model" tables in the `store` database and unsharded "merge"
//! tables in the `analyse` database.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use crate::core::identifiers::IdentifierError;
use crate::core::identifiers::LogicalDb;
use crate::core::identifiers::validate_identifier;
use crate::core::record::Record;
use crate::core::record::Value;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Column holding the tenant id in unsharded tables.
pub const DEFAULT_TENANT_COLUMN: &str = "gameid";

/// Column suffix used to infer a timestamp column when none is declared.
const TIMESTAMP_SUFFIX: &str = "_time";

/// Attribute tokens identifying surrogate auto-increment columns
/// (case-insensitive).
const AUTO_INCREMENT_MARKERS: [&str; 2] = ["AUTO_INCREMENT", "AUTOINCREMENT"];

// ============================================================================
// SECTION: Field Extraction
// ============================================================================

/// Derives the ordered insertable column names from a creation DDL body.
///
/// A line is a column definition when, after trimming, it starts with a
/// backtick-quoted identifier. Columns carrying an auto-increment attribute
/// are skipped so surrogate keys never appear in the insertable list.
/// Malformed lines are ignored; a malformed body yields an empty list.
#[must_use]
pub fn extract_fields(create_sql: &str) -> Vec<String> {
    create_sql
        .lines()
        .map(str::trim)
        .filter(|line| line.starts_with('`'))
        .filter(|line| !is_auto_increment_column(line))
        .filter_map(|line| line[1 ..].split_once('`').map(|(name, _)| name))
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

/// Returns true when a column definition line declares an auto-increment
/// attribute.
///
/// Only bare attribute tokens count; a marker inside a quoted `COMMENT` or
/// `DEFAULT` literal, or inside the quoted column name, does not.
#[must_use]
pub fn is_auto_increment_column(line: &str) -> bool {
    definition_tokens(line).iter().any(|token| {
        let token = token.trim_end_matches(',');
        AUTO_INCREMENT_MARKERS.iter().any(|marker| token.eq_ignore_ascii_case(marker))
    })
}

/// Splits a definition line on whitespace, keeping single-quoted literals
/// (with `''` escapes) as one token.
#[must_use]
pub fn definition_tokens(line: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quote = false;
    let mut chars = line.chars().peekable();
    while let Some(ch) = chars.next() {
        if in_quote {
            current.push(ch);
            if ch == '\'' {
                if chars.peek() == Some(&'\'') {
                    current.push('\'');
                    chars.next();
                } else {
                    in_quote = false;
                }
            }
        } else if ch == '\'' {
            in_quote = true;
            current.push(ch);
        } else if ch.is_whitespace() {
            if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
        } else {
            current.push(ch);
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

// ============================================================================
// SECTION: Schema Definition
// ============================================================================

/// Declarative description of one logical table.
///
/// # Invariants
/// - `fields` is derived from `create_sql` and never edited afterwards.
/// - `name` is unique within a [`crate::runtime::SchemaRegistry`].
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaDefinition {
    /// Logical table name.
    name: String,
    /// Creation DDL body (column definitions, keys, closing parenthesis).
    create_sql: String,
    /// Insertable columns in declaration order.
    fields: Vec<String>,
    /// Default logical database.
    database: LogicalDb,
    /// Whether physical names are prefixed by a tenant id.
    tenant_sharded: bool,
    /// Tenant column used by the unsharded delete path.
    tenant_column: String,
    /// Explicit timestamp column, if declared.
    timestamp_column: Option<String>,
    /// Per-field defaults consulted before the `0` fallback.
    defaults: BTreeMap<String, Value>,
    /// First-generation legacy log-table name.
    legacy_v1: Option<String>,
    /// Second-generation legacy log-table name.
    legacy_v2: Option<String>,
}

impl SchemaDefinition {
    /// Declares a per-tenant table stored in the `store` database.
    #[must_use]
    pub fn model(name: impl Into<String>, create_sql: impl Into<String>) -> Self {
        Self::build(name.into(), create_sql.into(), LogicalDb::Store, true)
    }

    /// Declares an unsharded aggregate table stored in the `analyse` database.
    #[must_use]
    pub fn merge(name: impl Into<String>, create_sql: impl Into<String>) -> Self {
        Self::build(name.into(), create_sql.into(), LogicalDb::Analyse, false)
    }

    /// Shared constructor; derives the field list.
    fn build(name: String, create_sql: String, database: LogicalDb, tenant_sharded: bool) -> Self {
        let fields = extract_fields(&create_sql);
        Self {
            name,
            create_sql,
            fields,
            database,
            tenant_sharded,
            tenant_column: DEFAULT_TENANT_COLUMN.to_string(),
            timestamp_column: None,
            defaults: BTreeMap::new(),
            legacy_v1: None,
            legacy_v2: None,
        }
    }

    /// Overrides the default logical database.
    #[must_use]
    pub const fn with_database(mut self, database: LogicalDb) -> Self {
        self.database = database;
        self
    }

    /// Overrides the tenant column used by the delete path.
    #[must_use]
    pub fn with_tenant_column(mut self, column: impl Into<String>) -> Self {
        self.tenant_column = column.into();
        self
    }

    /// Declares the timestamp column explicitly.
    #[must_use]
    pub fn with_timestamp_column(mut self, column: impl Into<String>) -> Self {
        self.timestamp_column = Some(column.into());
        self
    }

    /// Declares a default value for a field missing from a record.
    #[must_use]
    pub fn with_default(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.defaults.insert(field.into(), value.into());
        self
    }

    /// Declares the first-generation legacy log-table name.
    #[must_use]
    pub fn with_legacy_v1(mut self, name: impl Into<String>) -> Self {
        self.legacy_v1 = Some(name.into());
        self
    }

    /// Declares the second-generation legacy log-table name.
    #[must_use]
    pub fn with_legacy_v2(mut self, name: impl Into<String>) -> Self {
        self.legacy_v2 = Some(name.into());
        self
    }

    /// Logical table name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Creation DDL body.
    #[must_use]
    pub fn create_sql(&self) -> &str {
        &self.create_sql
    }

    /// Insertable columns in declaration order.
    #[must_use]
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Default logical database.
    #[must_use]
    pub const fn database(&self) -> LogicalDb {
        self.database
    }

    /// Whether the physical table name carries a tenant prefix.
    #[must_use]
    pub const fn is_tenant_sharded(&self) -> bool {
        self.tenant_sharded
    }

    /// Tenant column used when deleting from the unsharded table.
    #[must_use]
    pub fn tenant_column(&self) -> &str {
        &self.tenant_column
    }

    /// First-generation legacy log-table name.
    #[must_use]
    pub fn legacy_v1(&self) -> Option<&str> {
        self.legacy_v1.as_deref()
    }

    /// Second-generation legacy log-table name.
    #[must_use]
    pub fn legacy_v2(&self) -> Option<&str> {
        self.legacy_v2.as_deref()
    }

    /// Timestamp column: the declared one, else the first `*_time` field.
    #[must_use]
    pub fn timestamp_column(&self) -> Option<&str> {
        self.timestamp_column.as_deref().or_else(|| {
            self.fields.iter().map(String::as_str).find(|field| field.ends_with(TIMESTAMP_SUFFIX))
        })
    }

    /// Value used for `field` when a record does not carry it.
    #[must_use]
    pub fn default_for(&self, field: &str) -> Value {
        self.defaults.get(field).cloned().unwrap_or(Value::MISSING_FIELD_DEFAULT)
    }

    /// Serializes a record into values ordered by [`Self::fields`].
    #[must_use]
    pub fn row_values(&self, record: &Record) -> Vec<Value> {
        self.fields
            .iter()
            .map(|field| record.get(field).cloned().unwrap_or_else(|| self.default_for(field)))
            .collect()
    }

    /// Validates that every name this definition splices into SQL is plain.
    ///
    /// # Errors
    ///
    /// Returns [`IdentifierError`] for the first offending identifier.
    pub fn validate(&self) -> Result<(), IdentifierError> {
        validate_identifier("table", &self.name)?;
        validate_identifier("column", &self.tenant_column)?;
        for field in &self.fields {
            validate_identifier("column", field)?;
        }
        if let Some(column) = &self.timestamp_column {
            validate_identifier("column", column)?;
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
