// crates/gamestat-core/src/core/record.rs
// ============================================================================
// Module: Gamestat Records
// Description: Scalar values, insert/update records and delete filters.
// Purpose: Carry caller-supplied rows to the writer as bindable values.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A [`Record`] maps column names to scalar [`Value`]s. Records are always
//! bound through statement placeholders; [`render_statement`] exists only to
//! produce a readable statement for the event log.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Values
// ============================================================================

/// Scalar value bound into a statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// SQL `NULL`.
    Null,
    /// Signed integer.
    Int(i64),
    /// Floating point number.
    Float(f64),
    /// Text value.
    Text(String),
}

impl Value {
    /// Default literal substituted for fields absent from a record.
    pub const MISSING_FIELD_DEFAULT: Self = Self::Int(0);

    /// Renders the value as a single-quoted SQL literal for log output.
    #[must_use]
    pub fn to_log_literal(&self) -> String {
        match self {
            Self::Null => "NULL".to_string(),
            Self::Int(value) => format!("'{value}'"),
            Self::Float(value) => format!("'{value}'"),
            Self::Text(value) => format!("'{}'", value.replace('\'', "''")),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::Int(value) => value.fmt(f),
            Self::Float(value) => value.fmt(f),
            Self::Text(value) => value.fmt(f),
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

// ============================================================================
// SECTION: Records and Filters
// ============================================================================

/// One row keyed by column name.
pub type Record = BTreeMap<String, Value>;

/// Builds a [`Record`] from `(column, value)` pairs.
#[must_use]
pub fn record<I, K, V>(pairs: I) -> Record
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<Value>,
{
    pairs.into_iter().map(|(key, value)| (key.into(), value.into())).collect()
}

/// Per-column predicate used by the delete path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Filter {
    /// `column = value`.
    Eq(Value),
    /// `column IN (values...)`.
    In(Vec<Value>),
}

impl Filter {
    /// Equality filter.
    #[must_use]
    pub fn eq(value: impl Into<Value>) -> Self {
        Self::Eq(value.into())
    }

    /// Set-membership filter.
    #[must_use]
    pub fn any_of<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::In(values.into_iter().map(Into::into).collect())
    }
}

// ============================================================================
// SECTION: Log Rendering
// ============================================================================

/// Substitutes `?` placeholders with quoted literals for log output only.
///
/// Placeholders beyond the supplied parameters are left untouched.
#[must_use]
pub fn render_statement(sql: &str, params: &[Value]) -> String {
    let mut rendered = String::with_capacity(sql.len() + params.len() * 4);
    let mut params = params.iter();
    for ch in sql.chars() {
        if ch == '?'
            && let Some(value) = params.next()
        {
            rendered.push_str(&value.to_log_literal());
            continue;
        }
        rendered.push(ch);
    }
    rendered
}

// ============================================================================
// SECTION: Tests
// ============================================================================
