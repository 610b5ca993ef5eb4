// crates/gamestat-core/src/core/naming.rs
// ============================================================================
// Module: Gamestat Physical Naming
// Description: Tenant/date sharding rule for physical table names.
// Purpose: Single naming algorithm shared by create, write, load and drop.
// Dependencies: crate::core::{identifiers, schema}
// ============================================================================

//! ## Overview
//! Physical table names follow exactly one of three patterns:
//! `{table}`, `{tenant}_{table}` or `{tenant}_{table}_{date}`. The pattern is
//! selected by the schema's sharding flag and by which parts of the [`Shard`]
//! are present. Other tooling reads these names, so the format is fixed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::identifiers::IdentifierError;
use crate::core::identifiers::ShardDate;
use crate::core::identifiers::TenantId;
use crate::core::identifiers::validate_identifier;
use crate::core::schema::SchemaDefinition;

// ============================================================================
// SECTION: Shard
// ============================================================================

/// Caller-supplied sharding scope for one operation.
///
/// # Invariants
/// - `date` only affects the name when `tenant` is present and the schema is
///   tenant-sharded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Shard {
    /// Tenant identifier, if any.
    pub tenant: Option<TenantId>,
    /// Date suffix, if any.
    pub date: Option<ShardDate>,
}

impl Shard {
    /// Unscoped shard: the physical name equals the logical name.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            tenant: None,
            date: None,
        }
    }

    /// Tenant-scoped shard.
    #[must_use]
    pub fn tenant(tenant: impl Into<TenantId>) -> Self {
        Self {
            tenant: Some(tenant.into()),
            date: None,
        }
    }

    /// Tenant- and date-scoped shard.
    #[must_use]
    pub fn daily(tenant: impl Into<TenantId>, date: impl Into<ShardDate>) -> Self {
        Self {
            tenant: Some(tenant.into()),
            date: Some(date.into()),
        }
    }

    /// Same shard without its date component.
    #[must_use]
    pub fn without_date(&self) -> Self {
        Self {
            tenant: self.tenant.clone(),
            date: None,
        }
    }
}

// ============================================================================
// SECTION: Naming
// ============================================================================

/// Computes the physical table name for `schema` under `shard`.
///
/// # Errors
///
/// Returns [`IdentifierError`] when the table name, tenant or date is not a
/// plain identifier.
pub fn physical_table_name(
    schema: &SchemaDefinition,
    shard: &Shard,
) -> Result<String, IdentifierError> {
    validate_identifier("table", schema.name())?;
    let Some(tenant) = shard.tenant.as_ref().filter(|_| schema.is_tenant_sharded()) else {
        return Ok(schema.name().to_string());
    };
    tenant.validate()?;
    match &shard.date {
        Some(date) => {
            date.validate()?;
            Ok(format!("{tenant}_{}_{date}", schema.name()))
        }
        None => Ok(format!("{tenant}_{}", schema.name())),
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::Shard;
    use super::physical_table_name;
    use crate::core::schema::SchemaDefinition;

    const BODY: &str = "  `openid` varchar(100) NOT NULL,\n)";

    #[test]
    fn sharded_names_follow_the_three_patterns() {
        let login = SchemaDefinition::model("login", BODY);
        assert_eq!(
            physical_table_name(&login, &Shard::daily("2100007", "20240101")).ok().as_deref(),
            Some("2100007_login_20240101")
        );
        assert_eq!(
            physical_table_name(&login, &Shard::tenant("2100007")).ok().as_deref(),
            Some("2100007_login")
        );
        assert_eq!(physical_table_name(&login, &Shard::none()).ok().as_deref(), Some("login"));
    }

    #[test]
    fn unsharded_schema_ignores_tenant_and_date() {
        let merge = SchemaDefinition::merge("props_get_day", BODY);
        assert_eq!(
            physical_table_name(&merge, &Shard::daily("42", "20240101")).ok().as_deref(),
            Some("props_get_day")
        );
    }

    #[test]
    fn hostile_tenant_is_rejected() {
        let login = SchemaDefinition::model("login", BODY);
        assert!(physical_table_name(&login, &Shard::tenant("1` or 1=1")).is_err());
    }
}
