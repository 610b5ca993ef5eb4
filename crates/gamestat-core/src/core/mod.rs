// crates/gamestat-core/src/core/mod.rs
// ============================================================================
// Module: Gamestat Core Types
// Description: Identifiers, schema definitions, naming and record values.
// Purpose: Provide the stable model the DDL runtime operates on.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! Core types describe logical tables and the rows written into them. They
//! carry no I/O; the runtime turns them into statements executed through the
//! interfaces.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod catalog;
pub mod identifiers;
pub mod naming;
pub mod record;
pub mod schema;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use catalog::builtin_schemas;
pub use identifiers::IdentifierError;
pub use identifiers::LogicalDb;
pub use identifiers::ShardDate;
pub use identifiers::TenantId;
pub use identifiers::validate_identifier;
pub use naming::Shard;
pub use naming::physical_table_name;
pub use record::Filter;
pub use record::Record;
pub use record::Value;
pub use record::record;
pub use record::render_statement;
pub use schema::SchemaDefinition;
pub use schema::definition_tokens;
pub use schema::extract_fields;
pub use schema::is_auto_increment_column;
