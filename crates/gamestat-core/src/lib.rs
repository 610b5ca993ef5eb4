// crates/gamestat-core/src/lib.rs
// ============================================================================
// Module: Gamestat Core
// Description: Schema registry and sharded table writes for game analytics.
// Purpose: Public API of the backend-agnostic DDL subsystem.
// Dependencies: serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Gamestat keeps one logical schema per analytics table and materializes a
//! physical table per tenant (and optionally per day) on first write. Rows
//! are written through a pluggable [`interfaces::Connection`]; statement
//! failures are logged, not raised, so ingestion batches keep going.
//!
//! - [`core`]: identifiers, schema definitions, naming, records, catalog.
//! - [`interfaces`]: connection, credential and confirmation contracts.
//! - [`runtime`]: registry, pool, materializer, writer, loader, facade.

pub mod core;
pub mod interfaces;
pub mod runtime;

pub use crate::core::LogicalDb;
pub use crate::core::Record;
pub use crate::core::SchemaDefinition;
pub use crate::core::Shard;
pub use crate::core::TenantId;
pub use crate::core::Value;
pub use crate::runtime::Ddl;
pub use crate::runtime::DdlError;
