// crates/gamestat-core/src/runtime/materializer.rs
// ============================================================================
// Module: Table Materializer
// Description: Idempotent creation of physical tables on demand.
// Purpose: Guarantee the target table exists before rows are written.
// Dependencies: crate::core, crate::runtime::{error, log, pool}
// ============================================================================

//! ## Overview
//! `ensure` probes for the physical table and issues the schema's creation
//! DDL when it is missing. The probe and the creation run under the pool's
//! creation lock, so concurrent callers in one process see exactly one
//! `Created`; creation also uses `IF NOT EXISTS`, so other processes racing
//! on the same name still converge on a single table. A probe that
//! errors is treated as "absent": creation proceeds and the failed probe is
//! logged so it is distinguishable from a definitive miss.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::SchemaDefinition;
use crate::core::Shard;
use crate::core::physical_table_name;
use crate::runtime::error::DdlError;
use crate::runtime::log::DdlLogEvent;
use crate::runtime::log::DdlLogSink;
use crate::runtime::pool::ConnectionPool;

// ============================================================================
// SECTION: Types
// ============================================================================

/// What `ensure` had to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnsureOutcome {
    /// The probe found the table.
    Existed,
    /// The probe reported the table missing; it was created.
    Created,
    /// The probe failed; creation was issued anyway.
    CreatedAfterProbeFailure,
}

impl EnsureOutcome {
    /// Returns true when a creation statement was issued.
    #[must_use]
    pub const fn created(self) -> bool {
        !matches!(self, Self::Existed)
    }
}

/// Creates physical tables on demand.
pub struct TableMaterializer<'a> {
    /// Connection source.
    pool: &'a ConnectionPool,
    /// Event sink.
    sink: &'a dyn DdlLogSink,
}

impl<'a> TableMaterializer<'a> {
    /// Creates a materializer over `pool`.
    #[must_use]
    pub const fn new(pool: &'a ConnectionPool, sink: &'a dyn DdlLogSink) -> Self {
        Self {
            pool,
            sink,
        }
    }

    /// Ensures the physical table for `schema` under `shard` exists.
    ///
    /// # Errors
    ///
    /// Returns [`DdlError`] when the name is unsafe, the connection cannot be
    /// obtained, or the creation statement fails.
    pub fn ensure(
        &self,
        schema: &SchemaDefinition,
        shard: &Shard,
    ) -> Result<EnsureOutcome, DdlError> {
        let table = physical_table_name(schema, shard)?;
        let connection = self.pool.connection(schema.database())?;
        let _creation = self.pool.creation_guard();
        let outcome = match connection.table_exists(&table) {
            Ok(true) => return Ok(EnsureOutcome::Existed),
            Ok(false) => {
                self.sink.record(
                    &DdlLogEvent::info("table_missing", format!("table {table} does not exist"))
                        .with_table(&table)
                        .with_database(schema.database()),
                );
                EnsureOutcome::Created
            }
            Err(err) => {
                self.sink.record(
                    &DdlLogEvent::warning("table_probe_failed", err.to_string())
                        .with_table(&table)
                        .with_database(schema.database()),
                );
                EnsureOutcome::CreatedAfterProbeFailure
            }
        };
        connection.create_table(&table, schema.create_sql()).map_err(|err| {
            self.sink.record(
                &DdlLogEvent::error("table_create_failed", err.to_string())
                    .with_table(&table)
                    .with_database(schema.database()),
            );
            DdlError::CreateTable {
                table: table.clone(),
                message: err.to_string(),
            }
        })?;
        self.sink.record(
            &DdlLogEvent::info("table_created", format!("ensured table {table}"))
                .with_table(&table)
                .with_database(schema.database()),
        );
        Ok(outcome)
    }
}
