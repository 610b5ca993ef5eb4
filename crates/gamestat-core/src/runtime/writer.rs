// crates/gamestat-core/src/runtime/writer.rs
// ============================================================================
// Module: Record Writer
// Description: Batch insert, keyed upsert, filtered delete and table drop.
// Purpose: Turn records into bound SQL against physical tables.
// Dependencies: crate::{core, interfaces}, crate::runtime::{error, log, ...}
// ============================================================================

//! ## Overview
//! Writes always target the tenant's undated table. Insert materializes the
//! table first and then issues multi-row `INSERT` statements whose column
//! order follows [`SchemaDefinition::fields`]; missing fields take the
//! schema's default. Failed statements are logged with their rendered SQL and
//! swallowed, so a batch never aborts the caller.
//!
//! Update is a check-then-act upsert: a `SELECT 1` on the key columns decides
//! between `INSERT` and `UPDATE`. Two writers checking the same absent key
//! concurrently can both insert; only a unique key on those columns makes the
//! table converge (the losing insert fails and is logged).
//!
//! Delete targets the unsharded table with a tenant `IN (...)` clause. Drop,
//! delete and delete-since ask a [`Confirmation`] first.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::slice;

use crate::core::Filter;
use crate::core::IdentifierError;
use crate::core::Record;
use crate::core::SchemaDefinition;
use crate::core::Shard;
use crate::core::TenantId;
use crate::core::Value;
use crate::core::physical_table_name;
use crate::core::render_statement;
use crate::core::validate_identifier;
use crate::interfaces::Confirmation;
use crate::interfaces::Connection;
use crate::interfaces::ConnectionError;
use crate::runtime::error::DdlError;
use crate::runtime::log::DdlLogEvent;
use crate::runtime::log::DdlLogSink;
use crate::runtime::materializer::TableMaterializer;
use crate::runtime::pool::ConnectionPool;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Upper bound on bound parameters per statement; batches are split above it.
pub const MAX_BOUND_PARAMS: usize = 30_000;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Result of a destructive operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestructiveOutcome {
    /// The statement was issued (failures are logged, not returned).
    Issued,
    /// Confirmation was declined; nothing ran.
    Declined,
    /// The request selects no rows; nothing ran.
    Skipped,
}

/// Record-level writer over the shared pool.
pub struct RecordWriter<'a> {
    /// Connection source.
    pool: &'a ConnectionPool,
    /// Event sink.
    sink: &'a dyn DdlLogSink,
}

impl<'a> RecordWriter<'a> {
    /// Creates a writer over `pool`.
    #[must_use]
    pub const fn new(pool: &'a ConnectionPool, sink: &'a dyn DdlLogSink) -> Self {
        Self {
            pool,
            sink,
        }
    }

    /// Inserts `records` into the tenant table of `shard`, creating it first.
    ///
    /// The shard date is ignored: rows always land in the undated table.
    ///
    /// # Errors
    ///
    /// Returns [`DdlError`] when the table cannot be materialized or the
    /// connection cannot be obtained. Statement failures are logged only.
    pub fn insert(
        &self,
        schema: &SchemaDefinition,
        records: &[Record],
        shard: &Shard,
    ) -> Result<(), DdlError> {
        if records.is_empty() {
            return Ok(());
        }
        let shard = shard.without_date();
        TableMaterializer::new(self.pool, self.sink).ensure(schema, &shard)?;
        let table = physical_table_name(schema, &shard)?;
        let fields = schema.fields();
        if fields.is_empty() {
            self.sink.record(
                &DdlLogEvent::error("insert_failed", "schema declares no insertable fields")
                    .with_table(&table)
                    .with_database(schema.database()),
            );
            return Ok(());
        }
        let connection = self.pool.connection(schema.database())?;
        let columns = quote_list(fields);
        let row_placeholders = format!("({})", placeholders(fields.len()));
        let rows_per_statement = (MAX_BOUND_PARAMS / fields.len()).max(1);
        for chunk in records.chunks(rows_per_statement) {
            let values = vec![row_placeholders.as_str(); chunk.len()].join(",");
            let sql = format!("INSERT INTO `{table}` ({columns}) VALUES {values}");
            let params: Vec<Value> =
                chunk.iter().flat_map(|record| schema.row_values(record)).collect();
            self.run_logged(connection.as_ref(), schema, &table, "insert_failed", &sql, &params)?;
        }
        Ok(())
    }

    /// Upserts each record keyed by `where_fields` in the tenant table.
    ///
    /// A record missing a key field, or carrying a non-identifier column, is
    /// logged and skipped; the rest of the batch proceeds.
    ///
    /// # Errors
    ///
    /// Returns [`DdlError::InvalidIdentifier`] when `where_fields` is empty or
    /// unsafe, and [`DdlError`] when the table cannot be materialized or the
    /// connection cannot be obtained.
    pub fn update(
        &self,
        schema: &SchemaDefinition,
        records: &[Record],
        where_fields: &[&str],
        shard: &Shard,
    ) -> Result<(), DdlError> {
        if records.is_empty() {
            return Ok(());
        }
        if where_fields.is_empty() {
            return Err(IdentifierError::Empty {
                kind: "update key",
            }
            .into());
        }
        for field in where_fields {
            validate_identifier("column", field)?;
        }
        let shard = shard.without_date();
        TableMaterializer::new(self.pool, self.sink).ensure(schema, &shard)?;
        let table = physical_table_name(schema, &shard)?;
        let connection = self.pool.connection(schema.database())?;
        for record in records {
            let Some(key) = self.key_values(schema, &table, record, where_fields) else {
                continue;
            };
            let predicate = where_fields
                .iter()
                .map(|field| format!("`{field}` = ?"))
                .collect::<Vec<_>>()
                .join(" AND ");
            let probe = format!("SELECT 1 FROM `{table}` WHERE {predicate}");
            let matches = match connection.row_count(&probe, &key) {
                Ok(matches) => matches,
                Err(err) => {
                    self.log_statement_error(schema, &table, "update_failed", &probe, &key, &err)?;
                    continue;
                }
            };
            if matches == 0 {
                self.insert(schema, slice::from_ref(record), &shard)?;
                continue;
            }
            let assignments: Vec<(&String, &Value)> = record
                .iter()
                .filter(|(column, _)| !where_fields.contains(&column.as_str()))
                .collect();
            if assignments.is_empty() {
                continue;
            }
            let set_clause = assignments
                .iter()
                .map(|(column, _)| format!("`{column}` = ?"))
                .collect::<Vec<_>>()
                .join(", ");
            let sql = format!("UPDATE `{table}` SET {set_clause} WHERE {predicate}");
            let mut params: Vec<Value> =
                assignments.into_iter().map(|(_, value)| value.clone()).collect();
            params.extend(key);
            self.run_logged(connection.as_ref(), schema, &table, "update_failed", &sql, &params)?;
        }
        Ok(())
    }

    /// Deletes rows of the unsharded table matching `filters` for `tenants`.
    ///
    /// # Errors
    ///
    /// Returns [`DdlError`] when an identifier is unsafe or the connection
    /// cannot be obtained. Statement failures are logged only.
    pub fn delete(
        &self,
        schema: &SchemaDefinition,
        tenants: &[TenantId],
        filters: &BTreeMap<String, Filter>,
        confirmation: &dyn Confirmation,
    ) -> Result<DestructiveOutcome, DdlError> {
        let table = physical_table_name(schema, &Shard::none())?;
        validate_identifier("column", schema.tenant_column())?;
        if tenants.is_empty() {
            self.sink.record(
                &DdlLogEvent::warning("delete_failed", "no tenants given; nothing deleted")
                    .with_table(&table)
                    .with_database(schema.database()),
            );
            return Ok(DestructiveOutcome::Skipped);
        }
        let mut clauses = Vec::with_capacity(filters.len() + 1);
        let mut params = Vec::new();
        for (column, filter) in filters {
            validate_identifier("column", column)?;
            match filter {
                Filter::Eq(value) => {
                    clauses.push(format!("`{column}` = ?"));
                    params.push(value.clone());
                }
                Filter::In(values) if values.is_empty() => {
                    self.sink.record(
                        &DdlLogEvent::warning(
                            "delete_failed",
                            format!("empty value list for {column}; nothing deleted"),
                        )
                        .with_table(&table)
                        .with_database(schema.database()),
                    );
                    return Ok(DestructiveOutcome::Skipped);
                }
                Filter::In(values) => {
                    clauses.push(format!("`{column}` IN ({})", placeholders(values.len())));
                    params.extend(values.iter().cloned());
                }
            }
        }
        for tenant in tenants {
            tenant.validate()?;
        }
        clauses.push(format!("`{}` IN ({})", schema.tenant_column(), placeholders(tenants.len())));
        params.extend(tenants.iter().map(|tenant| Value::Text(tenant.as_str().to_string())));
        let sql = format!("DELETE FROM `{table}` WHERE {}", clauses.join(" AND "));
        self.run_destructive(schema, &table, "delete_failed", &sql, &params, confirmation)
    }

    /// Drops the physical table for `shard`; absent tables are a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`DdlError`] when the name is unsafe or the connection cannot
    /// be obtained. Statement failures are logged only.
    pub fn drop_table(
        &self,
        schema: &SchemaDefinition,
        shard: &Shard,
        confirmation: &dyn Confirmation,
    ) -> Result<DestructiveOutcome, DdlError> {
        let table = physical_table_name(schema, shard)?;
        let sql = format!("DROP TABLE IF EXISTS `{table}`");
        self.run_destructive(schema, &table, "drop_failed", &sql, &[], confirmation)
    }

    /// Deletes rows of the tenant table whose timestamp is at or after `cutoff`.
    ///
    /// # Errors
    ///
    /// Returns [`DdlError::MissingTimestampColumn`] when the schema has no
    /// timestamp column, plus the errors of [`Self::drop_table`].
    pub fn delete_since(
        &self,
        schema: &SchemaDefinition,
        shard: &Shard,
        cutoff: Value,
        confirmation: &dyn Confirmation,
    ) -> Result<DestructiveOutcome, DdlError> {
        let Some(column) = schema.timestamp_column() else {
            return Err(DdlError::MissingTimestampColumn(schema.name().to_string()));
        };
        validate_identifier("column", column)?;
        let table = physical_table_name(schema, &shard.without_date())?;
        let sql = format!("DELETE FROM `{table}` WHERE `{column}` >= ?");
        self.run_destructive(schema, &table, "delete_failed", &sql, &[cutoff], confirmation)
    }

    /// Executes raw SQL on the schema's database, logging failures.
    ///
    /// # Errors
    ///
    /// Returns [`DdlError`] when the connection cannot be obtained.
    pub fn execute(
        &self,
        schema: &SchemaDefinition,
        sql: &str,
        params: &[Value],
    ) -> Result<(), DdlError> {
        let connection = self.pool.connection(schema.database())?;
        self.run_logged(connection.as_ref(), schema, schema.name(), "statement_failed", sql, params)
    }

    /// Runs a raw query on the schema's database.
    ///
    /// # Errors
    ///
    /// Returns [`DdlError::Connection`] when the query fails.
    pub fn query(
        &self,
        schema: &SchemaDefinition,
        sql: &str,
        params: &[Value],
    ) -> Result<Vec<Record>, DdlError> {
        let connection = self.pool.connection(schema.database())?;
        connection.query(sql, params).map_err(|err| DdlError::connection(schema.database(), err))
    }

    /// Extracts key values for an update, logging records that cannot be keyed.
    fn key_values(
        &self,
        schema: &SchemaDefinition,
        table: &str,
        record: &Record,
        where_fields: &[&str],
    ) -> Option<Vec<Value>> {
        let reject = |message: String| {
            self.sink.record(
                &DdlLogEvent::error("update_failed", message)
                    .with_table(table)
                    .with_database(schema.database()),
            );
        };
        let unsafe_column =
            record.keys().find(|column| validate_identifier("column", column).is_err());
        if let Some(column) = unsafe_column {
            reject(format!("record column '{column}' is not a plain identifier"));
            return None;
        }
        let mut key = Vec::with_capacity(where_fields.len());
        for field in where_fields {
            let Some(value) = record.get(*field) else {
                reject(format!("record lacks key field {field}"));
                return None;
            };
            key.push(value.clone());
        }
        Some(key)
    }

    /// Asks for confirmation, then runs a destructive statement.
    fn run_destructive(
        &self,
        schema: &SchemaDefinition,
        table: &str,
        event: &'static str,
        sql: &str,
        params: &[Value],
        confirmation: &dyn Confirmation,
    ) -> Result<DestructiveOutcome, DdlError> {
        let rendered = render_statement(sql, params);
        if !confirmation.confirm(&rendered) {
            self.sink.record(
                &DdlLogEvent::info("destructive_declined", "confirmation declined")
                    .with_table(table)
                    .with_database(schema.database())
                    .with_sql(rendered),
            );
            return Ok(DestructiveOutcome::Declined);
        }
        let connection = self.pool.connection(schema.database())?;
        self.run_logged(connection.as_ref(), schema, table, event, sql, params)?;
        Ok(DestructiveOutcome::Issued)
    }

    /// Executes a statement, logging and swallowing statement failures.
    fn run_logged(
        &self,
        connection: &dyn Connection,
        schema: &SchemaDefinition,
        table: &str,
        event: &'static str,
        sql: &str,
        params: &[Value],
    ) -> Result<(), DdlError> {
        match connection.execute(sql, params) {
            Ok(_) => Ok(()),
            Err(err) => self.log_statement_error(schema, table, event, sql, params, &err),
        }
    }

    /// Logs a statement failure; connectivity failures still propagate.
    fn log_statement_error(
        &self,
        schema: &SchemaDefinition,
        table: &str,
        event: &'static str,
        sql: &str,
        params: &[Value],
        err: &ConnectionError,
    ) -> Result<(), DdlError> {
        self.sink.record(
            &DdlLogEvent::error(event, err.to_string())
                .with_table(table)
                .with_database(schema.database())
                .with_sql(render_statement(sql, params)),
        );
        match err {
            ConnectionError::Unavailable(_) => {
                Err(DdlError::connection(schema.database(), err.clone()))
            }
            ConnectionError::Statement(_) => Ok(()),
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Renders `` `a`,`b` `` for a column list.
fn quote_list(columns: &[String]) -> String {
    columns.iter().map(|column| format!("`{column}`")).collect::<Vec<_>>().join(",")
}

/// Renders `?,?,?` for `count` placeholders.
fn placeholders(count: usize) -> String {
    vec!["?"; count].join(",")
}

// ============================================================================
// SECTION: Tests
// ============================================================================
