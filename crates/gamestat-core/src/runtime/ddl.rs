// crates/gamestat-core/src/runtime/ddl.rs
// ============================================================================
// Module: DDL Facade
// Description: Name-based entry points over registry, pool and writers.
// Purpose: Give callers one handle addressing tables by logical name.
// Dependencies: crate::{core, interfaces}, crate::runtime::*
// ============================================================================

//! ## Overview
//! [`Ddl`] owns the schema registry, the connection pool, the credential
//! source and the event sink. Each operation resolves the logical table name
//! first; an unknown name is logged as `unknown_table` and returned as
//! [`DdlError::UnknownTable`]. The facade is `Send + Sync` and meant to be
//! shared behind an `Arc`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::core::Filter;
use crate::core::Record;
use crate::core::SchemaDefinition;
use crate::core::Shard;
use crate::core::TenantId;
use crate::core::Value;
use crate::interfaces::Confirmation;
use crate::interfaces::ConnectionFactory;
use crate::interfaces::CredentialSource;
use crate::runtime::error::DdlError;
use crate::runtime::loader::BulkLoader;
use crate::runtime::loader::LoadRequest;
use crate::runtime::log::DdlLogEvent;
use crate::runtime::log::DdlLogSink;
use crate::runtime::materializer::EnsureOutcome;
use crate::runtime::materializer::TableMaterializer;
use crate::runtime::pool::ConnectionPool;
use crate::runtime::registry::SchemaRegistry;
use crate::runtime::writer::DestructiveOutcome;
use crate::runtime::writer::RecordWriter;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Process-wide DDL handle.
pub struct Ddl {
    /// Registered schemas.
    registry: Arc<SchemaRegistry>,
    /// Shared connections.
    pool: ConnectionPool,
    /// Credential lookup, also used for load commands.
    credentials: Arc<dyn CredentialSource>,
    /// Event sink.
    sink: Arc<dyn DdlLogSink>,
}

impl Ddl {
    /// Creates a handle over `registry` using `factory` for connections.
    #[must_use]
    pub fn new(
        registry: Arc<SchemaRegistry>,
        factory: Arc<dyn ConnectionFactory>,
        credentials: Arc<dyn CredentialSource>,
        sink: Arc<dyn DdlLogSink>,
    ) -> Self {
        let pool = ConnectionPool::new(factory, Arc::clone(&credentials), Arc::clone(&sink));
        Self {
            registry,
            pool,
            credentials,
            sink,
        }
    }

    /// Returns the schema registry.
    #[must_use]
    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    /// Returns the connection pool.
    #[must_use]
    pub const fn pool(&self) -> &ConnectionPool {
        &self.pool
    }

    /// Resolves a logical table name, logging unknown names.
    ///
    /// # Errors
    ///
    /// Returns [`DdlError::UnknownTable`] when nothing is registered.
    pub fn schema(&self, table: &str) -> Result<Arc<SchemaDefinition>, DdlError> {
        self.registry.resolve(table).inspect_err(|err| {
            self.sink.record(&DdlLogEvent::error("unknown_table", err.to_string()).with_table(table));
        })
    }

    /// Ensures the physical table for `table` under `shard` exists.
    ///
    /// # Errors
    ///
    /// See [`TableMaterializer::ensure`].
    pub fn ensure_table(&self, table: &str, shard: &Shard) -> Result<EnsureOutcome, DdlError> {
        let schema = self.schema(table)?;
        self.materializer().ensure(&schema, shard)
    }

    /// Inserts records into the tenant table.
    ///
    /// # Errors
    ///
    /// See [`RecordWriter::insert`].
    pub fn insert(&self, table: &str, records: &[Record], shard: &Shard) -> Result<(), DdlError> {
        let schema = self.schema(table)?;
        self.writer().insert(&schema, records, shard)
    }

    /// Upserts records keyed by `where_fields`.
    ///
    /// # Errors
    ///
    /// See [`RecordWriter::update`].
    pub fn update(
        &self,
        table: &str,
        records: &[Record],
        where_fields: &[&str],
        shard: &Shard,
    ) -> Result<(), DdlError> {
        let schema = self.schema(table)?;
        self.writer().update(&schema, records, where_fields, shard)
    }

    /// Deletes filtered rows for `tenants` from the unsharded table.
    ///
    /// # Errors
    ///
    /// See [`RecordWriter::delete`].
    pub fn delete(
        &self,
        table: &str,
        tenants: &[TenantId],
        filters: &BTreeMap<String, Filter>,
        confirmation: &dyn Confirmation,
    ) -> Result<DestructiveOutcome, DdlError> {
        let schema = self.schema(table)?;
        self.writer().delete(&schema, tenants, filters, confirmation)
    }

    /// Drops the physical table selected by `shard`.
    ///
    /// # Errors
    ///
    /// See [`RecordWriter::drop_table`].
    pub fn drop_table(
        &self,
        table: &str,
        shard: &Shard,
        confirmation: &dyn Confirmation,
    ) -> Result<DestructiveOutcome, DdlError> {
        let schema = self.schema(table)?;
        self.writer().drop_table(&schema, shard, confirmation)
    }

    /// Clears tenant rows stamped at or after `cutoff`.
    ///
    /// # Errors
    ///
    /// See [`RecordWriter::delete_since`].
    pub fn delete_since(
        &self,
        table: &str,
        shard: &Shard,
        cutoff: impl Into<Value>,
        confirmation: &dyn Confirmation,
    ) -> Result<DestructiveOutcome, DdlError> {
        let schema = self.schema(table)?;
        self.writer().delete_since(&schema, shard, cutoff.into(), confirmation)
    }

    /// Builds the bulk-load command for a registered table.
    ///
    /// # Errors
    ///
    /// See [`BulkLoader::command`].
    pub fn load_command(&self, table: &str, request: &LoadRequest) -> Result<String, DdlError> {
        let schema = self.schema(table)?;
        self.load_command_for(&schema, request)
    }

    /// Builds the bulk-load command for an explicit schema.
    ///
    /// # Errors
    ///
    /// See [`BulkLoader::command`].
    pub fn load_command_for(
        &self,
        schema: &SchemaDefinition,
        request: &LoadRequest,
    ) -> Result<String, DdlError> {
        BulkLoader::new(&self.pool, self.credentials.as_ref(), self.sink.as_ref())
            .command(schema, request)
    }

    /// Runs a raw query against the database holding `table`.
    ///
    /// # Errors
    ///
    /// See [`RecordWriter::query`].
    pub fn query(&self, table: &str, sql: &str, params: &[Value]) -> Result<Vec<Record>, DdlError> {
        let schema = self.schema(table)?;
        self.writer().query(&schema, sql, params)
    }

    /// Executes raw SQL against the database holding `table`.
    ///
    /// # Errors
    ///
    /// See [`RecordWriter::execute`].
    pub fn execute(&self, table: &str, sql: &str, params: &[Value]) -> Result<(), DdlError> {
        let schema = self.schema(table)?;
        self.writer().execute(&schema, sql, params)
    }

    /// Drops every pooled connection.
    pub fn close(&self) {
        self.pool.close_all();
    }

    /// Borrows a materializer over the shared pool.
    fn materializer(&self) -> TableMaterializer<'_> {
        TableMaterializer::new(&self.pool, self.sink.as_ref())
    }

    /// Borrows a writer over the shared pool.
    fn writer(&self) -> RecordWriter<'_> {
        RecordWriter::new(&self.pool, self.sink.as_ref())
    }
}
