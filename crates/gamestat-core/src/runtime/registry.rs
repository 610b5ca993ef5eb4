// crates/gamestat-core/src/runtime/registry.rs
// ============================================================================
// Module: Schema Registry
// Description: Logical table name to schema definition mapping.
// Purpose: Resolve schemas for every DDL operation and legacy log aliases.
// Dependencies: crate::core, crate::runtime::{error, log}
// ============================================================================

//! ## Overview
//! The registry is populated once, at process start, from a static list of
//! [`SchemaDefinition`]s (see [`crate::core::catalog`]) and read thereafter.
//! Registration is insert-if-absent: a second definition under an existing
//! name is logged as a warning and discarded, so the first one wins. Two
//! independent alias namespaces map legacy log-table names onto schemas for
//! log ingestion; the insert path never consults them.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::OnceLock;

use crate::core::SchemaDefinition;
use crate::core::builtin_schemas;
use crate::runtime::error::DdlError;
use crate::runtime::log::DdlLogEvent;
use crate::runtime::log::DdlLogSink;
use crate::runtime::log::StderrLogSink;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Result of one registration attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// The definition is now registered.
    Registered,
    /// A definition with the same name already existed; it was kept.
    Duplicate,
    /// The definition uses identifiers that cannot be spliced into SQL.
    Rejected,
}

/// Process-wide schema registry.
///
/// # Invariants
/// - At most one definition per logical table name.
/// - Alias entries point at definitions that are also registered by name.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    /// Definitions keyed by logical table name.
    tables: BTreeMap<String, Arc<SchemaDefinition>>,
    /// First-generation legacy log-table aliases.
    legacy_v1: BTreeMap<String, Arc<SchemaDefinition>>,
    /// Second-generation legacy log-table aliases.
    legacy_v2: BTreeMap<String, Arc<SchemaDefinition>>,
}

/// Registry built from the built-in catalog on first use.
static GLOBAL_REGISTRY: OnceLock<Arc<SchemaRegistry>> = OnceLock::new();

impl SchemaRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry from definitions, in iteration order.
    #[must_use]
    pub fn from_schemas<I>(schemas: I, sink: &dyn DdlLogSink) -> Self
    where
        I: IntoIterator<Item = SchemaDefinition>,
    {
        let mut registry = Self::new();
        for schema in schemas {
            registry.register(schema, sink);
        }
        registry
    }

    /// Builds a registry from the built-in catalog.
    #[must_use]
    pub fn builtin(sink: &dyn DdlLogSink) -> Self {
        Self::from_schemas(builtin_schemas(), sink)
    }

    /// Returns the shared registry holding the built-in catalog.
    ///
    /// The first call populates it; conflicts are reported to stderr.
    #[must_use]
    pub fn global() -> Arc<Self> {
        Arc::clone(GLOBAL_REGISTRY.get_or_init(|| Arc::new(Self::builtin(&StderrLogSink))))
    }

    /// Registers `schema` unless its name is already taken.
    pub fn register(&mut self, schema: SchemaDefinition, sink: &dyn DdlLogSink) -> Registration {
        if let Err(err) = schema.validate() {
            sink.record(
                &DdlLogEvent::error("schema_rejected", err.to_string()).with_table(schema.name()),
            );
            return Registration::Rejected;
        }
        if self.tables.contains_key(schema.name()) {
            sink.record(
                &DdlLogEvent::warning(
                    "schema_duplicate",
                    format!("duplicate table template: {}, keeping the first", schema.name()),
                )
                .with_table(schema.name()),
            );
            return Registration::Duplicate;
        }
        if schema.fields().is_empty() {
            sink.record(
                &DdlLogEvent::warning("schema_without_fields", "creation ddl yields no fields")
                    .with_table(schema.name()),
            );
        }
        let schema = Arc::new(schema);
        if let Some(alias) = schema.legacy_v1() {
            insert_alias(&mut self.legacy_v1, alias, &schema, sink);
        }
        if let Some(alias) = schema.legacy_v2() {
            insert_alias(&mut self.legacy_v2, alias, &schema, sink);
        }
        self.tables.insert(schema.name().to_string(), schema);
        Registration::Registered
    }

    /// Returns the definition registered under `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<SchemaDefinition>> {
        self.tables.get(name).cloned()
    }

    /// Resolves `name` or fails with [`DdlError::UnknownTable`].
    ///
    /// # Errors
    ///
    /// Returns [`DdlError::UnknownTable`] when nothing is registered under `name`.
    pub fn resolve(&self, name: &str) -> Result<Arc<SchemaDefinition>, DdlError> {
        self.get(name).ok_or_else(|| DdlError::UnknownTable(name.to_string()))
    }

    /// Resolves a first-generation legacy log-table name.
    #[must_use]
    pub fn resolve_legacy_v1(&self, legacy_name: &str) -> Option<Arc<SchemaDefinition>> {
        self.legacy_v1.get(legacy_name).cloned()
    }

    /// Resolves a second-generation legacy log-table name.
    #[must_use]
    pub fn resolve_legacy_v2(&self, legacy_name: &str) -> Option<Arc<SchemaDefinition>> {
        self.legacy_v2.get(legacy_name).cloned()
    }

    /// Registered logical table names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    /// Number of registered definitions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Returns true when nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

/// Inserts an alias if absent, warning on conflicts.
fn insert_alias(
    aliases: &mut BTreeMap<String, Arc<SchemaDefinition>>,
    alias: &str,
    schema: &Arc<SchemaDefinition>,
    sink: &dyn DdlLogSink,
) {
    if let Some(existing) = aliases.get(alias) {
        sink.record(
            &DdlLogEvent::warning(
                "schema_alias_duplicate",
                format!("legacy alias {alias} already maps to {}", existing.name()),
            )
            .with_table(schema.name()),
        );
        return;
    }
    aliases.insert(alias.to_string(), Arc::clone(schema));
}
