// crates/gamestat-core/src/runtime/mod.rs
// ============================================================================
// Module: Gamestat Runtime
// Description: Registry, pooling, materialization, writes and bulk loads.
// Purpose: Execute DDL operations against pluggable connections.
// Dependencies: crate::{core, interfaces}, serde_json, thiserror
// ============================================================================

//! ## Overview
//! The runtime wires the core model to a [`crate::interfaces::Connection`].
//! Most callers only need the [`Ddl`] facade; the components are public for
//! embedders that manage schemas or connections themselves.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod ddl;
pub mod error;
pub mod loader;
pub mod log;
pub mod materializer;
pub mod pool;
pub mod registry;
pub mod writer;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use ddl::Ddl;
pub use error::DdlError;
pub use loader::BulkLoader;
pub use loader::LoadRequest;
pub use loader::is_shell_safe;
pub use log::DdlLogEvent;
pub use log::DdlLogSink;
pub use log::FileLogSink;
pub use log::LogLevel;
pub use log::MemoryLogSink;
pub use log::NoopLogSink;
pub use log::StderrLogSink;
pub use materializer::EnsureOutcome;
pub use materializer::TableMaterializer;
pub use pool::ConnectionPool;
pub use pool::resolve_credentials;
pub use registry::Registration;
pub use registry::SchemaRegistry;
pub use writer::DestructiveOutcome;
pub use writer::RecordWriter;
