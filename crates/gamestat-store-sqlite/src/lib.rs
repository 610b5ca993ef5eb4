// crates/gamestat-store-sqlite/src/lib.rs
// ============================================================================
// Module: Gamestat SQLite Backend
// Description: Embedded SQLite implementation of the connection interfaces.
// Purpose: Run the DDL runtime without an external database server.
// Dependencies: gamestat-core, rusqlite, serde, thiserror
// ============================================================================

//! ## Overview
//! [`SqliteConnectionFactory`] plugs into [`gamestat_core::Ddl`] as its
//! connection factory. Catalog creation bodies are translated to `SQLite`
//! DDL on the fly by [`translate::translate_create_table`].

pub mod store;
pub mod translate;

pub use store::SqliteBackendConfig;
pub use store::SqliteConnection;
pub use store::SqliteConnectionFactory;
pub use store::SqliteStoreError;
pub use store::SqliteStoreMode;
pub use store::SqliteSyncMode;
pub use translate::translate_create_table;
