// crates/gamestat-config/src/lib.rs
// ============================================================================
// Module: Gamestat Config Crate
// Description: Configuration model, loading and runtime wiring.
// Purpose: Turn `gamestat.toml` into a ready-to-use DDL handle.
// Dependencies: gamestat-core, gamestat-store-sqlite, serde, thiserror, toml
// ============================================================================

//! ## Overview
//! See [`config::GamestatConfig`] for the file format and load rules.

pub mod config;

pub use config::ConfigError;
pub use config::DatabaseConfig;
pub use config::GamestatConfig;
pub use config::LogSinkKind;
pub use config::LoggingConfig;
