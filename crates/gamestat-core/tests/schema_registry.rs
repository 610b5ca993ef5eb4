// crates/gamestat-core/tests/schema_registry.rs
// ============================================================================
// Module: Schema Registry Tests
// Description: Registration, duplicate handling and legacy alias lookup.
// Purpose: Ensure first-wins registration and alias namespaces stay separate.
// ============================================================================

//! Schema registry behaviour tests.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use gamestat_core::DdlError;
use gamestat_core::LogicalDb;
use gamestat_core::SchemaDefinition;
use gamestat_core::runtime::LogLevel;
use gamestat_core::runtime::MemoryLogSink;
use gamestat_core::runtime::Registration;
use gamestat_core::runtime::SchemaRegistry;

const FIRST: &str = "  `a` int(11) NOT NULL,\n) ENGINE=InnoDB";
const SECOND: &str = "  `b` int(11) NOT NULL,\n) ENGINE=InnoDB";

#[test]
fn duplicate_name_keeps_the_first_definition_and_warns() {
    let sink = MemoryLogSink::new();
    let mut registry = SchemaRegistry::new();
    assert_eq!(registry.register(SchemaDefinition::model("t", FIRST), &sink), Registration::Registered);
    assert_eq!(registry.register(SchemaDefinition::model("t", SECOND), &sink), Registration::Duplicate);

    assert_eq!(registry.len(), 1);
    assert_eq!(registry.resolve("t").unwrap().fields(), ["a"]);
    let warnings = sink.events_named("schema_duplicate");
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].level, LogLevel::Warning);
}

#[test]
fn unknown_name_resolves_to_error() {
    let registry = SchemaRegistry::new();
    assert!(registry.is_empty());
    assert!(registry.get("missing").is_none());
    assert_eq!(registry.resolve("missing").err(), Some(DdlError::UnknownTable("missing".into())));
}

#[test]
fn unsafe_table_names_are_rejected() {
    let sink = MemoryLogSink::new();
    let mut registry = SchemaRegistry::new();
    let outcome = registry.register(SchemaDefinition::model("bad-name", FIRST), &sink);
    assert_eq!(outcome, Registration::Rejected);
    assert!(registry.is_empty());
    assert_eq!(sink.events_named("schema_rejected").len(), 1);
}

#[test]
fn legacy_namespaces_are_independent() {
    let sink = MemoryLogSink::new();
    let registry = SchemaRegistry::from_schemas(
        [
            SchemaDefinition::model("login", FIRST).with_legacy_v1("login").with_legacy_v2("user_login"),
            SchemaDefinition::model("logout", SECOND).with_legacy_v2("login"),
        ],
        &sink,
    );
    assert_eq!(registry.resolve_legacy_v1("login").unwrap().name(), "login");
    assert_eq!(registry.resolve_legacy_v2("user_login").unwrap().name(), "login");
    assert_eq!(registry.resolve_legacy_v2("login").unwrap().name(), "logout");
    assert!(registry.resolve_legacy_v1("user_login").is_none());
}

#[test]
fn conflicting_alias_keeps_the_first_mapping() {
    let sink = MemoryLogSink::new();
    let registry = SchemaRegistry::from_schemas(
        [
            SchemaDefinition::model("a", FIRST).with_legacy_v1("old"),
            SchemaDefinition::model("b", SECOND).with_legacy_v1("old"),
        ],
        &sink,
    );
    assert_eq!(registry.len(), 2);
    assert_eq!(registry.resolve_legacy_v1("old").unwrap().name(), "a");
    assert_eq!(sink.events_named("schema_alias_duplicate").len(), 1);
}

#[test]
fn global_registry_holds_the_builtin_catalog() {
    let registry = SchemaRegistry::global();
    let names: Vec<&str> = registry.names().collect();
    assert_eq!(names, ["all_user", "gold_consume_day", "login", "props_get_day"]);

    let login = registry.resolve("login").unwrap();
    assert_eq!(login.database(), LogicalDb::Store);
    assert!(login.is_tenant_sharded());
    let merge = registry.resolve("props_get_day").unwrap();
    assert_eq!(merge.database(), LogicalDb::Analyse);
    assert!(!merge.is_tenant_sharded());
    assert_eq!(merge.tenant_column(), "gameid");
}
