// crates/gamestat-store-sqlite/tests/sqlite_backend.rs
// ============================================================================
// Module: SQLite Backend Integration Tests
// Description: End-to-end DDL runtime behaviour on the embedded backend.
// Purpose: Validate materialization, upsert convergence, destructive
//          operations and on-disk persistence against real SQLite.
// ============================================================================

//! ## Overview
//! Drives [`gamestat_core::Ddl`] through [`SqliteConnectionFactory`]:
//! - Catalog bodies translate and execute on `SQLite`
//! - Table materialization is idempotent
//! - Upserts converge to one row per key, and a unique key is the only
//!   guard when the existence probe goes stale
//! - Confirmed and declined destructive operations
//! - On-disk databases survive reconnects

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

use std::collections::BTreeMap;
use std::sync::Arc;
use std::thread;

use gamestat_core::Ddl;
use gamestat_core::LogicalDb;
use gamestat_core::Record;
use gamestat_core::SchemaDefinition;
use gamestat_core::Shard;
use gamestat_core::TenantId;
use gamestat_core::Value;
use gamestat_core::core::Filter;
use gamestat_core::core::builtin_schemas;
use gamestat_core::core::record;
use gamestat_core::interfaces::Confirmed;
use gamestat_core::interfaces::Connection;
use gamestat_core::interfaces::ConnectionError;
use gamestat_core::interfaces::ConnectionFactory;
use gamestat_core::interfaces::Credentials;
use gamestat_core::interfaces::Declined;
use gamestat_core::interfaces::StaticCredentials;
use gamestat_core::runtime::DestructiveOutcome;
use gamestat_core::runtime::EnsureOutcome;
use gamestat_core::runtime::MemoryLogSink;
use gamestat_core::runtime::SchemaRegistry;
use gamestat_store_sqlite::SqliteBackendConfig;
use gamestat_store_sqlite::SqliteConnectionFactory;
use gamestat_store_sqlite::translate_create_table;
use tempfile::TempDir;

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Per-tenant table without any unique key.
const VISIT_SQL: &str = "\
  `id` bigint(20) unsigned NOT NULL AUTO_INCREMENT,
  `openid` varchar(100) NOT NULL,
  `visit_time` int(11) NOT NULL,
  PRIMARY KEY (`id`)
) ENGINE=InnoDB DEFAULT CHARSET=utf8";

/// Connection whose existence probe always reports no matching rows, as a
/// concurrent writer would observe before the other writer commits.
struct StaleProbe {
    inner: Arc<dyn Connection>,
}

impl Connection for StaleProbe {
    fn table_exists(&self, table: &str) -> Result<bool, ConnectionError> {
        self.inner.table_exists(table)
    }

    fn create_table(&self, table: &str, create_sql: &str) -> Result<(), ConnectionError> {
        self.inner.create_table(table, create_sql)
    }

    fn execute(&self, sql: &str, params: &[Value]) -> Result<u64, ConnectionError> {
        self.inner.execute(sql, params)
    }

    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Record>, ConnectionError> {
        self.inner.query(sql, params)
    }

    fn row_count(&self, _sql: &str, _params: &[Value]) -> Result<u64, ConnectionError> {
        Ok(0)
    }
}

struct StaleProbeFactory(SqliteConnectionFactory);

impl ConnectionFactory for StaleProbeFactory {
    fn connect(
        &self,
        database: LogicalDb,
        credentials: &Credentials,
    ) -> Result<Arc<dyn Connection>, ConnectionError> {
        let inner = self.0.connect(database, credentials)?;
        Ok(Arc::new(StaleProbe {
            inner,
        }))
    }
}

fn credentials() -> StaticCredentials {
    let entry = |db: &str| Credentials {
        host: "localhost".to_string(),
        user: "bi".to_string(),
        password: String::new(),
        db: db.to_string(),
    };
    StaticCredentials::new()
        .with(LogicalDb::Store, entry("bi_store"))
        .with(LogicalDb::Analyse, entry("bi_analyse"))
}

fn build(factory: Arc<dyn ConnectionFactory>) -> (Ddl, Arc<MemoryLogSink>) {
    let sink = Arc::new(MemoryLogSink::new());
    let mut schemas = builtin_schemas();
    schemas.push(SchemaDefinition::model("visit", VISIT_SQL));
    let registry = Arc::new(SchemaRegistry::from_schemas(schemas, sink.as_ref()));
    let ddl = Ddl::new(registry, factory, Arc::new(credentials()), sink.clone());
    (ddl, sink)
}

fn in_memory() -> (Ddl, Arc<MemoryLogSink>) {
    build(Arc::new(SqliteConnectionFactory::in_memory()))
}

fn rows(ddl: &Ddl, table: &str, physical: &str) -> Vec<Record> {
    ddl.query(table, &format!("SELECT * FROM `{physical}` ORDER BY `id`"), &[]).unwrap()
}

fn user(openid: &str, snid: i64, login_time: i64) -> Record {
    record([
        ("openid", Value::from(openid)),
        ("snid", Value::from(snid)),
        ("login_time", Value::from(login_time)),
    ])
}

fn props(gameid: &str, dimension: i64, ds: &str) -> Record {
    record([
        ("ds", Value::from(ds)),
        ("dimension", Value::from(dimension)),
        ("gameid", Value::from(gameid)),
        ("clientid", Value::from(1)),
        ("propsid", Value::from("sword")),
        ("type", Value::from("bind")),
        ("get_wayid", Value::from(3)),
        ("get_wayclassid", Value::from(4)),
        ("total_cnt", Value::from(10)),
        ("unique_cnt", Value::from(5)),
        ("props_sum", Value::from(20)),
    ])
}

// ============================================================================
// SECTION: Materialization
// ============================================================================

#[test]
fn catalog_bodies_translate_to_executable_sqlite() {
    let connection = rusqlite::Connection::open_in_memory().unwrap();
    for schema in builtin_schemas() {
        let statement = translate_create_table(schema.name(), schema.create_sql()).unwrap();
        connection.execute_batch(&statement).unwrap();
        connection.execute_batch(&statement).unwrap();
        let columns: Vec<String> = connection
            .prepare(&format!("SELECT * FROM `{}`", schema.name()))
            .unwrap()
            .column_names()
            .into_iter()
            .map(str::to_string)
            .collect();
        assert_eq!(columns[0], "id");
        assert_eq!(&columns[1 ..], schema.fields());
    }
}

#[test]
fn ensure_creates_once_then_reports_existing() {
    let (ddl, sink) = in_memory();
    let shard = Shard::daily("42", "20240101");
    assert_eq!(ddl.ensure_table("login", &shard).unwrap(), EnsureOutcome::Created);
    assert_eq!(ddl.ensure_table("login", &shard).unwrap(), EnsureOutcome::Existed);
    assert_eq!(sink.events_named("table_created").len(), 1);

    let connection = ddl.pool().connection(LogicalDb::Store).unwrap();
    assert!(connection.table_exists("42_login_20240101").unwrap());
    assert!(!connection.table_exists("42_login").unwrap());
}

#[test]
fn concurrent_ensure_creates_the_table_exactly_once() {
    let (ddl, sink) = in_memory();
    let shard = Shard::tenant("7");
    let outcomes: Vec<EnsureOutcome> = thread::scope(|scope| {
        let handles: Vec<_> = (0 .. 8)
            .map(|_| scope.spawn(|| ddl.ensure_table("login", &shard)))
            .collect();
        handles.into_iter().map(|handle| handle.join().unwrap().unwrap()).collect()
    });

    let created = outcomes.iter().filter(|outcome| **outcome == EnsureOutcome::Created).count();
    assert_eq!(created, 1, "{outcomes:?}");
    assert_eq!(outcomes.len(), 8);
    assert_eq!(sink.events_named("table_created").len(), 1);
    let tables = ddl
        .query(
            "login",
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?",
            &[Value::from("7_login")],
        )
        .unwrap();
    assert_eq!(tables.len(), 1);
}

// ============================================================================
// SECTION: Upserts
// ============================================================================

#[test]
fn insert_then_update_keeps_one_row_per_key() {
    let (ddl, _sink) = in_memory();
    let shard = Shard::tenant("42");
    ddl.insert("all_user", &[user("u1", 11, 100)], &shard).unwrap();
    ddl.update("all_user", &[user("u1", 11, 200)], &["openid", "snid"], &shard).unwrap();

    let stored = rows(&ddl, "all_user", "42_all_user");
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0]["login_time"], Value::Int(200));
    assert_eq!(stored[0]["openid"], Value::from("u1"));
}

#[test]
fn repeated_updates_converge() {
    let (ddl, _sink) = in_memory();
    let shard = Shard::daily("42", "20240101");
    for login_time in [100, 150, 300] {
        let batch = [user("u1", 11, login_time), user("u2", 11, login_time + 1)];
        ddl.update("all_user", &batch, &["openid", "snid"], &shard).unwrap();
    }
    let stored = rows(&ddl, "all_user", "42_all_user");
    assert_eq!(stored.len(), 2);
    assert_eq!(stored[0]["login_time"], Value::Int(300));
    assert_eq!(stored[1]["login_time"], Value::Int(301));
}

#[test]
fn concurrent_updates_of_one_key_leave_one_row_under_a_unique_key() {
    let (ddl, _sink) = in_memory();
    let shard = Shard::tenant("42");
    ddl.ensure_table("all_user", &shard).unwrap();
    thread::scope(|scope| {
        for writer in 0 .. 4 {
            let ddl = &ddl;
            let shard = &shard;
            scope.spawn(move || {
                let batch = [user("u1", 11, 100 + writer)];
                ddl.update("all_user", &batch, &["openid", "snid"], shard).unwrap();
            });
        }
    });
    assert_eq!(rows(&ddl, "all_user", "42_all_user").len(), 1);
}

#[test]
fn stale_probe_without_unique_key_duplicates_rows() {
    let (ddl, _sink) = build(Arc::new(StaleProbeFactory(SqliteConnectionFactory::in_memory())));
    let shard = Shard::tenant("42");
    let visit = record([("openid", Value::from("u1")), ("visit_time", Value::from(5))]);
    ddl.update("visit", &[visit.clone()], &["openid"], &shard).unwrap();
    ddl.update("visit", &[visit], &["openid"], &shard).unwrap();
    assert_eq!(rows(&ddl, "visit", "42_visit").len(), 2);
}

#[test]
fn stale_probe_with_unique_key_logs_the_losing_insert() {
    let (ddl, sink) = build(Arc::new(StaleProbeFactory(SqliteConnectionFactory::in_memory())));
    let shard = Shard::tenant("42");
    ddl.update("all_user", &[user("u1", 11, 100)], &["openid", "snid"], &shard).unwrap();
    ddl.update("all_user", &[user("u1", 11, 200)], &["openid", "snid"], &shard).unwrap();

    let stored = rows(&ddl, "all_user", "42_all_user");
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0]["login_time"], Value::Int(100));
    let failures = sink.events_named("insert_failed");
    assert_eq!(failures.len(), 1);
    assert!(failures[0].sql.as_deref().unwrap().contains("'u1'"));
}

#[test]
fn missing_fields_take_schema_defaults() {
    let (ddl, _sink) = in_memory();
    let login = record([
        ("openid", Value::from("u1")),
        ("snid", Value::from(11)),
        ("clientid", Value::from(7)),
    ]);
    ddl.insert("login", &[login], &Shard::daily("42", "20240101")).unwrap();
    let stored = rows(&ddl, "login", "42_login");
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0]["roleid"], Value::from(""));
    assert_eq!(stored[0]["ip"], Value::from(""));
    assert_eq!(stored[0]["login_time"], Value::Int(0));
}

// ============================================================================
// SECTION: Destructive Operations
// ============================================================================

#[test]
fn delete_removes_only_matching_tenant_rows() {
    let (ddl, _sink) = in_memory();
    let batch = [
        props("g1", 1, "2024-01-01"),
        props("g1", 2, "2024-01-01"),
        props("g1", 1, "2024-01-02"),
        props("g2", 1, "2024-01-01"),
    ];
    ddl.insert("props_get_day", &batch, &Shard::none()).unwrap();

    let filters = BTreeMap::from([
        ("dimension".to_string(), Filter::any_of([1, 2])),
        ("ds".to_string(), Filter::eq("2024-01-01")),
    ]);
    let tenants = [TenantId::new("g1")];
    let outcome = ddl.delete("props_get_day", &tenants, &filters, &Declined).unwrap();
    assert_eq!(outcome, DestructiveOutcome::Declined);
    assert_eq!(rows(&ddl, "props_get_day", "props_get_day").len(), 4);

    let outcome = ddl.delete("props_get_day", &tenants, &filters, &Confirmed).unwrap();
    assert_eq!(outcome, DestructiveOutcome::Issued);
    let remaining: Vec<(Value, Value)> = rows(&ddl, "props_get_day", "props_get_day")
        .into_iter()
        .map(|row| (row["gameid"].clone(), row["ds"].clone()))
        .collect();
    assert_eq!(
        remaining,
        [
            (Value::from("g1"), Value::from("2024-01-02")),
            (Value::from("g2"), Value::from("2024-01-01")),
        ]
    );
}

#[test]
fn delete_since_clears_rows_at_or_after_cutoff() {
    let (ddl, _sink) = in_memory();
    let shard = Shard::tenant("42");
    let batch = [user("u1", 1, 100), user("u2", 1, 200), user("u3", 1, 300)];
    ddl.insert("all_user", &batch, &shard).unwrap();

    let outcome = ddl.delete_since("all_user", &shard, 200, &Confirmed).unwrap();
    assert_eq!(outcome, DestructiveOutcome::Issued);
    let stored = rows(&ddl, "all_user", "42_all_user");
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0]["openid"], Value::from("u1"));
}

#[test]
fn drop_table_removes_the_dated_shard_only() {
    let (ddl, _sink) = in_memory();
    let dated = Shard::daily("42", "20240101");
    ddl.ensure_table("login", &dated).unwrap();
    ddl.ensure_table("login", &Shard::tenant("42")).unwrap();

    assert_eq!(ddl.drop_table("login", &dated, &Confirmed).unwrap(), DestructiveOutcome::Issued);
    let connection = ddl.pool().connection(LogicalDb::Store).unwrap();
    assert!(!connection.table_exists("42_login_20240101").unwrap());
    assert!(connection.table_exists("42_login").unwrap());
    assert_eq!(ddl.ensure_table("login", &dated).unwrap(), EnsureOutcome::Created);
}

// ============================================================================
// SECTION: Persistence
// ============================================================================

#[test]
fn on_disk_databases_survive_reconnect() {
    let dir = TempDir::new().unwrap();
    let factory = SqliteConnectionFactory::new(SqliteBackendConfig::on_disk(dir.path())).unwrap();
    let (ddl, _sink) = build(Arc::new(factory));
    let shard = Shard::tenant("42");
    ddl.insert("all_user", &[user("u1", 11, 100)], &shard).unwrap();
    ddl.close();
    assert!(!ddl.pool().is_connected(LogicalDb::Store));

    assert_eq!(ddl.ensure_table("all_user", &shard).unwrap(), EnsureOutcome::Existed);
    assert_eq!(rows(&ddl, "all_user", "42_all_user").len(), 1);
    assert!(dir.path().join("bi_store.sqlite3").is_file());
    assert!(!dir.path().join("bi_analyse.sqlite3").exists());
}

#[test]
fn in_memory_databases_are_lost_on_close() {
    let (ddl, _sink) = in_memory();
    let shard = Shard::tenant("42");
    ddl.insert("all_user", &[user("u1", 11, 100)], &shard).unwrap();
    ddl.close();
    assert_eq!(ddl.ensure_table("all_user", &shard).unwrap(), EnsureOutcome::Created);
}

#[test]
fn unsafe_database_names_are_unavailable() {
    let dir = TempDir::new().unwrap();
    let factory = SqliteConnectionFactory::new(SqliteBackendConfig::on_disk(dir.path())).unwrap();
    let credentials = Credentials {
        host: "localhost".to_string(),
        user: "bi".to_string(),
        password: String::new(),
        db: "../escape".to_string(),
    };
    assert!(matches!(
        factory.connect(LogicalDb::Store, &credentials),
        Err(ConnectionError::Unavailable(_))
    ));
    assert_eq!(factory.config().root.as_deref(), Some(dir.path()));
}
