// crates/gamestat-core/src/runtime/pool.rs
// ============================================================================
// Module: Connection Pool
// Description: Lazily-created, cached connection per logical database.
// Purpose: Share exactly one connection per logical database process-wide.
// Dependencies: crate::{core, interfaces}, crate::runtime::{error, log}
// ============================================================================

//! ## Overview
//! [`ConnectionPool`] resolves credentials and opens a connection the first
//! time a logical database is requested, then hands out the cached handle.
//! Construction happens while the cache lock is held, so concurrent first
//! requests for the same database still produce a single connection. The
//! cache is never invalidated implicitly; [`ConnectionPool::close_all`] is the
//! explicit teardown.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;

use crate::core::LogicalDb;
use crate::interfaces::Connection;
use crate::interfaces::ConnectionFactory;
use crate::interfaces::CredentialField;
use crate::interfaces::CredentialSource;
use crate::interfaces::Credentials;
use crate::runtime::error::DdlError;
use crate::runtime::log::DdlLogEvent;
use crate::runtime::log::DdlLogSink;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Per-logical-database connection cache.
///
/// # Invariants
/// - At most one live connection per [`LogicalDb`].
/// - At most one table materialization runs at a time.
pub struct ConnectionPool {
    /// Builds new connections.
    factory: Arc<dyn ConnectionFactory>,
    /// Credential lookup.
    credentials: Arc<dyn CredentialSource>,
    /// Event sink.
    sink: Arc<dyn DdlLogSink>,
    /// Cached connections.
    connections: Mutex<BTreeMap<LogicalDb, Arc<dyn Connection>>>,
    /// Serializes existence probes with the creation that follows them.
    creation: Mutex<()>,
}

impl ConnectionPool {
    /// Creates an empty pool.
    #[must_use]
    pub fn new(
        factory: Arc<dyn ConnectionFactory>,
        credentials: Arc<dyn CredentialSource>,
        sink: Arc<dyn DdlLogSink>,
    ) -> Self {
        Self {
            factory,
            credentials,
            sink,
            connections: Mutex::new(BTreeMap::new()),
            creation: Mutex::new(()),
        }
    }

    /// Returns the connection for `database`, opening it on first use.
    ///
    /// # Errors
    ///
    /// Returns [`DdlError::MissingCredential`] when a credential attribute is
    /// absent and [`DdlError::Connection`] when the factory cannot connect.
    pub fn connection(&self, database: LogicalDb) -> Result<Arc<dyn Connection>, DdlError> {
        let mut connections = self
            .connections
            .lock()
            .map_err(|_| DdlError::State("connection pool mutex poisoned".to_string()))?;
        if let Some(connection) = connections.get(&database) {
            return Ok(Arc::clone(connection));
        }
        let credentials = resolve_credentials(self.credentials.as_ref(), database)?;
        self.sink.record(
            &DdlLogEvent::info(
                "connection_init",
                format!("opening connection to {}@{}", credentials.db, credentials.host),
            )
            .with_database(database),
        );
        let connection = self.factory.connect(database, &credentials).map_err(|err| {
            self.sink.record(
                &DdlLogEvent::error("connection_failed", err.to_string()).with_database(database),
            );
            DdlError::connection(database, err)
        })?;
        connections.insert(database, Arc::clone(&connection));
        drop(connections);
        Ok(connection)
    }

    /// Returns true when a connection for `database` is cached.
    #[must_use]
    pub fn is_connected(&self, database: LogicalDb) -> bool {
        self.connections.lock().is_ok_and(|connections| connections.contains_key(&database))
    }

    /// Holds the table-creation lock until the guard drops.
    ///
    /// The lock protects no data, so a poisoned lock is simply reacquired.
    pub(crate) fn creation_guard(&self) -> MutexGuard<'_, ()> {
        self.creation.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Drops every cached connection.
    ///
    /// Handles already given out stay usable until their holders drop them.
    /// A poisoned cache is still cleared, which also lets later callers
    /// reconnect.
    pub fn close_all(&self) {
        let mut connections = self.connections.lock().unwrap_or_else(PoisonError::into_inner);
        connections.clear();
        drop(connections);
        self.connections.clear_poison();
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves all credential attributes for `database`.
///
/// # Errors
///
/// Returns [`DdlError::MissingCredential`] for the first absent attribute.
pub fn resolve_credentials(
    source: &dyn CredentialSource,
    database: LogicalDb,
) -> Result<Credentials, DdlError> {
    let lookup = |field: CredentialField| {
        source.credential(database, field).ok_or(DdlError::MissingCredential {
            database,
            field: field.as_str(),
        })
    };
    Ok(Credentials {
        host: lookup(CredentialField::Host)?,
        user: lookup(CredentialField::User)?,
        password: lookup(CredentialField::Password)?,
        db: lookup(CredentialField::Db)?,
    })
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic,
        clippy::unwrap_used,
        reason = "Test assertions use unwrap and a deliberate panic."
    )]

    use std::sync::Arc;
    use std::thread;

    use super::ConnectionPool;
    use crate::core::LogicalDb;
    use crate::core::Record;
    use crate::core::Value;
    use crate::interfaces::Connection;
    use crate::interfaces::ConnectionError;
    use crate::interfaces::ConnectionFactory;
    use crate::interfaces::Credentials;
    use crate::interfaces::StaticCredentials;
    use crate::runtime::error::DdlError;
    use crate::runtime::log::NoopLogSink;

    /// Connection that accepts everything and stores nothing.
    struct NullConnection;

    impl Connection for NullConnection {
        fn table_exists(&self, _table: &str) -> Result<bool, ConnectionError> {
            Ok(true)
        }

        fn create_table(&self, _table: &str, _create_sql: &str) -> Result<(), ConnectionError> {
            Ok(())
        }

        fn execute(&self, _sql: &str, _params: &[Value]) -> Result<u64, ConnectionError> {
            Ok(0)
        }

        fn query(&self, _sql: &str, _params: &[Value]) -> Result<Vec<Record>, ConnectionError> {
            Ok(Vec::new())
        }
    }

    /// Factory handing out [`NullConnection`]s.
    struct NullFactory;

    impl ConnectionFactory for NullFactory {
        fn connect(
            &self,
            _database: LogicalDb,
            _credentials: &Credentials,
        ) -> Result<Arc<dyn Connection>, ConnectionError> {
            Ok(Arc::new(NullConnection))
        }
    }

    /// Pool with credentials for the store database only.
    fn pool() -> ConnectionPool {
        let credentials = Credentials {
            host: "h".to_string(),
            user: "u".to_string(),
            password: String::new(),
            db: "d".to_string(),
        };
        ConnectionPool::new(
            Arc::new(NullFactory),
            Arc::new(StaticCredentials::new().with(LogicalDb::Store, credentials)),
            Arc::new(NoopLogSink),
        )
    }

    #[test]
    fn close_all_clears_a_poisoned_cache() {
        let pool = pool();
        pool.connection(LogicalDb::Store).unwrap();
        thread::scope(|scope| {
            let poisoner = scope.spawn(|| {
                let _guard = pool.connections.lock();
                panic!("poison the connection cache");
            });
            assert!(poisoner.join().is_err());
        });
        assert!(matches!(pool.connection(LogicalDb::Store), Err(DdlError::State(_))));

        pool.close_all();
        assert!(!pool.is_connected(LogicalDb::Store));
        pool.connection(LogicalDb::Store).unwrap();
        assert!(pool.is_connected(LogicalDb::Store));
    }
}
