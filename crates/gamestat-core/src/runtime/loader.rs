// crates/gamestat-core/src/runtime/loader.rs
// ============================================================================
// Module: Bulk Loader
// Description: Builds the external client command for bulk CSV ingestion.
// Purpose: Hand large loads to the database's native loader.
// Dependencies: crate::{core, interfaces}, crate::runtime::{error, log, ...}
// ============================================================================

//! ## Overview
//! [`BulkLoader::command`] ensures the dated target table exists and returns
//! a shell command line for the `mysql` client performing a
//! `LOAD DATA LOCAL INFILE ... IGNORE` into it. The command is only built,
//! never executed; duplicate-key rows are skipped by the server.
//!
//! Every piece spliced into the command is checked first: user, host and
//! the CSV path must be free of quoting and shell metacharacters, while the
//! database name and column overrides must be plain identifiers (so neither
//! can be read as a client option). A password that is not shell-safe is
//! single-quoted.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt::Write;

use crate::core::SchemaDefinition;
use crate::core::Shard;
use crate::core::physical_table_name;
use crate::core::validate_identifier;
use crate::interfaces::CredentialSource;
use crate::runtime::error::DdlError;
use crate::runtime::log::DdlLogEvent;
use crate::runtime::log::DdlLogSink;
use crate::runtime::materializer::TableMaterializer;
use crate::runtime::pool::ConnectionPool;
use crate::runtime::pool::resolve_credentials;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Client binary invoked by the generated command.
pub const CLIENT_BINARY: &str = "mysql";

/// Characters that must not appear in the CSV path.
const CSV_PATH_FORBIDDEN: &[char] = &['\'', '"', '`', '\\', '$', '\n', '\r', '\0'];

// ============================================================================
// SECTION: Types
// ============================================================================

/// Parameters of one bulk-load command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadRequest {
    /// Path of the CSV file on the machine running the client.
    pub csv_path: String,
    /// Tenant and date selecting the physical table.
    pub shard: Shard,
    /// Physical database name overriding the configured one.
    pub database_override: Option<String>,
    /// Number of leading CSV lines to skip.
    pub ignore_lines: Option<u32>,
    /// Column list overriding the schema's field list.
    pub fields: Option<Vec<String>>,
}

impl LoadRequest {
    /// Creates a request for `csv_path` into the table selected by `shard`.
    #[must_use]
    pub fn new(csv_path: impl Into<String>, shard: Shard) -> Self {
        Self {
            csv_path: csv_path.into(),
            shard,
            ..Self::default()
        }
    }

    /// Overrides the physical database name.
    #[must_use]
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database_override = Some(database.into());
        self
    }

    /// Skips `lines` leading lines (typically a header row).
    #[must_use]
    pub const fn with_ignore_lines(mut self, lines: u32) -> Self {
        self.ignore_lines = Some(lines);
        self
    }

    /// Overrides the loaded column list.
    #[must_use]
    pub fn with_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }
}

/// Builds bulk-load commands.
pub struct BulkLoader<'a> {
    /// Connection source used to materialize the target table.
    pool: &'a ConnectionPool,
    /// Credentials rendered into the command.
    credentials: &'a dyn CredentialSource,
    /// Event sink.
    sink: &'a dyn DdlLogSink,
}

impl<'a> BulkLoader<'a> {
    /// Creates a loader.
    #[must_use]
    pub const fn new(
        pool: &'a ConnectionPool,
        credentials: &'a dyn CredentialSource,
        sink: &'a dyn DdlLogSink,
    ) -> Self {
        Self {
            pool,
            credentials,
            sink,
        }
    }

    /// Ensures the target table and returns the load command line.
    ///
    /// # Errors
    ///
    /// Returns [`DdlError::InvalidLoadCommand`] when an input cannot be
    /// rendered safely, [`DdlError::InvalidIdentifier`] when the database or
    /// a column is not a plain name, [`DdlError::MissingCredential`] when
    /// credentials are incomplete, and the errors of
    /// [`TableMaterializer::ensure`].
    pub fn command(
        &self,
        schema: &SchemaDefinition,
        request: &LoadRequest,
    ) -> Result<String, DdlError> {
        let credentials = resolve_credentials(self.credentials, schema.database())?;
        let db = request.database_override.clone().unwrap_or(credentials.db);
        require_shell_safe("user", &credentials.user)?;
        require_shell_safe("host", &credentials.host)?;
        validate_identifier("database", &db)?;
        if request.csv_path.is_empty() || request.csv_path.contains(CSV_PATH_FORBIDDEN) {
            return Err(DdlError::InvalidLoadCommand(
                "csv path is empty or contains quoting characters".to_string(),
            ));
        }
        let fields = match &request.fields {
            Some(fields) => fields.as_slice(),
            None => schema.fields(),
        };
        if fields.is_empty() {
            return Err(DdlError::InvalidLoadCommand(format!(
                "no columns to load into {}",
                schema.name()
            )));
        }
        for field in fields {
            validate_identifier("column", field)?;
        }
        TableMaterializer::new(self.pool, self.sink).ensure(schema, &request.shard)?;
        let table = physical_table_name(schema, &request.shard)?;

        let mut command = format!("{CLIENT_BINARY} -u{}", credentials.user);
        if !credentials.password.is_empty() {
            let _ = write!(command, " -p{}", shell_word(&credentials.password));
        }
        let _ = write!(
            command,
            " -h {} {db} --local-infile=1 -e \"load data local infile '{}' ignore into table \
             \\`{table}\\` character set utf8 fields terminated by ',' optionally enclosed by \
             '\\\"' escaped by '\\\"' lines terminated by '\\n'",
            credentials.host, request.csv_path
        );
        if let Some(lines) = request.ignore_lines {
            let _ = write!(command, " ignore {lines} lines");
        }
        let _ = write!(command, " ({});\"", fields.join(","));

        self.sink.record(
            &DdlLogEvent::info(
                "load_command_built",
                format!("load {} into {table}", request.csv_path),
            )
            .with_table(&table)
            .with_database(schema.database()),
        );
        Ok(command)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns true when `value` needs no shell quoting.
#[must_use]
pub fn is_shell_safe(value: &str) -> bool {
    !value.is_empty()
        && value.chars().all(|ch| {
            ch.is_ascii_alphanumeric()
                || matches!(ch, '_' | '-' | '.' | ':' | '@' | '%' | '+' | '=' | ',' | '/')
        })
}

/// Rejects values that would need quoting on the command line.
fn require_shell_safe(kind: &str, value: &str) -> Result<(), DdlError> {
    if is_shell_safe(value) {
        Ok(())
    } else {
        Err(DdlError::InvalidLoadCommand(format!("{kind} needs shell quoting")))
    }
}

/// Renders `value` as one shell word, single-quoting when required.
fn shell_word(value: &str) -> String {
    if is_shell_safe(value) {
        value.to_string()
    } else {
        format!("'{}'", value.replace('\'', r"'\''"))
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
