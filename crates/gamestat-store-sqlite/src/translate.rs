// crates/gamestat-store-sqlite/src/translate.rs
// ============================================================================
// Module: Creation DDL Translation
// Description: Rewrites MySQL-flavoured creation bodies into SQLite DDL.
// Purpose: Let catalog schemas materialize on the embedded backend.
// Dependencies: crate::store, gamestat-core
// ============================================================================

//! ## Overview
//! Schema bodies are written for the production server: one definition per
//! line, backtick-quoted names, `AUTO_INCREMENT` surrogate keys, `KEY` lines,
//! column `COMMENT`s and an `ENGINE=...` trailer. The translator walks the
//! body line by line:
//!
//! - column lines lose MySQL-only attributes (`unsigned`, `zerofill`,
//!   `COMMENT`, `CHARACTER SET`, `COLLATE`, `ON UPDATE`); an
//!   `AUTO_INCREMENT` column becomes `INTEGER PRIMARY KEY AUTOINCREMENT`;
//! - `PRIMARY KEY` is kept unless the auto-increment column already is one;
//! - `UNIQUE KEY name (cols)` becomes a table-level `UNIQUE (cols)`;
//! - plain `KEY`/`INDEX` lines become `CREATE INDEX IF NOT EXISTS`;
//! - the closing `)` line and everything after it are dropped.

// ============================================================================
// SECTION: Imports
// ============================================================================

use gamestat_core::core::definition_tokens;
use gamestat_core::core::is_auto_increment_column;

use crate::store::SqliteStoreError;

// ============================================================================
// SECTION: Translation
// ============================================================================

/// Translates a creation body into `SQLite` statements creating `table`.
///
/// The result is a batch: the `CREATE TABLE IF NOT EXISTS` statement followed
/// by one `CREATE INDEX IF NOT EXISTS` per secondary key.
///
/// # Errors
///
/// Returns [`SqliteStoreError::Invalid`] when the body has no column lines.
pub fn translate_create_table(table: &str, create_sql: &str) -> Result<String, SqliteStoreError> {
    let mut columns = Vec::new();
    let mut constraints = Vec::new();
    let mut indexes = Vec::new();
    let mut primary_key = None;
    let mut has_autoincrement = false;

    for raw in create_sql.lines() {
        let line = raw.trim().trim_end_matches(',').trim_end();
        if line.is_empty() {
            continue;
        }
        if line.starts_with(')') {
            break;
        }
        let upper = line.to_ascii_uppercase();
        if line.starts_with('`') {
            let (definition, autoincrement) = translate_column(line);
            has_autoincrement |= autoincrement;
            columns.push(definition);
        } else if upper.starts_with("PRIMARY KEY") {
            primary_key = Some(line.to_string());
        } else if upper.starts_with("UNIQUE") {
            if let Some(cols) = column_list(line) {
                constraints.push(format!("UNIQUE {cols}"));
            }
        } else if upper.starts_with("KEY") || upper.starts_with("INDEX") {
            if let Some(cols) = column_list(line) {
                let name = quoted_name(line).unwrap_or_else(|| format!("idx{}", indexes.len()));
                indexes.push(format!(
                    "CREATE INDEX IF NOT EXISTS `{table}__{name}` ON `{table}` {cols};"
                ));
            }
        } else if !(upper.starts_with("FULLTEXT") || upper.starts_with("SPATIAL")) {
            constraints.push(line.to_string());
        }
    }

    if columns.is_empty() {
        return Err(SqliteStoreError::Invalid(format!(
            "creation ddl for {table} has no column definitions"
        )));
    }
    let mut items = columns;
    if !has_autoincrement && let Some(primary_key) = primary_key {
        items.push(primary_key);
    }
    items.extend(constraints);

    let mut statement =
        format!("CREATE TABLE IF NOT EXISTS `{table}` (\n  {}\n);", items.join(",\n  "));
    for index in indexes {
        statement.push('\n');
        statement.push_str(&index);
    }
    Ok(statement)
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Translates one column line; reports whether it was the auto-increment key.
fn translate_column(line: &str) -> (String, bool) {
    let tokens = definition_tokens(line);
    if is_auto_increment_column(line) {
        let name = tokens.first().map_or("", String::as_str);
        return (format!("{name} INTEGER PRIMARY KEY AUTOINCREMENT"), true);
    }
    let mut kept: Vec<&str> = Vec::with_capacity(tokens.len());
    let mut index = 0;
    while index < tokens.len() {
        let token = tokens[index].as_str();
        let next = tokens.get(index + 1).map(String::as_str);
        let skip = if token.eq_ignore_ascii_case("unsigned") || token.eq_ignore_ascii_case("zerofill")
        {
            1
        } else if ["COMMENT", "COLLATE", "CHARSET"]
            .iter()
            .any(|keyword| token.eq_ignore_ascii_case(keyword))
        {
            2
        } else if (token.eq_ignore_ascii_case("CHARACTER")
            && next.is_some_and(|next| next.eq_ignore_ascii_case("SET")))
            || (token.eq_ignore_ascii_case("ON")
                && next.is_some_and(|next| next.eq_ignore_ascii_case("UPDATE")))
        {
            3
        } else {
            kept.push(token);
            1
        };
        index += skip;
    }
    (kept.join(" "), false)
}

/// Returns the parenthesised column list of a key line, parentheses included.
fn column_list(line: &str) -> Option<String> {
    let start = line.find('(')?;
    let end = line.rfind(')')?;
    (end > start).then(|| line[start ..= end].to_string())
}

/// Returns the first backtick-quoted name on a key line.
fn quoted_name(line: &str) -> Option<String> {
    let start = line.find('`')? + 1;
    let len = line[start ..].find('`')?;
    let name = &line[start .. start + len];
    (!name.is_empty() && name.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '_'))
        .then(|| name.to_string())
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::translate_column;

    #[test]
    fn column_translation_strips_mysql_attributes() {
        assert_eq!(
            translate_column("`n` varchar(8) CHARACTER SET utf8 COLLATE utf8_bin NOT NULL DEFAULT ''"),
            ("`n` varchar(8) NOT NULL DEFAULT ''".to_string(), false)
        );
        assert_eq!(
            translate_column("`id` bigint(20) unsigned NOT NULL AUTO_INCREMENT"),
            ("`id` INTEGER PRIMARY KEY AUTOINCREMENT".to_string(), true)
        );
        assert_eq!(
            translate_column("`note` varchar(10) COMMENT 'replaces auto_increment seq'"),
            ("`note` varchar(10)".to_string(), false)
        );
    }
}
