// crates/gamestat-store-sqlite/tests/proptest_translate.rs
// ============================================================================
// Module: Creation DDL Translation Property Tests
// Description: Property tests for translating creation bodies to SQLite.
// Purpose: Keep the physical column set aligned with the insertable fields.
// ============================================================================

//! Property-based tests: every generated creation body translates into DDL
//! that `SQLite` executes, and the resulting non-surrogate columns are exactly
//! the fields the insert path binds.

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

use std::fmt::Write;

use gamestat_core::core::extract_fields;
use gamestat_store_sqlite::translate_create_table;
use proptest::prelude::*;

fn column_type() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        Just("int(11) NOT NULL DEFAULT '0'"),
        Just("bigint(20) unsigned DEFAULT NULL"),
        Just("varchar(32) CHARACTER SET utf8 COLLATE utf8_bin NOT NULL DEFAULT ''"),
        Just("text"),
        Just("double DEFAULT NULL"),
        Just("timestamp NOT NULL DEFAULT CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP"),
    ]
}

fn comment() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(String::new()),
        "[a-z ]{0,12}".prop_map(|text| format!(" COMMENT '{text}'")),
        (
            "[a-z ]{0,6}",
            "[a-z ]{0,6}",
            prop_oneof![Just("AUTO_INCREMENT"), Just("auto_increment")],
        )
            .prop_map(|(before, after, marker)| format!(" COMMENT '{before}{marker}{after}'")),
    ]
}

fn body(with_id: bool, columns: &[(&str, String)], unique: bool) -> String {
    let mut body = String::new();
    if with_id {
        body.push_str("  `id` bigint(20) unsigned NOT NULL AUTO_INCREMENT,\n");
    }
    for (index, (kind, comment)) in columns.iter().enumerate() {
        writeln!(body, "  `c{index}` {kind}{comment},").unwrap();
    }
    if with_id {
        body.push_str("  PRIMARY KEY (`id`),\n");
    }
    if unique {
        body.push_str("  UNIQUE KEY `c0` (`c0`),\n");
    }
    body.push_str("  KEY `c0_idx` (`c0`)\n) ENGINE=InnoDB DEFAULT CHARSET=utf8");
    body
}

proptest! {
    #[test]
    fn translated_tables_expose_exactly_the_insertable_fields(
        with_id in any::<bool>(),
        unique in any::<bool>(),
        columns in prop::collection::vec((column_type(), comment()), 1 .. 6),
    ) {
        let body = body(with_id, &columns, unique);
        let statement = translate_create_table("generated", &body).unwrap();
        let connection = rusqlite::Connection::open_in_memory().unwrap();
        connection.execute_batch(&statement).unwrap();

        let physical: Vec<String> = connection
            .prepare("SELECT * FROM `generated`")
            .unwrap()
            .column_names()
            .into_iter()
            .map(str::to_string)
            .collect();
        let fields = extract_fields(&body);
        let expected: Vec<String> = (0 .. columns.len()).map(|index| format!("c{index}")).collect();
        prop_assert_eq!(&fields, &expected);
        let surrogate = usize::from(with_id);
        prop_assert_eq!(physical.len(), fields.len() + surrogate);
        prop_assert_eq!(&physical[surrogate ..], fields.as_slice());
    }

    #[test]
    fn translation_never_panics(body in "\\PC{0,200}") {
        let _ = translate_create_table("t", &body);
    }
}
