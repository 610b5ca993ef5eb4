// crates/gamestat-core/src/core/catalog.rs
// ============================================================================
// Module: Gamestat Built-in Catalog
// Description: Static declarations of the tables the ingestion pipeline uses.
// Purpose: Feed the schema registry at process start.
// Dependencies: crate::core::schema
// ============================================================================

//! ## Overview
//! Creation DDL bodies are written in the MySQL dialect used by the production
//! stores. Each body starts after `CREATE TABLE name (` and ends with the
//! closing parenthesis plus table options. Column lines start with a
//! backtick-quoted name so [`crate::core::schema::extract_fields`] can derive
//! the insert column order from them.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::schema::SchemaDefinition;

// ============================================================================
// SECTION: DDL Bodies
// ============================================================================

/// All users ever seen per tenant, unique on platform account.
pub const ALL_USER_SQL: &str = "\
  `id` bigint(20) unsigned NOT NULL AUTO_INCREMENT,
  `openid` varchar(100) NOT NULL COMMENT 'platform account',
  `snid` int(11) NOT NULL COMMENT 'platform id',
  `login_time` int(11) DEFAULT NULL,
  PRIMARY KEY (`id`),
  UNIQUE KEY `openid_snid` (`openid`,`snid`),
  KEY `login_time` (`login_time`)
) ENGINE=InnoDB DEFAULT CHARSET=utf8 COMMENT='all users'";

/// Raw login log rows per tenant.
pub const LOGIN_SQL: &str = "\
  `id` bigint(20) unsigned NOT NULL AUTO_INCREMENT,
  `openid` varchar(100) NOT NULL COMMENT 'platform account',
  `snid` int(11) NOT NULL COMMENT 'platform id',
  `clientid` int(11) NOT NULL COMMENT 'server id',
  `roleid` varchar(64) NOT NULL DEFAULT '' COMMENT 'role id',
  `ip` varchar(64) NOT NULL DEFAULT '',
  `login_time` int(11) NOT NULL,
  PRIMARY KEY (`id`),
  KEY `openid` (`openid`),
  KEY `login_time` (`login_time`)
) ENGINE=InnoDB DEFAULT CHARSET=utf8 COMMENT='login log'";

/// Daily item production aggregates.
pub const PROPS_GET_DAY_SQL: &str = "\
  `id` bigint(20) unsigned NOT NULL AUTO_INCREMENT,
  `ds` date DEFAULT NULL,
  `dimension` smallint(6) DEFAULT NULL COMMENT 'dau 1, new 2, first pay 3, revenue 4, paid 7',
  `gameid` varchar(32) NOT NULL COMMENT 'game id',
  `clientid` int(11) NOT NULL COMMENT 'server id',
  `propsid` varchar(200) NOT NULL COMMENT 'item id',
  `type` varchar(200) NOT NULL COMMENT 'item trait (bind, unbind)',
  `get_wayid` int(11) NOT NULL COMMENT 'source',
  `get_wayclassid` int(11) NOT NULL COMMENT 'source class (quest, auction)',
  `total_cnt` int(11) NOT NULL COMMENT 'times',
  `unique_cnt` int(11) NOT NULL COMMENT 'players',
  `props_sum` int(11) NOT NULL COMMENT 'items produced',
  PRIMARY KEY (`id`),
  KEY `dx1` (`ds`,`gameid`,`dimension`, `clientid`)
) ENGINE=InnoDB DEFAULT CHARSET=utf8 COMMENT='daily item production'";

/// Daily gold consumption aggregates.
pub const GOLD_CONSUME_DAY_SQL: &str = "\
  `id` bigint(20) unsigned NOT NULL AUTO_INCREMENT,
  `ds` date DEFAULT NULL,
  `dimension` smallint(6) DEFAULT NULL COMMENT 'dau 1, new 2, first pay 3, revenue 4, paid 7',
  `gameid` varchar(32) NOT NULL COMMENT 'game id',
  `clientid` int(11) NOT NULL COMMENT 'server id',
  `goodsid` int(11) NOT NULL COMMENT 'goods id',
  `consume_wayid` int(11) NOT NULL COMMENT 'sink',
  `consume_wayclassid` int(11) NOT NULL COMMENT 'sink class (quest, auction)',
  `total_cnt` bigint(20) NOT NULL COMMENT 'times',
  `unique_cnt` int(11) NOT NULL COMMENT 'players',
  `gold_sum` bigint(20) NOT NULL COMMENT 'gold spent',
  `poundage` bigint(20) NOT NULL COMMENT 'fees',
  `goodsnum` bigint(20) NOT NULL COMMENT 'goods bought',
  PRIMARY KEY (`id`),
  KEY `dx1` (`ds`,`gameid`,`dimension`, `clientid`, `goodsid`, `consume_wayclassid`)
) ENGINE=InnoDB DEFAULT CHARSET=utf8 COMMENT='daily gold consumption'";

// ============================================================================
// SECTION: Catalog
// ============================================================================

/// Returns every built-in schema in declaration order.
#[must_use]
pub fn builtin_schemas() -> Vec<SchemaDefinition> {
    vec![
        SchemaDefinition::model("all_user", ALL_USER_SQL),
        SchemaDefinition::model("login", LOGIN_SQL)
            .with_default("roleid", "")
            .with_default("ip", "")
            .with_legacy_v1("login")
            .with_legacy_v2("user_login"),
        SchemaDefinition::merge("props_get_day", PROPS_GET_DAY_SQL)
            .with_legacy_v1("props_get_day")
            .with_legacy_v2("props_get_day"),
        SchemaDefinition::merge("gold_consume_day", GOLD_CONSUME_DAY_SQL)
            .with_legacy_v1("gold_consume_day")
            .with_legacy_v2("gold_consume_day"),
    ]
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::builtin_schemas;

    #[test]
    fn builtin_schemas_have_fields_and_plain_identifiers() {
        for schema in builtin_schemas() {
            assert!(!schema.fields().is_empty(), "{} has no fields", schema.name());
            assert!(!schema.fields().iter().any(|field| field == "id"));
            assert_eq!(schema.validate(), Ok(()), "{}", schema.name());
        }
    }

    #[test]
    fn all_user_field_order_matches_ddl() {
        let schemas = builtin_schemas();
        let all_user = schemas.iter().find(|schema| schema.name() == "all_user");
        let fields = all_user.map(|schema| schema.fields().to_vec()).unwrap_or_default();
        assert_eq!(fields, vec!["openid", "snid", "login_time"]);
    }
}
