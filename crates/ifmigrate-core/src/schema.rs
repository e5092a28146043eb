//! The part of the monitored-device schema the pass reads and writes.
//!
//! By the time the pass runs, earlier upgrade steps have created
//! `interface_snmp`, while `items` still carries the per-item SNMP columns
//! and `interface` still carries `bulk`. [`LEGACY_LAYOUT_SQL`] spells out
//! that intermediate layout; [`verify_legacy_layout`] checks an existing
//! database against it before anything is read.

use crate::error::{MigrateError, Result};
use rusqlite::Connection;
use std::collections::HashSet;

/// DDL of the intermediate layout. Used to build fixture databases.
pub const LEGACY_LAYOUT_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS hosts (
    hostid INTEGER PRIMARY KEY,
    host TEXT NOT NULL DEFAULT '',
    status INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS interface (
    interfaceid INTEGER PRIMARY KEY,
    hostid INTEGER NOT NULL REFERENCES hosts(hostid) ON DELETE CASCADE,
    main INTEGER NOT NULL DEFAULT 0,
    type INTEGER NOT NULL DEFAULT 1,
    useip INTEGER NOT NULL DEFAULT 1,
    ip TEXT NOT NULL DEFAULT '127.0.0.1',
    dns TEXT NOT NULL DEFAULT '',
    port TEXT NOT NULL DEFAULT '10050',
    bulk INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS items (
    itemid INTEGER PRIMARY KEY,
    type INTEGER NOT NULL DEFAULT 0,
    hostid INTEGER NOT NULL REFERENCES hosts(hostid) ON DELETE CASCADE,
    key_ TEXT NOT NULL DEFAULT '',
    interfaceid INTEGER REFERENCES interface(interfaceid),
    snmp_community TEXT NOT NULL DEFAULT '',
    snmpv3_securityname TEXT NOT NULL DEFAULT '',
    snmpv3_securitylevel INTEGER NOT NULL DEFAULT 0,
    snmpv3_authpassphrase TEXT NOT NULL DEFAULT '',
    snmpv3_privpassphrase TEXT NOT NULL DEFAULT '',
    snmpv3_authprotocol INTEGER NOT NULL DEFAULT 0,
    snmpv3_privprotocol INTEGER NOT NULL DEFAULT 0,
    snmpv3_contextname TEXT NOT NULL DEFAULT '',
    port TEXT NOT NULL DEFAULT ''
);

CREATE INDEX IF NOT EXISTS items_interfaceid ON items(interfaceid);

CREATE TABLE IF NOT EXISTS interface_snmp (
    interfaceid INTEGER PRIMARY KEY REFERENCES interface(interfaceid) ON DELETE CASCADE,
    version INTEGER NOT NULL DEFAULT 2,
    bulk INTEGER NOT NULL DEFAULT 1,
    community TEXT NOT NULL DEFAULT '',
    securityname TEXT NOT NULL DEFAULT '',
    securitylevel INTEGER NOT NULL DEFAULT 0,
    authpassphrase TEXT NOT NULL DEFAULT '',
    privpassphrase TEXT NOT NULL DEFAULT '',
    authprotocol INTEGER NOT NULL DEFAULT 0,
    privprotocol INTEGER NOT NULL DEFAULT 0,
    contextname TEXT NOT NULL DEFAULT ''
);
"#;

/// Columns the pass touches, per table.
const REQUIRED_COLUMNS: &[(&str, &[&str])] = &[
    ("hosts", &["hostid", "status"]),
    (
        "interface",
        &["interfaceid", "hostid", "main", "type", "useip", "ip", "dns", "port", "bulk"],
    ),
    (
        "items",
        &[
            "itemid",
            "type",
            "hostid",
            "interfaceid",
            "snmp_community",
            "snmpv3_securityname",
            "snmpv3_securitylevel",
            "snmpv3_authpassphrase",
            "snmpv3_privpassphrase",
            "snmpv3_authprotocol",
            "snmpv3_privprotocol",
            "snmpv3_contextname",
            "port",
        ],
    ),
    (
        "interface_snmp",
        &[
            "interfaceid",
            "version",
            "bulk",
            "community",
            "securityname",
            "securitylevel",
            "authpassphrase",
            "privpassphrase",
            "authprotocol",
            "privprotocol",
            "contextname",
        ],
    ),
];

fn table_columns(conn: &Connection, table: &str) -> Result<HashSet<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", table))?;
    let columns = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<rusqlite::Result<HashSet<String>>>()?;
    Ok(columns)
}

/// Check that every table and column the pass needs is present.
pub fn verify_legacy_layout(conn: &Connection) -> Result<()> {
    for (table, required) in REQUIRED_COLUMNS {
        let columns = table_columns(conn, table)?;
        if columns.is_empty() {
            return Err(MigrateError::Schema {
                table: table.to_string(),
                message: "table does not exist".to_string(),
            });
        }

        let missing: Vec<&str> = required
            .iter()
            .copied()
            .filter(|column| !columns.contains(*column))
            .collect();
        if !missing.is_empty() {
            return Err(MigrateError::Schema {
                table: table.to_string(),
                message: format!("missing columns: {}", missing.join(", ")),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_verifies() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(LEGACY_LAYOUT_SQL).unwrap();
        verify_legacy_layout(&conn).unwrap();
    }

    #[test]
    fn test_missing_table_is_reported() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(LEGACY_LAYOUT_SQL).unwrap();
        conn.execute_batch("DROP TABLE interface_snmp;").unwrap();

        match verify_legacy_layout(&conn).unwrap_err() {
            MigrateError::Schema { table, .. } => assert_eq!(table, "interface_snmp"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_dropped_item_columns_are_reported() {
        // Shape of a database where the per-item columns are already gone
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE hosts (hostid INTEGER PRIMARY KEY, status INTEGER);
             CREATE TABLE interface (interfaceid INTEGER PRIMARY KEY, hostid INTEGER, main INTEGER,
                 type INTEGER, useip INTEGER, ip TEXT, dns TEXT, port TEXT, bulk INTEGER);
             CREATE TABLE items (itemid INTEGER PRIMARY KEY, type INTEGER, hostid INTEGER,
                 interfaceid INTEGER);",
        )
        .unwrap();

        match verify_legacy_layout(&conn).unwrap_err() {
            MigrateError::Schema { table, message } => {
                assert_eq!(table, "items");
                assert!(message.contains("snmp_community"));
                assert!(message.contains("port"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
