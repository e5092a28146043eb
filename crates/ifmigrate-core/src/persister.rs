//! Writes a consolidation plan back to the database.

use crate::config::LegacyCodes;
use crate::consolidator::Repoint;
use crate::error::{MigrateError, Result};
use crate::model::{ConfigRecord, InterfaceRecord};
use crate::store::{quote_literal, BulkInsert, MultiUpdate, MultiUpdateStats};
use rusqlite::types::Value;
use rusqlite::Connection;
use std::borrow::Borrow;

const CONFIG_TABLE: &str = "interface_snmp";
const CONFIG_COLUMNS: &[&str] = &[
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
];

const INTERFACE_TABLE: &str = "interface";
const INTERFACE_COLUMNS: &[&str] = &[
    "interfaceid",
    "hostid",
    "main",
    "type",
    "useip",
    "ip",
    "dns",
    "port",
];

/// Insert shared configurations. Returns the number of rows written.
pub fn insert_configs<I>(conn: &Connection, configs: I) -> Result<usize>
where
    I: IntoIterator,
    I::Item: Borrow<ConfigRecord>,
{
    let mut insert = BulkInsert::new(CONFIG_TABLE, CONFIG_COLUMNS);
    for config in configs {
        let config = config.borrow();
        let a = &config.attributes;
        insert.add_row(vec![
            Value::Integer(config.interface_id),
            Value::Integer(i64::from(a.version)),
            Value::Integer(i64::from(a.bulk)),
            Value::Text(a.community.clone()),
            Value::Text(a.security_name.clone()),
            Value::Integer(i64::from(a.security_level)),
            Value::Text(a.auth_passphrase.clone()),
            Value::Text(a.priv_passphrase.clone()),
            Value::Integer(i64::from(a.auth_protocol)),
            Value::Integer(i64::from(a.priv_protocol)),
            Value::Text(a.context_name.clone()),
        ])?;
    }

    if insert.is_empty() {
        return Ok(0);
    }
    insert.execute(conn)
}

/// Insert minted interfaces. Returns the number of rows written.
pub fn insert_interfaces(conn: &Connection, interfaces: &[InterfaceRecord]) -> Result<usize> {
    let mut insert = BulkInsert::new(INTERFACE_TABLE, INTERFACE_COLUMNS);
    for interface in interfaces {
        insert.add_row(vec![
            Value::Integer(interface.interface_id),
            Value::Integer(interface.host_id),
            Value::Integer(i64::from(interface.main)),
            Value::Integer(interface.kind),
            Value::Integer(i64::from(interface.use_ip)),
            Value::Text(interface.ip.clone()),
            Value::Text(interface.dns.clone()),
            Value::Text(interface.port.clone()),
        ])?;
    }

    if insert.is_empty() {
        return Ok(0);
    }
    insert.execute(conn)
}

/// UPDATE that moves the items described by `entry` to their canonical
/// interface and gives them the unified type.
///
/// Items are matched on everything the loader grouped them by, so rows
/// that merely share some values are left alone.
fn repoint_statement(entry: &Repoint) -> String {
    let a = &entry.attributes;
    format!(
        "UPDATE items SET type={unified},interfaceid={target} \
         WHERE type={legacy_type} AND interfaceid={legacy_id} \
         AND hostid IN (SELECT hostid FROM hosts WHERE status<>{template}) \
         AND snmp_community={community} AND snmpv3_securityname={security_name} \
         AND snmpv3_securitylevel={security_level} \
         AND snmpv3_authpassphrase={auth_passphrase} AND snmpv3_privpassphrase={priv_passphrase} \
         AND snmpv3_authprotocol={auth_protocol} AND snmpv3_privprotocol={priv_protocol} \
         AND snmpv3_contextname={context_name} AND port={port}",
        unified = LegacyCodes::ITEM_TYPE_SNMP,
        target = entry.interface_id,
        legacy_type = entry.item_type.code(),
        legacy_id = entry.legacy_interface_id,
        template = LegacyCodes::HOST_STATUS_TEMPLATE,
        community = quote_literal(&a.community),
        security_name = quote_literal(&a.security_name),
        security_level = a.security_level,
        auth_passphrase = quote_literal(&a.auth_passphrase),
        priv_passphrase = quote_literal(&a.priv_passphrase),
        auth_protocol = a.auth_protocol,
        priv_protocol = a.priv_protocol,
        context_name = quote_literal(&a.context_name),
        port = quote_literal(&entry.port_override),
    )
}

/// Point items at their newly assigned interfaces.
pub fn repoint_items(
    conn: &Connection,
    repoints: &[Repoint],
    max_statement_bytes: usize,
) -> Result<MultiUpdateStats> {
    let mut batch = MultiUpdate::begin(max_statement_bytes);
    for entry in repoints {
        batch.push(&repoint_statement(entry));
        batch.flush_if_overflowed(conn)?;
    }
    batch.finish(conn)
}

/// Give every remaining legacy-tagged item the unified type.
pub fn retag_legacy_items(conn: &Connection) -> Result<usize> {
    conn.execute(
        &format!(
            "UPDATE items SET type={} WHERE type IN ({})",
            LegacyCodes::ITEM_TYPE_SNMP,
            LegacyCodes::LEGACY_ITEM_TYPES_SQL
        ),
        [],
    )
    .map_err(|e| MigrateError::database("Failed to retag legacy items", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LegacyItemType, SnmpAttributes};
    use crate::schema::LEGACY_LAYOUT_SQL;

    fn create_test_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(LEGACY_LAYOUT_SQL).unwrap();
        conn.execute_batch(
            "INSERT INTO hosts (hostid, status) VALUES (1, 0), (2, 3);
             INSERT INTO interface (interfaceid, hostid, type, port) VALUES (20, 1, 2, '161'), (40, 2, 2, '161');",
        )
        .unwrap();
        conn
    }

    fn attrs(community: &str) -> SnmpAttributes {
        SnmpAttributes {
            version: 2,
            bulk: true,
            security_level: 0,
            auth_protocol: 0,
            priv_protocol: 0,
            community: community.to_string(),
            security_name: String::new(),
            auth_passphrase: String::new(),
            priv_passphrase: String::new(),
            context_name: String::new(),
        }
    }

    fn item_row(conn: &Connection, itemid: i64) -> (i64, i64) {
        conn.query_row(
            "SELECT type, interfaceid FROM items WHERE itemid = ?1",
            [itemid],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .unwrap()
    }

    #[test]
    fn test_insert_configs_and_interfaces() {
        let conn = create_test_conn();
        let interfaces = vec![InterfaceRecord {
            interface_id: 9001,
            host_id: 1,
            main: false,
            kind: 2,
            use_ip: true,
            ip: "10.0.0.1".into(),
            dns: String::new(),
            port: "1161".into(),
        }];
        assert_eq!(insert_interfaces(&conn, &interfaces).unwrap(), 1);

        let configs = vec![
            ConfigRecord {
                interface_id: 20,
                attributes: attrs("public"),
            },
            ConfigRecord {
                interface_id: 9001,
                attributes: attrs("it's"),
            },
        ];
        assert_eq!(insert_configs(&conn, &configs).unwrap(), 2);

        let community: String = conn
            .query_row(
                "SELECT community FROM interface_snmp WHERE interfaceid = 9001",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(community, "it's");

        let main: i64 = conn
            .query_row(
                "SELECT main FROM interface WHERE interfaceid = 9001",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(main, 0);
    }

    #[test]
    fn test_empty_inserts_write_nothing() {
        let conn = create_test_conn();
        assert_eq!(insert_configs(&conn, Vec::<ConfigRecord>::new()).unwrap(), 0);
        assert_eq!(insert_interfaces(&conn, &[]).unwrap(), 0);
    }

    #[test]
    fn test_repoint_matches_exact_rows_only() {
        let conn = create_test_conn();
        conn.execute_batch(
            "INSERT INTO interface (interfaceid, hostid, type, port) VALUES (9001, 1, 2, '161');
             INSERT INTO items (itemid, type, hostid, interfaceid, snmp_community, port) VALUES
                 (1, 4, 1, 20, 'private', ''),
                 (2, 4, 1, 20, 'public', ''),
                 (3, 1, 1, 20, 'private', ''),
                 (4, 4, 1, 20, 'private', '1161'),
                 (5, 4, 2, 40, 'private', '');",
        )
        .unwrap();

        let repoints = vec![Repoint {
            legacy_interface_id: 20,
            item_type: LegacyItemType::SnmpV2c,
            attributes: attrs("private"),
            port_override: String::new(),
            interface_id: 9001,
            minted: true,
        }];
        let stats = repoint_items(&conn, &repoints, 1024).unwrap();
        assert_eq!(stats.statements, 1);
        assert_eq!(stats.executions, 1);

        assert_eq!(item_row(&conn, 1), (20, 9001));
        assert_eq!(item_row(&conn, 2), (4, 20));
        assert_eq!(item_row(&conn, 3), (1, 20));
        assert_eq!(item_row(&conn, 4), (4, 20));
        assert_eq!(item_row(&conn, 5), (4, 40));
    }

    #[test]
    fn test_repoint_nothing_executes_nothing() {
        let conn = create_test_conn();
        let stats = repoint_items(&conn, &[], 1024).unwrap();
        assert_eq!(stats.executions, 0);
    }

    #[test]
    fn test_retag_covers_templates() {
        let conn = create_test_conn();
        conn.execute_batch(
            "INSERT INTO items (itemid, type, hostid, interfaceid) VALUES
                 (1, 1, 1, 20), (2, 4, 1, 20), (3, 6, 2, 40), (4, 0, 1, NULL);",
        )
        .unwrap();

        assert_eq!(retag_legacy_items(&conn).unwrap(), 3);
        assert_eq!(item_row(&conn, 3).0, LegacyCodes::ITEM_TYPE_SNMP);
        assert_eq!(retag_legacy_items(&conn).unwrap(), 0);
    }
}
