//! Reads the denormalized item rows and the unconfigured SNMP interfaces.

use crate::config::LegacyCodes;
use crate::error::{MigrateError, Result};
use crate::model::{InterfaceId, LegacyInterface, LegacyItemConfig, LegacyItemType, SnmpAttributes};
use rusqlite::{Connection, Row};
use tracing::debug;

/// Distinct item configurations per legacy interface, joined with the
/// interface's address data.
///
/// Ordered by legacy interface id so the consolidator's backward scan only
/// ever sees one interface's run; within a run, by the lowest item id of the
/// group, which makes the oldest item's settings the representative.
fn legacy_items_sql() -> String {
    format!(
        "SELECT s.interfaceid, s.type, s.bulk,
                s.snmp_community, s.snmpv3_securityname, s.snmpv3_securitylevel,
                s.snmpv3_authpassphrase, s.snmpv3_privpassphrase,
                s.snmpv3_authprotocol, s.snmpv3_privprotocol, s.snmpv3_contextname,
                s.port, s.hostid,
                n.type, n.useip, n.ip, n.dns, n.port
         FROM (SELECT i.interfaceid, i.type, f.bulk,
                      i.snmp_community, i.snmpv3_securityname, i.snmpv3_securitylevel,
                      i.snmpv3_authpassphrase, i.snmpv3_privpassphrase,
                      i.snmpv3_authprotocol, i.snmpv3_privprotocol, i.snmpv3_contextname,
                      i.port, i.hostid, MIN(i.itemid) AS first_itemid
               FROM items i
               LEFT JOIN hosts h ON i.hostid = h.hostid
               LEFT JOIN interface f ON i.interfaceid = f.interfaceid
               WHERE i.type IN ({types}) AND h.status <> {template}
               GROUP BY i.interfaceid, i.type, f.bulk,
                        i.snmp_community, i.snmpv3_securityname, i.snmpv3_securitylevel,
                        i.snmpv3_authpassphrase, i.snmpv3_privpassphrase,
                        i.snmpv3_authprotocol, i.snmpv3_privprotocol, i.snmpv3_contextname,
                        i.port, i.hostid) s
         LEFT JOIN interface n ON s.interfaceid = n.interfaceid
         ORDER BY s.interfaceid ASC, s.first_itemid ASC",
        types = LegacyCodes::LEGACY_ITEM_TYPES_SQL,
        template = LegacyCodes::HOST_STATUS_TEMPLATE,
    )
}

/// Raw shape of one loader row, before validation.
struct LegacyRow {
    interface_id: Option<InterfaceId>,
    item_type: i64,
    bulk: Option<bool>,
    community: String,
    security_name: String,
    security_level: u8,
    auth_passphrase: String,
    priv_passphrase: String,
    auth_protocol: u8,
    priv_protocol: u8,
    context_name: String,
    port: String,
    host_id: i64,
    if_kind: Option<i64>,
    if_use_ip: Option<bool>,
    if_ip: Option<String>,
    if_dns: Option<String>,
    if_port: Option<String>,
}

impl LegacyRow {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            interface_id: row.get(0)?,
            item_type: row.get(1)?,
            bulk: row.get(2)?,
            community: row.get(3)?,
            security_name: row.get(4)?,
            security_level: row.get(5)?,
            auth_passphrase: row.get(6)?,
            priv_passphrase: row.get(7)?,
            auth_protocol: row.get(8)?,
            priv_protocol: row.get(9)?,
            context_name: row.get(10)?,
            port: row.get(11)?,
            host_id: row.get(12)?,
            if_kind: row.get(13)?,
            if_use_ip: row.get(14)?,
            if_ip: row.get(15)?,
            if_dns: row.get(16)?,
            if_port: row.get(17)?,
        })
    }

    fn into_config(self) -> Result<LegacyItemConfig> {
        let item_type = LegacyItemType::from_code(self.item_type).ok_or_else(|| {
            MigrateError::corruption(format!("unexpected legacy item type {}", self.item_type))
        })?;

        let interface_id = self.interface_id.ok_or_else(|| {
            MigrateError::corruption(format!(
                "{:?} item on host {} has no interface",
                item_type, self.host_id
            ))
        })?;

        let missing = || {
            MigrateError::corruption(format!(
                "items reference interface {} which does not exist",
                interface_id
            ))
        };
        let interface = LegacyInterface {
            host_id: self.host_id,
            kind: self.if_kind.ok_or_else(missing)?,
            use_ip: self.if_use_ip.ok_or_else(missing)?,
            ip: self.if_ip.ok_or_else(missing)?,
            dns: self.if_dns.ok_or_else(missing)?,
            port: self.if_port.ok_or_else(missing)?,
        };

        Ok(LegacyItemConfig {
            legacy_interface_id: interface_id,
            item_type,
            attributes: SnmpAttributes {
                version: item_type.snmp_version(),
                bulk: self.bulk.unwrap_or(true),
                security_level: self.security_level,
                auth_protocol: self.auth_protocol,
                priv_protocol: self.priv_protocol,
                community: self.community,
                security_name: self.security_name,
                auth_passphrase: self.auth_passphrase,
                priv_passphrase: self.priv_passphrase,
                context_name: self.context_name,
            },
            port_override: self.port,
            interface,
        })
    }
}

/// Load one [`LegacyItemConfig`] per distinct legacy item configuration.
pub fn load_legacy_items(conn: &Connection) -> Result<Vec<LegacyItemConfig>> {
    let mut stmt = conn
        .prepare(&legacy_items_sql())
        .map_err(|e| MigrateError::database("Failed to prepare legacy item query", e))?;

    let rows = stmt
        .query_map([], LegacyRow::from_row)
        .map_err(|e| MigrateError::database("Failed to query legacy items", e))?;

    let mut items = Vec::new();
    for row in rows {
        let row = row.map_err(|e| MigrateError::database("Failed to read legacy item row", e))?;
        items.push(row.into_config()?);
    }

    debug!("Loaded {} distinct legacy item configurations", items.len());
    Ok(items)
}

/// An SNMP interface with no row in `interface_snmp`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnconfiguredInterface {
    pub interface_id: InterfaceId,
    pub bulk: bool,
}

/// Load SNMP interfaces that have no shared configuration yet.
pub fn load_unconfigured_interfaces(conn: &Connection) -> Result<Vec<UnconfiguredInterface>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT h.interfaceid, h.bulk
             FROM interface h
             WHERE h.type = {kind}
               AND h.interfaceid NOT IN (SELECT interfaceid FROM interface_snmp)
             ORDER BY h.interfaceid ASC",
            kind = LegacyCodes::INTERFACE_TYPE_SNMP,
        ))
        .map_err(|e| MigrateError::database("Failed to prepare interface query", e))?;

    let interfaces = stmt
        .query_map([], |row| {
            Ok(UnconfiguredInterface {
                interface_id: row.get(0)?,
                bulk: row.get::<_, Option<bool>>(1)?.unwrap_or(true),
            })
        })
        .map_err(|e| MigrateError::database("Failed to query unconfigured interfaces", e))?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(|e| MigrateError::database("Failed to read interface row", e))?;

    debug!("Found {} SNMP interfaces without configuration", interfaces.len());
    Ok(interfaces)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::LEGACY_LAYOUT_SQL;

    fn create_test_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(LEGACY_LAYOUT_SQL).unwrap();
        conn.execute_batch(
            "INSERT INTO hosts (hostid, host, status) VALUES (1, 'router', 0), (2, 'template', 3);
             INSERT INTO interface (interfaceid, hostid, main, type, useip, ip, dns, port, bulk)
                 VALUES (20, 1, 1, 2, 1, '10.0.0.1', 'router.lan', '161', 0),
                        (10, 1, 0, 2, 0, '10.0.0.2', 'switch.lan', '161', 1),
                        (40, 2, 1, 2, 1, '127.0.0.1', '', '161', 1),
                        (50, 1, 0, 1, 1, '10.0.0.1', '', '10050', 1);",
        )
        .unwrap();
        conn
    }

    fn add_item(
        conn: &Connection,
        itemid: i64,
        hostid: i64,
        item_type: i64,
        interfaceid: i64,
        community: &str,
        port: &str,
    ) {
        conn.execute(
            "INSERT INTO items (itemid, type, hostid, interfaceid, snmp_community, port)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![itemid, item_type, hostid, interfaceid, community, port],
        )
        .unwrap();
    }

    #[test]
    fn test_rows_are_ordered_and_grouped() {
        let conn = create_test_conn();
        add_item(&conn, 1, 1, 4, 20, "public", "");
        add_item(&conn, 2, 1, 4, 20, "public", "");
        add_item(&conn, 3, 1, 1, 10, "private", "");
        add_item(&conn, 4, 1, 6, 20, "", "1161");

        let items = load_legacy_items(&conn).unwrap();
        assert_eq!(items.len(), 3);

        assert_eq!(items[0].legacy_interface_id, 10);
        assert_eq!(items[0].item_type, LegacyItemType::SnmpV1);
        assert_eq!(items[0].attributes.version, 1);
        assert!(!items[0].interface.use_ip);

        assert_eq!(items[1].legacy_interface_id, 20);
        assert_eq!(items[1].attributes.community, "public");
        assert!(!items[1].attributes.bulk);
        assert_eq!(items[1].interface.ip, "10.0.0.1");
        assert_eq!(items[1].interface.port, "161");

        assert_eq!(items[2].legacy_interface_id, 20);
        assert_eq!(items[2].attributes.version, 3);
        assert_eq!(items[2].port_override, "1161");
        assert_eq!(items[2].effective_port(), "1161");
    }

    #[test]
    fn test_template_and_other_items_are_skipped() {
        let conn = create_test_conn();
        add_item(&conn, 1, 2, 4, 40, "public", "");
        add_item(&conn, 2, 1, 0, 50, "", "");
        add_item(&conn, 3, 1, 20, 20, "", "");

        assert!(load_legacy_items(&conn).unwrap().is_empty());
    }

    #[test]
    fn test_missing_interface_is_corruption() {
        let conn = create_test_conn();
        conn.execute(
            "INSERT INTO items (itemid, type, hostid, interfaceid) VALUES (1, 4, 1, NULL)",
            [],
        )
        .unwrap();

        let err = load_legacy_items(&conn).unwrap_err();
        assert!(matches!(err, MigrateError::Corruption { .. }));
    }

    #[test]
    fn test_unconfigured_interfaces() {
        let conn = create_test_conn();
        conn.execute("INSERT INTO interface_snmp (interfaceid) VALUES (10)", [])
            .unwrap();

        let interfaces = load_unconfigured_interfaces(&conn).unwrap();
        let ids: Vec<InterfaceId> = interfaces.iter().map(|i| i.interface_id).collect();
        assert_eq!(ids, vec![20, 40]);
        assert!(!interfaces[0].bulk);
        assert!(interfaces[1].bulk);
    }
}
