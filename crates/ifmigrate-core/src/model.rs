//! In-memory records built during a single consolidation pass.

use crate::config::LegacyCodes;
use serde::{Deserialize, Serialize};

/// Interface identifiers are SQLite integer primary keys.
pub type InterfaceId = i64;

/// Per-kind item tag used before the migration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LegacyItemType {
    SnmpV1,
    SnmpV2c,
    SnmpV3,
}

impl LegacyItemType {
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            LegacyCodes::ITEM_TYPE_SNMPV1 => Some(LegacyItemType::SnmpV1),
            LegacyCodes::ITEM_TYPE_SNMPV2C => Some(LegacyItemType::SnmpV2c),
            LegacyCodes::ITEM_TYPE_SNMPV3 => Some(LegacyItemType::SnmpV3),
            _ => None,
        }
    }

    pub fn code(&self) -> i64 {
        match self {
            LegacyItemType::SnmpV1 => LegacyCodes::ITEM_TYPE_SNMPV1,
            LegacyItemType::SnmpV2c => LegacyCodes::ITEM_TYPE_SNMPV2C,
            LegacyItemType::SnmpV3 => LegacyCodes::ITEM_TYPE_SNMPV3,
        }
    }

    /// Protocol version stored in the shared configuration.
    pub fn snmp_version(&self) -> u8 {
        match self {
            LegacyItemType::SnmpV1 => LegacyCodes::SNMP_VERSION_1,
            LegacyItemType::SnmpV2c => LegacyCodes::SNMP_VERSION_2C,
            LegacyItemType::SnmpV3 => LegacyCodes::SNMP_VERSION_3,
        }
    }
}

/// The settings that move from items into `interface_snmp`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnmpAttributes {
    pub version: u8,
    pub bulk: bool,
    pub security_level: u8,
    pub auth_protocol: u8,
    pub priv_protocol: u8,
    pub community: String,
    pub security_name: String,
    pub auth_passphrase: String,
    pub priv_passphrase: String,
    pub context_name: String,
}

impl SnmpAttributes {
    /// Settings for an interface that no item contributed settings to.
    pub fn placeholder(bulk: bool) -> Self {
        Self {
            version: LegacyCodes::SNMP_VERSION_2C,
            bulk,
            security_level: 0,
            auth_protocol: 0,
            priv_protocol: 0,
            community: LegacyCodes::DEFAULT_COMMUNITY.to_string(),
            security_name: String::new(),
            auth_passphrase: String::new(),
            priv_passphrase: String::new(),
            context_name: String::new(),
        }
    }
}

/// Address data of the legacy interface an item points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyInterface {
    pub host_id: i64,
    pub kind: i64,
    pub use_ip: bool,
    pub ip: String,
    pub dns: String,
    pub port: String,
}

/// One distinct legacy item configuration as returned by the loader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyItemConfig {
    pub legacy_interface_id: InterfaceId,
    pub item_type: LegacyItemType,
    pub attributes: SnmpAttributes,
    /// Per-item port; empty means "use the interface's port".
    pub port_override: String,
    pub interface: LegacyInterface,
}

impl LegacyItemConfig {
    /// The port this item actually polls on.
    pub fn effective_port(&self) -> &str {
        crate::matching::effective_port(&self.port_override, &self.interface.port)
    }
}

/// A row of the `interface` table minted by the pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceRecord {
    pub interface_id: InterfaceId,
    pub host_id: i64,
    /// Minted interfaces are never the host's default interface.
    pub main: bool,
    pub kind: i64,
    pub use_ip: bool,
    pub ip: String,
    pub dns: String,
    pub port: String,
}

/// A row of the `interface_snmp` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigRecord {
    pub interface_id: InterfaceId,
    pub attributes: SnmpAttributes,
}
