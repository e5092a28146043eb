//! Centralized configuration for the consolidation pass.
//!
//! Fixed codes of the monitored-device schema live in unit structs with
//! associated constants. Tunables that a caller may change live in
//! [`ConsolidationConfig`].

use crate::error::{MigrateError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Codes stored in the legacy and the new schema.
pub struct LegacyCodes;

impl LegacyCodes {
    // items.type
    pub const ITEM_TYPE_SNMPV1: i64 = 1;
    pub const ITEM_TYPE_SNMPV2C: i64 = 4;
    pub const ITEM_TYPE_SNMPV3: i64 = 6;
    pub const ITEM_TYPE_SNMP: i64 = 20;

    // interface.type
    pub const INTERFACE_TYPE_SNMP: i64 = 2;

    // hosts.status
    pub const HOST_STATUS_TEMPLATE: i64 = 3;

    // interface_snmp.version
    pub const SNMP_VERSION_1: u8 = 1;
    pub const SNMP_VERSION_2C: u8 = 2;
    pub const SNMP_VERSION_3: u8 = 3;

    /// Community written for interfaces that had no items to inherit one from.
    pub const DEFAULT_COMMUNITY: &'static str = "{$SNMP_COMMUNITY}";

    /// SQL list of the legacy item types, for `IN (...)` clauses.
    pub const LEGACY_ITEM_TYPES_SQL: &'static str = "1,4,6";
}

/// Limits of the SQLite statement facade.
pub struct StoreConfig;

impl StoreConfig {
    pub const BUSY_TIMEOUT_MS: u64 = 30_000;
    /// Bound parameters per statement (SQLite's conservative default limit).
    pub const MAX_BOUND_PARAMS: usize = 999;
    /// Flush threshold for accumulated update text (128 KiB).
    pub const DEFAULT_MAX_STATEMENT_BYTES: usize = 131_072;
    /// Smallest useful threshold; anything lower would flush every statement.
    pub const MIN_STATEMENT_BYTES: usize = 1_024;
}

/// How two attribute tuples are compared during deduplication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPolicy {
    /// Every field of the tuple takes part in the comparison.
    #[default]
    Strict,
    /// Protocol version and bulk flag are not compared. Gives the same
    /// grouping as upgrade runs that compared both fields of one tuple
    /// against themselves.
    Legacy,
}

impl MatchPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchPolicy::Strict => "strict",
            MatchPolicy::Legacy => "legacy",
        }
    }
}

impl std::str::FromStr for MatchPolicy {
    type Err = MigrateError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "strict" => Ok(MatchPolicy::Strict),
            "legacy" => Ok(MatchPolicy::Legacy),
            other => Err(MigrateError::Config {
                message: format!("unknown match policy '{}' (expected strict or legacy)", other),
            }),
        }
    }
}

/// Tunables for one run of the consolidation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct ConsolidationConfig {
    /// Attribute comparison used for deduplication.
    pub match_policy: MatchPolicy,
    /// Byte size after which the accumulated item update batch is flushed.
    pub max_statement_bytes: usize,
    /// Run the whole pass inside one transaction.
    ///
    /// When false, batches already executed stay committed if a later one
    /// fails.
    pub atomic: bool,
}

impl Default for ConsolidationConfig {
    fn default() -> Self {
        Self {
            match_policy: MatchPolicy::default(),
            max_statement_bytes: StoreConfig::DEFAULT_MAX_STATEMENT_BYTES,
            atomic: true,
        }
    }
}

impl ConsolidationConfig {
    /// Load configuration from a JSON file. Missing keys take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| MigrateError::io_with_path(e, path))?;
        let config: ConsolidationConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_statement_bytes < StoreConfig::MIN_STATEMENT_BYTES {
            return Err(MigrateError::Config {
                message: format!(
                    "max_statement_bytes must be at least {}, got {}",
                    StoreConfig::MIN_STATEMENT_BYTES,
                    self.max_statement_bytes
                ),
            });
        }
        Ok(())
    }
}
