//! ifmigrate core - consolidates per-item SNMP settings into shared
//! per-interface configuration.
//!
//! Before the migration every SNMP item carried its own community, SNMPv3
//! credentials and port. Afterwards those settings live in `interface_snmp`,
//! one row per interface, and items only reference the interface. This
//! crate implements the one-time data pass between the two layouts:
//!
//! 1. [`loader`] reads the distinct per-item configurations, ordered by the
//!    interface they currently use.
//! 2. [`consolidator`] keeps one representative per interface and mints new
//!    interfaces where settings or ports disagree, using [`matching`].
//! 3. [`orphans`] gives SNMP interfaces without items a placeholder
//!    configuration.
//! 4. [`persister`] writes interfaces, configurations and item updates.
//!
//! # Example
//!
//! ```rust,ignore
//! use ifmigrate_core::{open_database, run_consolidation, ConsolidationConfig};
//!
//! fn main() -> ifmigrate_core::Result<()> {
//!     let conn = open_database("/var/lib/zabbix/zabbix.db".as_ref())?;
//!     let report = run_consolidation(&conn, &ConsolidationConfig::default())?;
//!     println!("{} new interfaces", report.planned_interfaces);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod consolidator;
pub mod error;
pub mod loader;
pub mod matching;
pub mod migration;
pub mod model;
pub mod orphans;
pub mod persister;
pub mod schema;
pub mod store;

// Re-export commonly used types
pub use config::{ConsolidationConfig, LegacyCodes, MatchPolicy, StoreConfig};
pub use consolidator::{Consolidation, Consolidator, Repoint, Resolution, ResolutionCounts};
pub use error::{MigrateError, Result};
pub use migration::{
    dry_run, persist_plan, plan_consolidation, run_consolidation, run_consolidation_with,
    ConsolidationPlan, ConsolidationReport, PersistStats,
};
pub use model::{
    ConfigRecord, InterfaceId, InterfaceRecord, LegacyInterface, LegacyItemConfig,
    LegacyItemType, SnmpAttributes,
};
pub use schema::{verify_legacy_layout, LEGACY_LAYOUT_SQL};
pub use store::{open_database, IdAllocator, MaxIdAllocator, SequenceAllocator};
