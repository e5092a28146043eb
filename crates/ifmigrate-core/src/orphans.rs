//! Default configurations for SNMP interfaces no item contributed to.

use crate::loader::UnconfiguredInterface;
use crate::model::{ConfigRecord, InterfaceId, SnmpAttributes};
use std::collections::HashSet;
use tracing::warn;

/// Build a placeholder configuration for every unconfigured interface the
/// consolidation did not already cover.
pub fn fill_orphans(
    unconfigured: &[UnconfiguredInterface],
    configured: impl IntoIterator<Item = InterfaceId>,
) -> Vec<ConfigRecord> {
    let configured: HashSet<InterfaceId> = configured.into_iter().collect();

    let orphans: Vec<ConfigRecord> = unconfigured
        .iter()
        .filter(|interface| !configured.contains(&interface.interface_id))
        .map(|interface| ConfigRecord {
            interface_id: interface.interface_id,
            attributes: SnmpAttributes::placeholder(interface.bulk),
        })
        .collect();

    if !orphans.is_empty() {
        warn!(
            "{} SNMP interfaces have no items; they get a placeholder community to be configured",
            orphans.len()
        );
    }
    orphans
}
