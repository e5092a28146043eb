//! Reuse / split / create decisions for legacy item configurations.
//!
//! Items arrive ordered by legacy interface id. For each one the
//! consolidator decides between:
//!
//! - **Representative**: first usable configuration of its legacy interface;
//!   the legacy interface becomes its canonical interface.
//! - **ReuseExisting**: agrees with the representative; nothing to do.
//! - **ReuseSibling**: agrees with an interface already minted for the same
//!   legacy interface; only the item reference changes.
//! - **CreateNew**: nothing fits; a new interface and configuration are minted.

use crate::config::MatchPolicy;
use crate::error::{MigrateError, Result};
use crate::matching::{attributes_match, config_matches, port_compatible, shares_interface_port};
use crate::model::{
    ConfigRecord, InterfaceId, InterfaceRecord, LegacyItemConfig, LegacyItemType, SnmpAttributes,
};
use crate::store::IdAllocator;
use serde::Serialize;
use tracing::debug;

/// Entity class passed to the identifier allocator.
pub const INTERFACE_ENTITY: &str = "interface";

/// Terminal outcome for one legacy item configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome", content = "interface_id")]
pub enum Resolution {
    Representative,
    ReuseExisting,
    ReuseSibling(InterfaceId),
    CreateNew(InterfaceId),
}

/// Items that must be moved off their legacy interface.
///
/// The legacy tuple and port identify the item rows to rewrite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Repoint {
    pub legacy_interface_id: InterfaceId,
    pub item_type: LegacyItemType,
    pub attributes: SnmpAttributes,
    pub port_override: String,
    /// Canonical interface the items move to.
    pub interface_id: InterfaceId,
    /// True when the canonical interface was minted for this entry; false
    /// when it was borrowed from an earlier sibling.
    pub minted: bool,
}

/// Per-outcome counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResolutionCounts {
    pub representatives: usize,
    pub reused_existing: usize,
    pub reused_siblings: usize,
    pub created: usize,
}

impl ResolutionCounts {
    fn record(&mut self, resolution: Resolution) {
        match resolution {
            Resolution::Representative => self.representatives += 1,
            Resolution::ReuseExisting => self.reused_existing += 1,
            Resolution::ReuseSibling(_) => self.reused_siblings += 1,
            Resolution::CreateNew(_) => self.created += 1,
        }
    }
}

/// Result of consolidating every loaded item.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Consolidation {
    /// Configurations kept on their legacy interface, sorted by id.
    pub representatives: Vec<ConfigRecord>,
    /// Minted and borrowed placements, grouped by legacy interface.
    pub repoints: Vec<Repoint>,
    /// Minted interfaces, sorted by id.
    pub interfaces: Vec<InterfaceRecord>,
    pub counts: ResolutionCounts,
}

impl Consolidation {
    /// Configurations for the minted interfaces.
    pub fn minted_configs(&self) -> impl Iterator<Item = ConfigRecord> + '_ {
        self.repoints
            .iter()
            .filter(|entry| entry.minted)
            .map(|entry| ConfigRecord {
                interface_id: entry.interface_id,
                attributes: entry.attributes.clone(),
            })
    }

    /// Ids that will have a configuration once the plan is persisted.
    pub fn configured_ids(&self) -> impl Iterator<Item = InterfaceId> + '_ {
        self.representatives
            .iter()
            .map(|config| config.interface_id)
            .chain(self.interfaces.iter().map(|interface| interface.interface_id))
    }
}

/// Single-pass state machine over ordered legacy item configurations.
pub struct Consolidator {
    policy: MatchPolicy,
    state: Consolidation,
    last_legacy_id: Option<InterfaceId>,
}

impl Consolidator {
    pub fn new(policy: MatchPolicy) -> Self {
        Self {
            policy,
            state: Consolidation::default(),
            last_legacy_id: None,
        }
    }

    /// Classify one item. Items must be supplied in ascending legacy
    /// interface order.
    pub fn resolve(
        &mut self,
        item: LegacyItemConfig,
        ids: &mut dyn IdAllocator,
    ) -> Result<Resolution> {
        self.check_order(&item)?;

        let resolution = self.classify(item, ids)?;
        self.state.counts.record(resolution);
        Ok(resolution)
    }

    pub fn finish(self) -> Consolidation {
        self.state
    }

    fn check_order(&mut self, item: &LegacyItemConfig) -> Result<()> {
        if let Some(last) = self.last_legacy_id {
            if item.legacy_interface_id < last {
                return Err(MigrateError::corruption(format!(
                    "legacy interface {} arrived after {}; input must be ordered",
                    item.legacy_interface_id, last
                )));
            }
        }
        self.last_legacy_id = Some(item.legacy_interface_id);
        Ok(())
    }

    fn classify(&mut self, item: LegacyItemConfig, ids: &mut dyn IdAllocator) -> Result<Resolution> {
        let legacy_id = item.legacy_interface_id;

        if shares_interface_port(&item.port_override, &item.interface.port) {
            match self
                .state
                .representatives
                .binary_search_by_key(&legacy_id, |config| config.interface_id)
            {
                Err(pos) => {
                    debug!("Interface {}: {:?} item becomes representative", legacy_id, item.item_type);
                    self.state.representatives.insert(
                        pos,
                        ConfigRecord {
                            interface_id: legacy_id,
                            attributes: item.attributes,
                        },
                    );
                    return Ok(Resolution::Representative);
                }
                Ok(pos) => {
                    let representative = &self.state.representatives[pos];
                    if config_matches(
                        representative.interface_id,
                        &representative.attributes,
                        legacy_id,
                        &item.attributes,
                        self.policy,
                    ) {
                        return Ok(Resolution::ReuseExisting);
                    }
                }
            }
        }

        if let Some(sibling_id) = self.find_sibling(&item)? {
            debug!("Interface {}: item joins sibling interface {}", legacy_id, sibling_id);
            self.push_repoint(item, sibling_id, false);
            return Ok(Resolution::ReuseSibling(sibling_id));
        }

        let interface_id = ids.next_id(INTERFACE_ENTITY)?;
        debug!("Interface {}: minting interface {}", legacy_id, interface_id);

        let interface = InterfaceRecord {
            interface_id,
            host_id: item.interface.host_id,
            main: false,
            kind: item.interface.kind,
            use_ip: item.interface.use_ip,
            ip: item.interface.ip.clone(),
            dns: item.interface.dns.clone(),
            port: item.effective_port().to_string(),
        };
        let pos = self
            .state
            .interfaces
            .partition_point(|existing| existing.interface_id < interface_id);
        self.state.interfaces.insert(pos, interface);
        self.push_repoint(item, interface_id, true);

        Ok(Resolution::CreateNew(interface_id))
    }

    /// Scan the current legacy interface's run of minted/borrowed entries,
    /// newest first, for one the item can share.
    fn find_sibling(&self, item: &LegacyItemConfig) -> Result<Option<InterfaceId>> {
        let run = self
            .state
            .repoints
            .iter()
            .rev()
            .take_while(|entry| entry.legacy_interface_id == item.legacy_interface_id);

        for entry in run {
            if !attributes_match(&item.attributes, &entry.attributes, self.policy) {
                continue;
            }

            let candidate = self.minted_interface(entry.interface_id)?;
            if port_compatible(&item.port_override, &item.interface.port, &candidate.port) {
                return Ok(Some(entry.interface_id));
            }
        }
        Ok(None)
    }

    fn minted_interface(&self, interface_id: InterfaceId) -> Result<&InterfaceRecord> {
        self.state
            .interfaces
            .binary_search_by_key(&interface_id, |interface| interface.interface_id)
            .map(|pos| &self.state.interfaces[pos])
            .map_err(|_| {
                MigrateError::corruption(format!(
                    "placement refers to interface {} which was never minted",
                    interface_id
                ))
            })
    }

    fn push_repoint(&mut self, item: LegacyItemConfig, interface_id: InterfaceId, minted: bool) {
        self.state.repoints.push(Repoint {
            legacy_interface_id: item.legacy_interface_id,
            item_type: item.item_type,
            attributes: item.attributes,
            port_override: item.port_override,
            interface_id,
            minted,
        });
    }
}
