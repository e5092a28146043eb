//! Equality predicates used to decide whether two item configurations can
//! share one interface.
//!
//! All functions are pure; the consolidator combines them into its
//! reuse/split decisions.

use crate::config::MatchPolicy;
use crate::model::{InterfaceId, SnmpAttributes};

/// Compare two attribute tuples field by field.
///
/// The order is fixed: security level, auth protocol, priv protocol,
/// version, bulk, then the string fields (byte-exact, case-sensitive).
/// Under [`MatchPolicy::Legacy`] version and bulk are skipped.
pub fn attributes_match(a: &SnmpAttributes, b: &SnmpAttributes, policy: MatchPolicy) -> bool {
    if a.security_level != b.security_level
        || a.auth_protocol != b.auth_protocol
        || a.priv_protocol != b.priv_protocol
    {
        return false;
    }

    if policy == MatchPolicy::Strict && (a.version != b.version || a.bulk != b.bulk) {
        return false;
    }

    a.community == b.community
        && a.security_name == b.security_name
        && a.auth_passphrase == b.auth_passphrase
        && a.priv_passphrase == b.priv_passphrase
        && a.context_name == b.context_name
}

/// [`attributes_match`] that also requires both records to carry the same
/// interface identifier. Used against already committed records.
pub fn config_matches(
    id_a: InterfaceId,
    a: &SnmpAttributes,
    id_b: InterfaceId,
    b: &SnmpAttributes,
    policy: MatchPolicy,
) -> bool {
    id_a == id_b && attributes_match(a, b, policy)
}

/// Port an item polls on: its override, or the interface port when empty.
pub fn effective_port<'a>(port_override: &'a str, interface_port: &'a str) -> &'a str {
    if port_override.is_empty() {
        interface_port
    } else {
        port_override
    }
}

/// Whether an item can live on the legacy interface itself.
pub fn shares_interface_port(port_override: &str, interface_port: &str) -> bool {
    port_override.is_empty() || port_override == interface_port
}

/// Whether an item can be moved onto a candidate interface whose port is
/// `candidate_port`. An empty override defers to the legacy interface port.
pub fn port_compatible(port_override: &str, legacy_port: &str, candidate_port: &str) -> bool {
    effective_port(port_override, legacy_port) == candidate_port
}
