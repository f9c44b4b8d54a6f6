use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;

use crate::bls_sig_utils::BLSPublicKey;
use crate::hash_types::{ProTxHash, QuorumModifierHash};
use crate::sml::masternode_list::MasternodeList;
use crate::sml::masternode_list_entry::MasternodeType;
use crate::sml::masternode_list_entry::qualified_masternode_list_entry::QualifiedMasternodeListEntry;

/// Properties that must be unique across a masternode list but are shared by several entries.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IntegrityReport {
    pub duplicate_addresses: Vec<SocketAddr>,
    pub duplicate_operator_keys: Vec<BLSPublicKey>,
    pub duplicate_platform_node_ids: Vec<[u8; 20]>,
}

impl IntegrityReport {
    pub fn is_clean(&self) -> bool {
        self.duplicate_addresses.is_empty()
            && self.duplicate_operator_keys.is_empty()
            && self.duplicate_platform_node_ids.is_empty()
    }
}

fn duplicates<K: Ord + Clone>(keys: impl IntoIterator<Item = K>) -> Vec<K> {
    let mut counts = BTreeMap::new();
    for key in keys {
        *counts.entry(key).or_insert(0usize) += 1;
    }
    counts.into_iter().filter(|(_, count)| *count > 1).map(|(key, _)| key).collect()
}

impl MasternodeList {
    pub fn has_masternode(&self, pro_tx_hash: &ProTxHash) -> bool {
        self.masternodes.contains_key(pro_tx_hash)
    }

    pub fn has_valid_masternode(&self, pro_tx_hash: &ProTxHash) -> bool {
        self.masternodes.get(pro_tx_hash).is_some_and(|entry| entry.masternode_list_entry.is_valid)
    }

    pub fn masternode_for(&self, pro_tx_hash: &ProTxHash) -> Option<&Arc<QualifiedMasternodeListEntry>> {
        self.masternodes.get(pro_tx_hash)
    }

    pub fn valid_masternode_count(&self) -> usize {
        self.masternodes.values().filter(|entry| entry.masternode_list_entry.is_valid).count()
    }

    pub fn has_masternode_at_location(&self, address: SocketAddr) -> bool {
        self.masternodes
            .values()
            .any(|entry| entry.masternode_list_entry.service_address.to_socket_addr() == address)
    }

    /// Position of a masternode in the score order for `modifier`, 0 being the best.
    pub fn rank_of(&self, pro_tx_hash: &ProTxHash, modifier: QuorumModifierHash, hpmn_only: bool) -> Option<usize> {
        self.scores_for_quorum(modifier, hpmn_only)
            .iter()
            .position(|entry| entry.masternode_list_entry.pro_reg_tx_hash == *pro_tx_hash)
    }

    /// Counts the properties that Dash Core keeps unique and reports every value used more
    /// than once. Unset addresses are ignored. Voting keys may legitimately be shared.
    pub fn integrity_check(&self) -> IntegrityReport {
        let entries = || self.masternodes.values().map(|entry| &entry.masternode_list_entry);
        IntegrityReport {
            duplicate_addresses: duplicates(
                entries()
                    .filter(|entry| !entry.service_address.is_unspecified())
                    .map(|entry| entry.service_address.to_socket_addr()),
            ),
            duplicate_operator_keys: duplicates(entries().map(|entry| entry.operator_public_key)),
            duplicate_platform_node_ids: duplicates(entries().filter_map(|entry| match entry.mn_type {
                MasternodeType::HighPerformance { platform_node_id, .. } => Some(platform_node_id),
                MasternodeType::Regular => None,
            })),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr};

    use hashes::Hash;

    use super::*;
    use crate::hash_types::BlockHash;
    use crate::sml::address::ServiceAddress;
    use crate::sml::masternode_list::apply_diff::tests::diff;
    use crate::sml::masternode_list_entry::MasternodeListEntry;
    use crate::sml::masternode_list_entry::tests::entry;

    fn list(entries: Vec<MasternodeListEntry>) -> MasternodeList {
        let genesis = diff(
            BlockHash::all_zeros(),
            BlockHash::from_byte_array([1; 32]),
            1,
            vec![],
            entries.clone(),
            &entries,
        );
        MasternodeList::from_diff(&genesis).expect("genesis")
    }

    #[test]
    fn lookups() {
        let mut banned = entry(2);
        banned.is_valid = false;
        let list = list(vec![entry(1), banned.clone(), entry(3)]);
        assert!(list.has_masternode(&banned.pro_reg_tx_hash));
        assert!(!list.has_valid_masternode(&banned.pro_reg_tx_hash));
        assert!(list.has_valid_masternode(&entry(1).pro_reg_tx_hash));
        assert_eq!(list.valid_masternode_count(), 2);
        assert!(list.has_masternode_at_location(SocketAddr::new(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 3)), 9999)));
        assert!(!list.has_masternode_at_location(SocketAddr::new(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 3)), 9998)));

        let modifier = QuorumModifierHash::hash(b"rank");
        assert!(list.rank_of(&entry(1).pro_reg_tx_hash, modifier, false).is_some());
        assert_eq!(list.rank_of(&banned.pro_reg_tx_hash, modifier, false), None);
    }

    #[test]
    fn integrity_reports_shared_properties() {
        assert!(list(vec![entry(1), entry(2)]).integrity_check().is_clean());

        let mut copy = entry(3);
        copy.service_address = entry(1).service_address;
        copy.operator_public_key = entry(2).operator_public_key;
        copy.key_id_voting = entry(1).key_id_voting;
        let mut unset = entry(4);
        unset.service_address = ServiceAddress::default();
        let mut also_unset = entry(5);
        also_unset.service_address = ServiceAddress::default();

        let report = list(vec![entry(1), entry(2), copy, unset, also_unset]).integrity_check();
        assert_eq!(report.duplicate_addresses, vec![entry(1).service_address.to_socket_addr()]);
        assert_eq!(report.duplicate_operator_keys, vec![entry(2).operator_public_key]);
        assert!(report.duplicate_platform_node_ids.is_empty());
    }
}
