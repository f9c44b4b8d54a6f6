use std::cmp::Ordering;

#[cfg(feature = "bincode")]
use bincode::{Decode, Encode};

use crate::hash_types::{ConfirmedHashHashedWithProRegTx, Sha256dHash};
use crate::sml::masternode_list_entry::MasternodeListEntry;

/// A masternode list entry together with the hashes derived from it.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
#[cfg_attr(feature = "bincode", derive(Encode, Decode))]
pub struct QualifiedMasternodeListEntry {
    pub masternode_list_entry: MasternodeListEntry,
    pub entry_hash: Sha256dHash,
    pub confirmed_hash_hashed_with_pro_reg_tx: Option<ConfirmedHashHashedWithProRegTx>,
}

impl Ord for QualifiedMasternodeListEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.masternode_list_entry.pro_reg_tx_hash.cmp(&other.masternode_list_entry.pro_reg_tx_hash)
    }
}

impl PartialOrd for QualifiedMasternodeListEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl From<MasternodeListEntry> for QualifiedMasternodeListEntry {
    fn from(masternode_list_entry: MasternodeListEntry) -> Self {
        QualifiedMasternodeListEntry {
            entry_hash: masternode_list_entry.calculate_entry_hash(),
            confirmed_hash_hashed_with_pro_reg_tx: masternode_list_entry
                .confirmed_hash_hashed_with_pro_reg_tx(),
            masternode_list_entry,
        }
    }
}
