use std::collections::BTreeSet;
use std::sync::Arc;

use hashes::Hash;
use tracing::{debug, trace};

use crate::hash_types::BlockHash;
use crate::network::message_sml::MnListDiff;
use crate::sml::error::SmlError;
use crate::sml::masternode_list::MasternodeList;
use crate::sml::masternode_list_entry::qualified_masternode_list_entry::QualifiedMasternodeListEntry;
use crate::sml::quorum_entry::qualified_quorum_entry::QualifiedQuorumEntry;

impl MasternodeList {
    /// Builds the first list from a diff against the genesis sentinel.
    pub fn from_diff(diff: &MnListDiff) -> Result<Self, SmlError> {
        if diff.base_block_hash != BlockHash::all_zeros() {
            return Err(SmlError::MissingBaseMasternodeList(diff.base_block_hash));
        }
        MasternodeList::empty().apply_diff(diff, false)
    }

    /// Applies `diff` on top of this list and returns the resulting list.
    ///
    /// With `strict_height` the diff must advance the list by exactly one block, otherwise it
    /// only has to move forward. Both merkle roots committed in the coinbase are checked
    /// against the new list before it is returned.
    pub fn apply_diff(&self, diff: &MnListDiff, strict_height: bool) -> Result<MasternodeList, SmlError> {
        if diff.base_block_hash != self.block_hash {
            return Err(SmlError::ChainMismatch {
                expected: self.block_hash,
                found: diff.base_block_hash,
                same_height: diff.block_height() == Some(self.known_height),
            });
        }
        let coinbase = diff.coinbase_payload().ok_or(SmlError::MissingCoinbasePayload)?;
        let height = coinbase.height;
        if !self.is_genesis_sentinel() {
            if height == self.known_height {
                return Err(SmlError::SameHeight(height));
            }
            let expected = self.known_height + 1;
            if height < self.known_height || (strict_height && height != expected) {
                return Err(SmlError::HeightMismatch { expected, found: height });
            }
        }

        let mut masternodes = self.masternodes.clone();
        for pro_tx_hash in &diff.deleted_masternodes {
            if masternodes.remove(pro_tx_hash).is_none() {
                debug!(%pro_tx_hash, "diff deletes unknown masternode");
            }
        }
        let mut seen = BTreeSet::new();
        for entry in &diff.new_masternodes {
            if !seen.insert(entry.pro_reg_tx_hash) {
                return Err(SmlError::DuplicateMasternode(entry.pro_reg_tx_hash.to_string()));
            }
            masternodes.insert(
                entry.pro_reg_tx_hash,
                Arc::new(QualifiedMasternodeListEntry::from(entry.clone())),
            );
        }

        let mut quorums = self.quorums.clone();
        for deleted in &diff.deleted_quorums {
            if let Some(of_type) = quorums.get_mut(&deleted.llmq_type) {
                of_type.remove(&deleted.quorum_hash);
                if of_type.is_empty() {
                    quorums.remove(&deleted.llmq_type);
                }
            }
        }
        for quorum in &diff.new_quorums {
            quorums
                .entry(quorum.llmq_type)
                .or_default()
                .insert(quorum.quorum_hash, Arc::new(QualifiedQuorumEntry::from(quorum.clone())));
        }

        let mut list = MasternodeList {
            block_hash: diff.block_hash,
            known_height: height,
            masternode_merkle_root: None,
            llmq_merkle_root: None,
            masternodes,
            quorums,
        };

        let masternodes_unchanged = diff.deleted_masternodes.is_empty() && diff.new_masternodes.is_empty();
        if masternodes_unchanged && self.masternode_merkle_root == Some(coinbase.merkle_root_masternode_list) {
            list.masternode_merkle_root = self.masternode_merkle_root;
        } else {
            let computed = list.calculate_masternodes_merkle_root();
            if computed != coinbase.merkle_root_masternode_list {
                return Err(SmlError::MasternodeListMerkleRootMismatch {
                    expected: coinbase.merkle_root_masternode_list,
                    computed,
                });
            }
            list.masternode_merkle_root = Some(computed);
        }

        if coinbase.version >= 2 {
            let quorums_unchanged = diff.deleted_quorums.is_empty() && diff.new_quorums.is_empty();
            if quorums_unchanged && self.llmq_merkle_root == Some(coinbase.merkle_root_quorums) {
                list.llmq_merkle_root = self.llmq_merkle_root;
            } else {
                let computed = list.calculate_llmq_merkle_root();
                if computed != coinbase.merkle_root_quorums {
                    return Err(SmlError::QuorumsMerkleRootMismatch {
                        expected: coinbase.merkle_root_quorums,
                        computed,
                    });
                }
                list.llmq_merkle_root = Some(computed);
            }
        }

        trace!(
            block_hash = %list.block_hash,
            height,
            masternodes = list.masternodes.len(),
            "applied masternode list diff"
        );
        Ok(list)
    }
}
