//! The simplified masternode list at one block.
//!
//! A list is never mutated once it has been built. Applying a diff produces a new list
//! that shares every untouched entry with its parent through [`Arc`].

mod apply_diff;
mod masternode_helpers;
pub mod merkle_roots;
mod quorum_helpers;
mod scores_for_quorum;

use std::collections::BTreeMap;
use std::sync::Arc;

#[cfg(feature = "bincode")]
use bincode::{Decode, Encode};
use hashes::Hash;

use crate::hash_types::{BlockHash, MerkleRootMasternodeList, MerkleRootQuorums, ProTxHash, QuorumHash};
use crate::prelude::CoreBlockHeight;
use crate::sml::llmq_type::LLMQType;
use crate::sml::masternode_list_entry::qualified_masternode_list_entry::QualifiedMasternodeListEntry;
use crate::sml::quorum_entry::qualified_quorum_entry::QualifiedQuorumEntry;

pub use self::masternode_helpers::IntegrityReport;

#[derive(Clone, Eq, PartialEq, Debug)]
#[cfg_attr(feature = "bincode", derive(Encode, Decode))]
pub struct MasternodeList {
    pub block_hash: BlockHash,
    pub known_height: CoreBlockHeight,
    pub masternode_merkle_root: Option<MerkleRootMasternodeList>,
    pub llmq_merkle_root: Option<MerkleRootQuorums>,
    pub masternodes: BTreeMap<ProTxHash, Arc<QualifiedMasternodeListEntry>>,
    pub quorums: BTreeMap<LLMQType, BTreeMap<QuorumHash, Arc<QualifiedQuorumEntry>>>,
}

impl MasternodeList {
    /// The list before the first diff, identified by the all-zero block hash.
    pub fn empty() -> Self {
        Self::empty_at(BlockHash::all_zeros(), 0)
    }

    pub fn empty_at(block_hash: BlockHash, known_height: CoreBlockHeight) -> Self {
        MasternodeList {
            block_hash,
            known_height,
            masternode_merkle_root: None,
            llmq_merkle_root: None,
            masternodes: BTreeMap::new(),
            quorums: BTreeMap::new(),
        }
    }

    /// True for the list that precedes the first diff.
    pub fn is_genesis_sentinel(&self) -> bool {
        self.block_hash == BlockHash::all_zeros()
    }

    pub fn masternode_count(&self) -> usize {
        self.masternodes.len()
    }
}
