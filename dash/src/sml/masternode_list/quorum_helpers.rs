use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::hash_types::QuorumHash;
use crate::sml::llmq_type::LLMQType;
use crate::sml::masternode_list::MasternodeList;
use crate::sml::quorum_entry::qualified_quorum_entry::QualifiedQuorumEntry;

impl MasternodeList {
    pub fn quorum_hashes(&self) -> BTreeSet<QuorumHash> {
        self.quorums.values().flat_map(|quorums| quorums.keys().copied()).collect()
    }

    pub fn quorum_count(&self) -> usize {
        self.quorums.values().map(BTreeMap::len).sum()
    }

    pub fn quorums_of_type(&self, llmq_type: LLMQType) -> impl Iterator<Item = &Arc<QualifiedQuorumEntry>> {
        self.quorums.get(&llmq_type).into_iter().flat_map(|quorums| quorums.values())
    }

    pub fn quorum_entry_of_type_for_quorum_hash(
        &self,
        llmq_type: LLMQType,
        quorum_hash: QuorumHash,
    ) -> Option<&Arc<QualifiedQuorumEntry>> {
        self.quorums.get(&llmq_type)?.get(&quorum_hash)
    }

    /// Mutable access to a quorum of a list that has not been published yet.
    ///
    /// The entry is cloned first if it is still shared with another list.
    pub(crate) fn quorum_entry_of_type_for_quorum_hash_mut(
        &mut self,
        llmq_type: LLMQType,
        quorum_hash: QuorumHash,
    ) -> Option<&mut QualifiedQuorumEntry> {
        self.quorums.get_mut(&llmq_type)?.get_mut(&quorum_hash).map(Arc::make_mut)
    }
}
