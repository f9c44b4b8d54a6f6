use crate::hash_types::{QuorumModifierHash, ScoreHash};
use crate::sml::masternode_list_entry::qualified_masternode_list_entry::QualifiedMasternodeListEntry;

impl QualifiedMasternodeListEntry {
    /// The score of this masternode for a quorum built with `modifier`.
    ///
    /// Invalid and unconfirmed masternodes have no score and can not be selected.
    pub fn score(&self, modifier: QuorumModifierHash) -> Option<ScoreHash> {
        if !self.masternode_list_entry.is_valid {
            return None;
        }
        self.confirmed_hash_hashed_with_pro_reg_tx
            .map(|confirmed_hash_hashed| ScoreHash::create_score(confirmed_hash_hashed, modifier))
    }
}
