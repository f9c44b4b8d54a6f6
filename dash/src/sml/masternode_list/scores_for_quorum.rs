use std::sync::Arc;

use crate::hash_types::{QuorumModifierHash, ScoreHash};
use crate::sml::masternode_list::MasternodeList;
use crate::sml::masternode_list_entry::qualified_masternode_list_entry::QualifiedMasternodeListEntry;

impl MasternodeList {
    /// Sorts `masternodes` by score for `modifier`, best first.
    ///
    /// Masternodes without a score are dropped. Equal scores fall back to the proRegTx
    /// hash, both compared descending.
    pub fn sort_by_score<I>(
        masternodes: I,
        modifier: QuorumModifierHash,
    ) -> Vec<Arc<QualifiedMasternodeListEntry>>
    where
        I: IntoIterator<Item = Arc<QualifiedMasternodeListEntry>>,
    {
        let mut scored: Vec<(ScoreHash, Arc<QualifiedMasternodeListEntry>)> = masternodes
            .into_iter()
            .filter_map(|entry| entry.score(modifier).map(|score| (score, entry)))
            .collect();
        scored.sort_by(|(score_a, a), (score_b, b)| {
            score_b.cmp(score_a).then_with(|| {
                b.masternode_list_entry.pro_reg_tx_hash.cmp(&a.masternode_list_entry.pro_reg_tx_hash)
            })
        });
        scored.into_iter().map(|(_, entry)| entry).collect()
    }

    /// Every masternode of this list that can be selected for a quorum, best first.
    pub fn scores_for_quorum(
        &self,
        modifier: QuorumModifierHash,
        hpmn_only: bool,
    ) -> Vec<Arc<QualifiedMasternodeListEntry>> {
        Self::sort_by_score(
            self.masternodes
                .values()
                .filter(|entry| !hpmn_only || entry.masternode_list_entry.mn_type.is_high_performance())
                .cloned(),
            modifier,
        )
    }

    /// The members of a quorum of `size` built from this list with `modifier`.
    ///
    /// Returns fewer than `size` members when the list has fewer eligible masternodes.
    pub fn calculate_quorum(
        &self,
        size: usize,
        modifier: QuorumModifierHash,
        hpmn_only: bool,
    ) -> Vec<Arc<QualifiedMasternodeListEntry>> {
        let mut members = self.scores_for_quorum(modifier, hpmn_only);
        members.truncate(size);
        members
    }
}

#[cfg(test)]
mod tests {
    use hashes::Hash;

    use super::*;
    use crate::hash_types::BlockHash;
    use crate::sml::masternode_list::apply_diff::tests::diff;
    use crate::sml::masternode_list_entry::MasternodeType;
    use crate::sml::masternode_list_entry::tests::entry;

    fn list(count: u8) -> MasternodeList {
        let entries: Vec<_> = (1..=count).map(entry).collect();
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
    fn quorum_size_is_capped_by_eligible_members() {
        let list = list(6);
        let modifier = QuorumModifierHash::hash(b"modifier");
        assert_eq!(list.calculate_quorum(4, modifier, false).len(), 4);
        assert_eq!(list.calculate_quorum(10, modifier, false).len(), 6);
        assert!(list.calculate_quorum(4, modifier, true).is_empty());
    }

    #[test]
    fn selection_is_deterministic_and_sorted() {
        let list = list(8);
        let modifier = QuorumModifierHash::hash(b"modifier");
        let first = list.calculate_quorum(5, modifier, false);
        assert_eq!(first, list.calculate_quorum(5, modifier, false));
        let scores: Vec<ScoreHash> =
            first.iter().map(|entry| entry.score(modifier).expect("scored")).collect();
        assert!(scores.windows(2).all(|pair| pair[0] > pair[1]));
        assert_ne!(first, list.calculate_quorum(5, QuorumModifierHash::hash(b"other"), false));
    }

    #[test]
    fn banned_unconfirmed_and_regular_filtering() {
        let mut banned = entry(1);
        banned.is_valid = false;
        let mut unconfirmed = entry(2);
        unconfirmed.confirmed_hash = None;
        let mut evo = entry(3);
        evo.mn_type = MasternodeType::HighPerformance { platform_http_port: 1, platform_node_id: [3; 20] };
        let entries = vec![banned, unconfirmed, evo.clone(), entry(4)];
        let genesis = diff(
            BlockHash::all_zeros(),
            BlockHash::from_byte_array([1; 32]),
            1,
            vec![],
            entries.clone(),
            &entries,
        );
        let list = MasternodeList::from_diff(&genesis).expect("genesis");
        let modifier = QuorumModifierHash::hash(b"modifier");
        assert_eq!(list.scores_for_quorum(modifier, false).len(), 2);
        let evo_only = list.scores_for_quorum(modifier, true);
        assert_eq!(evo_only.len(), 1);
        assert_eq!(evo_only[0].masternode_list_entry, evo);
    }
}
