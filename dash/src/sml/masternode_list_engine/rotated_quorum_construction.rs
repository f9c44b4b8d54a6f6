//! Member selection for rotating quorums (DIP-0024).
//!
//! Every cycle a rotating quorum type replaces one quarter of the members of each of its
//! quorums. The committee of quorum `i` is the quarter picked for `i` three cycles ago,
//! then two cycles ago, then one cycle ago, then the new quarter, in that order.
//! Earlier quarters are rebuilt from the [`QuorumSnapshot`] recorded at their cycle.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{trace, warn};

use crate::hash_types::{BlockHash, ProTxHash, QuorumModifierHash};
use crate::network::message_qrinfo::{MNSkipListMode, QuorumSnapshot};
use crate::prelude::CoreBlockHeight;
use crate::sml::llmq_type::LLMQType;
use crate::sml::llmq_type::network::NetworkLLMQExt;
use crate::sml::masternode_list::MasternodeList;
use crate::sml::masternode_list_engine::MasternodeListEngine;
use crate::sml::masternode_list_entry::qualified_masternode_list_entry::QualifiedMasternodeListEntry;
use crate::sml::quorum_validation_error::QuorumValidationError;

type Member = Arc<QualifiedMasternodeListEntry>;

/// Quarters built for a new cycle together with the positions skipped while building them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewQuarters<T> {
    pub quarters: Vec<Vec<T>>,
    /// First entry absolute, following entries relative to the first.
    pub skip_list: Vec<i32>,
}

impl<T> NewQuarters<T> {
    pub fn skip_list_mode(&self) -> MNSkipListMode {
        if self.skip_list.is_empty() { MNSkipListMode::NoSkipping } else { MNSkipListMode::SkipEntries }
    }

    /// The snapshot recording this cycle, given which masternodes of the score sorted list
    /// were already used before it.
    pub fn snapshot(&self, active_quorum_members: Vec<bool>) -> QuorumSnapshot {
        QuorumSnapshot {
            skip_list_mode: self.skip_list_mode(),
            active_quorum_members,
            skip_list: self.skip_list.clone(),
        }
    }
}

/// Rebuilds the quarters of a past cycle.
///
/// `combined` is the score sorted list of masternodes unused at that cycle followed by the
/// score sorted list of used ones. The list is walked circularly.
pub fn quarters_from_skip_list<T: Clone>(
    combined: &[T],
    mode: MNSkipListMode,
    skip_list: &[i32],
    quorum_count: usize,
    quarter_size: usize,
) -> Result<Vec<Vec<T>>, QuorumValidationError> {
    let mut quarters = vec![Vec::with_capacity(quarter_size); quorum_count];
    match mode {
        MNSkipListMode::AllSkipped => return Ok(quarters),
        MNSkipListMode::KeepEntries => {
            return Err(QuorumValidationError::UnsupportedSkipListMode(mode.to_i32()));
        }
        MNSkipListMode::NoSkipping | MNSkipListMode::SkipEntries => {}
    }
    if quarter_size == 0 || quorum_count == 0 {
        return Ok(quarters);
    }
    if combined.is_empty() {
        return Err(QuorumValidationError::CorruptedSkipList("no masternodes to fill quarters".to_string()));
    }

    let mut first_entry_index = 0i64;
    let mut skipped = Vec::with_capacity(skip_list.len());
    if mode == MNSkipListMode::SkipEntries {
        for entry in skip_list {
            if first_entry_index == 0 {
                first_entry_index = *entry as i64;
                skipped.push(first_entry_index);
            } else {
                skipped.push(first_entry_index + *entry as i64);
            }
        }
    }

    let mut skipped = skipped.into_iter().peekable();
    let mut idx = 0usize;
    for quarter in quarters.iter_mut() {
        while quarter.len() < quarter_size {
            if skipped.peek() == Some(&(idx as i64)) {
                skipped.next();
            } else {
                quarter.push(combined[idx].clone());
            }
            idx += 1;
            if idx == combined.len() {
                idx = 0;
            }
        }
    }
    Ok(quarters)
}

/// Fills the quarters of a new cycle.
///
/// A masternode is skipped for quorum `i` when `used_indexed[i]` already holds it, which
/// covers the members it had in the three previous cycles and the ones picked so far.
/// When the list can not provide enough distinct masternodes every quarter is left empty.
pub fn build_new_quarters<T, K, F>(
    combined: &[T],
    key: F,
    mut used_indexed: Vec<BTreeSet<K>>,
    quorum_count: usize,
    quarter_size: usize,
) -> NewQuarters<T>
where
    T: Clone,
    K: Ord,
    F: Fn(&T) -> K,
{
    used_indexed.resize_with(quorum_count, BTreeSet::new);
    let mut quarters: Vec<Vec<T>> = vec![Vec::with_capacity(quarter_size); quorum_count];
    let mut skip_list = Vec::new();
    let mut first_skipped_index = 0i32;
    let mut idx = 0usize;
    let len = combined.len();

    for (quarter, used) in quarters.iter_mut().zip(used_indexed.iter_mut()) {
        let used_count = used.len();
        let mut updated = false;
        let initial_loop_idx = idx;
        while quarter.len() < quarter_size && used_count + quarter.len() < len {
            let candidate = &combined[idx];
            if used.insert(key(candidate)) {
                quarter.push(candidate.clone());
                updated = true;
            } else if first_skipped_index == 0 {
                first_skipped_index = idx as i32;
                skip_list.push(idx as i32);
            } else {
                skip_list.push(idx as i32 - first_skipped_index);
            }
            idx += 1;
            if idx == len {
                idx = 0;
            }
            if idx == initial_loop_idx {
                if !updated {
                    warn!(quarter_size, available = len, "not enough masternodes to fill rotated quarters");
                    return NewQuarters { quarters: vec![Vec::new(); quorum_count], skip_list: Vec::new() };
                }
                updated = false;
            }
        }
    }
    NewQuarters { quarters, skip_list }
}

impl MasternodeListEngine {
    fn work_block(&self, work_block_height: CoreBlockHeight) -> Result<(BlockHash, &MasternodeList), QuorumValidationError> {
        let block_hash = *self
            .block_hashes
            .get(&work_block_height)
            .ok_or(QuorumValidationError::RequiredBlockHeightNotPresent(work_block_height))?;
        let list = self
            .masternode_lists
            .get(&work_block_height)
            .ok_or(QuorumValidationError::RequiredMasternodeListNotPresent(work_block_height))?;
        Ok((block_hash, list))
    }

    fn rotation_modifier(
        &self,
        llmq_type: LLMQType,
        work_block_hash: BlockHash,
        work_block_height: CoreBlockHeight,
    ) -> Result<QuorumModifierHash, QuorumValidationError> {
        Ok(self.work_block_modifier_type(llmq_type, work_block_hash, work_block_height, None)?.build_llmq_hash())
    }

    /// Rebuilds the quarters of the cycle whose work block is at `work_block_height`.
    fn previous_quarters(
        &self,
        llmq_type: LLMQType,
        work_block_height: CoreBlockHeight,
    ) -> Result<Vec<Vec<Member>>, QuorumValidationError> {
        let (work_block_hash, list) = self.work_block(work_block_height)?;
        let snapshot = self
            .known_snapshots
            .get(&work_block_hash)
            .ok_or(QuorumValidationError::RequiredSnapshotNotPresent(work_block_hash))?;
        let params = llmq_type.params();
        let modifier = self.rotation_modifier(llmq_type, work_block_hash, work_block_height)?;
        let sorted = list.scores_for_quorum(modifier, llmq_type == self.network.platform_type());

        let (mut used, mut unused) = (Vec::new(), Vec::new());
        for (i, member) in sorted.into_iter().enumerate() {
            if snapshot.active_quorum_members.get(i).copied().unwrap_or(false) {
                used.push(member);
            } else {
                unused.push(member);
            }
        }
        unused.extend(used);
        quarters_from_skip_list(
            &unused,
            snapshot.skip_list_mode,
            &snapshot.skip_list,
            params.signing_active_quorum_count as usize,
            params.quarter_size(),
        )
    }

    /// Picks the quarters of the cycle whose work block is at `work_block_height`.
    ///
    /// Also returns which masternodes of the score sorted list were already used by the
    /// previous cycles, the bitset of the snapshot describing this cycle.
    fn new_quarters(
        &self,
        llmq_type: LLMQType,
        work_block_height: CoreBlockHeight,
        previous: [&Vec<Vec<Member>>; 3],
    ) -> Result<(NewQuarters<Member>, Vec<bool>), QuorumValidationError> {
        let (work_block_hash, list) = self.work_block(work_block_height)?;
        let params = llmq_type.params();
        let quorum_count = params.signing_active_quorum_count as usize;
        let modifier = self.rotation_modifier(llmq_type, work_block_hash, work_block_height)?;

        let mut used_all = BTreeSet::new();
        let mut used_indexed = vec![BTreeSet::new(); quorum_count];
        for quarters in previous {
            for (used, quarter) in used_indexed.iter_mut().zip(quarters.iter()) {
                for member in quarter {
                    let pro_tx_hash = member.masternode_list_entry.pro_reg_tx_hash;
                    // removed and banned masternodes free their slot
                    if list.has_valid_masternode(&pro_tx_hash) {
                        used_all.insert(pro_tx_hash);
                        used.insert(pro_tx_hash);
                    }
                }
            }
        }

        let sorted = list.scores_for_quorum(modifier, llmq_type == self.network.platform_type());
        let active_quorum_members: Vec<bool> = sorted
            .iter()
            .map(|member| used_all.contains(&member.masternode_list_entry.pro_reg_tx_hash))
            .collect();
        let (used, mut combined): (Vec<Member>, Vec<Member>) = sorted
            .into_iter()
            .partition(|member| used_all.contains(&member.masternode_list_entry.pro_reg_tx_hash));
        combined.extend(used);

        let new = build_new_quarters(
            &combined,
            |member: &Member| -> ProTxHash { member.masternode_list_entry.pro_reg_tx_hash },
            used_indexed,
            quorum_count,
            params.quarter_size(),
        );
        Ok((new, active_quorum_members))
    }

    /// The quarters of the three previous cycles, oldest first, and the new quarters of the
    /// cycle starting at `cycle_base_height`.
    fn cycle_quarters(
        &self,
        llmq_type: LLMQType,
        cycle_base_height: CoreBlockHeight,
    ) -> Result<([Vec<Vec<Member>>; 3], NewQuarters<Member>, Vec<bool>), QuorumValidationError> {
        let interval = llmq_type.params().dkg_params.interval;
        let work_block_height = |cycles_back: u32| {
            cycle_base_height
                .checked_sub(cycles_back * interval + 8)
                .ok_or(QuorumValidationError::RequiredBlockHeightNotPresent(cycle_base_height))
        };
        let q_h_m_c = self.previous_quarters(llmq_type, work_block_height(1)?)?;
        let q_h_m_2c = self.previous_quarters(llmq_type, work_block_height(2)?)?;
        let q_h_m_3c = self.previous_quarters(llmq_type, work_block_height(3)?)?;
        let (new, active_quorum_members) =
            self.new_quarters(llmq_type, work_block_height(0)?, [&q_h_m_c, &q_h_m_2c, &q_h_m_3c])?;
        Ok(([q_h_m_3c, q_h_m_2c, q_h_m_c], new, active_quorum_members))
    }

    /// Computes the committees of every quorum index of the cycle starting at `cycle_base_height`.
    pub fn rotated_committees_for_cycle(
        &self,
        llmq_type: LLMQType,
        cycle_base_height: CoreBlockHeight,
    ) -> Result<Vec<Vec<Member>>, QuorumValidationError> {
        let (previous, new, _) = self.cycle_quarters(llmq_type, cycle_base_height)?;
        let quorum_count = llmq_type.active_quorum_count() as usize;
        let committees = (0..quorum_count)
            .map(|index| {
                previous
                    .iter()
                    .chain(std::iter::once(&new.quarters))
                    .filter_map(|quarters| quarters.get(index))
                    .flat_map(|quarter| quarter.iter().cloned())
                    .collect()
            })
            .collect();
        trace!(%llmq_type, cycle_base_height, "computed rotated committees");
        Ok(committees)
    }

    /// The snapshot a node serving rotation info records for the cycle at `cycle_base_height`.
    pub fn quorum_snapshot_for_cycle(
        &self,
        llmq_type: LLMQType,
        cycle_base_height: CoreBlockHeight,
    ) -> Result<QuorumSnapshot, QuorumValidationError> {
        let (_, new, active_quorum_members) = self.cycle_quarters(llmq_type, cycle_base_height)?;
        Ok(new.snapshot(active_quorum_members))
    }

    /// The committee of the rotated quorum at `quorum_index` of the cycle at `cycle_base_height`.
    ///
    /// All committees of the cycle are cached by cycle base hash and quorum index, since the
    /// hashes of the blocks the later quorums form at are not known yet.
    pub(crate) fn rotated_members_at_index(
        &mut self,
        llmq_type: LLMQType,
        cycle_base_height: CoreBlockHeight,
        quorum_index: u16,
    ) -> Result<Vec<Member>, QuorumValidationError> {
        let cycle_base_hash = *self
            .block_hashes
            .get(&cycle_base_height)
            .ok_or(QuorumValidationError::RequiredBlockHeightNotPresent(cycle_base_height))?;
        if let Some(members) = self.cycle_quorum_members.get(&(llmq_type, cycle_base_hash, quorum_index)) {
            return Ok(members.clone());
        }
        let committees = self.rotated_committees_for_cycle(llmq_type, cycle_base_height)?;
        let members = committees
            .get(quorum_index as usize)
            .cloned()
            .ok_or(QuorumValidationError::RequiredRotatedQuorumMembersNotPresent(cycle_base_hash))?;
        for (index, committee) in committees.into_iter().enumerate() {
            self.cycle_quorum_members.insert((llmq_type, cycle_base_hash, index as u16), committee);
        }
        Ok(members)
    }
}
