mod helpers;
mod message_request_verification;
pub mod rotated_quorum_construction;
mod validation;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use hashes::Hash;
use tracing::{debug, info, trace, warn};

use crate::bls_sig_utils::BLSSignature;
use crate::hash_types::{BlockHash, QuorumHash};
use crate::network::Network;
use crate::network::message_qrinfo::{QRInfo, QuorumSnapshot};
use crate::network::message_sml::MnListDiff;
use crate::prelude::CoreBlockHeight;
use crate::sml::error::SmlError;
use crate::sml::llmq_type::LLMQType;
use crate::sml::masternode_list::MasternodeList;
use crate::sml::masternode_list_entry::qualified_masternode_list_entry::QualifiedMasternodeListEntry;
use crate::sml::quorum_entry::qualified_quorum_entry::QualifiedQuorumEntry;

/// How many historical masternode lists the engine keeps.
///
/// The latest list and the lists pinned by the last quorum rotation info are always kept.
/// On top of those the `max_retained_lists` most recent lists survive pruning.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MasternodeListCachePolicy {
    pub max_retained_lists: usize,
}

impl MasternodeListCachePolicy {
    pub const fn minimal() -> Self {
        MasternodeListCachePolicy { max_retained_lists: 1 }
    }

    pub const fn full() -> Self {
        MasternodeListCachePolicy { max_retained_lists: 10 }
    }
}

impl Default for MasternodeListCachePolicy {
    fn default() -> Self {
        Self::full()
    }
}

/// Holds the masternode lists known to a client and everything needed to validate the
/// quorums they carry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MasternodeListEngine {
    pub network: Network,
    pub block_hashes: BTreeMap<CoreBlockHeight, BlockHash>,
    pub block_heights: BTreeMap<BlockHash, CoreBlockHeight>,
    pub masternode_lists: BTreeMap<CoreBlockHeight, MasternodeList>,
    /// Best chain lock signature committed in the coinbase of a block.
    pub known_chain_locks: BTreeMap<BlockHash, BLSSignature>,
    /// Chain lock signature a quorum modifier was built from, as announced by a diff.
    pub quorum_chain_lock_signatures: BTreeMap<QuorumHash, BLSSignature>,
    /// Rotation snapshots keyed by the work block they describe.
    pub known_snapshots: BTreeMap<BlockHash, QuorumSnapshot>,
    /// The rotated quorums of a cycle ordered by quorum index, keyed by the cycle base block.
    pub rotated_quorums_per_cycle: BTreeMap<BlockHash, Vec<Arc<QualifiedQuorumEntry>>>,
    pub(crate) quorum_members: BTreeMap<(LLMQType, QuorumHash), Vec<Arc<QualifiedMasternodeListEntry>>>,
    pub(crate) cycle_quorum_members:
        BTreeMap<(LLMQType, BlockHash, u16), Vec<Arc<QualifiedMasternodeListEntry>>>,
    pub cache_policy: MasternodeListCachePolicy,
    pub pinned_heights: BTreeSet<CoreBlockHeight>,
    /// Diffs must build on the latest list and advance it by exactly one block.
    pub strict_height_check: bool,
    /// Check the recovered threshold signature of commitments on top of the members'
    /// aggregated signature.
    pub verify_threshold_signatures: bool,
}

impl MasternodeListEngine {
    pub fn new(network: Network) -> Self {
        MasternodeListEngine {
            network,
            block_hashes: BTreeMap::new(),
            block_heights: BTreeMap::new(),
            masternode_lists: BTreeMap::new(),
            known_chain_locks: BTreeMap::new(),
            quorum_chain_lock_signatures: BTreeMap::new(),
            known_snapshots: BTreeMap::new(),
            rotated_quorums_per_cycle: BTreeMap::new(),
            quorum_members: BTreeMap::new(),
            cycle_quorum_members: BTreeMap::new(),
            cache_policy: MasternodeListCachePolicy::default(),
            pinned_heights: BTreeSet::new(),
            strict_height_check: true,
            verify_threshold_signatures: true,
        }
    }

    pub fn with_cache_policy(mut self, cache_policy: MasternodeListCachePolicy) -> Self {
        self.cache_policy = cache_policy;
        self
    }

    pub fn with_strict_height_check(mut self, strict_height_check: bool) -> Self {
        self.strict_height_check = strict_height_check;
        self
    }

    pub fn with_threshold_signature_verification(mut self, verify_threshold_signatures: bool) -> Self {
        self.verify_threshold_signatures = verify_threshold_signatures;
        self
    }

    /// Starts an engine from a diff against the genesis sentinel.
    pub fn initialize_with_diff(diff: &MnListDiff, network: Network, verify_quorums: bool) -> Result<Self, SmlError> {
        let mut engine = MasternodeListEngine::new(network);
        engine.apply_diff(diff, verify_quorums)?;
        Ok(engine)
    }

    /// Records the height of a block the engine did not learn about through a diff.
    pub fn feed_block_height(&mut self, height: CoreBlockHeight, block_hash: BlockHash) {
        self.block_hashes.insert(height, block_hash);
        self.block_heights.insert(block_hash, height);
    }

    pub fn latest_masternode_list(&self) -> Option<&MasternodeList> {
        self.masternode_lists.last_key_value().map(|(_, list)| list)
    }

    pub fn latest_masternode_list_quorum_hashes(&self) -> BTreeSet<QuorumHash> {
        self.latest_masternode_list().map(|list| list.quorum_hashes()).unwrap_or_default()
    }

    pub fn masternode_list_for_block_hash(&self, block_hash: &BlockHash) -> Option<&MasternodeList> {
        self.block_heights.get(block_hash).and_then(|height| self.masternode_lists.get(height))
    }

    /// Applies a diff on top of the list it is based on.
    ///
    /// The base must be a list the engine holds, or the genesis sentinel. With the strict
    /// height check the base must be the latest list. A diff for a block that already has a
    /// list is ignored, a diff for a height held by another block is rejected.
    pub fn apply_diff(&mut self, diff: &MnListDiff, verify_quorums: bool) -> Result<(), SmlError> {
        self.apply_diff_with_height_check(diff, verify_quorums, self.strict_height_check)
    }

    fn apply_diff_with_height_check(
        &mut self,
        diff: &MnListDiff,
        verify_quorums: bool,
        strict_height: bool,
    ) -> Result<(), SmlError> {
        if let Some(height) = self.block_heights.get(&diff.block_hash) {
            if self.masternode_lists.contains_key(height) {
                trace!(block_hash = %diff.block_hash, height, "diff target already known");
                return Ok(());
            }
        }
        let list = if diff.base_block_hash == BlockHash::all_zeros() {
            MasternodeList::from_diff(diff)?
        } else {
            let latest = self.latest_masternode_list();
            let chain_mismatch = || SmlError::ChainMismatch {
                expected: latest.map(|list| list.block_hash).unwrap_or_else(BlockHash::all_zeros),
                found: diff.base_block_hash,
                same_height: latest.is_some_and(|list| diff.block_height() == Some(list.known_height)),
            };
            if strict_height && latest.map(|list| list.block_hash) != Some(diff.base_block_hash) {
                return Err(chain_mismatch());
            }
            let base = self.masternode_list_for_block_hash(&diff.base_block_hash).ok_or_else(chain_mismatch)?;
            base.apply_diff(diff, strict_height)?
        };
        let height = list.known_height;
        if let Some(known) = self.masternode_lists.get(&height) {
            warn!(height, known = %known.block_hash, block_hash = %diff.block_hash, "diff forks a known list");
            return Err(SmlError::ChainMismatch {
                expected: known.block_hash,
                found: diff.block_hash,
                same_height: true,
            });
        }
        let quorum_signatures = diff.chain_lock_signature_per_new_quorum()?;
        let chain_lock =
            diff.coinbase_payload().and_then(|coinbase| coinbase.best_cl_signature).filter(|sig| !sig.is_zeroed());

        self.feed_block_height(height, list.block_hash);
        if let Some(signature) = chain_lock {
            self.known_chain_locks.insert(diff.block_hash, signature);
        }
        for (quorum, signature) in diff.new_quorums.iter().zip(quorum_signatures) {
            if let Some(signature) = signature {
                self.quorum_chain_lock_signatures.insert(quorum.quorum_hash, signature);
            }
        }
        self.masternode_lists.insert(height, list);
        if verify_quorums {
            let new_quorums: Vec<(LLMQType, QuorumHash)> =
                diff.new_quorums.iter().map(|quorum| (quorum.llmq_type, quorum.quorum_hash)).collect();
            self.verify_list_quorums(height, &new_quorums);
        }
        debug!(
            height,
            block_hash = %diff.block_hash,
            new_masternodes = diff.new_masternodes.len(),
            new_quorums = diff.new_quorums.len(),
            "masternode list diff applied"
        );
        self.prune_masternode_lists();
        Ok(())
    }

    /// Validates the given quorums of the list at `height` and records the outcome on them.
    fn verify_list_quorums(&mut self, height: CoreBlockHeight, quorums: &[(LLMQType, QuorumHash)]) {
        let mut results = Vec::with_capacity(quorums.len());
        for &(llmq_type, quorum_hash) in quorums {
            let Some(quorum) = self
                .masternode_lists
                .get(&height)
                .and_then(|list| list.quorum_entry_of_type_for_quorum_hash(llmq_type, quorum_hash))
                .cloned()
            else {
                continue;
            };
            let result = self.validate_quorum(&quorum);
            if let Err(error) = &result {
                warn!(%llmq_type, %quorum_hash, %error, "quorum did not validate");
            }
            results.push((llmq_type, quorum_hash, result));
        }
        if let Some(list) = self.masternode_lists.get_mut(&height) {
            for (llmq_type, quorum_hash, result) in results {
                if let Some(quorum) = list.quorum_entry_of_type_for_quorum_hash_mut(llmq_type, quorum_hash) {
                    quorum.update_quorum_status(result);
                }
            }
        }
    }

    /// Feeds a quorum rotation info message.
    ///
    /// The contained diffs are applied oldest first without the strict height check, their
    /// snapshots are recorded, and the last commitment of every quorum index is validated
    /// and stored as the rotated quorums of its cycle. Heights of commitment blocks the
    /// engine has not seen are resolved through `fetch_block_height`.
    pub fn feed_qr_info<FH>(
        &mut self,
        qr_info: QRInfo,
        verify_rotated_quorums: bool,
        fetch_block_height: Option<FH>,
    ) -> Result<(), SmlError>
    where
        FH: Fn(&BlockHash) -> Option<CoreBlockHeight>,
    {
        let mut snapshots: Vec<(&QuorumSnapshot, &MnListDiff)> = qr_info
            .quorum_snapshot_list
            .iter()
            .zip(qr_info.mn_list_diff_list.iter())
            .collect();
        if let Some((snapshot, diff)) = &qr_info.quorum_snapshot_and_mn_list_diff_at_h_minus_4c {
            snapshots.push((snapshot, diff));
        }
        snapshots.push((&qr_info.quorum_snapshot_at_h_minus_3c, &qr_info.mn_list_diff_at_h_minus_3c));
        snapshots.push((&qr_info.quorum_snapshot_at_h_minus_2c, &qr_info.mn_list_diff_at_h_minus_2c));
        snapshots.push((&qr_info.quorum_snapshot_at_h_minus_c, &qr_info.mn_list_diff_at_h_minus_c));
        for (snapshot, diff) in snapshots {
            self.known_snapshots.insert(diff.block_hash, snapshot.clone());
        }

        let mut diffs = qr_info.cycle_diffs();
        diffs.push(&qr_info.mn_list_diff_tip);
        let mut ordered = Vec::with_capacity(diffs.len());
        for diff in diffs {
            let height = diff.block_height().ok_or(SmlError::MissingCoinbasePayload)?;
            ordered.push((height, diff));
        }
        ordered.sort_by_key(|(height, _)| *height);
        ordered.dedup_by_key(|(_, diff)| diff.block_hash);

        let mut pinned = BTreeSet::new();
        for (height, diff) in ordered {
            self.apply_diff_with_height_check(diff, false, false)?;
            pinned.insert(height);
        }
        self.pinned_heights = pinned;

        if let Some(fetch_block_height) = &fetch_block_height {
            for commitment in &qr_info.last_commitment_per_index {
                let block_hash = BlockHash::from_byte_array(commitment.quorum_hash.to_byte_array());
                if !self.block_heights.contains_key(&block_hash) {
                    if let Some(height) = fetch_block_height(&block_hash) {
                        self.feed_block_height(height, block_hash);
                    }
                }
            }
        }

        let mut rotated: Vec<Arc<QualifiedQuorumEntry>> = Vec::with_capacity(qr_info.last_commitment_per_index.len());
        for commitment in qr_info.last_commitment_per_index {
            let mut quorum = QualifiedQuorumEntry::from(commitment);
            if verify_rotated_quorums {
                let result = self.validate_quorum(&quorum);
                if let Err(error) = &result {
                    warn!(
                        llmq_type = %quorum.quorum_entry.llmq_type,
                        quorum_hash = %quorum.quorum_entry.quorum_hash,
                        %error,
                        "rotated quorum did not validate"
                    );
                }
                quorum.update_quorum_status(result);
            }
            rotated.push(Arc::new(quorum));
        }
        rotated.sort_by_key(|quorum| quorum.quorum_index());
        if let Some(first) = rotated.first() {
            let cycle_hash = BlockHash::from_byte_array(first.quorum_entry.quorum_hash.to_byte_array());
            info!(%cycle_hash, quorums = rotated.len(), "recorded rotated quorums of cycle");
            self.rotated_quorums_per_cycle.insert(cycle_hash, rotated);
        }
        self.prune_masternode_lists();
        Ok(())
    }

    /// Drops the lists the cache policy does not retain.
    fn prune_masternode_lists(&mut self) {
        let Some(latest) = self.masternode_lists.last_key_value().map(|(height, _)| *height) else {
            return;
        };
        let evicted: Vec<CoreBlockHeight> = self
            .masternode_lists
            .keys()
            .rev()
            .filter(|height| **height != latest && !self.pinned_heights.contains(*height))
            .skip(self.cache_policy.max_retained_lists)
            .copied()
            .collect();
        if evicted.is_empty() {
            return;
        }
        for height in &evicted {
            self.masternode_lists.remove(height);
        }
        let retained: BTreeSet<QuorumHash> =
            self.masternode_lists.values().flat_map(|list| list.quorum_hashes()).collect();
        self.quorum_members.retain(|(_, quorum_hash), _| retained.contains(quorum_hash));
        trace!(evicted = evicted.len(), retained = self.masternode_lists.len(), "pruned masternode lists");
    }
}
