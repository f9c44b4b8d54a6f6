use std::sync::Arc;

use hashes::Hash;

use crate::blockdata::transaction::special_transaction::quorum_commitment::QuorumEntry;
use crate::hash_types::{BlockHash, QuorumHash};
use crate::prelude::CoreBlockHeight;
use crate::sml::llmq_type::LLMQType;
use crate::sml::llmq_type::network::NetworkLLMQExt;
use crate::sml::masternode_list_engine::MasternodeListEngine;
use crate::sml::masternode_list_entry::qualified_masternode_list_entry::QualifiedMasternodeListEntry;
use crate::sml::quorum_entry::qualified_quorum_entry::QualifiedQuorumEntry;
use crate::sml::quorum_entry::quorum_modifier_type::LLMQModifierType;
use crate::sml::quorum_validation_error::QuorumValidationError;

/// Distance between a quorum block and the work block its members are drawn from.
pub(crate) const WORK_DIFF_DEPTH: CoreBlockHeight = 8;

impl MasternodeListEngine {
    /// The modifier of a non rotating quorum formed at `quorum_height`.
    ///
    /// Activation of v20 is decided at the work block, `WORK_DIFF_DEPTH` blocks below the
    /// quorum. Before it the quorum block hash is the modifier.
    pub(crate) fn quorum_modifier_type(
        &self,
        llmq_type: LLMQType,
        quorum_block_hash: BlockHash,
        quorum_height: CoreBlockHeight,
        quorum_hash: Option<QuorumHash>,
    ) -> Result<LLMQModifierType, QuorumValidationError> {
        let work_block_height = quorum_height.saturating_sub(WORK_DIFF_DEPTH);
        if !self.network.core_v20_is_active_at(work_block_height) {
            return Ok(LLMQModifierType::PreCoreV20(llmq_type, quorum_block_hash));
        }
        let work_block_hash = *self
            .block_hashes
            .get(&work_block_height)
            .ok_or(QuorumValidationError::RequiredBlockHeightNotPresent(work_block_height))?;
        self.work_block_modifier_type(llmq_type, work_block_hash, work_block_height, quorum_hash)
    }

    /// The modifier of a quorum whose members come from the list at the work block.
    ///
    /// Once v20 is active the modifier needs the chain lock signature committed at the work
    /// block, or the one a diff announced for `quorum_hash`.
    pub(crate) fn work_block_modifier_type(
        &self,
        llmq_type: LLMQType,
        work_block_hash: BlockHash,
        work_block_height: CoreBlockHeight,
        quorum_hash: Option<QuorumHash>,
    ) -> Result<LLMQModifierType, QuorumValidationError> {
        if !self.network.core_v20_is_active_at(work_block_height) {
            return Ok(LLMQModifierType::PreCoreV20(llmq_type, work_block_hash));
        }
        let signature = self
            .known_chain_locks
            .get(&work_block_hash)
            .or_else(|| quorum_hash.and_then(|quorum_hash| self.quorum_chain_lock_signatures.get(&quorum_hash)))
            .copied()
            .ok_or(QuorumValidationError::RequiredChainLockNotPresent(work_block_height, work_block_hash))?;
        Ok(LLMQModifierType::new_quorum_modifier_type(
            llmq_type,
            work_block_hash,
            work_block_height,
            Some(signature),
            self.network,
        ))
    }

    /// The committee of `quorum`, in the order its bitsets refer to.
    pub fn quorum_members_for(
        &mut self,
        quorum: &QuorumEntry,
    ) -> Result<Vec<Arc<QualifiedMasternodeListEntry>>, QuorumValidationError> {
        let block_hash = BlockHash::from_byte_array(quorum.quorum_hash.to_byte_array());
        let height = *self
            .block_heights
            .get(&block_hash)
            .ok_or(QuorumValidationError::RequiredBlockNotPresent(block_hash))?;
        let llmq_type = quorum.llmq_type;
        let rotated_index = if llmq_type.is_rotating_quorum_type() {
            let quorum_index = llmq_type.quorum_index_at(height);
            if quorum.quorum_index.map(i32::from) != Some(quorum_index as i32) {
                return Err(QuorumValidationError::InvalidQuorumIndex {
                    llmq_type,
                    index: quorum.quorum_index.unwrap_or(-1),
                });
            }
            Some(quorum_index)
        } else {
            if !llmq_type.is_dkg_height(height) {
                return Err(QuorumValidationError::QuorumHeightNotOnInterval { llmq_type, height });
            }
            None
        };

        let key = (llmq_type, quorum.quorum_hash);
        if let Some(members) = self.quorum_members.get(&key) {
            return Ok(members.clone());
        }
        let members = if let Some(quorum_index) = rotated_index {
            self.rotated_members_at_index(llmq_type, height - quorum_index, quorum_index as u16)?
        } else {
            let modifier = self
                .quorum_modifier_type(llmq_type, block_hash, height, Some(quorum.quorum_hash))?
                .build_llmq_hash();
            // members are drawn from the work block list once v20 is active at the quorum block
            let list_height = if self.network.core_v20_is_active_at(height) {
                height.saturating_sub(WORK_DIFF_DEPTH)
            } else {
                height
            };
            let list = self
                .masternode_lists
                .get(&list_height)
                .ok_or(QuorumValidationError::RequiredMasternodeListNotPresent(list_height))?;
            list.calculate_quorum(
                llmq_type.size() as usize,
                modifier,
                llmq_type == self.network.platform_type(),
            )
        };
        self.quorum_members.insert(key, members.clone());
        Ok(members)
    }

    /// Validates a commitment against the committee it was made by.
    pub fn validate_quorum(&mut self, quorum: &QualifiedQuorumEntry) -> Result<(), QuorumValidationError> {
        if quorum.quorum_entry.is_null() {
            return quorum.quorum_entry.validate_null();
        }
        quorum.quorum_entry.validate_structure()?;
        let members = self.quorum_members_for(&quorum.quorum_entry)?;
        quorum.validate(
            members.iter().map(|member| &member.masternode_list_entry),
            self.verify_threshold_signatures,
        )
    }
}
