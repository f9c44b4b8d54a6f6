use std::fmt;

use hashes::Hash;

use crate::bls_sig_utils::BLSSignature;
use crate::hash_types::{BlockHash, QuorumModifierHash};
use crate::network::Network;
use crate::prelude::CoreBlockHeight;
use crate::sml::llmq_type::LLMQType;

/// The entropy source mixed into masternode scores for one quorum.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum LLMQModifierType {
    /// `sha256d(llmqType || blockHash)`.
    PreCoreV20(LLMQType, BlockHash),
    /// `sha256d(llmqType || workBlockHeight || bestChainLockSignature)`.
    CoreV20(LLMQType, CoreBlockHeight, BLSSignature),
}

impl fmt::Display for LLMQModifierType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LLMQModifierType::PreCoreV20(llmq_type, block_hash) => {
                write!(f, "PreCoreV20: Type: {}, BlockHash: {}", llmq_type, block_hash)
            }
            LLMQModifierType::CoreV20(llmq_type, height, signature) => {
                write!(f, "CoreV20: Type: {}, Height: {}, Signature: {}", llmq_type, height, signature)
            }
        }
    }
}

impl LLMQModifierType {
    pub fn build_llmq_hash(&self) -> QuorumModifierHash {
        let mut writer = Vec::with_capacity(1 + 4 + 96);
        match self {
            LLMQModifierType::PreCoreV20(llmq_type, block_hash) => {
                writer.push(llmq_type.index());
                writer.extend_from_slice(block_hash.as_byte_array());
            }
            LLMQModifierType::CoreV20(llmq_type, block_height, cl_signature) => {
                writer.push(llmq_type.index());
                writer.extend_from_slice(&block_height.to_le_bytes());
                writer.extend_from_slice(cl_signature.as_bytes());
            }
        }
        QuorumModifierHash::hash(&writer)
    }

    /// Picks the modifier of a quorum whose members are taken from the list at the work block.
    ///
    /// Once v20 is active the chain lock signature committed in the work block's coinbase
    /// is used when there is one. Otherwise the work block hash is used.
    pub fn new_quorum_modifier_type(
        llmq_type: LLMQType,
        work_block_hash: BlockHash,
        work_block_height: CoreBlockHeight,
        work_block_chain_lock: Option<BLSSignature>,
        network: Network,
    ) -> LLMQModifierType {
        match work_block_chain_lock {
            Some(signature) if network.core_v20_is_active_at(work_block_height) => {
                LLMQModifierType::CoreV20(llmq_type, work_block_height, signature)
            }
            _ => LLMQModifierType::PreCoreV20(llmq_type, work_block_hash),
        }
    }
}
