use std::sync::Arc;

use hashes::Hash;
use tracing::debug;

use crate::bls_sig_utils::BLSSignature;
use crate::ephemerealdata::sign_id;
use crate::hash_types::{BlockHash, QuorumSigningRequestId, Sha256dHash};
use crate::prelude::CoreBlockHeight;
use crate::sml::llmq_type::LLMQType;
use crate::sml::llmq_type::network::NetworkLLMQExt;
use crate::sml::masternode_list::MasternodeList;
use crate::sml::masternode_list_engine::MasternodeListEngine;
use crate::sml::message_verification_error::MessageVerificationError;
use crate::sml::quorum_entry::qualified_quorum_entry::QualifiedQuorumEntry;
use crate::{ChainLock, InstantLock};

/// Signing requests are assigned to the quorums active this many blocks before the height
/// they are made at, so that nodes a few blocks apart agree on the quorum.
pub const SIGN_HEIGHT_OFFSET: CoreBlockHeight = 8;

/// The quorum index of a rotating quorum type that signs for `selection_hash`.
///
/// Takes the upper `log2(quorum_count)` bits below the top bit of the last eight bytes of
/// the hash read as a little endian integer.
pub fn rotated_quorum_index(quorum_count: u32, selection_hash: &[u8; 32]) -> u16 {
    let n = quorum_count.max(1).ilog2();
    if n == 0 {
        return 0;
    }
    let mut tail = [0u8; 8];
    tail.copy_from_slice(&selection_hash[24..32]);
    let b = u64::from_le_bytes(tail);
    let mask = (1u64 << n) - 1;
    (mask & (b >> (64 - n - 1))) as u16
}

impl MasternodeListEngine {
    fn select_quorum_in_list(
        &self,
        list: &MasternodeList,
        llmq_type: LLMQType,
        request_id: QuorumSigningRequestId,
    ) -> Result<Arc<QualifiedQuorumEntry>, MessageVerificationError> {
        let mut quorums = list.quorums_of_type(llmq_type).peekable();
        if quorums.peek().is_none() {
            return Err(MessageVerificationError::NoQuorumsOfType(list.known_height, llmq_type));
        }
        let selected = if llmq_type.is_rotating_quorum_type() {
            let quorum_index = rotated_quorum_index(llmq_type.active_quorum_count(), request_id.as_byte_array());
            quorums
                .filter(|quorum| quorum.quorum_index() == quorum_index)
                .max_by_key(|quorum| {
                    self.block_heights.get(&BlockHash::from_byte_array(quorum.quorum_entry.quorum_hash.to_byte_array()))
                })
                .ok_or(MessageVerificationError::QuorumIndexNotFound(quorum_index, list.block_hash))?
        } else {
            quorums
                .min_by_key(|quorum| quorum.ordering_hash_for_request_id(request_id))
                .ok_or(MessageVerificationError::NoQuorumsOfType(list.known_height, llmq_type))?
        };
        Ok(selected.clone())
    }

    /// The quorum of `llmq_type` responsible for `request_id` at `sign_height`.
    ///
    /// Quorums are taken from the newest list at or below `sign_height - SIGN_HEIGHT_OFFSET`.
    /// Rotating types pick the quorum whose index the request id maps to, the others pick the
    /// quorum with the smallest ordering hash.
    pub fn select_quorum_for_signing(
        &self,
        llmq_type: LLMQType,
        sign_height: CoreBlockHeight,
        request_id: QuorumSigningRequestId,
    ) -> Result<Arc<QualifiedQuorumEntry>, MessageVerificationError> {
        if self.masternode_lists.is_empty() {
            return Err(MessageVerificationError::NoMasternodeLists);
        }
        let height = sign_height.saturating_sub(SIGN_HEIGHT_OFFSET);
        let list = self
            .masternode_list_at_or_before(height)
            .ok_or(MessageVerificationError::NoMasternodeListAtHeight(height))?;
        self.select_quorum_in_list(list, llmq_type, request_id)
    }

    pub fn verify_chain_lock(&self, chain_lock: &ChainLock) -> Result<(), MessageVerificationError> {
        let llmq_type = self.network.chain_locks_type();
        let quorum = self.select_quorum_for_signing(llmq_type, chain_lock.block_height, chain_lock.request_id())?;
        let sign_id = chain_lock.sign_id(llmq_type, quorum.quorum_entry.quorum_hash);
        quorum.verify_message_digest(sign_id, chain_lock.signature)
    }

    /// The quorum that signs `instant_lock`, with its request id and quorum index.
    ///
    /// Deterministic locks name the cycle whose rotated quorums sign them. Older locks are
    /// signed by a quorum of the instant send type of the latest list.
    pub fn is_lock_quorum(
        &self,
        instant_lock: &InstantLock,
    ) -> Result<(Arc<QualifiedQuorumEntry>, QuorumSigningRequestId, u16), MessageVerificationError> {
        let request_id = instant_lock.request_id();
        if !instant_lock.is_deterministic() {
            let list = self.latest_masternode_list().ok_or(MessageVerificationError::NoMasternodeLists)?;
            let quorum = self.select_quorum_in_list(list, self.network.is_llmq_type(), request_id)?;
            let quorum_index = quorum.quorum_index();
            return Ok((quorum, request_id, quorum_index));
        }

        let cycle_hash = instant_lock.cyclehash;
        let quorums = self
            .rotated_quorums_per_cycle
            .get(&cycle_hash)
            .ok_or(MessageVerificationError::CycleHashNotPresent(cycle_hash))?;
        if quorums.is_empty() {
            return Err(MessageVerificationError::CycleHashEmpty(cycle_hash));
        }
        let quorum_count = self.network.isd_llmq_type().active_quorum_count();
        let quorum_index = rotated_quorum_index(quorum_count, request_id.as_byte_array());
        let quorum = quorums
            .iter()
            .find(|quorum| quorum.quorum_index() == quorum_index)
            .ok_or(MessageVerificationError::QuorumIndexNotFound(quorum_index, cycle_hash))?;
        Ok((quorum.clone(), request_id, quorum_index))
    }

    pub fn verify_is_lock(&self, instant_lock: &InstantLock) -> Result<(), MessageVerificationError> {
        let (quorum, _, _) = self.is_lock_quorum(instant_lock)?;
        let sign_id = instant_lock.sign_id(quorum.quorum_entry.llmq_type, quorum.quorum_entry.quorum_hash);
        quorum.verify_message_digest(sign_id, instant_lock.signature)
    }

    /// Checks a recovered signature against the quorum selected for its request.
    ///
    /// Returns `false` on any failure. The reason is logged.
    pub fn verify_recovered_sig(
        &self,
        llmq_type: LLMQType,
        sign_height: CoreBlockHeight,
        request_id: QuorumSigningRequestId,
        msg_hash: Sha256dHash,
        signature: BLSSignature,
    ) -> bool {
        let result = self.select_quorum_for_signing(llmq_type, sign_height, request_id).and_then(|quorum| {
            let sign_id =
                sign_id(llmq_type, quorum.quorum_entry.quorum_hash, request_id, msg_hash.as_byte_array());
            quorum.verify_message_digest(sign_id, signature)
        });
        match result {
            Ok(()) => true,
            Err(error) => {
                debug!(%llmq_type, sign_height, %request_id, %error, "recovered signature rejected");
                false
            }
        }
    }
}
