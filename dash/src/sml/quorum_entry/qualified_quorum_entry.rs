#[cfg(feature = "bincode")]
use bincode::{Decode, Encode};

use crate::blockdata::transaction::special_transaction::quorum_commitment::QuorumEntry;
use crate::hash_types::{QuorumCommitmentHash, QuorumEntryHash};
use crate::sml::llmq_entry_verification::{
    LLMQEntryVerificationSkipStatus, LLMQEntryVerificationStatus,
};
use crate::sml::quorum_validation_error::QuorumValidationError;

/// A quorum commitment with its derived hashes and verification state.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Hash)]
#[cfg_attr(feature = "bincode", derive(Encode, Decode))]
pub struct QualifiedQuorumEntry {
    pub quorum_entry: QuorumEntry,
    pub verified: LLMQEntryVerificationStatus,
    pub commitment_hash: QuorumCommitmentHash,
    pub entry_hash: QuorumEntryHash,
}

impl From<QuorumEntry> for QualifiedQuorumEntry {
    fn from(value: QuorumEntry) -> Self {
        QualifiedQuorumEntry {
            commitment_hash: value.calculate_commitment_hash(),
            entry_hash: value.calculate_entry_hash(),
            quorum_entry: value,
            verified: LLMQEntryVerificationStatus::Skipped(
                LLMQEntryVerificationSkipStatus::NotMarkedForVerification,
            ),
        }
    }
}

impl QualifiedQuorumEntry {
    /// Records the outcome of validating this commitment.
    ///
    /// Missing context (an unknown block or masternode list) marks the entry as skipped
    /// rather than invalid, so that it can be validated again later.
    pub fn update_quorum_status(&mut self, result: Result<(), QuorumValidationError>) {
        self.verified = match result {
            Ok(()) => LLMQEntryVerificationStatus::Verified,
            Err(QuorumValidationError::RequiredBlockNotPresent(block_hash)) => {
                LLMQEntryVerificationStatus::Skipped(LLMQEntryVerificationSkipStatus::UnknownBlock(
                    block_hash,
                ))
            }
            Err(QuorumValidationError::RequiredMasternodeListNotPresent(height)) => {
                LLMQEntryVerificationStatus::Skipped(LLMQEntryVerificationSkipStatus::MissedList(
                    height,
                ))
            }
            Err(
                error @ (QuorumValidationError::RequiredSnapshotNotPresent(_)
                | QuorumValidationError::RequiredChainLockNotPresent(..)
                | QuorumValidationError::RequiredBlockHeightNotPresent(_)
                | QuorumValidationError::RequiredRotatedQuorumMembersNotPresent(_)),
            ) => LLMQEntryVerificationStatus::Skipped(LLMQEntryVerificationSkipStatus::OtherContext(
                error.to_string(),
            )),
            Err(error) => LLMQEntryVerificationStatus::Invalid(error),
        };
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use hashes::Hash;

    use super::*;
    use crate::bls_sig_utils::{BLSPublicKey, BLSSignature};
    use crate::hash_types::{BlockHash, QuorumHash, QuorumVVecHash};
    use crate::sml::llmq_type::LLMQType;

    pub(crate) fn null_entry(size: usize) -> QuorumEntry {
        QuorumEntry {
            version: 1,
            llmq_type: LLMQType::LlmqtypeTest,
            quorum_hash: QuorumHash::from_byte_array([8; 32]),
            quorum_index: None,
            signers: vec![false; size],
            valid_members: vec![false; size],
            quorum_public_key: BLSPublicKey::default(),
            quorum_vvec_hash: QuorumVVecHash::all_zeros(),
            threshold_sig: BLSSignature::default(),
            all_commitment_aggregated_signature: BLSSignature::default(),
        }
    }

    #[test]
    fn status_updates() {
        let mut entry = QualifiedQuorumEntry::from(null_entry(4));
        assert!(!entry.verified.is_verified());

        entry.update_quorum_status(Err(QuorumValidationError::RequiredBlockNotPresent(
            BlockHash::all_zeros(),
        )));
        assert_eq!(
            entry.verified,
            LLMQEntryVerificationStatus::Skipped(LLMQEntryVerificationSkipStatus::UnknownBlock(
                BlockHash::all_zeros()
            ))
        );

        entry.update_quorum_status(Err(QuorumValidationError::InvalidQuorumPublicKey));
        assert!(entry.verified.is_invalid());

        entry.update_quorum_status(Ok(()));
        assert!(entry.verified.is_verified());
    }
}
