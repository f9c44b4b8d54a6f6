#[cfg(feature = "bincode")]
use bincode::{Decode, Encode};
use thiserror::Error;

use crate::BlockHash;
use crate::prelude::CoreBlockHeight;
use crate::sml::llmq_type::LLMQType;

/// Why a quorum commitment, or the committee behind it, could not be validated.
#[derive(Debug, Error, Clone, Ord, PartialOrd, PartialEq, Hash, Eq)]
#[cfg_attr(feature = "bincode", derive(Encode, Decode))]
pub enum QuorumValidationError {
    #[error("Required block not present: {0}")]
    RequiredBlockNotPresent(BlockHash),

    #[error("Required block hash not present at height {0}")]
    RequiredBlockHeightNotPresent(CoreBlockHeight),

    #[error("Required masternode list not present at block height {0}")]
    RequiredMasternodeListNotPresent(CoreBlockHeight),

    #[error("Required chain lock not present at block height {0}, block hash: {1}")]
    RequiredChainLockNotPresent(CoreBlockHeight, BlockHash),

    #[error("Required quorum snapshot not present for block {0}")]
    RequiredSnapshotNotPresent(BlockHash),

    #[error("Required rotated members not present for quorum at block {0}")]
    RequiredRotatedQuorumMembersNotPresent(BlockHash),

    #[error("Invalid quorum commitment version {0}")]
    InvalidQuorumVersion(u16),

    #[error("Quorum of type {llmq_type} at height {height} is not on a DKG interval")]
    QuorumHeightNotOnInterval { llmq_type: LLMQType, height: CoreBlockHeight },

    #[error("Invalid quorum index {index} for quorum of type {llmq_type}")]
    InvalidQuorumIndex { llmq_type: LLMQType, index: i16 },

    #[error("Insufficient signers: required {required}, found {found}")]
    InsufficientSigners { required: u64, found: u64 },

    #[error("Insufficient valid members: required {required}, found {found}")]
    InsufficientValidMembers { required: u64, found: u64 },

    #[error(
        "Invalid bitset lengths: expected {expected}, signers length {signers_len}, valid members length {valid_members_len}"
    )]
    InvalidBitsetLengths { expected: usize, signers_len: usize, valid_members_len: usize },

    #[error("Committee has {found} members, commitment expects {expected}")]
    CommitteeSizeMismatch { expected: usize, found: usize },

    #[error("Invalid null commitment: {0}")]
    InvalidNullCommitment(String),

    #[error("Invalid quorum public key")]
    InvalidQuorumPublicKey,

    #[error("Invalid BLS public key: {0}")]
    InvalidBLSPublicKey(String),

    #[error("Invalid BLS signature: {0}")]
    InvalidBLSSignature(String),

    #[error("All commitment aggregated signature not valid: {0}")]
    AllCommitmentAggregatedSignatureNotValid(String),

    #[error("Threshold signature not valid: {0}")]
    ThresholdSignatureNotValid(String),

    #[error("Unsupported skip list mode {0}")]
    UnsupportedSkipListMode(i32),

    #[error("Corrupted skip list: {0}")]
    CorruptedSkipList(String),
}
