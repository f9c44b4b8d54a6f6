#[cfg(feature = "bincode")]
use bincode::{Decode, Encode};
use thiserror::Error;

use crate::bls_sig_utils::{BLSPublicKey, BLSSignature};
use crate::hash_types::{BlockHash, QuorumHash, QuorumSigningSignId};
use crate::prelude::CoreBlockHeight;
use crate::sml::llmq_type::LLMQType;
use crate::sml::quorum_validation_error::QuorumValidationError;

/// Why a chain lock, InstantSend lock or recovered signature failed verification.
#[derive(Debug, Error, Clone, Ord, PartialOrd, PartialEq, Hash, Eq)]
#[cfg_attr(feature = "bincode", derive(Encode, Decode))]
pub enum MessageVerificationError {
    #[error("Required cycle not present to verify instant send: {0}")]
    CycleHashNotPresent(BlockHash),

    #[error("Required cycle present but has no quorum: {0}")]
    CycleHashEmpty(BlockHash),

    #[error("Quorum with index {0} not found in cycle {1}")]
    QuorumIndexNotFound(u16, BlockHash),

    #[error("No masternode lists in engine")]
    NoMasternodeLists,

    #[error("No masternode list at or below height {0}")]
    NoMasternodeListAtHeight(CoreBlockHeight),

    #[error("Masternode list at height {0} has no quorums of type {1}")]
    NoQuorumsOfType(CoreBlockHeight, LLMQType),

    #[error("Quorum {0} of type {1} is not known")]
    UnknownQuorum(QuorumHash, LLMQType),

    #[error(
        "Threshold signature {0} is not valid for digest {1} using public key {2} for quorum {3} of type {4}, error is: {5}"
    )]
    ThresholdSignatureNotValid(
        Box<BLSSignature>,
        Box<QuorumSigningSignId>,
        Box<BLSPublicKey>,
        QuorumHash,
        LLMQType,
        String,
    ),

    #[error("Invalid BLS public key: {0}")]
    InvalidBLSPublicKey(String),

    #[error("Invalid BLS signature: {0}")]
    InvalidBLSSignature(String),

    #[error("Error: {0}")]
    Generic(String),
}

impl From<QuorumValidationError> for MessageVerificationError {
    fn from(value: QuorumValidationError) -> Self {
        match value {
            QuorumValidationError::InvalidBLSPublicKey(public_key) => {
                MessageVerificationError::InvalidBLSPublicKey(public_key)
            }
            QuorumValidationError::InvalidBLSSignature(signature) => {
                MessageVerificationError::InvalidBLSSignature(signature)
            }
            error => MessageVerificationError::Generic(error.to_string()),
        }
    }
}
