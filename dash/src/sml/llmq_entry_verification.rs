use std::fmt::{Display, Formatter};

#[cfg(feature = "bincode")]
use bincode::{Decode, Encode};

use crate::hash_types::BlockHash;
use crate::prelude::CoreBlockHeight;
use crate::sml::quorum_validation_error::QuorumValidationError;

/// Why a quorum commitment was accepted without being verified.
#[derive(Clone, Ord, PartialOrd, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "bincode", derive(Encode, Decode))]
pub enum LLMQEntryVerificationSkipStatus {
    NotMarkedForVerification,
    MissedList(CoreBlockHeight),
    UnknownBlock(BlockHash),
    OtherContext(String),
}

impl Display for LLMQEntryVerificationSkipStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            LLMQEntryVerificationSkipStatus::NotMarkedForVerification => {
                f.write_str("NotMarkedForVerification")
            }
            LLMQEntryVerificationSkipStatus::MissedList(height) => write!(f, "MissedList({height})"),
            LLMQEntryVerificationSkipStatus::UnknownBlock(block_hash) => {
                write!(f, "UnknownBlock({block_hash})")
            }
            LLMQEntryVerificationSkipStatus::OtherContext(message) => {
                write!(f, "OtherContext({message})")
            }
        }
    }
}

/// Verification state of a quorum commitment held by a masternode list.
#[derive(Clone, Ord, PartialOrd, PartialEq, Eq, Hash, Debug, Default)]
#[cfg_attr(feature = "bincode", derive(Encode, Decode))]
pub enum LLMQEntryVerificationStatus {
    #[default]
    Unknown,
    Verified,
    Skipped(LLMQEntryVerificationSkipStatus),
    Invalid(QuorumValidationError),
}

impl LLMQEntryVerificationStatus {
    pub fn is_verified(&self) -> bool {
        matches!(self, LLMQEntryVerificationStatus::Verified)
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self, LLMQEntryVerificationStatus::Invalid(_))
    }
}

impl Display for LLMQEntryVerificationStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            LLMQEntryVerificationStatus::Unknown => f.write_str("unknown"),
            LLMQEntryVerificationStatus::Verified => f.write_str("verified"),
            LLMQEntryVerificationStatus::Invalid(error) => write!(f, "Invalid({error})"),
            LLMQEntryVerificationStatus::Skipped(reason) => write!(f, "Skipped({reason})"),
        }
    }
}
