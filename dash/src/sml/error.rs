use bitflags::bitflags;
use thiserror::Error;

use crate::blockdata::merkle_tree::MerkleBlockError;
use crate::consensus::encode;
use crate::hash_types::{BlockHash, MerkleRootMasternodeList, MerkleRootQuorums};
use crate::prelude::CoreBlockHeight;
use crate::sml::quorum_validation_error::QuorumValidationError;

bitflags! {
    /// What the caller should do after a masternode list diff was rejected.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct RecoveryFlags: u8 {
        /// Local state can not be trusted anymore, resync from a checkpoint.
        const REQUIRE_RESET = 0b0001;
        /// The peer that sent the diff is misbehaving or stale.
        const REQUIRE_NEW_PEER = 0b0010;
        /// The diff does not advance the list.
        const SAME_HEIGHT = 0b0100;
        /// A committed merkle root did not match the recomputed one.
        const MERKLE_ROOT_MISMATCH = 0b1000;
    }
}

/// Errors raised while applying masternode list diffs.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SmlError {
    /// `same_height` is set when the diff targets the height of the list it failed to extend.
    #[error("Diff base {found} does not extend the list at {expected}")]
    ChainMismatch { expected: BlockHash, found: BlockHash, same_height: bool },

    #[error("Diff height {found} does not follow list height, expected {expected}")]
    HeightMismatch { expected: CoreBlockHeight, found: CoreBlockHeight },

    #[error("Diff does not advance the list at height {0}")]
    SameHeight(CoreBlockHeight),

    #[error("Masternode list merkle root mismatch: committed {expected}, computed {computed}")]
    MasternodeListMerkleRootMismatch {
        expected: MerkleRootMasternodeList,
        computed: MerkleRootMasternodeList,
    },

    #[error("Quorums merkle root mismatch: committed {expected}, computed {computed}")]
    QuorumsMerkleRootMismatch { expected: MerkleRootQuorums, computed: MerkleRootQuorums },

    #[error("Coinbase transaction carries no coinbase payload")]
    MissingCoinbasePayload,

    #[error("Invalid coinbase inclusion proof: {0}")]
    InvalidCoinbaseProof(#[from] MerkleBlockError),

    #[error("Base masternode list for block {0} is not known")]
    MissingBaseMasternodeList(BlockHash),

    #[error("Block {0} has no known height")]
    MissingBlockHeight(BlockHash),

    #[error("Masternode {0} is listed more than once")]
    DuplicateMasternode(String),

    #[error("Quorum validation failed: {0}")]
    QuorumValidation(#[from] QuorumValidationError),

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),
}

impl From<encode::Error> for SmlError {
    fn from(value: encode::Error) -> Self {
        SmlError::InvalidPayload(value.to_string())
    }
}

impl SmlError {
    /// The recovery action this error asks of the caller.
    pub fn recovery_flags(&self) -> RecoveryFlags {
        match self {
            SmlError::ChainMismatch { same_height: true, .. } => {
                RecoveryFlags::SAME_HEIGHT | RecoveryFlags::REQUIRE_NEW_PEER
            }
            SmlError::ChainMismatch { .. } | SmlError::HeightMismatch { .. } => {
                RecoveryFlags::REQUIRE_NEW_PEER
            }
            SmlError::SameHeight(_) => RecoveryFlags::SAME_HEIGHT | RecoveryFlags::REQUIRE_NEW_PEER,
            SmlError::MasternodeListMerkleRootMismatch { .. }
            | SmlError::QuorumsMerkleRootMismatch { .. } => {
                RecoveryFlags::REQUIRE_RESET | RecoveryFlags::MERKLE_ROOT_MISMATCH
            }
            SmlError::MissingBaseMasternodeList(_) | SmlError::MissingBlockHeight(_) => {
                RecoveryFlags::REQUIRE_RESET
            }
            SmlError::MissingCoinbasePayload
            | SmlError::InvalidCoinbaseProof(_)
            | SmlError::DuplicateMasternode(_)
            | SmlError::QuorumValidation(_)
            | SmlError::InvalidPayload(_) => RecoveryFlags::REQUIRE_NEW_PEER,
        }
    }

    pub fn requires_reset(&self) -> bool {
        self.recovery_flags().contains(RecoveryFlags::REQUIRE_RESET)
    }

    /// A merkle root mismatch is never retried against the same peer.
    pub fn requires_new_peer(&self) -> bool {
        self.recovery_flags()
            .intersects(RecoveryFlags::REQUIRE_NEW_PEER | RecoveryFlags::MERKLE_ROOT_MISMATCH)
    }
}
