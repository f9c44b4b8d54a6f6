// Rust Dash Library
// Written for Dash in 2022 by
//     The Dash Core Developers
//
// To the extent possible under law, the author(s) have dedicated all
// copyright and related and neighboring rights to this software to
// the public domain worldwide. This software is distributed without
// any warranty.
//
// You should have received a copy of the CC0 Public Domain Dedication
// along with this software.
// If not, see <http://creativecommons.org/publicdomain/zero/1.0/>.
//

//! Dash hash types.
//!
//! Every hash is a newtype over a `hashes` primitive stored in internal (wire) byte
//! order. Double SHA256 types display and parse in the reversed order shown by Dash
//! Core RPCs and block explorers. Ordering is byte-wise over the internal
//! representation, matching `uint256` comparison in Dash Core, except for
//! [`ScoreHash`] which compares as a 256-bit little-endian integer.

use std::cmp::Ordering;
use std::fmt;

use hashes::{Hash, HashEngine, hash_newtype, sha256, sha256d};

macro_rules! impl_hash_encodings {
    ($($newtype:ident),+ $(,)?) => {
        $(
            impl_hashencode!($newtype);
            #[cfg(feature = "bincode")]
            impl_hash_bincode!($newtype, 32);
        )+
    };
}

hash_newtype! {
    /// A dash block hash.
    pub struct BlockHash(sha256d::Hash);
    /// A dash transaction hash/transaction ID.
    pub struct Txid(sha256d::Hash);
    /// A node in the transaction merkle tree.
    pub struct TxMerkleNode(sha256d::Hash);
    /// A generic double SHA256 hash.
    pub struct Sha256dHash(sha256d::Hash);
    /// Hash of the provider registration transaction of a masternode.
    pub struct ProTxHash(sha256d::Hash);
    /// Hash of the block in which a masternode registration was confirmed.
    pub struct ConfirmedHash(sha256d::Hash);
    /// Hash of the block a quorum was formed at.
    pub struct QuorumHash(sha256d::Hash);
    /// Hash of a quorum verification vector.
    pub struct QuorumVVecHash(sha256d::Hash);
    /// Message signed by quorum members when committing to a DKG result.
    pub struct QuorumCommitmentHash(sha256d::Hash);
    /// Hash of a serialized quorum commitment, the leaf of the quorum merkle tree.
    pub struct QuorumEntryHash(sha256d::Hash);
    /// Request id of a signing session.
    pub struct QuorumSigningRequestId(sha256d::Hash);
    /// The digest actually signed by a quorum for a request.
    pub struct QuorumSigningSignId(sha256d::Hash);
    /// Ordering hash used to pick the quorum responsible for a request.
    pub struct QuorumOrderingHash(sha256d::Hash);
    /// Entropy mixed into masternode scores when building a quorum.
    pub struct QuorumModifierHash(sha256d::Hash);
    /// Merkle root of the simplified masternode list.
    pub struct MerkleRootMasternodeList(sha256d::Hash);
    /// Merkle root of the active quorum commitments.
    pub struct MerkleRootQuorums(sha256d::Hash);

    /// SHA256 of a masternode's proRegTx hash followed by its confirmed hash.
    pub struct ConfirmedHashHashedWithProRegTx(sha256::Hash);
}

impl_hash_encodings!(
    BlockHash,
    Txid,
    TxMerkleNode,
    Sha256dHash,
    ProTxHash,
    ConfirmedHash,
    QuorumHash,
    QuorumVVecHash,
    QuorumCommitmentHash,
    QuorumEntryHash,
    QuorumSigningRequestId,
    QuorumSigningSignId,
    QuorumOrderingHash,
    QuorumModifierHash,
    MerkleRootMasternodeList,
    MerkleRootQuorums,
    ConfirmedHashHashedWithProRegTx,
);

/// Score of a masternode for one quorum modifier. Higher scores are selected first.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScoreHash(sha256::Hash);

impl ScoreHash {
    /// `SHA256(confirmedHashWithProRegTx || modifier)`.
    pub fn create_score(
        confirmed_hash_hashed_with_pro_reg_tx: ConfirmedHashHashedWithProRegTx,
        modifier: QuorumModifierHash,
    ) -> Self {
        let mut engine = sha256::Hash::engine();
        engine.input(confirmed_hash_hashed_with_pro_reg_tx.as_byte_array());
        engine.input(modifier.as_byte_array());
        Self(sha256::Hash::from_engine(engine))
    }

    pub fn from_byte_array(bytes: [u8; 32]) -> Self {
        Self(sha256::Hash::from_byte_array(bytes))
    }

    pub fn as_byte_array(&self) -> &[u8; 32] {
        self.0.as_byte_array()
    }
}

impl Ord for ScoreHash {
    fn cmp(&self, other: &Self) -> Ordering {
        // little-endian 256-bit integer, most significant byte last
        self.as_byte_array().iter().rev().cmp(other.as_byte_array().iter().rev())
    }
}

impl PartialOrd for ScoreHash {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for ScoreHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl fmt::Debug for ScoreHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ScoreHash({})", self.0)
    }
}
