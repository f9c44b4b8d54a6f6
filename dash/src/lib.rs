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

//! # Dash LLMQ engine
//!
//! Client-side consensus state for the Dash masternode network: the deterministic
//! masternode list, the quorum commitment list, quorum member selection (including
//! DIP-0024 rotation) and verification of the threshold signatures produced by
//! those quorums for ChainLocks and InstantSend locks.
//!
//! Everything in this crate is synchronous and deterministic. Concurrency, caching
//! of recovered signatures and the lock trackers live in the `dash-spv` crate.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(unused_must_use)]

#[macro_use]
mod internal_macros;

pub mod blockdata;
pub mod bls_sig_utils;
pub mod consensus;
pub mod ephemerealdata;
pub mod hash_types;
pub mod network;
pub mod sml;

pub use blsful;
pub use hashes;

pub use crate::blockdata::transaction::outpoint::OutPoint;
pub use crate::blockdata::transaction::special_transaction::coinbase::CoinbasePayload;
pub use crate::blockdata::transaction::special_transaction::quorum_commitment::QuorumEntry;
pub use crate::blockdata::transaction::{Transaction, TxIn, TxOut};
pub use crate::consensus::encode::VarInt;
pub use crate::ephemerealdata::chain_lock::ChainLock;
pub use crate::ephemerealdata::instant_lock::InstantLock;
pub use crate::ephemerealdata::recovered_signature::RecoveredSignature;
pub use crate::hash_types::{
    BlockHash, ConfirmedHash, ConfirmedHashHashedWithProRegTx, MerkleRootMasternodeList,
    MerkleRootQuorums, ProTxHash, QuorumCommitmentHash, QuorumEntryHash, QuorumHash,
    QuorumModifierHash, QuorumOrderingHash, QuorumSigningRequestId, QuorumSigningSignId,
    QuorumVVecHash, ScoreHash, Sha256dHash, TxMerkleNode, Txid,
};
pub use crate::network::Network;

pub mod prelude {
    /// Height of a block on the Dash core chain.
    pub type CoreBlockHeight = u32;
}
