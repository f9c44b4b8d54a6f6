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

//! Simplified masternode list messages.
//!
//! `getmnlistd` asks a peer for the difference between the masternode lists at two
//! blocks, and `mnlistdiff` is the answer.

use std::io;

#[cfg(feature = "bincode")]
use bincode::{Decode, Encode};

use crate::blockdata::merkle_tree::PartialMerkleTree;
use crate::blockdata::transaction::Transaction;
use crate::blockdata::transaction::special_transaction::coinbase::CoinbasePayload;
use crate::blockdata::transaction::special_transaction::quorum_commitment::QuorumEntry;
use crate::bls_sig_utils::BLSSignature;
use crate::consensus::encode::{self, MAX_VEC_SIZE, VarInt};
use crate::consensus::{Decodable, Encodable};
use crate::hash_types::{BlockHash, ProTxHash, QuorumHash};
use crate::network::constants::{
    BLS_SCHEME_PROTO_VERSION, MNLISTDIFF_CHAINLOCKS_PROTO_VERSION, MNLISTDIFF_VERSION_ORDER,
    PROTOCOL_VERSION,
};
use crate::sml::llmq_type::LLMQType;
use crate::sml::masternode_list_entry::MasternodeListEntry;

/// The `getmnlistd` message. An all-zero base requests the full list at `block_hash`.
#[derive(PartialEq, Eq, Clone, Copy, Debug, Hash)]
pub struct GetMnListDiff {
    pub base_block_hash: BlockHash,
    pub block_hash: BlockHash,
}

impl_consensus_encoding!(GetMnListDiff, base_block_hash, block_hash);

/// A quorum removed from the active set.
#[derive(PartialEq, Eq, Clone, Copy, Debug, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "bincode", derive(Encode, Decode))]
pub struct DeletedQuorum {
    pub llmq_type: LLMQType,
    pub quorum_hash: QuorumHash,
}

impl_consensus_encoding!(DeletedQuorum, llmq_type, quorum_hash);

/// A chain lock signature together with the positions, in `new_quorums`, of the quorums
/// whose modifier was computed from it.
#[derive(PartialEq, Eq, Clone, Debug, Hash)]
#[cfg_attr(feature = "bincode", derive(Encode, Decode))]
pub struct QuorumsCLSigsObject {
    pub signature: BLSSignature,
    pub index_set: Vec<u16>,
}

impl_consensus_encoding!(QuorumsCLSigsObject, signature, index_set);

/// The `mnlistdiff` message.
#[derive(Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "bincode", derive(Encode, Decode))]
pub struct MnListDiff {
    pub version: u16,
    pub base_block_hash: BlockHash,
    pub block_hash: BlockHash,
    /// Proves that `coinbase_tx` is the first transaction of `block_hash`.
    pub coinbase_merkle_proof: PartialMerkleTree,
    pub coinbase_tx: Transaction,
    pub deleted_masternodes: Vec<ProTxHash>,
    pub new_masternodes: Vec<MasternodeListEntry>,
    pub deleted_quorums: Vec<DeletedQuorum>,
    pub new_quorums: Vec<QuorumEntry>,
    pub quorums_chainlock_signatures: Vec<QuorumsCLSigsObject>,
}

impl MnListDiff {
    pub fn coinbase_payload(&self) -> Option<&CoinbasePayload> {
        self.coinbase_tx.special_transaction_payload.as_ref()?.as_coinbase()
    }

    /// The height declared by the coinbase of the target block.
    pub fn block_height(&self) -> Option<u32> {
        self.coinbase_payload().map(|payload| payload.height)
    }

    /// True when the diff changes neither the masternodes nor the quorums.
    pub fn is_empty(&self) -> bool {
        self.deleted_masternodes.is_empty()
            && self.new_masternodes.is_empty()
            && self.deleted_quorums.is_empty()
            && self.new_quorums.is_empty()
    }

    /// The chain lock signature attached to each of `new_quorums`, by position.
    pub fn chain_lock_signature_per_new_quorum(&self) -> Result<Vec<Option<BLSSignature>>, encode::Error> {
        let mut signatures = vec![None; self.new_quorums.len()];
        for object in &self.quorums_chainlock_signatures {
            for index in &object.index_set {
                let slot = signatures
                    .get_mut(*index as usize)
                    .ok_or(encode::Error::ParseFailed("chain lock signature index out of range"))?;
                *slot = Some(object.signature);
            }
        }
        Ok(signatures)
    }

    /// Encodes the diff for a peer speaking `protocol_version`.
    pub fn consensus_encode_with_protocol_version<W: io::Write + ?Sized>(
        &self,
        w: &mut W,
        protocol_version: u32,
    ) -> Result<usize, io::Error> {
        let mut len = 0;
        let version_first = protocol_version >= MNLISTDIFF_VERSION_ORDER;
        if version_first {
            len += self.version.consensus_encode(w)?;
        }
        len += self.base_block_hash.consensus_encode(w)?;
        len += self.block_hash.consensus_encode(w)?;
        len += self.coinbase_merkle_proof.consensus_encode(w)?;
        len += self.coinbase_tx.consensus_encode(w)?;
        if !version_first && protocol_version >= BLS_SCHEME_PROTO_VERSION {
            len += self.version.consensus_encode(w)?;
        }
        len += self.deleted_masternodes.consensus_encode(w)?;
        len += VarInt(self.new_masternodes.len() as u64).consensus_encode(w)?;
        for entry in &self.new_masternodes {
            len += entry.consensus_encode_with_protocol_version(w, protocol_version)?;
        }
        len += self.deleted_quorums.consensus_encode(w)?;
        len += self.new_quorums.consensus_encode(w)?;
        if protocol_version >= MNLISTDIFF_CHAINLOCKS_PROTO_VERSION {
            len += self.quorums_chainlock_signatures.consensus_encode(w)?;
        }
        Ok(len)
    }

    /// Decodes a diff sent by a peer speaking `protocol_version`.
    pub fn consensus_decode_with_protocol_version<R: io::Read + ?Sized>(
        r: &mut R,
        protocol_version: u32,
    ) -> Result<Self, encode::Error> {
        let version_first = protocol_version >= MNLISTDIFF_VERSION_ORDER;
        let mut version = if version_first { u16::consensus_decode(r)? } else { 0 };
        let base_block_hash = BlockHash::consensus_decode(r)?;
        let block_hash = BlockHash::consensus_decode(r)?;
        let coinbase_merkle_proof = PartialMerkleTree::consensus_decode(r)?;
        let coinbase_tx = Transaction::consensus_decode(r)?;
        if !version_first && protocol_version >= BLS_SCHEME_PROTO_VERSION {
            version = u16::consensus_decode(r)?;
        }
        let deleted_masternodes = Vec::<ProTxHash>::consensus_decode(r)?;
        let count = VarInt::consensus_decode(r)?.0 as usize;
        if count > MAX_VEC_SIZE {
            return Err(encode::Error::OversizedVectorAllocation { requested: count, max: MAX_VEC_SIZE });
        }
        let mut new_masternodes = Vec::with_capacity(count.min(1024));
        for _ in 0..count {
            new_masternodes
                .push(MasternodeListEntry::consensus_decode_with_protocol_version(r, protocol_version)?);
        }
        let deleted_quorums = Vec::<DeletedQuorum>::consensus_decode(r)?;
        let new_quorums = Vec::<QuorumEntry>::consensus_decode(r)?;
        let quorums_chainlock_signatures = if protocol_version >= MNLISTDIFF_CHAINLOCKS_PROTO_VERSION {
            Vec::<QuorumsCLSigsObject>::consensus_decode(r)?
        } else {
            Vec::new()
        };
        Ok(MnListDiff {
            version,
            base_block_hash,
            block_hash,
            coinbase_merkle_proof,
            coinbase_tx,
            deleted_masternodes,
            new_masternodes,
            deleted_quorums,
            new_quorums,
            quorums_chainlock_signatures,
        })
    }
}

impl Encodable for MnListDiff {
    fn consensus_encode<W: io::Write + ?Sized>(&self, w: &mut W) -> Result<usize, io::Error> {
        self.consensus_encode_with_protocol_version(w, PROTOCOL_VERSION)
    }
}

impl Decodable for MnListDiff {
    fn consensus_decode<R: io::Read + ?Sized>(r: &mut R) -> Result<Self, encode::Error> {
        Self::consensus_decode_with_protocol_version(r, PROTOCOL_VERSION)
    }
}
