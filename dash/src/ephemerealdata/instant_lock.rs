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

//! InstantSend locks.
//!
//! An InstantSend lock (DIP-0010, deterministic since DIP-0022) is a quorum signature
//! committing the spent outpoints of a transaction to that transaction.

use std::io;

#[cfg(feature = "bincode")]
use bincode::{Decode, Encode};
use hashes::Hash;

use crate::blockdata::transaction::outpoint::OutPoint;
use crate::bls_sig_utils::BLSSignature;
use crate::consensus::encode;
use crate::consensus::{Decodable, Encodable, serialize};
use crate::ephemerealdata::{sign_id, write_request_prefix};
use crate::hash_types::{BlockHash, QuorumHash, QuorumSigningRequestId, QuorumSigningSignId, Txid};
use crate::sml::llmq_type::LLMQType;

const IS_LOCK_REQUEST_ID_PREFIX: &str = "islock";
const INPUT_LOCK_REQUEST_ID_PREFIX: &str = "inlock";

/// An InstantSend lock.
///
/// Version 0 is the legacy `islock` message. Later versions are `isdlock` messages which
/// also carry the hash of the first block of the DKG cycle whose quorums signed them.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "bincode", derive(Encode, Decode))]
pub struct InstantLock {
    pub version: u8,
    pub inputs: Vec<OutPoint>,
    pub txid: Txid,
    pub cyclehash: BlockHash,
    pub signature: BLSSignature,
}

impl InstantLock {
    pub fn is_deterministic(&self) -> bool {
        self.version != 0
    }

    /// `sha256d(compact("islock") || "islock" || inputs)`.
    pub fn request_id(&self) -> QuorumSigningRequestId {
        let mut bytes = Vec::with_capacity(7 + 9 + self.inputs.len() * 36);
        write_request_prefix(&mut bytes, IS_LOCK_REQUEST_ID_PREFIX);
        bytes.extend_from_slice(&serialize(&self.inputs));
        QuorumSigningRequestId::hash(&bytes)
    }

    /// Request id of the per input signing session for `outpoint`.
    pub fn input_request_id(outpoint: &OutPoint) -> QuorumSigningRequestId {
        let mut bytes = Vec::with_capacity(7 + 36);
        write_request_prefix(&mut bytes, INPUT_LOCK_REQUEST_ID_PREFIX);
        bytes.extend_from_slice(&serialize(outpoint));
        QuorumSigningRequestId::hash(&bytes)
    }

    /// The digest the quorum `quorum_hash` of type `llmq_type` signs for this lock.
    pub fn sign_id(&self, llmq_type: LLMQType, quorum_hash: QuorumHash) -> QuorumSigningSignId {
        sign_id(llmq_type, quorum_hash, self.request_id(), self.txid.as_byte_array())
    }

    /// Encodes the lock as a legacy `islock` message, without version and cycle hash.
    pub fn consensus_encode_legacy<W: io::Write + ?Sized>(
        &self,
        w: &mut W,
    ) -> Result<usize, io::Error> {
        let mut len = 0;
        len += self.inputs.consensus_encode(w)?;
        len += self.txid.consensus_encode(w)?;
        len += self.signature.consensus_encode(w)?;
        Ok(len)
    }

    /// Decodes a legacy `islock` message.
    pub fn consensus_decode_legacy<R: io::Read + ?Sized>(r: &mut R) -> Result<Self, encode::Error> {
        Ok(InstantLock {
            version: 0,
            inputs: Vec::<OutPoint>::consensus_decode(r)?,
            txid: Txid::consensus_decode(r)?,
            cyclehash: BlockHash::all_zeros(),
            signature: BLSSignature::consensus_decode(r)?,
        })
    }
}

impl Encodable for InstantLock {
    fn consensus_encode<W: io::Write + ?Sized>(&self, w: &mut W) -> Result<usize, io::Error> {
        let mut len = 0;
        len += self.version.consensus_encode(w)?;
        len += self.inputs.consensus_encode(w)?;
        len += self.txid.consensus_encode(w)?;
        len += self.cyclehash.consensus_encode(w)?;
        len += self.signature.consensus_encode(w)?;
        Ok(len)
    }
}

impl Decodable for InstantLock {
    fn consensus_decode<R: io::Read + ?Sized>(r: &mut R) -> Result<Self, encode::Error> {
        let version = u8::consensus_decode(r)?;
        if version == 0 {
            return Err(encode::Error::ParseFailed("isdlock messages start at version 1"));
        }
        let inputs = Vec::<OutPoint>::consensus_decode(r)?;
        if inputs.is_empty() {
            return Err(encode::Error::ParseFailed("instant lock without inputs"));
        }
        Ok(InstantLock {
            version,
            inputs,
            txid: Txid::consensus_decode(r)?,
            cyclehash: BlockHash::consensus_decode(r)?,
            signature: BLSSignature::consensus_decode(r)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::consensus::deserialize;

    fn lock() -> InstantLock {
        InstantLock {
            version: 1,
            inputs: vec![
                OutPoint::new(Txid::from_byte_array([1; 32]), 0),
                OutPoint::new(Txid::from_byte_array([2; 32]), 5),
            ],
            txid: Txid::from_byte_array([3; 32]),
            cyclehash: BlockHash::from_byte_array([4; 32]),
            signature: BLSSignature::from([5; 96]),
        }
    }

    #[test]
    fn request_id_covers_inputs() {
        let lock = lock();
        let mut preimage = vec![6u8];
        preimage.extend_from_slice(b"islock");
        preimage.push(2);
        for input in &lock.inputs {
            preimage.extend_from_slice(&serialize(input));
        }
        assert_eq!(lock.request_id(), QuorumSigningRequestId::hash(&preimage));

        let mut reordered = lock.clone();
        reordered.inputs.reverse();
        assert_ne!(reordered.request_id(), lock.request_id());
    }

    #[test]
    fn input_request_ids_differ_per_outpoint() {
        let lock = lock();
        assert_ne!(
            InstantLock::input_request_id(&lock.inputs[0]),
            InstantLock::input_request_id(&lock.inputs[1])
        );
    }

    #[test]
    fn deterministic_round_trip() {
        let lock = lock();
        let bytes = serialize(&lock);
        assert_eq!(bytes.len(), 1 + 1 + 72 + 32 + 32 + 96);
        assert_eq!(deserialize::<InstantLock>(&bytes).expect("isdlock"), lock);
    }

    #[test]
    fn legacy_round_trip() {
        let mut lock = lock();
        lock.version = 0;
        lock.cyclehash = BlockHash::all_zeros();
        let mut bytes = Vec::new();
        lock.consensus_encode_legacy(&mut bytes).expect("encode");
        let decoded =
            InstantLock::consensus_decode_legacy(&mut std::io::Cursor::new(bytes)).expect("islock");
        assert_eq!(decoded, lock);
        assert!(!decoded.is_deterministic());
    }

    #[test]
    fn version_zero_is_not_an_isdlock() {
        let mut lock = lock();
        lock.version = 0;
        assert_matches!(
            deserialize::<InstantLock>(&serialize(&lock)),
            Err(encode::Error::ParseFailed(_))
        );
    }
}
