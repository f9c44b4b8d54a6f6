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

//! Chain locks.
//!
//! A chain lock (DIP-0008) is a quorum signature over a block hash at a height. Once
//! verified, no reorganisation below that block is accepted.

use std::fmt;

#[cfg(feature = "bincode")]
use bincode::{Decode, Encode};
use hashes::Hash;

use crate::bls_sig_utils::BLSSignature;
use crate::ephemerealdata::{sign_id, write_request_prefix};
use crate::hash_types::{BlockHash, QuorumHash, QuorumSigningRequestId, QuorumSigningSignId};
use crate::prelude::CoreBlockHeight;
use crate::sml::llmq_type::LLMQType;

const CL_REQUEST_ID_PREFIX: &str = "clsig";

/// A `clsig` message.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "bincode", derive(Encode, Decode))]
pub struct ChainLock {
    pub block_height: CoreBlockHeight,
    pub block_hash: BlockHash,
    pub signature: BLSSignature,
}

impl_consensus_encoding!(ChainLock, block_height, block_hash, signature);

impl ChainLock {
    /// `sha256d(compact("clsig") || "clsig" || height)`.
    pub fn request_id(&self) -> QuorumSigningRequestId {
        Self::request_id_for_height(self.block_height)
    }

    pub fn request_id_for_height(height: CoreBlockHeight) -> QuorumSigningRequestId {
        let mut bytes = Vec::with_capacity(1 + CL_REQUEST_ID_PREFIX.len() + 4);
        write_request_prefix(&mut bytes, CL_REQUEST_ID_PREFIX);
        bytes.extend_from_slice(&height.to_le_bytes());
        QuorumSigningRequestId::hash(&bytes)
    }

    /// The digest the quorum `quorum_hash` of type `llmq_type` signs for this lock.
    pub fn sign_id(&self, llmq_type: LLMQType, quorum_hash: QuorumHash) -> QuorumSigningSignId {
        sign_id(llmq_type, quorum_hash, self.request_id(), self.block_hash.as_byte_array())
    }
}

impl fmt::Display for ChainLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChainLock({} at {})", self.block_hash, self.block_height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consensus::{deserialize, serialize};

    fn chain_lock() -> ChainLock {
        ChainLock {
            block_height: 1177907,
            block_hash: "0000000000000009b8ec23a3c5abc7ee1ae8e7f28da4e9dc9ac97a64bd0d2e47"
                .parse()
                .expect("block hash"),
            signature: BLSSignature::from([0x8c; 96]),
        }
    }

    #[test]
    fn request_id_preimage() {
        let mut preimage = vec![5u8];
        preimage.extend_from_slice(b"clsig");
        preimage.extend_from_slice(&1177907u32.to_le_bytes());
        assert_eq!(chain_lock().request_id(), QuorumSigningRequestId::hash(&preimage));
        assert_ne!(
            ChainLock::request_id_for_height(1177907),
            ChainLock::request_id_for_height(1177908)
        );
    }

    #[test]
    fn wire_layout() {
        let lock = chain_lock();
        let bytes = serialize(&lock);
        assert_eq!(bytes.len(), 4 + 32 + 96);
        assert_eq!(&bytes[..4], &1177907u32.to_le_bytes());
        assert_eq!(deserialize::<ChainLock>(&bytes).expect("clsig"), lock);
    }
}
