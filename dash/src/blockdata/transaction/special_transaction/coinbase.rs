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

//! Dash Coinbase Special Transaction.
//!
//! Every block carries a coinbase special transaction (DIP-0004) committing to the
//! merkle roots of the simplified masternode list and of the active quorums.

use std::io;

#[cfg(feature = "bincode")]
use bincode::{Decode, Encode};
use hashes::Hash;

use crate::bls_sig_utils::BLSSignature;
use crate::consensus::encode::{compact_size_len, read_compact_size, write_compact_size};
use crate::consensus::{Decodable, Encodable, encode};
use crate::hash_types::{MerkleRootMasternodeList, MerkleRootQuorums};

/// The payload of a coinbase special transaction.
///
/// Version 1 only commits to the masternode list, version 2 adds the quorum root and
/// version 3 adds the best known chain lock and the asset lock pool balance.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Hash)]
#[cfg_attr(feature = "bincode", derive(Encode, Decode))]
pub struct CoinbasePayload {
    pub version: u16,
    pub height: u32,
    pub merkle_root_masternode_list: MerkleRootMasternodeList,
    pub merkle_root_quorums: MerkleRootQuorums,
    /// Distance in blocks to the best chain locked block.
    pub best_cl_height: Option<u32>,
    pub best_cl_signature: Option<BLSSignature>,
    pub asset_locked_amount: Option<u64>,
}

impl CoinbasePayload {
    /// The size of the payload in bytes.
    pub fn size(&self) -> usize {
        let mut size: usize = 2 + 4 + 32;
        if self.version >= 2 {
            size += 32;
        }
        if self.version >= 3 {
            size += compact_size_len(self.best_cl_height.unwrap_or_default()) + 96 + 8;
        }
        size
    }

    /// Height of the best chain locked block, when the payload carries one.
    pub fn best_cl_block_height(&self) -> Option<u32> {
        let diff = self.best_cl_height?;
        self.height.checked_sub(diff.checked_add(1)?)
    }
}

fn missing(field: &str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidInput, format!("{} is not set", field))
}

impl Encodable for CoinbasePayload {
    fn consensus_encode<W: io::Write + ?Sized>(&self, w: &mut W) -> Result<usize, io::Error> {
        let mut len = 0;
        len += self.version.consensus_encode(w)?;
        len += self.height.consensus_encode(w)?;
        len += self.merkle_root_masternode_list.consensus_encode(w)?;
        if self.version >= 2 {
            len += self.merkle_root_quorums.consensus_encode(w)?;
        }
        if self.version >= 3 {
            let best_cl_height = self.best_cl_height.ok_or_else(|| missing("best_cl_height"))?;
            let best_cl_signature =
                self.best_cl_signature.ok_or_else(|| missing("best_cl_signature"))?;
            let asset_locked_amount =
                self.asset_locked_amount.ok_or_else(|| missing("asset_locked_amount"))?;
            len += write_compact_size(w, best_cl_height)?;
            len += best_cl_signature.consensus_encode(w)?;
            len += asset_locked_amount.consensus_encode(w)?;
        }
        Ok(len)
    }
}

impl Decodable for CoinbasePayload {
    fn consensus_decode<R: io::Read + ?Sized>(r: &mut R) -> Result<Self, encode::Error> {
        let version = u16::consensus_decode(r)?;
        let height = u32::consensus_decode(r)?;
        let merkle_root_masternode_list = MerkleRootMasternodeList::consensus_decode(r)?;
        let merkle_root_quorums = if version >= 2 {
            MerkleRootQuorums::consensus_decode(r)?
        } else {
            MerkleRootQuorums::all_zeros()
        };
        let (best_cl_height, best_cl_signature, asset_locked_amount) = if version >= 3 {
            (
                Some(read_compact_size(r)?),
                Some(BLSSignature::consensus_decode(r)?),
                Some(u64::consensus_decode(r)?),
            )
        } else {
            (None, None, None)
        };
        Ok(CoinbasePayload {
            version,
            height,
            merkle_root_masternode_list,
            merkle_root_quorums,
            best_cl_height,
            best_cl_signature,
            asset_locked_amount,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consensus::{deserialize, serialize};

    fn payload(version: u16) -> CoinbasePayload {
        CoinbasePayload {
            version,
            height: 1000,
            merkle_root_masternode_list: MerkleRootMasternodeList::from_byte_array([3; 32]),
            merkle_root_quorums: MerkleRootQuorums::from_byte_array([4; 32]),
            best_cl_height: Some(900),
            best_cl_signature: Some(BLSSignature::from([0; 96])),
            asset_locked_amount: Some(10000),
        }
    }

    #[test]
    fn size_per_version() {
        for (want, version) in [(38usize, 1u16), (70, 2), (177, 3)] {
            let payload = payload(version);
            assert_eq!(payload.size(), want);
            assert_eq!(serialize(&payload).len(), want);
        }
    }

    #[test]
    fn version_one_payload_is_not_over_read() {
        let bytes = hex::decode(
            "01004bb00f002176daba0c98fecfa0903fa527d118fbb704c497ee6ab817945e68ba9ba8743b",
        )
        .expect("hex");
        let decoded: CoinbasePayload = deserialize(&bytes).expect("payload");
        assert_eq!(decoded.version, 1);
        assert_eq!(decoded.height, 1028171);
        assert_eq!(decoded.merkle_root_quorums, MerkleRootQuorums::all_zeros());
        assert_eq!(decoded.best_cl_height, None);
    }

    #[test]
    fn version_three_round_trip() {
        let original = payload(3);
        let decoded: CoinbasePayload = deserialize(&serialize(&original)).expect("payload");
        assert_eq!(decoded, original);
        assert_eq!(decoded.best_cl_block_height(), Some(99));
    }

    #[test]
    fn version_three_requires_chain_lock_fields() {
        let mut incomplete = payload(3);
        incomplete.best_cl_signature = None;
        assert!(incomplete.consensus_encode(&mut Vec::new()).is_err());
    }
}
