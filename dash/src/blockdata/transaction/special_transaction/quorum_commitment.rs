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

//! Dash Quorum Commitment Special Transaction.
//!
//! A final commitment is the outcome of one DKG session (DIP-0006). It is mined in a
//! quorum commitment special transaction and relayed in masternode list diffs.

use std::io;

#[cfg(feature = "bincode")]
use bincode::{Decode, Encode};

use crate::bls_sig_utils::{BLSPublicKey, BLSSignature};
use crate::consensus::encode::{dynamic_bitset_len, read_dynamic_bitset, write_dynamic_bitset};
use crate::consensus::{Decodable, Encodable, encode};
use crate::hash_types::{QuorumHash, QuorumVVecHash};
use crate::sml::llmq_type::LLMQType;

/// A final quorum commitment.
///
/// `signers` and `valid_members` hold one flag per member of the quorum, in the order
/// the members were selected.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Hash)]
#[cfg_attr(feature = "bincode", derive(Encode, Decode))]
pub struct QuorumEntry {
    pub version: u16,
    pub llmq_type: LLMQType,
    pub quorum_hash: QuorumHash,
    /// Slot inside the DKG cycle, only carried by versions 2 and 4.
    pub quorum_index: Option<i16>,
    pub signers: Vec<bool>,
    pub valid_members: Vec<bool>,
    pub quorum_public_key: BLSPublicKey,
    pub quorum_vvec_hash: QuorumVVecHash,
    /// Recovered threshold signature of the quorum over the commitment hash.
    pub threshold_sig: BLSSignature,
    /// Aggregated signature of all signers over the commitment hash.
    pub all_commitment_aggregated_signature: BLSSignature,
}

impl QuorumEntry {
    /// Whether this version of the commitment carries a quorum index.
    pub fn has_quorum_index(version: u16) -> bool {
        version == 2 || version == 4
    }

    /// Versions 1 and 2 were signed with the legacy BLS scheme.
    pub fn uses_legacy_bls(&self) -> bool {
        self.version == 1 || self.version == 2
    }

    pub fn count_signers(&self) -> usize {
        self.signers.iter().filter(|signed| **signed).count()
    }

    pub fn count_valid_members(&self) -> usize {
        self.valid_members.iter().filter(|valid| **valid).count()
    }

    /// The size of the serialized commitment in bytes.
    pub fn size(&self) -> usize {
        let mut size = 2 + 1 + 32 + 48 + 32 + 96 + 96;
        size += dynamic_bitset_len(self.signers.len());
        size += dynamic_bitset_len(self.valid_members.len());
        if Self::has_quorum_index(self.version) {
            size += 2;
        }
        size
    }
}

impl Encodable for QuorumEntry {
    fn consensus_encode<W: io::Write + ?Sized>(&self, w: &mut W) -> Result<usize, io::Error> {
        let mut len = 0;
        len += self.version.consensus_encode(w)?;
        len += self.llmq_type.consensus_encode(w)?;
        len += self.quorum_hash.consensus_encode(w)?;
        if Self::has_quorum_index(self.version) {
            len += self.quorum_index.unwrap_or_default().consensus_encode(w)?;
        }
        len += write_dynamic_bitset(w, &self.signers)?;
        len += write_dynamic_bitset(w, &self.valid_members)?;
        len += self.quorum_public_key.consensus_encode(w)?;
        len += self.quorum_vvec_hash.consensus_encode(w)?;
        len += self.threshold_sig.consensus_encode(w)?;
        len += self.all_commitment_aggregated_signature.consensus_encode(w)?;
        Ok(len)
    }
}

impl Decodable for QuorumEntry {
    fn consensus_decode<R: io::Read + ?Sized>(r: &mut R) -> Result<Self, encode::Error> {
        let version = u16::consensus_decode(r)?;
        let llmq_type = LLMQType::consensus_decode(r)?;
        let quorum_hash = QuorumHash::consensus_decode(r)?;
        let quorum_index =
            if Self::has_quorum_index(version) { Some(i16::consensus_decode(r)?) } else { None };
        let signers = read_dynamic_bitset(r)?;
        let valid_members = read_dynamic_bitset(r)?;
        Ok(QuorumEntry {
            version,
            llmq_type,
            quorum_hash,
            quorum_index,
            signers,
            valid_members,
            quorum_public_key: BLSPublicKey::consensus_decode(r)?,
            quorum_vvec_hash: QuorumVVecHash::consensus_decode(r)?,
            threshold_sig: BLSSignature::consensus_decode(r)?,
            all_commitment_aggregated_signature: BLSSignature::consensus_decode(r)?,
        })
    }
}

/// The payload of a quorum commitment special transaction, mined by the block at `height`.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Hash)]
#[cfg_attr(feature = "bincode", derive(Encode, Decode))]
pub struct QuorumCommitmentPayload {
    pub version: u16,
    pub height: u32,
    pub finalization_commitment: QuorumEntry,
}

impl_consensus_encoding!(QuorumCommitmentPayload, version, height, finalization_commitment);

impl QuorumCommitmentPayload {
    /// The size of the payload in bytes.
    pub fn size(&self) -> usize {
        2 + 4 + self.finalization_commitment.size()
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use hashes::Hash;

    use super::*;
    use crate::consensus::{deserialize, serialize};

    fn commitment(version: u16, members: usize) -> QuorumEntry {
        QuorumEntry {
            version,
            llmq_type: LLMQType::Llmqtype50_60,
            quorum_hash: QuorumHash::from_byte_array([9; 32]),
            quorum_index: QuorumEntry::has_quorum_index(version).then_some(3),
            signers: (0..members).map(|i| i % 3 != 0).collect(),
            valid_members: vec![true; members],
            quorum_public_key: BLSPublicKey::from([1; 48]),
            quorum_vvec_hash: QuorumVVecHash::from_byte_array([2; 32]),
            threshold_sig: BLSSignature::from([3; 96]),
            all_commitment_aggregated_signature: BLSSignature::from([4; 96]),
        }
    }

    #[test]
    fn size() {
        let payload = QuorumCommitmentPayload {
            version: 1,
            height: 1,
            finalization_commitment: commitment(1, 40),
        };
        assert_eq!(payload.size(), 325);
        assert_eq!(serialize(&payload).len(), 325);
    }

    #[test]
    fn quorum_index_only_in_indexed_versions() {
        for version in 1..=4u16 {
            let entry = commitment(version, 50);
            let bytes = serialize(&entry);
            assert_eq!(bytes.len(), entry.size());
            let decoded: QuorumEntry = deserialize(&bytes).expect("commitment");
            assert_eq!(decoded, entry);
            assert_eq!(decoded.quorum_index.is_some(), version == 2 || version == 4);
        }
    }

    #[test]
    fn counts() {
        let entry = commitment(3, 9);
        assert_eq!(entry.count_signers(), 6);
        assert_eq!(entry.count_valid_members(), 9);
        assert!(!entry.uses_legacy_bls());
        assert!(commitment(2, 9).uses_legacy_bls());
    }

    #[test]
    fn unknown_llmq_type_is_rejected() {
        let mut bytes = serialize(&commitment(1, 8));
        bytes[2] = 77;
        assert_matches!(
            deserialize::<QuorumEntry>(&bytes),
            Err(encode::Error::InvalidEnumValue { name: "LLMQType", .. })
        );
    }
}
