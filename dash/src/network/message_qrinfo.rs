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

//! Quorum rotation messages.
//!
//! `getqrinfo` asks a peer for everything needed to rebuild the rotated quorums of the
//! current cycle: the masternode list diffs at the last cycle boundaries and the quorum
//! snapshots recording which masternodes were used at each of them.

use std::io;

#[cfg(feature = "bincode")]
use bincode::{Decode, Encode};

use crate::blockdata::transaction::special_transaction::quorum_commitment::QuorumEntry;
use crate::consensus::encode::{self, MAX_VEC_SIZE, VarInt, read_dynamic_bitset, write_dynamic_bitset};
use crate::consensus::{Decodable, Encodable};
use crate::hash_types::BlockHash;
use crate::network::constants::PROTOCOL_VERSION;
use crate::network::message_sml::MnListDiff;

/// The `getqrinfo` message.
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct GetQRInfo {
    /// Blocks for which the requester already holds a masternode list.
    pub base_block_hashes: Vec<BlockHash>,
    pub block_request_hash: BlockHash,
    /// Also request the snapshot and diff at `h - 4c`.
    pub extra_share: bool,
}

impl_consensus_encoding!(GetQRInfo, base_block_hashes, block_request_hash, extra_share);

/// How the skip list of a [`QuorumSnapshot`] is to be read.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Default)]
#[cfg_attr(feature = "bincode", derive(Encode, Decode))]
pub enum MNSkipListMode {
    /// No masternode was skipped. The skip list is empty.
    #[default]
    NoSkipping = 0,
    /// The skip list holds the skipped positions. The first entry is absolute, the
    /// following ones are relative to it.
    SkipEntries = 1,
    /// The skip list holds the positions that were kept.
    KeepEntries = 2,
    /// Every masternode was skipped and no DKG session took place.
    AllSkipped = 3,
}

impl MNSkipListMode {
    pub fn to_i32(self) -> i32 {
        self as i32
    }
}

impl TryFrom<i32> for MNSkipListMode {
    type Error = encode::Error;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(MNSkipListMode::NoSkipping),
            1 => Ok(MNSkipListMode::SkipEntries),
            2 => Ok(MNSkipListMode::KeepEntries),
            3 => Ok(MNSkipListMode::AllSkipped),
            value => Err(encode::Error::InvalidEnumValue { name: "MNSkipListMode", value: value as i64 }),
        }
    }
}

impl Encodable for MNSkipListMode {
    fn consensus_encode<W: io::Write + ?Sized>(&self, w: &mut W) -> Result<usize, io::Error> {
        self.to_i32().consensus_encode(w)
    }
}

impl Decodable for MNSkipListMode {
    fn consensus_decode<R: io::Read + ?Sized>(r: &mut R) -> Result<Self, encode::Error> {
        MNSkipListMode::try_from(i32::consensus_decode(r)?)
    }
}

/// Which masternodes of the score-sorted list at a cycle boundary were already part of
/// a rotated quorum, and which positions were skipped while filling the new quarters.
#[derive(PartialEq, Eq, Clone, Debug, Hash, Default)]
#[cfg_attr(feature = "bincode", derive(Encode, Decode))]
pub struct QuorumSnapshot {
    pub skip_list_mode: MNSkipListMode,
    pub active_quorum_members: Vec<bool>,
    pub skip_list: Vec<i32>,
}

impl Encodable for QuorumSnapshot {
    fn consensus_encode<W: io::Write + ?Sized>(&self, w: &mut W) -> Result<usize, io::Error> {
        let mut len = self.skip_list_mode.consensus_encode(w)?;
        len += write_dynamic_bitset(w, &self.active_quorum_members)?;
        len += self.skip_list.consensus_encode(w)?;
        Ok(len)
    }
}

impl Decodable for QuorumSnapshot {
    fn consensus_decode<R: io::Read + ?Sized>(r: &mut R) -> Result<Self, encode::Error> {
        Ok(QuorumSnapshot {
            skip_list_mode: MNSkipListMode::consensus_decode(r)?,
            active_quorum_members: read_dynamic_bitset(r)?,
            skip_list: Vec::<i32>::consensus_decode(r)?,
        })
    }
}

/// The `qrinfo` message.
#[derive(PartialEq, Eq, Clone, Debug)]
#[cfg_attr(feature = "bincode", derive(Encode, Decode))]
pub struct QRInfo {
    pub quorum_snapshot_at_h_minus_c: QuorumSnapshot,
    pub quorum_snapshot_at_h_minus_2c: QuorumSnapshot,
    pub quorum_snapshot_at_h_minus_3c: QuorumSnapshot,
    pub mn_list_diff_tip: MnListDiff,
    pub mn_list_diff_h: MnListDiff,
    pub mn_list_diff_at_h_minus_c: MnListDiff,
    pub mn_list_diff_at_h_minus_2c: MnListDiff,
    pub mn_list_diff_at_h_minus_3c: MnListDiff,
    /// Present when `extra_share` was requested.
    pub quorum_snapshot_and_mn_list_diff_at_h_minus_4c: Option<(QuorumSnapshot, MnListDiff)>,
    /// The latest rotated commitment for every quorum index.
    pub last_commitment_per_index: Vec<QuorumEntry>,
    pub quorum_snapshot_list: Vec<QuorumSnapshot>,
    pub mn_list_diff_list: Vec<MnListDiff>,
}

impl QRInfo {
    /// Every diff carried by the message, tip excluded, from oldest to newest.
    pub fn cycle_diffs(&self) -> Vec<&MnListDiff> {
        let mut diffs = Vec::with_capacity(6 + self.mn_list_diff_list.len());
        diffs.extend(self.mn_list_diff_list.iter());
        if let Some((_, diff)) = &self.quorum_snapshot_and_mn_list_diff_at_h_minus_4c {
            diffs.push(diff);
        }
        diffs.push(&self.mn_list_diff_at_h_minus_3c);
        diffs.push(&self.mn_list_diff_at_h_minus_2c);
        diffs.push(&self.mn_list_diff_at_h_minus_c);
        diffs.push(&self.mn_list_diff_h);
        diffs
    }

    pub fn consensus_encode_with_protocol_version<W: io::Write + ?Sized>(
        &self,
        w: &mut W,
        protocol_version: u32,
    ) -> Result<usize, io::Error> {
        let mut len = 0;
        len += self.quorum_snapshot_at_h_minus_c.consensus_encode(w)?;
        len += self.quorum_snapshot_at_h_minus_2c.consensus_encode(w)?;
        len += self.quorum_snapshot_at_h_minus_3c.consensus_encode(w)?;
        for diff in [
            &self.mn_list_diff_tip,
            &self.mn_list_diff_h,
            &self.mn_list_diff_at_h_minus_c,
            &self.mn_list_diff_at_h_minus_2c,
            &self.mn_list_diff_at_h_minus_3c,
        ] {
            len += diff.consensus_encode_with_protocol_version(w, protocol_version)?;
        }
        match &self.quorum_snapshot_and_mn_list_diff_at_h_minus_4c {
            Some((snapshot, diff)) => {
                len += true.consensus_encode(w)?;
                len += snapshot.consensus_encode(w)?;
                len += diff.consensus_encode_with_protocol_version(w, protocol_version)?;
            }
            None => len += false.consensus_encode(w)?,
        }
        len += self.last_commitment_per_index.consensus_encode(w)?;
        len += self.quorum_snapshot_list.consensus_encode(w)?;
        len += VarInt(self.mn_list_diff_list.len() as u64).consensus_encode(w)?;
        for diff in &self.mn_list_diff_list {
            len += diff.consensus_encode_with_protocol_version(w, protocol_version)?;
        }
        Ok(len)
    }

    pub fn consensus_decode_with_protocol_version<R: io::Read + ?Sized>(
        r: &mut R,
        protocol_version: u32,
    ) -> Result<Self, encode::Error> {
        let quorum_snapshot_at_h_minus_c = QuorumSnapshot::consensus_decode(r)?;
        let quorum_snapshot_at_h_minus_2c = QuorumSnapshot::consensus_decode(r)?;
        let quorum_snapshot_at_h_minus_3c = QuorumSnapshot::consensus_decode(r)?;
        let mn_list_diff_tip = MnListDiff::consensus_decode_with_protocol_version(r, protocol_version)?;
        let mn_list_diff_h = MnListDiff::consensus_decode_with_protocol_version(r, protocol_version)?;
        let mn_list_diff_at_h_minus_c = MnListDiff::consensus_decode_with_protocol_version(r, protocol_version)?;
        let mn_list_diff_at_h_minus_2c =
            MnListDiff::consensus_decode_with_protocol_version(r, protocol_version)?;
        let mn_list_diff_at_h_minus_3c =
            MnListDiff::consensus_decode_with_protocol_version(r, protocol_version)?;
        let quorum_snapshot_and_mn_list_diff_at_h_minus_4c = if bool::consensus_decode(r)? {
            let snapshot = QuorumSnapshot::consensus_decode(r)?;
            let diff = MnListDiff::consensus_decode_with_protocol_version(r, protocol_version)?;
            Some((snapshot, diff))
        } else {
            None
        };
        let last_commitment_per_index = Vec::<QuorumEntry>::consensus_decode(r)?;
        let quorum_snapshot_list = Vec::<QuorumSnapshot>::consensus_decode(r)?;
        let count = VarInt::consensus_decode(r)?.0 as usize;
        if count > MAX_VEC_SIZE {
            return Err(encode::Error::OversizedVectorAllocation { requested: count, max: MAX_VEC_SIZE });
        }
        if count != quorum_snapshot_list.len() {
            return Err(encode::Error::ParseFailed("qrinfo snapshot and diff lists differ in length"));
        }
        let mut mn_list_diff_list = Vec::with_capacity(count.min(16));
        for _ in 0..count {
            mn_list_diff_list.push(MnListDiff::consensus_decode_with_protocol_version(r, protocol_version)?);
        }
        Ok(QRInfo {
            quorum_snapshot_at_h_minus_c,
            quorum_snapshot_at_h_minus_2c,
            quorum_snapshot_at_h_minus_3c,
            mn_list_diff_tip,
            mn_list_diff_h,
            mn_list_diff_at_h_minus_c,
            mn_list_diff_at_h_minus_2c,
            mn_list_diff_at_h_minus_3c,
            quorum_snapshot_and_mn_list_diff_at_h_minus_4c,
            last_commitment_per_index,
            quorum_snapshot_list,
            mn_list_diff_list,
        })
    }
}

impl Encodable for QRInfo {
    fn consensus_encode<W: io::Write + ?Sized>(&self, w: &mut W) -> Result<usize, io::Error> {
        self.consensus_encode_with_protocol_version(w, PROTOCOL_VERSION)
    }
}

impl Decodable for QRInfo {
    fn consensus_decode<R: io::Read + ?Sized>(r: &mut R) -> Result<Self, encode::Error> {
        Self::consensus_decode_with_protocol_version(r, PROTOCOL_VERSION)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use hashes::Hash;

    use super::*;
    use crate::consensus::{deserialize, serialize};

    #[test]
    fn snapshot_round_trip() {
        let snapshot = QuorumSnapshot {
            skip_list_mode: MNSkipListMode::SkipEntries,
            active_quorum_members: vec![true, false, true, true, false, false, false, false, true],
            skip_list: vec![3, 2, 5],
        };
        let bytes = serialize(&snapshot);
        // mode, bit count, two bitset bytes, skip list count and entries
        assert_eq!(bytes.len(), 4 + 1 + 2 + 1 + 12);
        assert_eq!(&bytes[5..7], &[0b0000_1101, 0b0000_0001]);
        assert_eq!(deserialize::<QuorumSnapshot>(&bytes).expect("snapshot"), snapshot);
    }

    #[test]
    fn unknown_skip_mode_is_rejected() {
        let mut bytes = serialize(&QuorumSnapshot::default());
        bytes[..4].copy_from_slice(&4i32.to_le_bytes());
        assert_matches!(
            deserialize::<QuorumSnapshot>(&bytes),
            Err(encode::Error::InvalidEnumValue { name: "MNSkipListMode", value: 4 })
        );
        bytes[..4].copy_from_slice(&(-1i32).to_le_bytes());
        assert!(deserialize::<QuorumSnapshot>(&bytes).is_err());
    }

    #[test]
    fn get_qr_info_layout() {
        let request = GetQRInfo {
            base_block_hashes: vec![BlockHash::from_byte_array([1; 32]), BlockHash::from_byte_array([2; 32])],
            block_request_hash: BlockHash::from_byte_array([3; 32]),
            extra_share: true,
        };
        let bytes = serialize(&request);
        assert_eq!(bytes.len(), 1 + 64 + 32 + 1);
        assert_eq!(bytes[0], 2);
        assert_eq!(*bytes.last().expect("non empty"), 1);
        assert_eq!(deserialize::<GetQRInfo>(&bytes).expect("request"), request);
    }
}
