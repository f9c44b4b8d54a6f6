pub mod hash;
pub mod qualified_masternode_list_entry;
pub mod score;

use std::io;
use std::io::{Read, Write};

#[cfg(feature = "bincode")]
use bincode::{Decode, Encode};
use hashes::Hash;

use crate::bls_sig_utils::BLSPublicKey;
use crate::consensus::{Decodable, Encodable, encode};
use crate::hash_types::{ConfirmedHash, ProTxHash};
use crate::network::constants::{DMN_TYPE_PROTO_VERSION, PROTOCOL_VERSION, SMNLE_VERSIONED_PROTO_VERSION};
use crate::sml::address::ServiceAddress;

/// The kind of a masternode. Evo masternodes also serve Dash Platform.
#[derive(Clone, Copy, Ord, PartialOrd, PartialEq, Eq, Hash, Debug, Default)]
#[cfg_attr(feature = "bincode", derive(Encode, Decode))]
pub enum MasternodeType {
    #[default]
    Regular,
    HighPerformance { platform_http_port: u16, platform_node_id: [u8; 20] },
}

impl MasternodeType {
    pub fn is_high_performance(&self) -> bool {
        matches!(self, MasternodeType::HighPerformance { .. })
    }

    fn code(&self) -> u16 {
        match self {
            MasternodeType::Regular => 0,
            MasternodeType::HighPerformance { .. } => 1,
        }
    }
}

impl Encodable for MasternodeType {
    fn consensus_encode<W: Write + ?Sized>(&self, w: &mut W) -> Result<usize, io::Error> {
        let mut len = self.code().consensus_encode(w)?;
        if let MasternodeType::HighPerformance { platform_http_port, platform_node_id } = self {
            len += platform_http_port.consensus_encode(w)?;
            len += platform_node_id.consensus_encode(w)?;
        }
        Ok(len)
    }
}

impl Decodable for MasternodeType {
    fn consensus_decode<R: Read + ?Sized>(r: &mut R) -> Result<Self, encode::Error> {
        match u16::consensus_decode(r)? {
            0 => Ok(MasternodeType::Regular),
            1 => Ok(MasternodeType::HighPerformance {
                platform_http_port: u16::consensus_decode(r)?,
                platform_node_id: <[u8; 20]>::consensus_decode(r)?,
            }),
            other => Err(encode::Error::InvalidEnumValue {
                name: "MasternodeType",
                value: other as i64,
            }),
        }
    }
}

/// One masternode of the simplified masternode list (DIP-0004).
#[derive(Clone, Ord, PartialOrd, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "bincode", derive(Encode, Decode))]
pub struct MasternodeListEntry {
    /// 1 for legacy BLS operator keys, 2 for basic BLS keys and a masternode type.
    pub version: u16,
    pub pro_reg_tx_hash: ProTxHash,
    /// `None` while the registration is not confirmed yet.
    pub confirmed_hash: Option<ConfirmedHash>,
    pub service_address: ServiceAddress,
    pub operator_public_key: BLSPublicKey,
    pub key_id_voting: [u8; 20],
    pub is_valid: bool,
    pub mn_type: MasternodeType,
}

impl MasternodeListEntry {
    pub fn uses_legacy_bls(&self) -> bool {
        self.version < 2
    }

    /// Encodes the fields shared by the wire and hashing formats.
    fn encode_body<W: Write + ?Sized>(&self, w: &mut W, with_type: bool) -> Result<usize, io::Error> {
        let mut len = 0;
        len += self.pro_reg_tx_hash.consensus_encode(w)?;
        len += self.confirmed_hash.unwrap_or_else(ConfirmedHash::all_zeros).consensus_encode(w)?;
        len += self.service_address.consensus_encode(w)?;
        len += self.operator_public_key.consensus_encode(w)?;
        len += self.key_id_voting.consensus_encode(w)?;
        len += self.is_valid.consensus_encode(w)?;
        if with_type && self.version >= 2 {
            len += self.mn_type.consensus_encode(w)?;
        }
        Ok(len)
    }

    /// Encodes the entry the way it is hashed into the masternode list merkle root.
    pub fn consensus_encode_for_hash<W: Write + ?Sized>(&self, w: &mut W) -> Result<usize, io::Error> {
        self.encode_body(w, true)
    }

    /// Encodes the entry as sent to a peer speaking `protocol_version`.
    pub fn consensus_encode_with_protocol_version<W: Write + ?Sized>(
        &self,
        w: &mut W,
        protocol_version: u32,
    ) -> Result<usize, io::Error> {
        let mut len = 0;
        if protocol_version >= SMNLE_VERSIONED_PROTO_VERSION {
            len += self.version.consensus_encode(w)?;
        }
        len += self.encode_body(w, protocol_version >= DMN_TYPE_PROTO_VERSION)?;
        Ok(len)
    }

    /// Decodes an entry sent by a peer speaking `protocol_version`.
    pub fn consensus_decode_with_protocol_version<R: Read + ?Sized>(
        r: &mut R,
        protocol_version: u32,
    ) -> Result<Self, encode::Error> {
        let version = if protocol_version >= SMNLE_VERSIONED_PROTO_VERSION {
            u16::consensus_decode(r)?
        } else {
            1
        };
        let pro_reg_tx_hash = ProTxHash::consensus_decode(r)?;
        let confirmed_hash = ConfirmedHash::consensus_decode(r)?;
        let service_address = ServiceAddress::consensus_decode(r)?;
        let operator_public_key = BLSPublicKey::consensus_decode(r)?;
        let key_id_voting = <[u8; 20]>::consensus_decode(r)?;
        let is_valid = bool::consensus_decode(r)?;
        let mn_type = if version >= 2 && protocol_version >= DMN_TYPE_PROTO_VERSION {
            MasternodeType::consensus_decode(r)?
        } else {
            MasternodeType::Regular
        };
        Ok(MasternodeListEntry {
            version,
            pro_reg_tx_hash,
            confirmed_hash: (confirmed_hash != ConfirmedHash::all_zeros()).then_some(confirmed_hash),
            service_address,
            operator_public_key,
            key_id_voting,
            is_valid,
            mn_type,
        })
    }
}

impl Encodable for MasternodeListEntry {
    fn consensus_encode<W: Write + ?Sized>(&self, w: &mut W) -> Result<usize, io::Error> {
        self.consensus_encode_with_protocol_version(w, PROTOCOL_VERSION)
    }
}

impl Decodable for MasternodeListEntry {
    fn consensus_decode<R: Read + ?Sized>(r: &mut R) -> Result<Self, encode::Error> {
        Self::consensus_decode_with_protocol_version(r, PROTOCOL_VERSION)
    }
}
