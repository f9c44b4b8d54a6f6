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

//! Dash transactions.
//!
//! Only the shape of a transaction is modelled: enough to hash it, to find the
//! coinbase special payload and to walk the inputs of a transaction that is
//! being locked by InstantSend. Script evaluation is left to full nodes.

pub mod outpoint;
pub mod special_transaction;

use std::io;

#[cfg(feature = "bincode")]
use bincode::{Decode, Encode};
use hashes::Hash;

pub use crate::blockdata::transaction::outpoint::OutPoint;
pub use crate::blockdata::transaction::special_transaction::{TransactionPayload, TransactionType};
use crate::consensus::encode::{self, MAX_VEC_SIZE, VarInt};
use crate::consensus::{Decodable, Encodable};
use crate::hash_types::Txid;

/// A transaction input.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Hash, Default)]
#[cfg_attr(feature = "bincode", derive(Encode, Decode))]
pub struct TxIn {
    pub previous_output: OutPoint,
    pub script_sig: Vec<u8>,
    pub sequence: u32,
}

impl_consensus_encoding!(TxIn, previous_output, script_sig, sequence);

/// A transaction output.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Hash, Default)]
#[cfg_attr(feature = "bincode", derive(Encode, Decode))]
pub struct TxOut {
    /// Value in duffs.
    pub value: u64,
    pub script_pubkey: Vec<u8>,
}

impl_consensus_encoding!(TxOut, value, script_pubkey);

/// A Dash transaction.
///
/// The serialized version field is an `i32` whose lower half is the version and whose
/// upper half is the special transaction type (DIP-0002). A special payload follows the
/// lock time when the version is at least 3 and the type is not classic.
#[derive(Clone, PartialEq, Eq, Debug, Hash)]
#[cfg_attr(feature = "bincode", derive(Encode, Decode))]
pub struct Transaction {
    pub version: u16,
    pub tx_type: u16,
    pub input: Vec<TxIn>,
    pub output: Vec<TxOut>,
    pub lock_time: u32,
    pub special_transaction_payload: Option<TransactionPayload>,
}

impl Transaction {
    /// Computes the txid, the double SHA256 of the whole serialized transaction.
    pub fn txid(&self) -> Txid {
        Txid::hash(&encode::serialize(self))
    }

    pub fn transaction_type(&self) -> TransactionType {
        TransactionType::from(self.tx_type)
    }

    /// A coinbase has exactly one input spending the null outpoint.
    pub fn is_coin_base(&self) -> bool {
        self.input.len() == 1 && self.input[0].previous_output.is_null()
    }

    /// The outpoints this transaction spends.
    pub fn spent_outpoints(&self) -> impl Iterator<Item = &OutPoint> {
        self.input.iter().map(|input| &input.previous_output)
    }

    fn carries_payload(&self) -> bool {
        self.version >= 3 && self.transaction_type() != TransactionType::Classic
    }
}

impl Encodable for Transaction {
    fn consensus_encode<W: io::Write + ?Sized>(&self, w: &mut W) -> Result<usize, io::Error> {
        let mut len = 0;
        let version = (self.version as u32) | ((self.tx_type as u32) << 16);
        len += version.consensus_encode(w)?;
        len += self.input.consensus_encode(w)?;
        len += self.output.consensus_encode(w)?;
        len += self.lock_time.consensus_encode(w)?;
        if self.carries_payload() {
            let payload = match &self.special_transaction_payload {
                Some(payload) => payload.to_bytes(),
                None => Vec::new(),
            };
            len += payload.consensus_encode(w)?;
        }
        Ok(len)
    }
}

impl Decodable for Transaction {
    fn consensus_decode<R: io::Read + ?Sized>(r: &mut R) -> Result<Self, encode::Error> {
        let version_and_type = u32::consensus_decode(r)?;
        let version = (version_and_type & 0xffff) as u16;
        let tx_type = (version_and_type >> 16) as u16;
        let input = Vec::<TxIn>::consensus_decode(r)?;
        let output = Vec::<TxOut>::consensus_decode(r)?;
        let lock_time = u32::consensus_decode(r)?;
        let mut tx = Transaction {
            version,
            tx_type,
            input,
            output,
            lock_time,
            special_transaction_payload: None,
        };
        if tx.carries_payload() {
            let len = VarInt::consensus_decode(r)?.0 as usize;
            if len > MAX_VEC_SIZE {
                return Err(encode::Error::OversizedVectorAllocation {
                    requested: len,
                    max: MAX_VEC_SIZE,
                });
            }
            let mut bytes = vec![0u8; len];
            r.read_exact(&mut bytes)?;
            tx.special_transaction_payload =
                Some(TransactionPayload::from_bytes(tx.transaction_type(), bytes)?);
        }
        Ok(tx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockdata::transaction::special_transaction::coinbase::CoinbasePayload;
    use crate::consensus::{deserialize, serialize};
    use crate::hash_types::{MerkleRootMasternodeList, MerkleRootQuorums};

    fn coinbase(height: u32) -> Transaction {
        Transaction {
            version: 3,
            tx_type: TransactionType::Coinbase.to_u16(),
            input: vec![TxIn {
                previous_output: OutPoint::null(),
                script_sig: vec![0x51],
                sequence: u32::MAX,
            }],
            output: vec![TxOut { value: 5_000_000_000, script_pubkey: vec![0x6a] }],
            lock_time: 0,
            special_transaction_payload: Some(TransactionPayload::Coinbase(CoinbasePayload {
                version: 2,
                height,
                merkle_root_masternode_list: MerkleRootMasternodeList::from_byte_array([1; 32]),
                merkle_root_quorums: MerkleRootQuorums::from_byte_array([2; 32]),
                best_cl_height: None,
                best_cl_signature: None,
                asset_locked_amount: None,
            })),
        }
    }

    #[test]
    fn coinbase_round_trip_keeps_payload() {
        let tx = coinbase(1000);
        let bytes = serialize(&tx);
        // version 3 | type 5 << 16
        assert_eq!(&bytes[..4], &[3, 0, 5, 0]);
        let decoded: Transaction = deserialize(&bytes).expect("transaction");
        assert_eq!(decoded, tx);
        assert!(decoded.is_coin_base());
        assert_eq!(decoded.txid(), tx.txid());
        match decoded.special_transaction_payload {
            Some(TransactionPayload::Coinbase(payload)) => assert_eq!(payload.height, 1000),
            other => panic!("unexpected payload {:?}", other),
        }
    }

    #[test]
    fn txid_depends_on_payload() {
        assert_ne!(coinbase(1).txid(), coinbase(2).txid());
    }

    #[test]
    fn classic_transaction_has_no_payload() {
        let tx = Transaction {
            version: 2,
            tx_type: 0,
            input: vec![TxIn::default()],
            output: vec![],
            lock_time: 7,
            special_transaction_payload: None,
        };
        let bytes = serialize(&tx);
        assert_eq!(bytes.len(), 4 + 1 + 41 + 1 + 4);
        assert_eq!(deserialize::<Transaction>(&bytes).expect("tx"), tx);
    }
}
