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

//! Dash special transactions.
//!
//! Special transactions (DIP-0002) carry an extra payload whose format depends on the
//! transaction type. Only the coinbase and quorum commitment payloads are parsed; the
//! others are kept as raw bytes.

pub mod coinbase;
pub mod quorum_commitment;

use std::fmt;

#[cfg(feature = "bincode")]
use bincode::{Decode, Encode};

use crate::blockdata::transaction::special_transaction::coinbase::CoinbasePayload;
use crate::blockdata::transaction::special_transaction::quorum_commitment::QuorumCommitmentPayload;
use crate::consensus::{deserialize, encode, serialize};

/// The special transaction types of DIP-0002.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum TransactionType {
    Classic,
    ProviderRegistration,
    ProviderUpdateService,
    ProviderUpdateRegistrar,
    ProviderUpdateRevocation,
    Coinbase,
    QuorumCommitment,
    MnhfSignal,
    AssetLock,
    AssetUnlock,
    Unknown(u16),
}

impl TransactionType {
    pub fn to_u16(self) -> u16 {
        match self {
            TransactionType::Classic => 0,
            TransactionType::ProviderRegistration => 1,
            TransactionType::ProviderUpdateService => 2,
            TransactionType::ProviderUpdateRegistrar => 3,
            TransactionType::ProviderUpdateRevocation => 4,
            TransactionType::Coinbase => 5,
            TransactionType::QuorumCommitment => 6,
            TransactionType::MnhfSignal => 7,
            TransactionType::AssetLock => 8,
            TransactionType::AssetUnlock => 9,
            TransactionType::Unknown(value) => value,
        }
    }
}

impl From<u16> for TransactionType {
    fn from(value: u16) -> Self {
        match value {
            0 => TransactionType::Classic,
            1 => TransactionType::ProviderRegistration,
            2 => TransactionType::ProviderUpdateService,
            3 => TransactionType::ProviderUpdateRegistrar,
            4 => TransactionType::ProviderUpdateRevocation,
            5 => TransactionType::Coinbase,
            6 => TransactionType::QuorumCommitment,
            7 => TransactionType::MnhfSignal,
            8 => TransactionType::AssetLock,
            9 => TransactionType::AssetUnlock,
            other => TransactionType::Unknown(other),
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionType::Unknown(value) => write!(f, "Unknown({})", value),
            known => write!(f, "{:?}", known),
        }
    }
}

/// The extra payload of a special transaction.
#[derive(Clone, PartialEq, Eq, Debug, Hash)]
#[cfg_attr(feature = "bincode", derive(Encode, Decode))]
pub enum TransactionPayload {
    Coinbase(CoinbasePayload),
    QuorumCommitment(QuorumCommitmentPayload),
    /// A payload this crate does not interpret.
    Other(Vec<u8>),
}

impl TransactionPayload {
    /// Parses the payload bytes of a transaction of type `tx_type`.
    ///
    /// Known payloads must consume the payload bytes exactly.
    pub fn from_bytes(tx_type: TransactionType, bytes: Vec<u8>) -> Result<Self, encode::Error> {
        Ok(match tx_type {
            TransactionType::Coinbase => TransactionPayload::Coinbase(deserialize(&bytes)?),
            TransactionType::QuorumCommitment => {
                TransactionPayload::QuorumCommitment(deserialize(&bytes)?)
            }
            _ => TransactionPayload::Other(bytes),
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            TransactionPayload::Coinbase(payload) => serialize(payload),
            TransactionPayload::QuorumCommitment(payload) => serialize(payload),
            TransactionPayload::Other(bytes) => bytes.clone(),
        }
    }

    pub fn as_coinbase(&self) -> Option<&CoinbasePayload> {
        match self {
            TransactionPayload::Coinbase(payload) => Some(payload),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_codes() {
        for code in 0u16..12 {
            assert_eq!(TransactionType::from(code).to_u16(), code);
        }
        assert_eq!(TransactionType::from(5), TransactionType::Coinbase);
        assert_eq!(TransactionType::from(42).to_string(), "Unknown(42)");
    }

    #[test]
    fn unknown_payloads_are_kept_raw() {
        let payload =
            TransactionPayload::from_bytes(TransactionType::AssetLock, vec![1, 2, 3]).expect("raw");
        assert_eq!(payload, TransactionPayload::Other(vec![1, 2, 3]));
        assert_eq!(payload.to_bytes(), vec![1, 2, 3]);
        assert!(payload.as_coinbase().is_none());
    }
}
