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

//! Network payloads exchanged with peers while keeping the masternode list in sync.
//!
//! Only the payload bodies live here. Message framing and transport belong to the host.

use std::fmt;

pub mod constants;
pub mod message_qrinfo;
pub mod message_sml;

/// The Dash network to act on.
#[derive(Copy, PartialEq, Eq, PartialOrd, Ord, Clone, Hash, Debug, Default)]
#[cfg_attr(feature = "bincode", derive(bincode::Encode, bincode::Decode))]
#[non_exhaustive]
pub enum Network {
    /// Classic Dash Core payment chain.
    #[default]
    Dash,
    /// Dash's testnet network.
    Testnet,
    /// Dash's devnet network.
    Devnet,
    /// Local regression test network.
    Regtest,
}

impl Network {
    /// Creates a `Network` from the magic bytes.
    pub fn from_magic(magic: u32) -> Option<Network> {
        // Note: any new entries here must be added to `magic` below
        match magic {
            0xBD6B0CBF => Some(Network::Dash),
            0xFFCAE2CE => Some(Network::Testnet),
            0xCEFFCAE2 => Some(Network::Devnet),
            0xDAB5BFFA => Some(Network::Regtest),
            _ => None,
        }
    }

    /// Return the network magic bytes, which should be encoded little-endian
    /// at the start of every message.
    pub fn magic(self) -> u32 {
        // Note: any new entries here must be added to `from_magic` above
        match self {
            Network::Dash => 0xBD6B0CBF,
            Network::Testnet => 0xFFCAE2CE,
            Network::Devnet => 0xCEFFCAE2,
            Network::Regtest => 0xDAB5BFFA,
        }
    }

    /// The known activation height of core v20, from which quorum modifiers
    /// are derived from chain lock signatures instead of block hashes.
    pub fn core_v20_activation_height(&self) -> u32 {
        match self {
            Network::Dash => 1987776,
            Network::Testnet => 905100,
            Network::Devnet | Network::Regtest => 1,
        }
    }

    pub fn core_v20_is_active_at(&self, core_block_height: u32) -> bool {
        core_block_height >= self.core_v20_activation_height()
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Network::Dash => write!(f, "dash"),
            Network::Testnet => write!(f, "testnet"),
            Network::Devnet => write!(f, "devnet"),
            Network::Regtest => write!(f, "regtest"),
        }
    }
}

impl std::str::FromStr for Network {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dash" | "mainnet" => Ok(Network::Dash),
            "testnet" | "test" => Ok(Network::Testnet),
            "devnet" | "dev" => Ok(Network::Devnet),
            "regtest" => Ok(Network::Regtest),
            _ => Err(format!("Unknown network type: {}", s)),
        }
    }
}
