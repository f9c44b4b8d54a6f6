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

//! Protocol versions that change the layout of the payloads in this crate.

/// Version of the protocol this library speaks.
pub const PROTOCOL_VERSION: u32 = 70230;

/// Instant send locks carry their own request id derivation.
pub const ISDLOCK_PROTO_VERSION: u32 = 70220;

/// `mnlistdiff` carries a version field and operator keys switch to the basic BLS scheme.
pub const BLS_SCHEME_PROTO_VERSION: u32 = 70225;

/// Masternode entries carry a type and optional platform fields.
pub const DMN_TYPE_PROTO_VERSION: u32 = 70227;

/// Simplified masternode list entries are individually versioned.
pub const SMNLE_VERSIONED_PROTO_VERSION: u32 = 70228;

/// `mnlistdiff` moves its version field to the front of the payload.
pub const MNLISTDIFF_VERSION_ORDER: u32 = 70229;

/// `mnlistdiff` carries the chain lock signatures of its new quorums.
pub const MNLISTDIFF_CHAINLOCKS_PROTO_VERSION: u32 = 70230;
