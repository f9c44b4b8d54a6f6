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

//! Block data.
//!
//! The parts of a Dash block the LLMQ engine needs: the coinbase special
//! transaction and the partial merkle tree proving its inclusion.

pub mod merkle_tree;
pub mod transaction;
