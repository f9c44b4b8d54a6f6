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

//! Partial merkle trees.
//!
//! Masternode list diffs prove that their coinbase transaction belongs to the target
//! block with a BIP-0037 style partial merkle tree.

#[cfg(feature = "bincode")]
use bincode::{Decode, Encode};
use hashes::{Hash, sha256d};
use thiserror::Error;

use crate::hash_types::{TxMerkleNode, Txid};

/// An error when extracting the matched transactions of a partial merkle tree.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MerkleBlockError {
    #[error("merkle root mismatch, computed {computed} expected {expected}")]
    MerkleRootMismatch { computed: TxMerkleNode, expected: TxMerkleNode },
    #[error("the tree commits to no transactions")]
    NoTransactions,
    #[error("the tree commits to more transactions than fit in a block")]
    TooManyTransactions,
    #[error("the tree has more hashes than transactions")]
    TooManyHashes,
    #[error("the tree ran out of flag bits")]
    NotEnoughBits,
    #[error("the tree ran out of hashes")]
    NotEnoughHashes,
    #[error("not every flag bit was consumed")]
    NotAllBitsConsumed,
    #[error("not every hash was consumed")]
    NotAllHashesConsumed,
    #[error("a left and right child share the same hash")]
    IdenticalHashesFound,
    #[error("the coinbase is not the first matched transaction")]
    CoinbaseNotFirst,
}

/// Upper bound on transactions in a block, 1 MB divided by the minimum transaction size.
const MAX_TRANSACTIONS: u32 = 1_000_000 / 60;

/// A partial merkle tree with the hashes and flag bits needed to rebuild its root.
#[derive(Clone, PartialEq, Eq, Debug, Hash, Default)]
#[cfg_attr(feature = "bincode", derive(Encode, Decode))]
pub struct PartialMerkleTree {
    pub total_transactions: u32,
    pub hashes: Vec<TxMerkleNode>,
    /// Flag bits packed LSB-first into bytes.
    pub flags: Vec<u8>,
}

impl_consensus_encoding!(PartialMerkleTree, total_transactions, hashes, flags);

fn parent(left: &TxMerkleNode, right: &TxMerkleNode) -> TxMerkleNode {
    let mut bytes = [0u8; 64];
    bytes[..32].copy_from_slice(left.as_byte_array());
    bytes[32..].copy_from_slice(right.as_byte_array());
    TxMerkleNode::from_byte_array(sha256d::Hash::hash(&bytes).to_byte_array())
}

impl PartialMerkleTree {
    fn width(&self, height: u32) -> u32 {
        (self.total_transactions + (1 << height) - 1) >> height
    }

    fn tree_height(&self) -> u32 {
        let mut height = 0;
        while self.width(height) > 1 {
            height += 1;
        }
        height
    }

    fn flag(&self, bit: usize) -> Option<bool> {
        self.flags.get(bit / 8).map(|byte| byte & (1 << (bit % 8)) != 0)
    }

    /// Builds a tree over `txids` that matches the transactions whose flag is set.
    pub fn from_txids(txids: &[Txid], matches: &[bool]) -> Self {
        let mut tree = PartialMerkleTree {
            total_transactions: txids.len() as u32,
            hashes: Vec::new(),
            flags: Vec::new(),
        };
        if txids.is_empty() || txids.len() != matches.len() {
            return tree;
        }
        let mut bits = Vec::new();
        let height = tree.tree_height();
        tree.build(height, 0, txids, matches, &mut bits);
        tree.flags = vec![0u8; bits.len().div_ceil(8)];
        for (p, bit) in bits.iter().enumerate() {
            if *bit {
                tree.flags[p / 8] |= 1 << (p % 8);
            }
        }
        tree
    }

    fn node_hash(&self, height: u32, pos: u32, txids: &[Txid]) -> TxMerkleNode {
        if height == 0 {
            return TxMerkleNode::from_byte_array(txids[pos as usize].to_byte_array());
        }
        let left = self.node_hash(height - 1, pos * 2, txids);
        let right = if pos * 2 + 1 < self.width(height - 1) {
            self.node_hash(height - 1, pos * 2 + 1, txids)
        } else {
            left
        };
        parent(&left, &right)
    }

    fn build(&mut self, height: u32, pos: u32, txids: &[Txid], matches: &[bool], bits: &mut Vec<bool>) {
        let start = (pos << height) as usize;
        let end = (((pos + 1) << height) as usize).min(txids.len());
        let parent_of_match = matches[start..end].iter().any(|m| *m);
        bits.push(parent_of_match);
        if height == 0 || !parent_of_match {
            let hash = self.node_hash(height, pos, txids);
            self.hashes.push(hash);
        } else {
            self.build(height - 1, pos * 2, txids, matches, bits);
            if pos * 2 + 1 < self.width(height - 1) {
                self.build(height - 1, pos * 2 + 1, txids, matches, bits);
            }
        }
    }

    /// Recomputes the root, collecting the matched txids and their positions.
    pub fn extract_matches(
        &self,
        matches: &mut Vec<Txid>,
        indexes: &mut Vec<u32>,
    ) -> Result<TxMerkleNode, MerkleBlockError> {
        matches.clear();
        indexes.clear();
        if self.total_transactions == 0 {
            return Err(MerkleBlockError::NoTransactions);
        }
        if self.total_transactions > MAX_TRANSACTIONS {
            return Err(MerkleBlockError::TooManyTransactions);
        }
        if self.hashes.len() as u32 > self.total_transactions {
            return Err(MerkleBlockError::TooManyHashes);
        }
        if self.flags.len() * 8 < self.hashes.len() {
            return Err(MerkleBlockError::NotEnoughBits);
        }
        let mut bits_used = 0usize;
        let mut hashes_used = 0usize;
        let root = self.traverse(self.tree_height(), 0, &mut bits_used, &mut hashes_used, matches, indexes)?;
        // every byte of flags must be touched
        if bits_used.div_ceil(8) != self.flags.len() {
            return Err(MerkleBlockError::NotAllBitsConsumed);
        }
        if hashes_used != self.hashes.len() {
            return Err(MerkleBlockError::NotAllHashesConsumed);
        }
        Ok(root)
    }

    fn traverse(
        &self,
        height: u32,
        pos: u32,
        bits_used: &mut usize,
        hashes_used: &mut usize,
        matches: &mut Vec<Txid>,
        indexes: &mut Vec<u32>,
    ) -> Result<TxMerkleNode, MerkleBlockError> {
        let parent_of_match = self.flag(*bits_used).ok_or(MerkleBlockError::NotEnoughBits)?;
        *bits_used += 1;
        if height == 0 || !parent_of_match {
            let hash = *self.hashes.get(*hashes_used).ok_or(MerkleBlockError::NotEnoughHashes)?;
            *hashes_used += 1;
            if height == 0 && parent_of_match {
                matches.push(Txid::from_byte_array(hash.to_byte_array()));
                indexes.push(pos);
            }
            return Ok(hash);
        }
        let left = self.traverse(height - 1, pos * 2, bits_used, hashes_used, matches, indexes)?;
        let right = if pos * 2 + 1 < self.width(height - 1) {
            let right = self.traverse(height - 1, pos * 2 + 1, bits_used, hashes_used, matches, indexes)?;
            if right == left {
                return Err(MerkleBlockError::IdenticalHashesFound);
            }
            right
        } else {
            left
        };
        Ok(parent(&left, &right))
    }

    /// Checks that the tree proves `coinbase` as the first transaction of a block whose
    /// transaction merkle root is `merkle_root`.
    pub fn verify_coinbase_inclusion(
        &self,
        coinbase: Txid,
        merkle_root: TxMerkleNode,
    ) -> Result<(), MerkleBlockError> {
        let mut matches = Vec::new();
        let mut indexes = Vec::new();
        let computed = self.extract_matches(&mut matches, &mut indexes)?;
        if computed != merkle_root {
            return Err(MerkleBlockError::MerkleRootMismatch { computed, expected: merkle_root });
        }
        match (matches.first(), indexes.first()) {
            (Some(first), Some(0)) if *first == coinbase => Ok(()),
            _ => Err(MerkleBlockError::CoinbaseNotFirst),
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::consensus::{deserialize, serialize};

    fn txids(n: u8) -> Vec<Txid> {
        (0..n).map(|i| Txid::hash(&[i])).collect()
    }

    fn root(txids: &[Txid]) -> TxMerkleNode {
        let mut level: Vec<TxMerkleNode> =
            txids.iter().map(|t| TxMerkleNode::from_byte_array(t.to_byte_array())).collect();
        while level.len() > 1 {
            level = level
                .chunks(2)
                .map(|pair| parent(&pair[0], pair.get(1).unwrap_or(&pair[0])))
                .collect();
        }
        level[0]
    }

    #[test]
    fn coinbase_inclusion() {
        for n in [1u8, 2, 5, 8, 13] {
            let txids = txids(n);
            let mut flags = vec![false; n as usize];
            flags[0] = true;
            let tree = PartialMerkleTree::from_txids(&txids, &flags);
            let tree: PartialMerkleTree = deserialize(&serialize(&tree)).expect("tree");
            assert!(tree.verify_coinbase_inclusion(txids[0], root(&txids)).is_ok());
        }
    }

    #[test]
    fn wrong_root_or_coinbase() {
        let txids = txids(6);
        let mut flags = vec![false; 6];
        flags[0] = true;
        let tree = PartialMerkleTree::from_txids(&txids, &flags);
        assert_matches!(
            tree.verify_coinbase_inclusion(txids[0], TxMerkleNode::all_zeros()),
            Err(MerkleBlockError::MerkleRootMismatch { .. })
        );
        assert_matches!(
            tree.verify_coinbase_inclusion(txids[1], root(&txids)),
            Err(MerkleBlockError::CoinbaseNotFirst)
        );
    }

    #[test]
    fn malformed_trees() {
        let empty = PartialMerkleTree::default();
        assert_matches!(
            empty.extract_matches(&mut Vec::new(), &mut Vec::new()),
            Err(MerkleBlockError::NoTransactions)
        );
        let mut tree = PartialMerkleTree::from_txids(&txids(4), &[true, false, false, false]);
        tree.hashes.push(TxMerkleNode::all_zeros());
        assert!(tree.extract_matches(&mut Vec::new(), &mut Vec::new()).is_err());
    }
}
