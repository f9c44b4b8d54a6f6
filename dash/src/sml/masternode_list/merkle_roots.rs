use hashes::{Hash, sha256d};

use crate::hash_types::{MerkleRootMasternodeList, MerkleRootQuorums};
use crate::sml::masternode_list::MasternodeList;

/// Root of the merkle tree over `hashes`, in the given order.
///
/// Levels are built pairwise with `sha256d(left || right)`. An odd node is paired with
/// itself. An empty tree has the all-zero root.
pub fn merkle_root_from_hashes(hashes: Vec<[u8; 32]>) -> [u8; 32] {
    if hashes.is_empty() {
        return [0; 32];
    }
    let mut level = hashes;
    while level.len() > 1 {
        level = level
            .chunks(2)
            .map(|pair| {
                let mut buffer = [0u8; 64];
                buffer[..32].copy_from_slice(&pair[0]);
                buffer[32..].copy_from_slice(pair.get(1).unwrap_or(&pair[0]));
                sha256d::Hash::hash(&buffer).to_byte_array()
            })
            .collect();
    }
    level[0]
}

impl MasternodeList {
    /// Merkle root over the entry hashes, ordered by proRegTx hash.
    pub fn calculate_masternodes_merkle_root(&self) -> MerkleRootMasternodeList {
        let hashes = self.masternodes.values().map(|entry| entry.entry_hash.to_byte_array()).collect();
        MerkleRootMasternodeList::from_byte_array(merkle_root_from_hashes(hashes))
    }

    /// Merkle root over the hashes of every quorum commitment, sorted.
    pub fn calculate_llmq_merkle_root(&self) -> MerkleRootQuorums {
        let mut hashes: Vec<[u8; 32]> = self
            .quorums
            .values()
            .flat_map(|quorums| quorums.values())
            .map(|quorum| quorum.entry_hash.to_byte_array())
            .collect();
        hashes.sort();
        MerkleRootQuorums::from_byte_array(merkle_root_from_hashes(hashes))
    }
}
