use hashes::Hash;

use crate::blockdata::transaction::special_transaction::quorum_commitment::QuorumEntry;
use crate::consensus::encode::{write_compact_size, write_fixed_bitset};
use crate::consensus::{Encodable, serialize};
use crate::hash_types::{QuorumCommitmentHash, QuorumEntryHash};

impl QuorumEntry {
    /// The message every member signs when committing to the DKG result.
    ///
    /// `sha256d(llmqType || quorumHash || compact(size) || validMembers || quorumPublicKey || quorumVvecHash)`
    pub fn calculate_commitment_hash(&self) -> QuorumCommitmentHash {
        let mut writer = Vec::with_capacity(1 + 32 + 5 + self.valid_members.len() / 8 + 1 + 48 + 32);
        // writes into a Vec<u8> are infallible
        let _ = self.llmq_type.consensus_encode(&mut writer);
        let _ = self.quorum_hash.consensus_encode(&mut writer);
        let _ = write_compact_size(&mut writer, self.valid_members.len() as u32);
        let _ = write_fixed_bitset(&mut writer, &self.valid_members);
        let _ = self.quorum_public_key.consensus_encode(&mut writer);
        let _ = self.quorum_vvec_hash.consensus_encode(&mut writer);
        QuorumCommitmentHash::hash(&writer)
    }

    /// The leaf of this commitment in the quorum merkle tree.
    pub fn calculate_entry_hash(&self) -> QuorumEntryHash {
        QuorumEntryHash::hash(&serialize(self))
    }
}
