use hashes::Hash;

use crate::hash_types::{QuorumOrderingHash, QuorumSigningRequestId};
use crate::sml::quorum_entry::qualified_quorum_entry::QualifiedQuorumEntry;

impl QualifiedQuorumEntry {
    /// `sha256d(llmqType || quorumHash || requestId)`. The quorum with the smallest
    /// ordering hash signs the request.
    pub fn ordering_hash_for_request_id(&self, request_id: QuorumSigningRequestId) -> QuorumOrderingHash {
        let mut writer = Vec::with_capacity(1 + 64);
        writer.push(self.quorum_entry.llmq_type.index());
        writer.extend_from_slice(self.quorum_entry.quorum_hash.as_byte_array());
        writer.extend_from_slice(request_id.as_byte_array());
        QuorumOrderingHash::hash(&writer)
    }

    /// The quorum index, zero for quorums that do not carry one.
    pub fn quorum_index(&self) -> u16 {
        self.quorum_entry.quorum_index.map(|index| index.max(0) as u16).unwrap_or_default()
    }
}
