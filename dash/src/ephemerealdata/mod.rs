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

//! Short lived messages signed by quorums.
//!
//! Chain locks, InstantSend locks and the recovered signatures backing them are
//! relayed between peers but never stored in blocks.

pub mod chain_lock;
pub mod instant_lock;
pub mod recovered_signature;

use hashes::Hash;

use crate::hash_types::{QuorumHash, QuorumSigningRequestId, QuorumSigningSignId};
use crate::sml::llmq_type::LLMQType;

/// The digest a quorum signs for a signing request.
///
/// `sha256d(llmqType || quorumHash || requestId || messageHash)`, every hash in internal
/// byte order.
pub fn sign_id(
    llmq_type: LLMQType,
    quorum_hash: QuorumHash,
    request_id: QuorumSigningRequestId,
    message_hash: &[u8; 32],
) -> QuorumSigningSignId {
    let mut bytes = Vec::with_capacity(1 + 32 * 3);
    bytes.push(llmq_type.index());
    bytes.extend_from_slice(quorum_hash.as_byte_array());
    bytes.extend_from_slice(request_id.as_byte_array());
    bytes.extend_from_slice(message_hash);
    QuorumSigningSignId::hash(&bytes)
}

/// Writes the compact size prefixed ASCII tag used as a request id prefix.
fn write_request_prefix(bytes: &mut Vec<u8>, prefix: &str) {
    bytes.push(prefix.len() as u8);
    bytes.extend_from_slice(prefix.as_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_id_layout() {
        let quorum_hash = QuorumHash::from_byte_array([1; 32]);
        let request_id = QuorumSigningRequestId::from_byte_array([2; 32]);
        let mut expected = vec![LLMQType::Llmqtype400_60.index()];
        expected.extend_from_slice(&[1; 32]);
        expected.extend_from_slice(&[2; 32]);
        expected.extend_from_slice(&[3; 32]);
        assert_eq!(
            sign_id(LLMQType::Llmqtype400_60, quorum_hash, request_id, &[3; 32]),
            QuorumSigningSignId::hash(&expected)
        );
        assert_ne!(
            sign_id(LLMQType::Llmqtype50_60, quorum_hash, request_id, &[3; 32]),
            QuorumSigningSignId::hash(&expected)
        );
    }
}
