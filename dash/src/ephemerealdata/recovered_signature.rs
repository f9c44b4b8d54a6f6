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

//! Recovered threshold signatures (`qsigrec`).

#[cfg(feature = "bincode")]
use bincode::{Decode, Encode};
use hashes::Hash;

use crate::bls_sig_utils::BLSSignature;
use crate::ephemerealdata::sign_id;
use crate::hash_types::{QuorumHash, QuorumSigningRequestId, QuorumSigningSignId, Sha256dHash};
use crate::sml::llmq_type::LLMQType;

/// A threshold signature recovered from the signature shares of a quorum.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "bincode", derive(Encode, Decode))]
pub struct RecoveredSignature {
    pub llmq_type: LLMQType,
    pub quorum_hash: QuorumHash,
    pub id: QuorumSigningRequestId,
    pub msg_hash: Sha256dHash,
    pub sig: BLSSignature,
}

impl_consensus_encoding!(RecoveredSignature, llmq_type, quorum_hash, id, msg_hash, sig);

impl RecoveredSignature {
    /// The digest the signing quorum signed.
    pub fn sign_id(&self) -> QuorumSigningSignId {
        sign_id(self.llmq_type, self.quorum_hash, self.id, self.msg_hash.as_byte_array())
    }
}
