use blsful::{Bls12381G2Impl, Signature};
use hashes::Hash;

use crate::bls_sig_utils::BLSSignature;
use crate::hash_types::QuorumSigningSignId;
use crate::sml::message_verification_error::MessageVerificationError;
use crate::sml::quorum_entry::qualified_quorum_entry::QualifiedQuorumEntry;

impl QualifiedQuorumEntry {
    /// Verifies a threshold signature of this quorum over `sign_id`.
    ///
    /// # Errors
    ///
    /// Returns `MessageVerificationError::ThresholdSignatureNotValid` if the signature does not
    /// verify, and a BLS error if the quorum key or the signature do not decode.
    pub fn verify_message_digest(
        &self,
        sign_id: QuorumSigningSignId,
        signature: BLSSignature,
    ) -> Result<(), MessageVerificationError> {
        let public_key =
            self.quorum_entry.quorum_public_key.to_blsful(self.quorum_entry.uses_legacy_bls())?;
        let bls_signature: Signature<Bls12381G2Impl> = signature.try_into()?;
        bls_signature.verify(&public_key, sign_id.as_byte_array()).map_err(|e| {
            MessageVerificationError::ThresholdSignatureNotValid(
                Box::new(signature),
                Box::new(sign_id),
                Box::new(self.quorum_entry.quorum_public_key),
                self.quorum_entry.quorum_hash,
                self.quorum_entry.llmq_type,
                e.to_string(),
            )
        })
    }
}
