use blsful::{Bls12381G2Impl, PublicKey, Signature};
use hashes::Hash;

use crate::blockdata::transaction::special_transaction::quorum_commitment::QuorumEntry;
use crate::hash_types::QuorumVVecHash;
use crate::sml::masternode_list_entry::MasternodeListEntry;
use crate::sml::quorum_entry::qualified_quorum_entry::QualifiedQuorumEntry;
use crate::sml::quorum_validation_error::QuorumValidationError;

impl QuorumEntry {
    /// A null commitment records a failed DKG session: nobody signed and nothing was agreed.
    pub fn is_null(&self) -> bool {
        !self.signers.iter().any(|signed| *signed)
            && !self.valid_members.iter().any(|valid| *valid)
            && self.quorum_public_key.is_zeroed()
            && self.quorum_vvec_hash == QuorumVVecHash::all_zeros()
            && self.threshold_sig.is_zeroed()
            && self.all_commitment_aggregated_signature.is_zeroed()
    }

    /// Checks the version and the bitset sizes against the quorum type.
    pub fn validate_sizes(&self) -> Result<(), QuorumValidationError> {
        if !(1..=4).contains(&self.version) {
            return Err(QuorumValidationError::InvalidQuorumVersion(self.version));
        }
        let expected = self.llmq_type.size() as usize;
        if self.signers.len() != expected || self.valid_members.len() != expected {
            return Err(QuorumValidationError::InvalidBitsetLengths {
                expected,
                signers_len: self.signers.len(),
                valid_members_len: self.valid_members.len(),
            });
        }
        Ok(())
    }

    /// Validates a commitment for a failed DKG session.
    pub fn validate_null(&self) -> Result<(), QuorumValidationError> {
        self.validate_sizes()?;
        if !self.is_null() {
            return Err(QuorumValidationError::InvalidNullCommitment(
                "commitment carries signers, members, keys or signatures".to_string(),
            ));
        }
        Ok(())
    }

    /// Checks everything that does not need the quorum members.
    pub fn validate_structure(&self) -> Result<(), QuorumValidationError> {
        self.validate_sizes()?;
        let params = self.llmq_type.params();
        let rotating = self.llmq_type.is_rotating_quorum_type();
        match self.quorum_index {
            Some(index) if rotating && (index < 0 || index as u32 >= params.signing_active_quorum_count) => {
                return Err(QuorumValidationError::InvalidQuorumIndex {
                    llmq_type: self.llmq_type,
                    index,
                });
            }
            Some(index) if !rotating && index != 0 => {
                return Err(QuorumValidationError::InvalidQuorumIndex {
                    llmq_type: self.llmq_type,
                    index,
                });
            }
            _ => {}
        }
        let valid_members = self.count_valid_members() as u64;
        if valid_members < params.min_size as u64 {
            return Err(QuorumValidationError::InsufficientValidMembers {
                required: params.min_size as u64,
                found: valid_members,
            });
        }
        let signers = self.count_signers() as u64;
        if signers < params.min_size as u64 {
            return Err(QuorumValidationError::InsufficientSigners {
                required: params.min_size as u64,
                found: signers,
            });
        }
        if self.quorum_public_key.is_zeroed() || self.quorum_vvec_hash == QuorumVVecHash::all_zeros() {
            return Err(QuorumValidationError::InvalidQuorumPublicKey);
        }
        Ok(())
    }
}

impl QualifiedQuorumEntry {
    /// Verifies the members' aggregated signature over the commitment hash.
    ///
    /// `signing_members` are the members whose signer bit is set, in committee order. Their
    /// operator keys are summed and checked against the aggregated signature.
    pub fn verify_aggregated_commitment_signature<'a, I>(
        &self,
        signing_members: I,
    ) -> Result<(), QuorumValidationError>
    where
        I: IntoIterator<Item = &'a MasternodeListEntry>,
    {
        let aggregated = signing_members.into_iter().try_fold(
            None,
            |acc: Option<PublicKey<Bls12381G2Impl>>, member| {
                let key = member.operator_public_key.to_blsful(member.uses_legacy_bls())?;
                Ok::<_, QuorumValidationError>(Some(match acc {
                    None => key,
                    Some(sum) => PublicKey(sum.0 + key.0),
                }))
            },
        )?;
        let public_key = aggregated.ok_or_else(|| {
            QuorumValidationError::AllCommitmentAggregatedSignatureNotValid(
                "no signing members".to_string(),
            )
        })?;
        let signature: Signature<Bls12381G2Impl> =
            self.quorum_entry.all_commitment_aggregated_signature.try_into()?;
        signature
            .verify(&public_key, self.commitment_hash.as_byte_array())
            .map_err(|e| QuorumValidationError::AllCommitmentAggregatedSignatureNotValid(e.to_string()))
    }

    /// Verifies the recovered threshold signature with the quorum public key.
    pub fn verify_quorum_signature(&self) -> Result<(), QuorumValidationError> {
        let public_key =
            self.quorum_entry.quorum_public_key.to_blsful(self.quorum_entry.uses_legacy_bls())?;
        let signature: Signature<Bls12381G2Impl> = self.quorum_entry.threshold_sig.try_into()?;
        signature
            .verify(&public_key, self.commitment_hash.as_byte_array())
            .map_err(|e| QuorumValidationError::ThresholdSignatureNotValid(e.to_string()))
    }

    /// Fully validates the commitment against its committee, in selection order.
    ///
    /// The recovered threshold signature is only checked with `verify_threshold_signature`.
    pub fn validate<'a, I>(
        &self,
        members: I,
        verify_threshold_signature: bool,
    ) -> Result<(), QuorumValidationError>
    where
        I: IntoIterator<Item = &'a MasternodeListEntry>,
    {
        let members: Vec<&MasternodeListEntry> = members.into_iter().collect();
        if self.quorum_entry.is_null() {
            return self.quorum_entry.validate_null();
        }
        self.quorum_entry.validate_structure()?;
        // a short committee is allowed as long as no bit points past its end
        let beyond_committee = self
            .quorum_entry
            .signers
            .iter()
            .zip(self.quorum_entry.valid_members.iter())
            .skip(members.len())
            .any(|(signed, valid)| *signed || *valid);
        if members.len() > self.quorum_entry.signers.len() || beyond_committee {
            return Err(QuorumValidationError::CommitteeSizeMismatch {
                expected: self.quorum_entry.signers.len(),
                found: members.len(),
            });
        }
        let signing_members = members
            .iter()
            .zip(self.quorum_entry.signers.iter())
            .filter_map(|(member, signed)| signed.then_some(*member));
        self.verify_aggregated_commitment_signature(signing_members)?;
        if verify_threshold_signature {
            self.verify_quorum_signature()?;
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use assert_matches::assert_matches;
    use blsful::{SecretKey, SignatureSchemes};

    use super::*;
    use crate::bls_sig_utils::{BLSPublicKey, BLSSignature};
    use crate::hash_types::{QuorumHash, QuorumVVecHash};
    use crate::sml::llmq_type::LLMQType;
    use crate::sml::masternode_list_entry::tests::entry;
    use crate::sml::quorum_entry::qualified_quorum_entry::tests::null_entry;

    fn sign(secret: &SecretKey<Bls12381G2Impl>, message: &[u8]) -> Signature<Bls12381G2Impl> {
        secret.sign(SignatureSchemes::Basic, message).expect("sign")
    }

    pub(crate) fn summed(signatures: &[Signature<Bls12381G2Impl>]) -> BLSSignature {
        let points = signatures.iter().map(|signature| match signature {
            Signature::Basic(point)
            | Signature::MessageAugmentation(point)
            | Signature::ProofOfPossession(point) => *point,
        });
        let sum = points.reduce(|acc, point| acc + point).expect("at least one signature");
        BLSSignature::from(&Signature::<Bls12381G2Impl>::Basic(sum))
    }

    /// A committee of `LlmqtypeTest` members and a commitment signed by all but the last.
    pub(crate) fn signed_commitment() -> (QualifiedQuorumEntry, Vec<MasternodeListEntry>) {
        let size = LLMQType::LlmqtypeTest.size() as usize;
        let member_secrets: Vec<_> =
            (0..size).map(|_| SecretKey::<Bls12381G2Impl>::random(&mut rand::thread_rng())).collect();
        let quorum_secret = SecretKey::<Bls12381G2Impl>::random(&mut rand::thread_rng());
        let members: Vec<MasternodeListEntry> = member_secrets
            .iter()
            .enumerate()
            .map(|(i, secret)| {
                let mut member = entry(i as u8 + 1);
                member.operator_public_key = BLSPublicKey::from(&PublicKey::from(secret));
                member
            })
            .collect();

        let mut quorum_entry = QuorumEntry {
            version: 3,
            llmq_type: LLMQType::LlmqtypeTest,
            quorum_hash: QuorumHash::from_byte_array([5; 32]),
            quorum_index: None,
            signers: (0..size).map(|i| i + 1 < size).collect(),
            valid_members: vec![true; size],
            quorum_public_key: BLSPublicKey::from(&PublicKey::from(&quorum_secret)),
            quorum_vvec_hash: QuorumVVecHash::from_byte_array([6; 32]),
            threshold_sig: BLSSignature::default(),
            all_commitment_aggregated_signature: BLSSignature::default(),
        };
        let commitment_hash = quorum_entry.calculate_commitment_hash();
        quorum_entry.threshold_sig =
            BLSSignature::from(&sign(&quorum_secret, commitment_hash.as_byte_array()));
        let member_signatures: Vec<_> = member_secrets[..size - 1]
            .iter()
            .map(|secret| sign(secret, commitment_hash.as_byte_array()))
            .collect();
        quorum_entry.all_commitment_aggregated_signature = summed(&member_signatures);
        (QualifiedQuorumEntry::from(quorum_entry), members)
    }

    #[test]
    fn valid_commitment() {
        let (commitment, members) = signed_commitment();
        assert_eq!(commitment.validate(&members, true), Ok(()));
    }

    #[test]
    fn threshold_signature_check_is_optional() {
        let (mut commitment, members) = signed_commitment();
        commitment.quorum_entry.threshold_sig = commitment.quorum_entry.all_commitment_aggregated_signature;
        assert_matches!(
            commitment.validate(&members, true),
            Err(QuorumValidationError::ThresholdSignatureNotValid(_))
        );
        assert_eq!(commitment.validate(&members, false), Ok(()));
    }

    #[test]
    fn wrong_signer_set_is_rejected() {
        let (mut commitment, members) = signed_commitment();
        commitment.quorum_entry.signers = vec![true; members.len()];
        assert_matches!(
            commitment.validate(&members, true),
            Err(QuorumValidationError::AllCommitmentAggregatedSignatureNotValid(_))
        );
    }

    #[test]
    fn wrong_quorum_key_is_rejected() {
        let (mut commitment, members) = signed_commitment();
        let other = SecretKey::<Bls12381G2Impl>::random(&mut rand::thread_rng());
        commitment.quorum_entry.quorum_public_key = BLSPublicKey::from(&PublicKey::from(&other));
        // the commitment hash covers the key, so it must be recomputed
        commitment.commitment_hash = commitment.quorum_entry.calculate_commitment_hash();
        assert!(commitment.validate(&members, true).is_err());
    }

    #[test]
    fn committee_size_must_match() {
        let (commitment, members) = signed_commitment();
        assert_matches!(
            commitment.validate(&members[1..], true),
            Err(QuorumValidationError::CommitteeSizeMismatch { expected: 4, found: 3 })
        );
    }

    #[test]
    fn null_commitments() {
        let size = LLMQType::LlmqtypeTest.size() as usize;
        let null = QualifiedQuorumEntry::from(null_entry(size));
        assert!(null.quorum_entry.is_null());
        assert_eq!(null.validate(std::iter::empty(), true), Ok(()));

        let wrong_size = QualifiedQuorumEntry::from(null_entry(size + 1));
        assert_matches!(
            wrong_size.validate(std::iter::empty(), true),
            Err(QuorumValidationError::InvalidBitsetLengths { .. })
        );
    }

    #[test]
    fn structure_checks() {
        let (commitment, _) = signed_commitment();
        let mut entry = commitment.quorum_entry.clone();
        entry.version = 5;
        assert_eq!(entry.validate_structure(), Err(QuorumValidationError::InvalidQuorumVersion(5)));

        let mut entry = commitment.quorum_entry.clone();
        entry.signers = vec![true, false, false, false];
        assert_matches!(
            entry.validate_structure(),
            Err(QuorumValidationError::InsufficientSigners { required: 2, found: 1 })
        );

        let mut entry = commitment.quorum_entry;
        entry.version = 4;
        entry.quorum_index = Some(1);
        assert_matches!(entry.validate_structure(), Err(QuorumValidationError::InvalidQuorumIndex { .. }));
    }
}
