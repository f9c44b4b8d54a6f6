//! Engines with keyed quorums for the unit tests.

use std::sync::Arc;

use dashcore::blsful::{Bls12381G2Impl, PublicKey, SecretKey, SignatureSchemes};
use dashcore::bls_sig_utils::{BLSPublicKey, BLSSignature};
use dashcore::hash_types::{QuorumSigningSignId, QuorumVVecHash};
use dashcore::hashes::Hash;
use dashcore::prelude::CoreBlockHeight;
use dashcore::sml::llmq_type::LLMQType;
use dashcore::sml::llmq_type::network::NetworkLLMQExt;
use dashcore::sml::masternode_list::MasternodeList;
use dashcore::sml::masternode_list_engine::MasternodeListEngine;
use dashcore::sml::quorum_entry::qualified_quorum_entry::QualifiedQuorumEntry;
use dashcore::{
    BlockHash, ChainLock, InstantLock, Network, QuorumEntry, QuorumHash, QuorumSigningRequestId,
    RecoveredSignature, Sha256dHash,
};

pub(crate) type Secret = SecretKey<Bls12381G2Impl>;

pub(crate) fn block(height: u32) -> BlockHash {
    let mut bytes = [0xbb; 32];
    bytes[..4].copy_from_slice(&height.to_le_bytes());
    BlockHash::from_byte_array(bytes)
}

pub(crate) fn sign(secret: &Secret, sign_id: QuorumSigningSignId) -> BLSSignature {
    BLSSignature::from(&secret.sign(SignatureSchemes::Basic, sign_id.as_byte_array()).expect("sign"))
}

fn keyed_quorum(llmq_type: LLMQType, quorum_hash: QuorumHash, quorum_index: Option<i16>) -> (QuorumEntry, Secret) {
    let secret = Secret::random(&mut rand::thread_rng());
    let size = llmq_type.size() as usize;
    let quorum = QuorumEntry {
        version: if quorum_index.is_some() { 4 } else { 3 },
        llmq_type,
        quorum_hash,
        quorum_index,
        signers: vec![true; size],
        valid_members: vec![true; size],
        quorum_public_key: BLSPublicKey::from(&PublicKey::from(&secret)),
        quorum_vvec_hash: QuorumVVecHash::from_byte_array([1; 32]),
        threshold_sig: BLSSignature::default(),
        all_commitment_aggregated_signature: BLSSignature::default(),
    };
    (quorum, secret)
}

/// A regtest engine holding one list with chain lock and InstantSend quorums, plus one
/// cycle of rotated quorums for deterministic locks.
pub(crate) struct QuorumFixture {
    pub(crate) engine: MasternodeListEngine,
    pub(crate) cycle_hash: BlockHash,
    secrets: Vec<(LLMQType, QuorumHash, Secret)>,
}

impl QuorumFixture {
    pub(crate) fn regtest(list_height: CoreBlockHeight) -> Self {
        let network = Network::Regtest;
        let mut engine = MasternodeListEngine::new(network);
        let mut list = MasternodeList::empty_at(block(list_height), list_height);
        let mut secrets = Vec::new();

        let mut add = |list: &mut MasternodeList, llmq_type: LLMQType, seed: u8, index: Option<i16>| {
            let (quorum, secret) = keyed_quorum(llmq_type, QuorumHash::from_byte_array([seed; 32]), index);
            secrets.push((llmq_type, quorum.quorum_hash, secret));
            let quorum = Arc::new(QualifiedQuorumEntry::from(quorum));
            list.quorums.entry(llmq_type).or_default().insert(quorum.quorum_entry.quorum_hash, quorum.clone());
            quorum
        };

        for seed in 1..=3 {
            add(&mut list, network.chain_locks_type(), seed, None);
        }
        for seed in 11..=12 {
            add(&mut list, network.is_llmq_type(), seed, None);
        }
        let rotated: Vec<_> =
            (0..2).map(|index| add(&mut list, network.isd_llmq_type(), 21 + index as u8, Some(index))).collect();

        let cycle_height = list_height - network.isd_llmq_type().quorum_index_at(list_height);
        let cycle_hash = block(cycle_height);
        engine.feed_block_height(cycle_height, cycle_hash);
        engine.rotated_quorums_per_cycle.insert(cycle_hash, rotated);
        engine.feed_block_height(list_height, block(list_height));
        engine.masternode_lists.insert(list_height, list);

        QuorumFixture {
            engine,
            cycle_hash,
            secrets,
        }
    }

    fn secret(&self, llmq_type: LLMQType, quorum_hash: QuorumHash) -> &Secret {
        &self
            .secrets
            .iter()
            .find(|(t, hash, _)| *t == llmq_type && *hash == quorum_hash)
            .expect("quorum of the fixture")
            .2
    }

    pub(crate) fn chain_lock(&self, block_height: CoreBlockHeight, block_hash: BlockHash) -> ChainLock {
        let llmq_type = self.engine.network.chain_locks_type();
        let mut chain_lock = ChainLock {
            block_height,
            block_hash,
            signature: BLSSignature::default(),
        };
        let quorum = self
            .engine
            .select_quorum_for_signing(llmq_type, block_height, chain_lock.request_id())
            .expect("chain lock quorum");
        let sign_id = chain_lock.sign_id(llmq_type, quorum.quorum_entry.quorum_hash);
        chain_lock.signature = sign(self.secret(llmq_type, quorum.quorum_entry.quorum_hash), sign_id);
        chain_lock
    }

    pub(crate) fn recovered_sig(
        &self,
        llmq_type: LLMQType,
        sign_height: CoreBlockHeight,
        id: QuorumSigningRequestId,
        msg_hash: Sha256dHash,
    ) -> RecoveredSignature {
        let quorum = self.engine.select_quorum_for_signing(llmq_type, sign_height, id).expect("signing quorum");
        let mut recovered_sig = RecoveredSignature {
            llmq_type,
            quorum_hash: quorum.quorum_entry.quorum_hash,
            id,
            msg_hash,
            sig: BLSSignature::default(),
        };
        recovered_sig.sig = sign(self.secret(llmq_type, recovered_sig.quorum_hash), recovered_sig.sign_id());
        recovered_sig
    }

    /// Signs `instant_lock` with the quorum that verifies it.
    pub(crate) fn sign_instant_lock(&self, mut instant_lock: InstantLock) -> InstantLock {
        let (quorum, _, _) = self.engine.is_lock_quorum(&instant_lock).expect("lock quorum");
        let llmq_type = quorum.quorum_entry.llmq_type;
        let sign_id = instant_lock.sign_id(llmq_type, quorum.quorum_entry.quorum_hash);
        instant_lock.signature = sign(self.secret(llmq_type, quorum.quorum_entry.quorum_hash), sign_id);
        instant_lock
    }
}
