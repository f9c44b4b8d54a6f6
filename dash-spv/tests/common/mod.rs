//! Shared setup for the integration tests: a regtest engine whose quorums have known keys.

#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use dash_spv::{
    ChainLockTracker, InMemoryChain, InstantSendTracker, LlmqServices, SigningManager, SigningRequester,
    SigningResult,
};
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
use tokio::sync::{Mutex, RwLock};

type Secret = SecretKey<Bls12381G2Impl>;

/// Hash of the block at `height` on the main test chain.
pub fn block(height: u32) -> BlockHash {
    fork_block(0xbb, height)
}

/// Hash of the block at `height` on the fork tagged `fork`.
pub fn fork_block(fork: u8, height: u32) -> BlockHash {
    let mut bytes = [fork; 32];
    bytes[..4].copy_from_slice(&height.to_le_bytes());
    BlockHash::from_byte_array(bytes)
}

/// The chain `block(1)..=block(tip)`.
pub async fn main_chain(tip: CoreBlockHeight) -> InMemoryChain {
    let chain = InMemoryChain::new();
    for height in 1..=tip {
        chain.add_block(block(height), block(height - 1), height).await;
    }
    chain
}

/// Records the signing sessions the InstantSend tracker starts.
#[derive(Default)]
pub struct RecordingRequester {
    pub requests: Mutex<Vec<(LLMQType, QuorumSigningRequestId, Sha256dHash)>>,
}

#[async_trait]
impl SigningRequester for RecordingRequester {
    async fn request_signature(
        &self,
        llmq_type: LLMQType,
        id: QuorumSigningRequestId,
        msg_hash: Sha256dHash,
    ) -> SigningResult<()> {
        self.requests.lock().await.push((llmq_type, id, msg_hash));
        Ok(())
    }
}

pub struct Quorums {
    pub engine: MasternodeListEngine,
    pub cycle_hash: BlockHash,
    keys: Vec<(LLMQType, QuorumHash, Secret)>,
}

impl Quorums {
    /// Three chain lock quorums, two InstantSend quorums and one cycle of two rotated
    /// quorums, all in the list at `list_height`.
    pub fn regtest(list_height: CoreBlockHeight) -> Self {
        let network = Network::Regtest;
        let mut engine = MasternodeListEngine::new(network);
        let mut list = MasternodeList::empty_at(block(list_height), list_height);
        let mut keys = Vec::new();
        let mut rotated = Vec::new();

        let layout = [
            (network.chain_locks_type(), 1..=3, None),
            (network.is_llmq_type(), 11..=12, None),
            (network.isd_llmq_type(), 21..=22, Some(21)),
        ];
        for (llmq_type, seeds, first_rotated) in layout {
            for seed in seeds {
                let quorum_index = first_rotated.map(|first: u8| (seed - first) as i16);
                let secret = Secret::random(&mut rand::thread_rng());
                let size = llmq_type.size() as usize;
                let entry = QuorumEntry {
                    version: if quorum_index.is_some() { 4 } else { 3 },
                    llmq_type,
                    quorum_hash: QuorumHash::from_byte_array([seed; 32]),
                    quorum_index,
                    signers: vec![true; size],
                    valid_members: vec![true; size],
                    quorum_public_key: BLSPublicKey::from(&PublicKey::from(&secret)),
                    quorum_vvec_hash: QuorumVVecHash::from_byte_array([seed; 32]),
                    threshold_sig: BLSSignature::default(),
                    all_commitment_aggregated_signature: BLSSignature::default(),
                };
                keys.push((llmq_type, entry.quorum_hash, secret));
                let quorum = Arc::new(QualifiedQuorumEntry::from(entry));
                if quorum_index.is_some() {
                    rotated.push(quorum.clone());
                }
                list.quorums.entry(llmq_type).or_default().insert(quorum.quorum_entry.quorum_hash, quorum);
            }
        }

        let cycle_height = list_height - network.isd_llmq_type().quorum_index_at(list_height);
        let cycle_hash = block(cycle_height);
        engine.feed_block_height(cycle_height, cycle_hash);
        engine.rotated_quorums_per_cycle.insert(cycle_hash, rotated);
        engine.feed_block_height(list_height, block(list_height));
        engine.masternode_lists.insert(list_height, list);

        Quorums {
            engine,
            cycle_hash,
            keys,
        }
    }

    fn sign(&self, llmq_type: LLMQType, quorum_hash: QuorumHash, sign_id: QuorumSigningSignId) -> BLSSignature {
        let (_, _, secret) = self
            .keys
            .iter()
            .find(|(t, hash, _)| *t == llmq_type && *hash == quorum_hash)
            .expect("known quorum");
        BLSSignature::from(&secret.sign(SignatureSchemes::Basic, sign_id.as_byte_array()).expect("sign"))
    }

    pub fn chain_lock(&self, block_height: CoreBlockHeight, block_hash: BlockHash) -> ChainLock {
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
        let quorum_hash = quorum.quorum_entry.quorum_hash;
        chain_lock.signature = self.sign(llmq_type, quorum_hash, chain_lock.sign_id(llmq_type, quorum_hash));
        chain_lock
    }

    pub fn recovered_sig(
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
        recovered_sig.sig = self.sign(llmq_type, recovered_sig.quorum_hash, recovered_sig.sign_id());
        recovered_sig
    }

    pub fn sign_instant_lock(&self, mut instant_lock: InstantLock) -> InstantLock {
        let (quorum, _, _) = self.engine.is_lock_quorum(&instant_lock).expect("lock quorum");
        let llmq_type = quorum.quorum_entry.llmq_type;
        let quorum_hash = quorum.quorum_entry.quorum_hash;
        instant_lock.signature = self.sign(llmq_type, quorum_hash, instant_lock.sign_id(llmq_type, quorum_hash));
        instant_lock
    }

    /// Services sharing one copy of the engine, over `chain`.
    pub fn services(&self, chain: InMemoryChain) -> (LlmqServices<InMemoryChain, RecordingRequester>, Arc<RecordingRequester>) {
        let engine = Arc::new(RwLock::new(self.engine.clone()));
        let requester = Arc::new(RecordingRequester::default());
        let services = LlmqServices {
            signing: Arc::new(SigningManager::new(engine.clone(), 64)),
            chain_locks: Arc::new(ChainLockTracker::new(engine.clone(), Arc::new(chain), true, 16)),
            instant_send: Arc::new(InstantSendTracker::new(engine, requester.clone(), 16)),
        };
        (services, requester)
    }
}

/// Polls `done` until it holds, giving the workers time to run in between.
pub async fn wait_for<F, Fut>(what: &str, mut done: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..400 {
        if done().await {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }
    panic!("timed out waiting for {what}");
}
