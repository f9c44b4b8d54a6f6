//! InstantSend lock tracking.
//!
//! A transaction is tracked once its inputs are known. Every input is signed in its own
//! signing session. When all inputs of a transaction have a recovered signature, the
//! tracker assembles the lock and asks for the lock-level signature. Locks relayed by peers
//! take the same path from verification on.
//!
//! The first valid lock on an outpoint wins. A later lock spending the same outpoint for
//! another transaction is recorded as a conflict and dropped.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashcore::hashes::Hash;
use dashcore::sml::llmq_type::LLMQType;
use dashcore::sml::llmq_type::network::NetworkLLMQExt;
use dashcore::sml::message_verification_error::MessageVerificationError;
use dashcore::{BlockHash, InstantLock, OutPoint, QuorumSigningRequestId, RecoveredSignature, Sha256dHash, Txid};
use indexmap::IndexMap;
use tokio::sync::{RwLock, broadcast};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::engine::SharedEngine;
use crate::error::{SigningResult, ValidationError, ValidationResult};

const LISTENER_CAPACITY: usize = 256;

/// Starts signing sessions on behalf of the tracker.
#[async_trait]
pub trait SigningRequester: Send + Sync {
    /// Asks the quorums of `llmq_type` to sign `msg_hash` under the request `id`.
    async fn request_signature(
        &self,
        llmq_type: LLMQType,
        id: QuorumSigningRequestId,
        msg_hash: Sha256dHash,
    ) -> SigningResult<()>;
}

/// Two transactions locking the same outpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstantSendConflict {
    pub outpoint: OutPoint,
    /// The transaction that holds the lock.
    pub locked_txid: Txid,
    pub conflicting_txid: Txid,
}

/// What [`InstantSendTracker::on_instant_lock`] did with a lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstantLockOutcome {
    Accepted,
    AlreadyKnown,
    /// The quorum that signs the lock is not known yet.
    Queued,
    /// An input is already locked by another transaction.
    Conflicted,
}

#[derive(Debug)]
struct TrackedTransaction {
    inputs: Vec<OutPoint>,
    signed_inputs: HashSet<OutPoint>,
    lock_requested: bool,
    tracked_at: Instant,
}

#[derive(Debug)]
struct StoredLock {
    instant_lock: InstantLock,
    received_at: Instant,
}

#[derive(Debug, Default)]
struct InstantSendState {
    tracked: IndexMap<Txid, TrackedTransaction>,
    input_requests: HashMap<QuorumSigningRequestId, (Txid, OutPoint)>,
    /// Assembled locks waiting for their own recovered signature.
    lock_requests: HashMap<QuorumSigningRequestId, InstantLock>,
    locks: IndexMap<Txid, StoredLock>,
    locked_outpoints: HashMap<OutPoint, Txid>,
    conflicts: Vec<InstantSendConflict>,
    pending: VecDeque<InstantLock>,
}

impl InstantSendState {
    fn untrack(&mut self, txid: &Txid) {
        if let Some(tracked) = self.tracked.shift_remove(txid) {
            for outpoint in &tracked.inputs {
                let request_id = InstantLock::input_request_id(outpoint);
                if self.input_requests.get(&request_id).is_some_and(|(claimant, _)| claimant == txid) {
                    self.input_requests.remove(&request_id);
                }
            }
        }
        self.lock_requests.retain(|_, lock| lock.txid != *txid);
    }

    fn remove_lock(&mut self, txid: &Txid) -> bool {
        let Some(stored) = self.locks.shift_remove(txid) else {
            return false;
        };
        for outpoint in &stored.instant_lock.inputs {
            if self.locked_outpoints.get(outpoint) == Some(txid) {
                self.locked_outpoints.remove(outpoint);
            }
        }
        true
    }
}

fn txid_msg_hash(txid: Txid) -> Sha256dHash {
    Sha256dHash::from_byte_array(txid.to_byte_array())
}

/// Errors that only mean the engine has not synced far enough yet.
fn is_retryable(error: &MessageVerificationError) -> bool {
    matches!(
        error,
        MessageVerificationError::CycleHashNotPresent(_)
            | MessageVerificationError::NoMasternodeLists
            | MessageVerificationError::NoMasternodeListAtHeight(_)
            | MessageVerificationError::NoQuorumsOfType(..)
    )
}

fn validate_structure(instant_lock: &InstantLock) -> ValidationResult<()> {
    if instant_lock.txid == Txid::all_zeros() {
        return Err(ValidationError::InvalidInstantLock("transaction id cannot be zero".to_string()));
    }
    if instant_lock.signature.is_zeroed() {
        return Err(ValidationError::InvalidInstantLock("signature cannot be zero".to_string()));
    }
    if instant_lock.inputs.is_empty() {
        return Err(ValidationError::InvalidInstantLock("lock has no inputs".to_string()));
    }
    let unique: HashSet<_> = instant_lock.inputs.iter().collect();
    if unique.len() != instant_lock.inputs.len() {
        return Err(ValidationError::InvalidInstantLock("duplicate input".to_string()));
    }
    if instant_lock.is_deterministic() && instant_lock.cyclehash == BlockHash::all_zeros() {
        return Err(ValidationError::InvalidInstantLock("deterministic lock without cycle hash".to_string()));
    }
    Ok(())
}

/// Tracks per-input signatures and InstantSend locks.
pub struct InstantSendTracker<R: SigningRequester> {
    engine: SharedEngine,
    requester: Arc<R>,
    state: RwLock<InstantSendState>,
    max_pending: usize,
    listeners: broadcast::Sender<InstantLock>,
}

impl<R: SigningRequester> InstantSendTracker<R> {
    pub fn new(engine: SharedEngine, requester: Arc<R>, max_pending: usize) -> Self {
        let (listeners, _) = broadcast::channel(LISTENER_CAPACITY);
        InstantSendTracker {
            engine,
            requester,
            state: RwLock::new(InstantSendState::default()),
            max_pending: max_pending.max(1),
            listeners,
        }
    }

    /// Receives every lock accepted from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<InstantLock> {
        self.listeners.subscribe()
    }

    /// Starts tracking `txid`. Returns the request ids of its input signing sessions.
    ///
    /// An input session belongs to the first tracked transaction spending the outpoint. A
    /// transaction spending an outpoint already claimed by another one is not tracked and
    /// gets no request ids.
    pub async fn track_transaction(&self, txid: Txid, inputs: Vec<OutPoint>) -> Vec<QuorumSigningRequestId> {
        let request_ids: Vec<_> = inputs.iter().map(InstantLock::input_request_id).collect();
        let mut state = self.state.write().await;
        if state.tracked.contains_key(&txid) || state.locks.contains_key(&txid) {
            return request_ids;
        }
        let claimed = request_ids.iter().zip(&inputs).find_map(|(request_id, outpoint)| {
            let (claimant, _) = state.input_requests.get(request_id)?;
            (*claimant != txid).then_some((*claimant, *outpoint))
        });
        if let Some((claimant, outpoint)) = claimed {
            warn!(%txid, %claimant, %outpoint, "input already claimed by another transaction, not tracking");
            return Vec::new();
        }
        for (request_id, outpoint) in request_ids.iter().zip(&inputs) {
            state.input_requests.insert(*request_id, (txid, *outpoint));
        }
        state.tracked.insert(
            txid,
            TrackedTransaction {
                inputs,
                signed_inputs: HashSet::new(),
                lock_requested: false,
                tracked_at: Instant::now(),
            },
        );
        debug!(%txid, "tracking transaction for InstantSend");
        request_ids
    }

    /// Dispatches a verified recovered signature to the input or lock session it belongs to.
    pub async fn on_recovered_sig(&self, recovered_sig: &RecoveredSignature) -> ValidationResult<()> {
        let (is_input, is_lock) = {
            let state = self.state.read().await;
            (
                state.input_requests.contains_key(&recovered_sig.id),
                state.lock_requests.contains_key(&recovered_sig.id),
            )
        };
        if is_input {
            self.on_recovered_input_sig(recovered_sig).await?;
        } else if is_lock {
            self.on_recovered_lock_sig(recovered_sig).await?;
        }
        Ok(())
    }

    /// Records the signature of one input. Once every input is signed the lock is assembled,
    /// its signing session requested, and the lock returned.
    pub async fn on_recovered_input_sig(
        &self,
        recovered_sig: &RecoveredSignature,
    ) -> ValidationResult<Option<InstantLock>> {
        let (txid, inputs) = {
            let mut state = self.state.write().await;
            let Some((txid, outpoint)) = state.input_requests.get(&recovered_sig.id).copied() else {
                return Ok(None);
            };
            if recovered_sig.msg_hash != txid_msg_hash(txid) {
                return Err(ValidationError::InputSignatureMismatch(outpoint, txid));
            }
            let Some(tracked) = state.tracked.get_mut(&txid) else {
                return Ok(None);
            };
            tracked.signed_inputs.insert(outpoint);
            if tracked.lock_requested || tracked.signed_inputs.len() < tracked.inputs.len() {
                return Ok(None);
            }
            tracked.lock_requested = true;
            (txid, tracked.inputs.clone())
        };

        let (instant_lock, llmq_type) = self.assemble_lock(txid, inputs).await;
        let request_id = instant_lock.request_id();
        self.state.write().await.lock_requests.insert(request_id, instant_lock.clone());
        debug!(%txid, %llmq_type, "all inputs signed, requesting InstantSend lock signature");

        if let Err(e) = self.requester.request_signature(llmq_type, request_id, txid_msg_hash(txid)).await {
            warn!(%txid, "failed to request the InstantSend lock signature: {}", e);
        }
        Ok(Some(instant_lock))
    }

    /// A lock for the current rotation cycle when the engine knows it, otherwise a legacy lock.
    async fn assemble_lock(&self, txid: Txid, inputs: Vec<OutPoint>) -> (InstantLock, LLMQType) {
        let engine = self.engine.read().await;
        let network = engine.network;
        let cycle_hash = engine.latest_masternode_list().and_then(|list| {
            let height = list.known_height;
            let cycle_height = height - network.isd_llmq_type().quorum_index_at(height);
            engine.block_hashes.get(&cycle_height).copied()
        });
        match cycle_hash.filter(|hash| engine.rotated_quorums_per_cycle.contains_key(hash)) {
            Some(cyclehash) => (
                InstantLock {
                    version: 1,
                    inputs,
                    txid,
                    cyclehash,
                    signature: Default::default(),
                },
                network.isd_llmq_type(),
            ),
            None => (
                InstantLock {
                    version: 0,
                    inputs,
                    txid,
                    cyclehash: BlockHash::all_zeros(),
                    signature: Default::default(),
                },
                network.is_llmq_type(),
            ),
        }
    }

    /// Completes an assembled lock with its recovered signature.
    pub async fn on_recovered_lock_sig(
        &self,
        recovered_sig: &RecoveredSignature,
    ) -> ValidationResult<Option<InstantLockOutcome>> {
        let Some(mut instant_lock) = self.state.write().await.lock_requests.remove(&recovered_sig.id) else {
            return Ok(None);
        };
        if recovered_sig.msg_hash != txid_msg_hash(instant_lock.txid) {
            return Err(ValidationError::InvalidInstantLock(format!(
                "recovered signature does not sign transaction {}",
                instant_lock.txid
            )));
        }
        instant_lock.signature = recovered_sig.sig;
        self.on_instant_lock(instant_lock).await.map(Some)
    }

    /// Verifies and stores a lock.
    pub async fn on_instant_lock(&self, instant_lock: InstantLock) -> ValidationResult<InstantLockOutcome> {
        validate_structure(&instant_lock)?;
        if self.state.read().await.locks.contains_key(&instant_lock.txid) {
            return Ok(InstantLockOutcome::AlreadyKnown);
        }

        let verification = self.engine.read().await.verify_is_lock(&instant_lock);
        match verification {
            Ok(()) => {}
            Err(e) if is_retryable(&e) => {
                debug!(txid = %instant_lock.txid, "queueing InstantSend lock: {}", e);
                self.queue_pending(instant_lock).await;
                return Ok(InstantLockOutcome::Queued);
            }
            Err(e) => {
                warn!(txid = %instant_lock.txid, "rejecting InstantSend lock: {}", e);
                return Err(ValidationError::InvalidInstantLock(e.to_string()));
            }
        }

        {
            let mut state = self.state.write().await;
            if state.locks.contains_key(&instant_lock.txid) {
                return Ok(InstantLockOutcome::AlreadyKnown);
            }
            let conflicts: Vec<_> = instant_lock
                .inputs
                .iter()
                .filter_map(|outpoint| {
                    let locked_txid = *state.locked_outpoints.get(outpoint)?;
                    (locked_txid != instant_lock.txid).then_some(InstantSendConflict {
                        outpoint: *outpoint,
                        locked_txid,
                        conflicting_txid: instant_lock.txid,
                    })
                })
                .collect();
            if !conflicts.is_empty() {
                for conflict in &conflicts {
                    warn!(
                        outpoint = %conflict.outpoint,
                        locked_txid = %conflict.locked_txid,
                        conflicting_txid = %conflict.conflicting_txid,
                        "conflicting InstantSend lock"
                    );
                    if !state.conflicts.contains(conflict) {
                        state.conflicts.push(*conflict);
                    }
                }
                return Ok(InstantLockOutcome::Conflicted);
            }

            for outpoint in &instant_lock.inputs {
                state.locked_outpoints.insert(*outpoint, instant_lock.txid);
            }
            state.untrack(&instant_lock.txid);
            state.locks.insert(
                instant_lock.txid,
                StoredLock {
                    instant_lock: instant_lock.clone(),
                    received_at: Instant::now(),
                },
            );
        }

        info!(txid = %instant_lock.txid, "InstantSend lock accepted");
        let _ = self.listeners.send(instant_lock);
        Ok(InstantLockOutcome::Accepted)
    }

    async fn queue_pending(&self, instant_lock: InstantLock) {
        let mut state = self.state.write().await;
        if state.pending.contains(&instant_lock) {
            return;
        }
        if state.pending.len() >= self.max_pending {
            if let Some(dropped) = state.pending.pop_front() {
                warn!(
                    "Pending InstantSend locks at capacity ({}), dropping lock for {}",
                    self.max_pending, dropped.txid
                );
            }
        }
        state.pending.push_back(instant_lock);
    }

    /// Retries the queued locks. Returns how many were accepted.
    pub async fn process_pending_locks(&self) -> usize {
        let pending = std::mem::take(&mut self.state.write().await.pending);
        let mut accepted = 0;
        for instant_lock in pending {
            let txid = instant_lock.txid;
            match self.on_instant_lock(instant_lock).await {
                Ok(InstantLockOutcome::Accepted) => accepted += 1,
                Ok(_) => {}
                Err(e) => debug!(%txid, "dropping pending InstantSend lock: {}", e),
            }
        }
        accepted
    }

    pub async fn is_locked(&self, txid: &Txid) -> bool {
        self.state.read().await.locks.contains_key(txid)
    }

    pub async fn get_instant_lock(&self, txid: &Txid) -> Option<InstantLock> {
        self.state.read().await.locks.get(txid).map(|stored| stored.instant_lock.clone())
    }

    /// The transaction whose lock holds `outpoint`.
    pub async fn locking_transaction(&self, outpoint: &OutPoint) -> Option<Txid> {
        self.state.read().await.locked_outpoints.get(outpoint).copied()
    }

    pub async fn is_tracked(&self, txid: &Txid) -> bool {
        self.state.read().await.tracked.contains_key(txid)
    }

    pub async fn pending_count(&self) -> usize {
        self.state.read().await.pending.len()
    }

    /// Every conflict recorded so far.
    pub async fn conflicts(&self) -> Vec<InstantSendConflict> {
        self.state.read().await.conflicts.clone()
    }

    /// Drops locks and tracked transactions older than `max_age`. Returns how many locks
    /// were removed.
    pub async fn prune(&self, max_age: Duration) -> usize {
        let now = Instant::now();
        let mut state = self.state.write().await;
        let expired_locks: Vec<Txid> = state
            .locks
            .iter()
            .filter(|(_, stored)| now.duration_since(stored.received_at) > max_age)
            .map(|(txid, _)| *txid)
            .collect();
        for txid in &expired_locks {
            state.remove_lock(txid);
        }
        let expired_tracked: Vec<Txid> = state
            .tracked
            .iter()
            .filter(|(_, tracked)| now.duration_since(tracked.tracked_at) > max_age)
            .map(|(txid, _)| *txid)
            .collect();
        for txid in &expired_tracked {
            state.untrack(txid);
        }
        let locked: HashSet<Txid> = state.locks.keys().copied().collect();
        state.conflicts.retain(|conflict| locked.contains(&conflict.locked_txid));
        if !expired_locks.is_empty() || !expired_tracked.is_empty() {
            debug!(
                "pruned {} InstantSend locks and {} tracked transactions",
                expired_locks.len(),
                expired_tracked.len()
            );
        }
        expired_locks.len()
    }

    /// Forgets transactions that were mined. Returns how many locks were removed.
    pub async fn remove_confirmed(&self, txids: &[Txid]) -> usize {
        let mut state = self.state.write().await;
        let mut removed = 0;
        for txid in txids {
            if state.remove_lock(txid) {
                removed += 1;
            }
            state.untrack(txid);
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use dashcore::bls_sig_utils::BLSSignature;
    use dashcore::{Network, QuorumHash};
    use dashcore::sml::masternode_list_engine::MasternodeListEngine;
    use tokio::sync::Mutex;

    use super::*;
    use crate::test_utils::QuorumFixture;

    #[derive(Default)]
    struct RecordingRequester {
        requests: Mutex<Vec<(LLMQType, QuorumSigningRequestId, Sha256dHash)>>,
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

    fn outpoint(seed: u8, vout: u32) -> OutPoint {
        OutPoint {
            txid: Txid::from_byte_array([seed; 32]),
            vout,
        }
    }

    fn tracker() -> (InstantSendTracker<RecordingRequester>, Arc<RecordingRequester>, QuorumFixture) {
        let fixture = QuorumFixture::regtest(100);
        let engine = Arc::new(RwLock::new(fixture.engine.clone()));
        let requester = Arc::new(RecordingRequester::default());
        (InstantSendTracker::new(engine, requester.clone(), 4), requester, fixture)
    }

    fn input_sig(outpoint: &OutPoint, txid: Txid) -> RecoveredSignature {
        RecoveredSignature {
            llmq_type: Network::Regtest.is_llmq_type(),
            quorum_hash: QuorumHash::all_zeros(),
            id: InstantLock::input_request_id(outpoint),
            msg_hash: txid_msg_hash(txid),
            sig: BLSSignature::from([1; 96]),
        }
    }

    fn signed_lock(fixture: &QuorumFixture, txid: Txid, inputs: Vec<OutPoint>) -> InstantLock {
        fixture.sign_instant_lock(InstantLock {
            version: 1,
            inputs,
            txid,
            cyclehash: fixture.cycle_hash,
            signature: BLSSignature::default(),
        })
    }

    #[tokio::test]
    async fn lock_is_assembled_once_every_input_is_signed() {
        let (tracker, requester, fixture) = tracker();
        let txid = Txid::from_byte_array([0x42; 32]);
        let inputs = vec![outpoint(1, 0), outpoint(2, 3)];
        let request_ids = tracker.track_transaction(txid, inputs.clone()).await;
        assert_eq!(request_ids, inputs.iter().map(InstantLock::input_request_id).collect::<Vec<_>>());

        assert_eq!(tracker.on_recovered_input_sig(&input_sig(&inputs[0], txid)).await.expect("input"), None);
        // the same input again does not complete the transaction
        assert_eq!(tracker.on_recovered_input_sig(&input_sig(&inputs[0], txid)).await.expect("input"), None);
        assert!(requester.requests.lock().await.is_empty());

        let assembled = tracker
            .on_recovered_input_sig(&input_sig(&inputs[1], txid))
            .await
            .expect("input")
            .expect("assembled lock");
        assert!(assembled.is_deterministic());
        assert_eq!(assembled.cyclehash, fixture.cycle_hash);
        assert_eq!(assembled.inputs, inputs);

        let requests = requester.requests.lock().await.clone();
        assert_eq!(
            requests,
            vec![(Network::Regtest.isd_llmq_type(), assembled.request_id(), txid_msg_hash(txid))]
        );

        let signature = fixture.sign_instant_lock(assembled.clone()).signature;
        let lock_sig = RecoveredSignature {
            llmq_type: Network::Regtest.isd_llmq_type(),
            quorum_hash: QuorumHash::all_zeros(),
            id: assembled.request_id(),
            msg_hash: txid_msg_hash(txid),
            sig: signature,
        };
        let mut listener = tracker.subscribe();
        tracker.on_recovered_sig(&lock_sig).await.expect("lock signature");

        assert!(tracker.is_locked(&txid).await);
        assert!(!tracker.is_tracked(&txid).await);
        assert_eq!(tracker.locking_transaction(&inputs[1]).await, Some(txid));
        assert_eq!(listener.recv().await.expect("notification").txid, txid);
    }

    #[tokio::test]
    async fn input_signature_for_another_message_is_rejected() {
        let (tracker, _, _) = tracker();
        let txid = Txid::from_byte_array([0x43; 32]);
        let input = outpoint(3, 0);
        tracker.track_transaction(txid, vec![input]).await;

        let wrong = input_sig(&input, Txid::from_byte_array([0x44; 32]));
        assert_matches!(
            tracker.on_recovered_input_sig(&wrong).await,
            Err(ValidationError::InputSignatureMismatch(o, t)) if o == input && t == txid
        );
    }

    #[tokio::test]
    async fn first_transaction_keeps_a_shared_input() {
        let (tracker, requester, _) = tracker();
        let shared = outpoint(4, 0);
        let first = Txid::from_byte_array([0x45; 32]);
        let second = Txid::from_byte_array([0x46; 32]);

        assert_eq!(tracker.track_transaction(first, vec![shared]).await.len(), 1);
        assert!(tracker.track_transaction(second, vec![shared, outpoint(4, 1)]).await.is_empty());
        assert!(!tracker.is_tracked(&second).await);

        // forgetting the refused transaction leaves the first claim alone
        tracker.remove_confirmed(&[second]).await;
        assert_matches!(
            tracker.on_recovered_input_sig(&input_sig(&shared, second)).await,
            Err(ValidationError::InputSignatureMismatch(o, t)) if o == shared && t == first
        );
        let assembled = tracker
            .on_recovered_input_sig(&input_sig(&shared, first))
            .await
            .expect("input")
            .expect("assembled lock");
        assert_eq!(assembled.txid, first);
        assert_eq!(requester.requests.lock().await.len(), 1);

        // the unclaimed input is free for another transaction
        let third = Txid::from_byte_array([0x47; 32]);
        assert_eq!(tracker.track_transaction(third, vec![outpoint(4, 1)]).await.len(), 1);
    }

    #[tokio::test]
    async fn first_lock_on_an_outpoint_wins() {
        let (tracker, _, fixture) = tracker();
        let shared = outpoint(5, 1);
        let first = signed_lock(&fixture, Txid::from_byte_array([0x51; 32]), vec![shared, outpoint(6, 0)]);
        let second = signed_lock(&fixture, Txid::from_byte_array([0x52; 32]), vec![shared]);

        assert_eq!(tracker.on_instant_lock(first.clone()).await.expect("first"), InstantLockOutcome::Accepted);
        assert_eq!(tracker.on_instant_lock(first.clone()).await.expect("again"), InstantLockOutcome::AlreadyKnown);
        assert_eq!(tracker.on_instant_lock(second.clone()).await.expect("second"), InstantLockOutcome::Conflicted);

        assert!(!tracker.is_locked(&second.txid).await);
        assert_eq!(tracker.locking_transaction(&shared).await, Some(first.txid));
        assert_eq!(
            tracker.conflicts().await,
            vec![InstantSendConflict {
                outpoint: shared,
                locked_txid: first.txid,
                conflicting_txid: second.txid,
            }]
        );
    }

    #[tokio::test]
    async fn malformed_and_forged_locks_are_rejected() {
        let (tracker, _, fixture) = tracker();
        let txid = Txid::from_byte_array([0x61; 32]);
        let unsigned = InstantLock {
            version: 1,
            inputs: vec![outpoint(7, 0)],
            txid,
            cyclehash: fixture.cycle_hash,
            signature: BLSSignature::default(),
        };
        assert_matches!(tracker.on_instant_lock(unsigned).await, Err(ValidationError::InvalidInstantLock(_)));

        let mut duplicated = signed_lock(&fixture, txid, vec![outpoint(7, 0)]);
        duplicated.inputs.push(outpoint(7, 0));
        assert_matches!(tracker.on_instant_lock(duplicated).await, Err(ValidationError::InvalidInstantLock(_)));

        let mut forged = signed_lock(&fixture, txid, vec![outpoint(7, 0)]);
        forged.txid = Txid::from_byte_array([0x62; 32]);
        assert_matches!(tracker.on_instant_lock(forged).await, Err(ValidationError::InvalidInstantLock(_)));
        assert!(!tracker.is_locked(&txid).await);
    }

    #[tokio::test]
    async fn locks_for_unknown_cycles_are_queued() {
        let fixture = QuorumFixture::regtest(100);
        let engine = Arc::new(RwLock::new(MasternodeListEngine::new(Network::Regtest)));
        let tracker = InstantSendTracker::new(engine.clone(), Arc::new(RecordingRequester::default()), 4);
        let lock = signed_lock(&fixture, Txid::from_byte_array([0x71; 32]), vec![outpoint(8, 0)]);

        assert_eq!(tracker.on_instant_lock(lock.clone()).await.expect("queued"), InstantLockOutcome::Queued);
        assert_eq!(tracker.pending_count().await, 1);

        *engine.write().await = fixture.engine.clone();
        assert_eq!(tracker.process_pending_locks().await, 1);
        assert!(tracker.is_locked(&lock.txid).await);
    }

    #[tokio::test(start_paused = true)]
    async fn confirmed_and_expired_locks_are_dropped() {
        let (tracker, _, fixture) = tracker();
        let old = signed_lock(&fixture, Txid::from_byte_array([0x81; 32]), vec![outpoint(9, 0)]);
        let mined = signed_lock(&fixture, Txid::from_byte_array([0x82; 32]), vec![outpoint(9, 1)]);
        tracker.on_instant_lock(old.clone()).await.expect("old");
        tokio::time::advance(Duration::from_secs(100)).await;
        tracker.on_instant_lock(mined.clone()).await.expect("mined");
        tracker.track_transaction(Txid::from_byte_array([0x83; 32]), vec![outpoint(9, 2)]).await;

        assert_eq!(tracker.remove_confirmed(&[mined.txid]).await, 1);
        assert_eq!(tracker.locking_transaction(&outpoint(9, 1)).await, None);

        assert_eq!(tracker.prune(Duration::from_secs(50)).await, 1);
        assert!(!tracker.is_locked(&old.txid).await);
        assert!(tracker.is_tracked(&Txid::from_byte_array([0x83; 32])).await);
    }
}
