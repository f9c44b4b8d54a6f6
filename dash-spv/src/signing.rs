//! Recovered signature handling.
//!
//! The [`SigningManager`] verifies recovered threshold signatures against the quorum the
//! engine selects for their request, caches the valid ones and notifies subscribers. Peers
//! can relay the same signature many times, and a request id can only ever be signed for
//! one message: a second message for a known request id is a conflict and is rejected.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use dashcore::prelude::CoreBlockHeight;
use dashcore::sml::llmq_type::LLMQType;
use dashcore::sml::message_verification_error::MessageVerificationError;
use dashcore::sml::quorum_entry::qualified_quorum_entry::QualifiedQuorumEntry;
use dashcore::{QuorumSigningRequestId, QuorumSigningSignId, RecoveredSignature, Sha256dHash};
use indexmap::IndexMap;
use tokio::sync::{Mutex, RwLock, broadcast, mpsc};
use tokio::time::Instant;
use tracing::{debug, trace, warn};

use crate::engine::SharedEngine;
use crate::error::{SigningError, SigningResult, StorageError};

/// Capacity of the notification channel for accepted signatures.
const LISTENER_CAPACITY: usize = 256;

/// A recovered signature waiting for verification, with the height it was signed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingRecoveredSig {
    pub recovered_sig: RecoveredSignature,
    pub sign_height: CoreBlockHeight,
}

#[derive(Debug, Clone, Copy)]
struct CachedRecoveredSig {
    recovered_sig: RecoveredSignature,
    received_at: Instant,
}

type RequestKey = (LLMQType, QuorumSigningRequestId);

#[derive(Debug, Default)]
struct RecoveredSigCache {
    /// Insertion ordered so that cleanup visits the oldest signatures first.
    by_id: IndexMap<RequestKey, CachedRecoveredSig>,
    by_sign_hash: HashMap<QuorumSigningSignId, RequestKey>,
}

impl RecoveredSigCache {
    /// `Ok(true)` when the exact signature is known, an error when the request id is
    /// taken by another message.
    fn check_known(&self, recovered_sig: &RecoveredSignature) -> SigningResult<bool> {
        match self.by_id.get(&(recovered_sig.llmq_type, recovered_sig.id)) {
            None => Ok(false),
            Some(known) if known.recovered_sig.msg_hash == recovered_sig.msg_hash => Ok(true),
            Some(known) => {
                warn!(
                    llmq_type = %recovered_sig.llmq_type,
                    id = %recovered_sig.id,
                    known_msg_hash = %known.recovered_sig.msg_hash,
                    msg_hash = %recovered_sig.msg_hash,
                    "conflicting recovered signature rejected"
                );
                Err(SigningError::ConflictingRecoveredSig {
                    llmq_type: recovered_sig.llmq_type,
                    id: recovered_sig.id,
                })
            }
        }
    }
}

/// Verifies, caches and distributes recovered signatures.
#[derive(Debug)]
pub struct SigningManager {
    engine: SharedEngine,
    cache: RwLock<RecoveredSigCache>,
    pending_tx: mpsc::Sender<PendingRecoveredSig>,
    pending_rx: Mutex<mpsc::Receiver<PendingRecoveredSig>>,
    pending_capacity: usize,
    listeners: broadcast::Sender<RecoveredSignature>,
}

impl SigningManager {
    /// `pending_capacity` bounds the queue of signatures waiting for verification.
    pub fn new(engine: SharedEngine, pending_capacity: usize) -> Self {
        let pending_capacity = pending_capacity.max(1);
        let (pending_tx, pending_rx) = mpsc::channel(pending_capacity);
        let (listeners, _) = broadcast::channel(LISTENER_CAPACITY);
        SigningManager {
            engine,
            cache: RwLock::new(RecoveredSigCache::default()),
            pending_tx,
            pending_rx: Mutex::new(pending_rx),
            pending_capacity,
            listeners,
        }
    }

    pub fn engine(&self) -> &SharedEngine {
        &self.engine
    }

    /// Receives every signature accepted from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<RecoveredSignature> {
        self.listeners.subscribe()
    }

    /// The quorum responsible for `id` at `sign_height`.
    pub async fn select_quorum_for_signing(
        &self,
        llmq_type: LLMQType,
        sign_height: CoreBlockHeight,
        id: QuorumSigningRequestId,
    ) -> Result<Arc<QualifiedQuorumEntry>, MessageVerificationError> {
        self.engine.read().await.select_quorum_for_signing(llmq_type, sign_height, id)
    }

    pub async fn has_recovered_sig(
        &self,
        llmq_type: LLMQType,
        id: QuorumSigningRequestId,
        msg_hash: Sha256dHash,
    ) -> bool {
        self.cache
            .read()
            .await
            .by_id
            .get(&(llmq_type, id))
            .is_some_and(|cached| cached.recovered_sig.msg_hash == msg_hash)
    }

    pub async fn has_recovered_sig_for_id(&self, llmq_type: LLMQType, id: QuorumSigningRequestId) -> bool {
        self.cache.read().await.by_id.contains_key(&(llmq_type, id))
    }

    pub async fn has_recovered_sig_for_hash(&self, sign_hash: &QuorumSigningSignId) -> bool {
        self.cache.read().await.by_sign_hash.contains_key(sign_hash)
    }

    pub async fn get_recovered_sig_for_id(
        &self,
        llmq_type: LLMQType,
        id: QuorumSigningRequestId,
    ) -> Option<RecoveredSignature> {
        self.cache.read().await.by_id.get(&(llmq_type, id)).map(|cached| cached.recovered_sig)
    }

    /// Whether a different message was already signed for the request of `recovered_sig`.
    pub async fn is_conflicting(&self, recovered_sig: &RecoveredSignature) -> bool {
        self.cache
            .read()
            .await
            .by_id
            .get(&(recovered_sig.llmq_type, recovered_sig.id))
            .is_some_and(|cached| cached.recovered_sig.msg_hash != recovered_sig.msg_hash)
    }

    pub async fn len(&self) -> usize {
        self.cache.read().await.by_id.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.cache.read().await.by_id.is_empty()
    }

    /// Verifies and stores a recovered signature.
    ///
    /// Returns `Ok(false)` for a signature that is already known and `Ok(true)` for a new
    /// one, which is also sent to the subscribers.
    pub async fn push_recovered_sig(
        &self,
        recovered_sig: RecoveredSignature,
        sign_height: CoreBlockHeight,
    ) -> SigningResult<bool> {
        if self.cache.read().await.check_known(&recovered_sig)? {
            trace!(id = %recovered_sig.id, "recovered signature already known");
            return Ok(false);
        }

        let valid = self.engine.read().await.verify_recovered_sig(
            recovered_sig.llmq_type,
            sign_height,
            recovered_sig.id,
            recovered_sig.msg_hash,
            recovered_sig.sig,
        );
        if !valid {
            return Err(SigningError::InvalidRecoveredSig {
                llmq_type: recovered_sig.llmq_type,
                id: recovered_sig.id,
            });
        }

        {
            let mut cache = self.cache.write().await;
            // another task may have stored the request while the signature was verified
            if cache.check_known(&recovered_sig)? {
                return Ok(false);
            }
            let key = (recovered_sig.llmq_type, recovered_sig.id);
            cache.by_sign_hash.insert(recovered_sig.sign_id(), key);
            cache.by_id.insert(
                key,
                CachedRecoveredSig {
                    recovered_sig,
                    received_at: Instant::now(),
                },
            );
        }

        debug!(
            llmq_type = %recovered_sig.llmq_type,
            quorum_hash = %recovered_sig.quorum_hash,
            id = %recovered_sig.id,
            "recovered signature accepted"
        );
        // no subscribers is fine
        let _ = self.listeners.send(recovered_sig);
        Ok(true)
    }

    /// Queues a signature for the signing worker.
    pub fn enqueue_recovered_sig(
        &self,
        recovered_sig: RecoveredSignature,
        sign_height: CoreBlockHeight,
    ) -> SigningResult<()> {
        self.pending_tx
            .try_send(PendingRecoveredSig {
                recovered_sig,
                sign_height,
            })
            .map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => {
                    StorageError::QueueFull("recovered signatures", self.pending_capacity).into()
                }
                mpsc::error::TrySendError::Closed(_) => {
                    StorageError::QueueClosed("recovered signatures").into()
                }
            })
    }

    /// Verifies everything queued so far. Returns how many new signatures were accepted.
    pub async fn process_pending(&self) -> usize {
        let batch = {
            let mut pending_rx = self.pending_rx.lock().await;
            let mut batch = Vec::new();
            while let Ok(pending) = pending_rx.try_recv() {
                batch.push(pending);
            }
            batch
        };
        self.process_batch(batch).await
    }

    /// Waits for queued signatures and verifies them.
    pub(crate) async fn process_next_batch(&self) -> usize {
        let batch = {
            let mut pending_rx = self.pending_rx.lock().await;
            let mut batch = Vec::with_capacity(self.pending_capacity);
            pending_rx.recv_many(&mut batch, self.pending_capacity).await;
            batch
        };
        self.process_batch(batch).await
    }

    async fn process_batch(&self, batch: Vec<PendingRecoveredSig>) -> usize {
        if batch.is_empty() {
            return 0;
        }
        let total = batch.len();
        let mut accepted = 0;
        for pending in batch {
            match self.push_recovered_sig(pending.recovered_sig, pending.sign_height).await {
                Ok(true) => accepted += 1,
                Ok(false) => {}
                Err(e) => debug!("dropping queued recovered signature: {}", e),
            }
        }
        debug!("processed {} queued recovered signatures, {} accepted", total, accepted);
        accepted
    }

    /// Forgets signatures older than `max_age`. Returns how many were removed.
    pub async fn cleanup(&self, max_age: Duration) -> usize {
        let now = Instant::now();
        let mut cache = self.cache.write().await;
        let RecoveredSigCache {
            by_id,
            by_sign_hash,
        } = &mut *cache;
        let before = by_id.len();
        by_id.retain(|_, cached| now.duration_since(cached.received_at) <= max_age);
        by_sign_hash.retain(|_, key| by_id.contains_key(key));
        let removed = before - by_id.len();
        if removed > 0 {
            debug!("removed {} expired recovered signatures", removed);
        }
        removed
    }
}
