//! Background workers of the LLMQ services.
//!
//! One task per subsystem, each fed by a bounded channel:
//! - the signing worker verifies queued recovered signatures;
//! - the chain lock worker processes relayed chain locks;
//! - the InstantSend worker processes relayed locks and the signatures accepted by the
//!   signing manager;
//! - the cleanup worker expires old signatures and locks and retries pending work on a
//!   fixed interval.
//!
//! All of them stop when [`WorkerHandle::shutdown`] flips the stop signal.

use std::sync::Arc;

use dashcore::prelude::CoreBlockHeight;
use dashcore::{ChainLock, InstantLock, RecoveredSignature};
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::chainlock::{BlockLookup, ChainLockTracker};
use crate::config::LlmqConfig;
use crate::error::{Result, SpvError, StorageError};
use crate::instantsend::{InstantSendTracker, SigningRequester};
use crate::signing::SigningManager;

/// The services driven by the workers.
pub struct LlmqServices<B: BlockLookup, R: SigningRequester> {
    pub signing: Arc<SigningManager>,
    pub chain_locks: Arc<ChainLockTracker<B>>,
    pub instant_send: Arc<InstantSendTracker<R>>,
}

impl<B: BlockLookup, R: SigningRequester> Clone for LlmqServices<B, R> {
    fn clone(&self) -> Self {
        LlmqServices {
            signing: self.signing.clone(),
            chain_locks: self.chain_locks.clone(),
            instant_send: self.instant_send.clone(),
        }
    }
}

/// Feeds and stops the running workers.
pub struct WorkerHandle {
    stop: watch::Sender<bool>,
    chain_lock_tx: mpsc::Sender<ChainLock>,
    instant_lock_tx: mpsc::Sender<InstantLock>,
    signing: Arc<SigningManager>,
    capacity: usize,
    tasks: Vec<(&'static str, JoinHandle<()>)>,
}

impl WorkerHandle {
    /// Spawns the workers on the current tokio runtime.
    pub fn spawn<B, R>(config: &LlmqConfig, services: LlmqServices<B, R>) -> Self
    where
        B: BlockLookup + 'static,
        R: SigningRequester + 'static,
    {
        let capacity = config.pending_queue_capacity.max(1);
        let (stop, stop_rx) = watch::channel(false);
        let (chain_lock_tx, chain_lock_rx) = mpsc::channel(capacity);
        let (instant_lock_tx, instant_lock_rx) = mpsc::channel(capacity);
        let recovered_sigs = services.signing.subscribe();

        let tasks = vec![
            ("signing", tokio::spawn(signing_worker(services.signing.clone(), stop_rx.clone()))),
            (
                "chain locks",
                tokio::spawn(chain_lock_worker(services.chain_locks.clone(), chain_lock_rx, stop_rx.clone())),
            ),
            (
                "instant send",
                tokio::spawn(instant_send_worker(
                    services.instant_send.clone(),
                    instant_lock_rx,
                    recovered_sigs,
                    stop_rx.clone(),
                )),
            ),
            ("cleanup", tokio::spawn(cleanup_worker(config.clone(), services.clone(), stop_rx))),
        ];
        info!("Started {} LLMQ workers", tasks.len());

        WorkerHandle {
            stop,
            chain_lock_tx,
            instant_lock_tx,
            signing: services.signing,
            capacity,
            tasks,
        }
    }

    /// Queues a chain lock relayed by a peer.
    pub fn submit_chain_lock(&self, chain_lock: ChainLock) -> Result<()> {
        self.chain_lock_tx.try_send(chain_lock).map_err(|e| queue_error("chain locks", self.capacity, e))
    }

    /// Queues an InstantSend lock relayed by a peer.
    pub fn submit_instant_lock(&self, instant_lock: InstantLock) -> Result<()> {
        self.instant_lock_tx
            .try_send(instant_lock)
            .map_err(|e| queue_error("instant send locks", self.capacity, e))
    }

    /// Queues a recovered signature relayed by a peer.
    pub fn submit_recovered_sig(&self, recovered_sig: RecoveredSignature, sign_height: CoreBlockHeight) -> Result<()> {
        Ok(self.signing.enqueue_recovered_sig(recovered_sig, sign_height)?)
    }

    /// Stops every worker and waits for them to finish.
    pub async fn shutdown(self) -> Result<()> {
        // every receiver may be gone already
        let _ = self.stop.send(true);
        let mut failed = Vec::new();
        for (name, task) in self.tasks {
            if let Err(e) = task.await {
                warn!("LLMQ worker {} failed: {}", name, e);
                failed.push(format!("{name}: {e}"));
            }
        }
        if !failed.is_empty() {
            return Err(SpvError::Worker(failed.join(", ")));
        }
        info!("LLMQ workers stopped");
        Ok(())
    }
}

fn queue_error<T>(queue: &'static str, capacity: usize, error: mpsc::error::TrySendError<T>) -> SpvError {
    match error {
        mpsc::error::TrySendError::Full(_) => StorageError::QueueFull(queue, capacity).into(),
        mpsc::error::TrySendError::Closed(_) => StorageError::QueueClosed(queue).into(),
    }
}

async fn signing_worker(signing: Arc<SigningManager>, mut stop: watch::Receiver<bool>) {
    loop {
        tokio::select! {
            _ = stop.changed() => break,
            accepted = signing.process_next_batch() => {
                if accepted > 0 {
                    debug!("signing worker accepted {} recovered signatures", accepted);
                }
            }
        }
    }
    debug!("signing worker stopped");
}

async fn chain_lock_worker<B: BlockLookup>(
    chain_locks: Arc<ChainLockTracker<B>>,
    mut chain_lock_rx: mpsc::Receiver<ChainLock>,
    mut stop: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            _ = stop.changed() => break,
            received = chain_lock_rx.recv() => {
                let Some(chain_lock) = received else { break };
                if let Err(e) = chain_locks.process_chain_lock(chain_lock).await {
                    warn!("ChainLock at height {} rejected: {}", chain_lock.block_height, e);
                }
            }
        }
    }
    debug!("chain lock worker stopped");
}

async fn instant_send_worker<R: SigningRequester>(
    instant_send: Arc<InstantSendTracker<R>>,
    mut instant_lock_rx: mpsc::Receiver<InstantLock>,
    mut recovered_sigs: broadcast::Receiver<RecoveredSignature>,
    mut stop: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            _ = stop.changed() => break,
            received = instant_lock_rx.recv() => {
                let Some(instant_lock) = received else { break };
                let txid = instant_lock.txid;
                if let Err(e) = instant_send.on_instant_lock(instant_lock).await {
                    warn!("InstantSend lock for {} rejected: {}", txid, e);
                }
            }
            received = recovered_sigs.recv() => match received {
                Ok(recovered_sig) => {
                    if let Err(e) = instant_send.on_recovered_sig(&recovered_sig).await {
                        warn!("recovered signature {} not usable for InstantSend: {}", recovered_sig.id, e);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("InstantSend worker lagging, skipped {} recovered signatures", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }
    debug!("instant send worker stopped");
}

async fn cleanup_worker<B: BlockLookup, R: SigningRequester>(
    config: LlmqConfig,
    services: LlmqServices<B, R>,
    mut stop: watch::Receiver<bool>,
) {
    let mut interval = tokio::time::interval(config.cleanup_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = stop.changed() => break,
            _ = interval.tick() => {
                services.signing.cleanup(config.max_recovered_sig_age).await;
                services.instant_send.prune(config.max_recovered_sig_age).await;
                services.chain_locks.process_pending().await;
                services.instant_send.process_pending_locks().await;
            }
        }
    }
    debug!("cleanup worker stopped");
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use dashcore::hashes::Hash;
    use dashcore::sml::llmq_type::LLMQType;
    use dashcore::sml::llmq_type::network::NetworkLLMQExt;
    use dashcore::{Network, QuorumSigningRequestId, Sha256dHash};
    use tokio::sync::RwLock;

    use super::*;
    use crate::chainlock::InMemoryChain;
    use crate::error::SigningResult;
    use crate::test_utils::{QuorumFixture, block};

    struct NoopRequester;

    #[async_trait]
    impl SigningRequester for NoopRequester {
        async fn request_signature(&self, _: LLMQType, _: QuorumSigningRequestId, _: Sha256dHash) -> SigningResult<()> {
            Ok(())
        }
    }

    async fn services(fixture: &QuorumFixture) -> LlmqServices<InMemoryChain, NoopRequester> {
        let engine = Arc::new(RwLock::new(fixture.engine.clone()));
        let chain = InMemoryChain::new();
        for height in 1..=60 {
            chain.add_block(block(height), block(height - 1), height).await;
        }
        LlmqServices {
            signing: Arc::new(SigningManager::new(engine.clone(), 16)),
            chain_locks: Arc::new(ChainLockTracker::new(engine.clone(), Arc::new(chain), true, 16)),
            instant_send: Arc::new(InstantSendTracker::new(engine, Arc::new(NoopRequester), 16)),
        }
    }

    /// Lets the workers run until `done` holds.
    async fn wait_for<F, Fut>(mut done: F)
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = bool>,
    {
        for _ in 0..200 {
            if done().await {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("workers did not get there in time");
    }

    #[tokio::test]
    async fn submitted_messages_reach_the_services() {
        let fixture = QuorumFixture::regtest(20);
        let services = services(&fixture).await;
        let handle = WorkerHandle::spawn(&LlmqConfig::regtest(), services.clone());

        let chain_lock = fixture.chain_lock(50, block(50));
        handle.submit_chain_lock(chain_lock).expect("queued");
        let chain_locks = services.chain_locks.clone();
        wait_for(|| {
            let chain_locks = chain_locks.clone();
            async move { chain_locks.enforced_chain_lock().await == Some(chain_lock) }
        })
        .await;

        let llmq_type = Network::Regtest.chain_locks_type();
        let id = QuorumSigningRequestId::from_byte_array([3; 32]);
        let recovered_sig = fixture.recovered_sig(llmq_type, 40, id, Sha256dHash::from_byte_array([4; 32]));
        handle.submit_recovered_sig(recovered_sig, 40).expect("queued");
        let signing = services.signing.clone();
        wait_for(|| {
            let signing = signing.clone();
            async move { signing.has_recovered_sig_for_id(llmq_type, id).await }
        })
        .await;

        handle.shutdown().await.expect("clean shutdown");
    }

    #[tokio::test]
    async fn submitting_after_shutdown_fails() {
        let fixture = QuorumFixture::regtest(20);
        let services = services(&fixture).await;
        let handle = WorkerHandle::spawn(&LlmqConfig::regtest(), services);
        let chain_lock_tx = handle.chain_lock_tx.clone();
        handle.shutdown().await.expect("clean shutdown");

        assert_matches!(chain_lock_tx.try_send(fixture.chain_lock(50, block(50))), Err(mpsc::error::TrySendError::Closed(_)));
    }
}
