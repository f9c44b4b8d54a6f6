//! Chain lock tracking.
//!
//! A chain lock is a quorum signature over a block at a given height. Once the locked
//! block is known locally the lock is enforced: no reorg may disconnect it, and any fork
//! that disagrees with it below its height is rejected. Conflicts are reported to the
//! host, never resolved here.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use dashcore::prelude::CoreBlockHeight;
use dashcore::sml::message_verification_error::MessageVerificationError;
use dashcore::{BlockHash, ChainLock};
use indexmap::IndexMap;
use tokio::sync::{RwLock, broadcast};
use tracing::{debug, error, info, warn};

use crate::engine::SharedEngine;
use crate::error::{ValidationError, ValidationResult};

/// Enforced chain locks kept for reorg checks.
const MAX_ENFORCED_HISTORY: usize = 1000;

/// Capacity of the enforcement notification channel.
const LISTENER_CAPACITY: usize = 64;

/// Read access to the host's block chain.
#[async_trait]
pub trait BlockLookup: Send + Sync {
    /// Height of `block_hash` if the block is known.
    async fn height_of(&self, block_hash: &BlockHash) -> Option<CoreBlockHeight>;

    /// The ancestor of `block_hash` at `height`, the block itself included.
    async fn ancestor_at(&self, block_hash: &BlockHash, height: CoreBlockHeight) -> Option<BlockHash>;
}

/// A block tree held in memory.
#[derive(Debug, Default)]
pub struct InMemoryChain {
    blocks: RwLock<HashMap<BlockHash, (CoreBlockHeight, BlockHash)>>,
}

impl InMemoryChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `block_hash` at `height` on top of `prev_block_hash`.
    pub async fn add_block(&self, block_hash: BlockHash, prev_block_hash: BlockHash, height: CoreBlockHeight) {
        self.blocks.write().await.insert(block_hash, (height, prev_block_hash));
    }
}

#[async_trait]
impl BlockLookup for InMemoryChain {
    async fn height_of(&self, block_hash: &BlockHash) -> Option<CoreBlockHeight> {
        self.blocks.read().await.get(block_hash).map(|(height, _)| *height)
    }

    async fn ancestor_at(&self, block_hash: &BlockHash, height: CoreBlockHeight) -> Option<BlockHash> {
        let blocks = self.blocks.read().await;
        let mut current = *block_hash;
        loop {
            let (current_height, prev) = blocks.get(&current)?;
            if *current_height == height {
                return Some(current);
            }
            if *current_height < height {
                return None;
            }
            current = *prev;
        }
    }
}

/// Progress of the best chain lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainLockState {
    /// No chain lock seen yet.
    Idle,
    /// The best chain lock is verified but its block is not known yet.
    HaveSignatureNoBlock,
    /// The best chain lock's block is known and the lock is enforced.
    Enforced,
}

/// What [`ChainLockTracker::process_chain_lock`] did with a lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainLockOutcome {
    /// The lock is the new best lock and its block is known.
    Enforced,
    /// The lock is the new best lock, enforcement waits for its block.
    AwaitingBlock,
    /// The lock can not be verified yet and was queued.
    Queued,
    /// The lock is already known or older than the best lock.
    Ignored,
}

#[derive(Debug, Default)]
struct TrackerState {
    best_chain_lock: Option<ChainLock>,
    enforced: Option<ChainLock>,
    /// Every enforced lock by height.
    enforced_history: IndexMap<CoreBlockHeight, ChainLock>,
    pending: VecDeque<ChainLock>,
}

/// Verifies chain locks and enforces the best one.
pub struct ChainLockTracker<B: BlockLookup> {
    engine: SharedEngine,
    chain: Arc<B>,
    state: RwLock<TrackerState>,
    enforce_chain_locks: bool,
    max_pending: usize,
    listeners: broadcast::Sender<ChainLock>,
}

/// Decides `chain_lock` against the best lock. `None` means it is higher and worth verifying.
fn compare_with_best(
    best: Option<ChainLock>,
    chain_lock: &ChainLock,
) -> ValidationResult<Option<ChainLockOutcome>> {
    let Some(best) = best else {
        return Ok(None);
    };
    if chain_lock.block_height > best.block_height {
        return Ok(None);
    }
    if chain_lock.block_height == best.block_height && chain_lock.block_hash != best.block_hash {
        error!(
            "Conflicting ChainLock at height {}: existing {} vs new {}",
            chain_lock.block_height, best.block_hash, chain_lock.block_hash
        );
        return Err(ValidationError::ConflictingChainLock {
            height: chain_lock.block_height,
            existing: best.block_hash,
            new: chain_lock.block_hash,
        });
    }
    Ok(Some(ChainLockOutcome::Ignored))
}

/// Errors that only mean the engine has not synced far enough yet.
fn is_retryable(error: &MessageVerificationError) -> bool {
    matches!(
        error,
        MessageVerificationError::NoMasternodeLists
            | MessageVerificationError::NoMasternodeListAtHeight(_)
            | MessageVerificationError::NoQuorumsOfType(..)
    )
}

impl<B: BlockLookup> ChainLockTracker<B> {
    pub fn new(engine: SharedEngine, chain: Arc<B>, enforce_chain_locks: bool, max_pending: usize) -> Self {
        let (listeners, _) = broadcast::channel(LISTENER_CAPACITY);
        ChainLockTracker {
            engine,
            chain,
            state: RwLock::new(TrackerState::default()),
            enforce_chain_locks,
            max_pending: max_pending.max(1),
            listeners,
        }
    }

    /// Receives every chain lock that gets enforced from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<ChainLock> {
        self.listeners.subscribe()
    }

    pub async fn state(&self) -> ChainLockState {
        let state = self.state.read().await;
        match (&state.best_chain_lock, &state.enforced) {
            (None, _) => ChainLockState::Idle,
            (Some(best), Some(enforced)) if best == enforced => ChainLockState::Enforced,
            (Some(_), _) => ChainLockState::HaveSignatureNoBlock,
        }
    }

    /// The highest verified chain lock, enforced or not.
    pub async fn best_chain_lock(&self) -> Option<ChainLock> {
        self.state.read().await.best_chain_lock
    }

    /// The highest chain lock whose block is known.
    pub async fn enforced_chain_lock(&self) -> Option<ChainLock> {
        self.state.read().await.enforced
    }

    pub async fn pending_count(&self) -> usize {
        self.state.read().await.pending.len()
    }

    /// Verifies a chain lock and makes it the best lock if it is higher than the current one.
    ///
    /// A lock for another block at the height of the best lock, or one whose block forks
    /// away from the enforced lock, is an error. Locks that can not be verified before the
    /// engine knows the quorums of their height are queued.
    pub async fn process_chain_lock(&self, chain_lock: ChainLock) -> ValidationResult<ChainLockOutcome> {
        if let Some(outcome) = self.check_against_best(&chain_lock).await? {
            return Ok(outcome);
        }

        let verification = self.engine.read().await.verify_chain_lock(&chain_lock);
        match verification {
            Ok(()) => {}
            Err(e) if is_retryable(&e) => {
                self.queue_pending(chain_lock).await;
                return Ok(ChainLockOutcome::Queued);
            }
            Err(e) => {
                warn!("Rejecting ChainLock at height {}: {}", chain_lock.block_height, e);
                return Err(ValidationError::InvalidChainLock(e.to_string()));
            }
        }

        let block_height = self.chain.height_of(&chain_lock.block_hash).await;
        if block_height.is_some_and(|height| height != chain_lock.block_height) {
            return Err(ValidationError::InvalidChainLock(format!(
                "block {} is not at height {}",
                chain_lock.block_hash, chain_lock.block_height
            )));
        }
        if block_height.is_some() {
            self.check_extends_enforced(&chain_lock).await?;
        }

        {
            let mut state = self.state.write().await;
            // another lock may have been accepted meanwhile
            if let Some(outcome) = compare_with_best(state.best_chain_lock, &chain_lock)? {
                return Ok(outcome);
            }
            state.best_chain_lock = Some(chain_lock);
        }
        info!("Accepted ChainLock for height {} hash {}", chain_lock.block_height, chain_lock.block_hash);

        if block_height.is_some() && self.enforce(chain_lock).await {
            Ok(ChainLockOutcome::Enforced)
        } else {
            debug!("Waiting for block {} to enforce its ChainLock", chain_lock.block_hash);
            Ok(ChainLockOutcome::AwaitingBlock)
        }
    }

    async fn check_against_best(&self, chain_lock: &ChainLock) -> ValidationResult<Option<ChainLockOutcome>> {
        let best = self.state.read().await.best_chain_lock;
        compare_with_best(best, chain_lock)
    }

    /// Errors when the block of `chain_lock` does not descend from the enforced block.
    async fn check_extends_enforced(&self, chain_lock: &ChainLock) -> ValidationResult<()> {
        let Some(enforced) = self.state.read().await.enforced else {
            return Ok(());
        };
        let ancestor = self.chain.ancestor_at(&chain_lock.block_hash, enforced.block_height).await;
        if ancestor.is_some_and(|ancestor| ancestor != enforced.block_hash) {
            error!(
                "ChainLock for {} at height {} forks away from the enforced lock on {}",
                chain_lock.block_hash, chain_lock.block_height, enforced.block_hash
            );
            return Err(ValidationError::ChainLockForked {
                height: chain_lock.block_height,
                enforced: enforced.block_hash,
                new: chain_lock.block_hash,
            });
        }
        Ok(())
    }

    /// Enforces `chain_lock` if it is still the best lock. Returns whether it was enforced.
    async fn enforce(&self, chain_lock: ChainLock) -> bool {
        {
            let mut state = self.state.write().await;
            if state.best_chain_lock != Some(chain_lock) || state.enforced == Some(chain_lock) {
                return false;
            }
            state.enforced = Some(chain_lock);
            state.enforced_history.insert(chain_lock.block_height, chain_lock);
            if state.enforced_history.len() > MAX_ENFORCED_HISTORY {
                state.enforced_history.shift_remove_index(0);
            }
        }
        info!("Enforcing ChainLock for height {} hash {}", chain_lock.block_height, chain_lock.block_hash);
        let _ = self.listeners.send(chain_lock);
        true
    }

    /// Tells the tracker a block was connected. Enforces the best lock if it locks this block.
    ///
    /// A best lock whose block turns out to fork away from the enforced lock is dropped and
    /// the enforced lock becomes the best one again.
    pub async fn on_block_connected(&self, block_hash: BlockHash, height: CoreBlockHeight) -> bool {
        let best = self.state.read().await.best_chain_lock;
        let Some(best) = best.filter(|best| best.block_hash == block_hash && best.block_height == height) else {
            return false;
        };
        if let Err(e) = self.check_extends_enforced(&best).await {
            warn!("Dropping ChainLock at height {}: {}", best.block_height, e);
            let mut state = self.state.write().await;
            if state.best_chain_lock == Some(best) {
                state.best_chain_lock = state.enforced;
            }
            return false;
        }
        self.enforce(best).await
    }

    /// Whether the block `block_hash` at `height` disagrees with the enforced lock.
    ///
    /// Only blocks at or below the enforced height can conflict.
    pub async fn has_conflicting_chain_lock(&self, height: CoreBlockHeight, block_hash: BlockHash) -> bool {
        if !self.enforce_chain_locks {
            return false;
        }
        let Some(enforced) = self.state.read().await.enforced else {
            return false;
        };
        if height > enforced.block_height {
            return false;
        }
        match self.chain.ancestor_at(&enforced.block_hash, height).await {
            Some(ancestor) => ancestor != block_hash,
            None => {
                warn!("No ancestor of enforced block {} at height {}", enforced.block_hash, height);
                false
            }
        }
    }

    /// Whether the block `block_hash` at `height` is covered by the enforced lock.
    pub async fn is_block_chain_locked(&self, block_hash: BlockHash, height: CoreBlockHeight) -> bool {
        let Some(enforced) = self.state.read().await.enforced else {
            return false;
        };
        if height > enforced.block_height {
            return false;
        }
        if height == enforced.block_height {
            return block_hash == enforced.block_hash;
        }
        self.chain.ancestor_at(&enforced.block_hash, height).await == Some(block_hash)
    }

    /// Whether disconnecting the blocks from `reorg_from_height` to `reorg_to_height` would
    /// undo a chain locked block.
    pub async fn would_violate_chain_lock(
        &self,
        reorg_from_height: CoreBlockHeight,
        reorg_to_height: CoreBlockHeight,
    ) -> bool {
        if !self.enforce_chain_locks {
            return false;
        }
        let state = self.state.read().await;
        if state.enforced.is_some_and(|enforced| enforced.block_height >= reorg_from_height) {
            debug!("Reorg from height {} would undo the enforced ChainLock", reorg_from_height);
            return true;
        }
        state
            .enforced_history
            .keys()
            .any(|height| (reorg_from_height..=reorg_to_height).contains(height))
    }

    async fn queue_pending(&self, chain_lock: ChainLock) {
        let mut state = self.state.write().await;
        if state.pending.contains(&chain_lock) {
            return;
        }
        if state.pending.len() >= self.max_pending {
            if let Some(dropped) = state.pending.pop_front() {
                warn!(
                    "Pending ChainLocks queue at capacity ({}), dropping oldest ChainLock at height {}",
                    self.max_pending, dropped.block_height
                );
            }
        }
        state.pending.push_back(chain_lock);
        debug!("Queued ChainLock for pending validation, total pending: {}", state.pending.len());
    }

    /// Retries the queued chain locks. Returns how many became the best lock.
    pub async fn process_pending(&self) -> usize {
        let pending = std::mem::take(&mut self.state.write().await.pending);
        if pending.is_empty() {
            return 0;
        }
        let total = pending.len();
        let mut accepted = 0;
        // ascending height so that every lock gets a chance to become the best one
        let mut pending: Vec<_> = pending.into_iter().collect();
        pending.sort_by_key(|chain_lock| chain_lock.block_height);
        for chain_lock in pending {
            match self.process_chain_lock(chain_lock).await {
                Ok(ChainLockOutcome::Enforced | ChainLockOutcome::AwaitingBlock) => accepted += 1,
                Ok(_) => {}
                Err(e) => {
                    error!("Failed to validate pending ChainLock at height {}: {}", chain_lock.block_height, e)
                }
            }
        }
        debug!("Pending ChainLock validation complete: {} of {} accepted", accepted, total);
        accepted
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use dashcore::Network;
    use dashcore::hashes::Hash;
    use dashcore::sml::masternode_list_engine::MasternodeListEngine;

    use super::*;
    use crate::test_utils::{QuorumFixture, block};

    /// A chain `0..=tip` of `block(h)` hashes.
    async fn linear_chain(tip: CoreBlockHeight) -> Arc<InMemoryChain> {
        let chain = InMemoryChain::new();
        for height in 1..=tip {
            chain.add_block(block(height), block(height - 1), height).await;
        }
        Arc::new(chain)
    }

    fn fork_block(height: CoreBlockHeight) -> BlockHash {
        let mut bytes = [0xcc; 32];
        bytes[..4].copy_from_slice(&height.to_le_bytes());
        BlockHash::from_byte_array(bytes)
    }

    fn tracker(chain: Arc<InMemoryChain>) -> (ChainLockTracker<InMemoryChain>, QuorumFixture) {
        let fixture = QuorumFixture::regtest(20);
        let engine = Arc::new(RwLock::new(fixture.engine.clone()));
        (ChainLockTracker::new(engine, chain, true, 4), fixture)
    }

    #[tokio::test]
    async fn in_memory_chain_walks_ancestors() {
        let chain = linear_chain(10).await;
        chain.add_block(fork_block(8), block(7), 8).await;
        assert_eq!(chain.height_of(&block(10)).await, Some(10));
        assert_eq!(chain.ancestor_at(&block(10), 4).await, Some(block(4)));
        assert_eq!(chain.ancestor_at(&fork_block(8), 7).await, Some(block(7)));
        assert_eq!(chain.ancestor_at(&block(5), 6).await, None);
    }

    #[tokio::test]
    async fn lock_on_a_known_block_is_enforced() {
        let (tracker, fixture) = tracker(linear_chain(60).await);
        let mut listener = tracker.subscribe();
        assert_eq!(tracker.state().await, ChainLockState::Idle);

        let chain_lock = fixture.chain_lock(50, block(50));
        assert_eq!(tracker.process_chain_lock(chain_lock).await.expect("valid"), ChainLockOutcome::Enforced);
        assert_eq!(tracker.state().await, ChainLockState::Enforced);
        assert_eq!(tracker.best_chain_lock().await, Some(chain_lock));
        assert_eq!(listener.recv().await.expect("notification"), chain_lock);

        assert!(tracker.is_block_chain_locked(block(50), 50).await);
        assert!(tracker.is_block_chain_locked(block(30), 30).await);
        assert!(!tracker.is_block_chain_locked(block(55), 55).await);
        assert!(!tracker.has_conflicting_chain_lock(40, block(40)).await);
        assert!(tracker.has_conflicting_chain_lock(40, fork_block(40)).await);

        // the same lock again, and an older one, change nothing
        assert_eq!(tracker.process_chain_lock(chain_lock).await.expect("known"), ChainLockOutcome::Ignored);
        let older = fixture.chain_lock(45, block(45));
        assert_eq!(tracker.process_chain_lock(older).await.expect("older"), ChainLockOutcome::Ignored);
    }

    #[tokio::test]
    async fn lock_waits_for_its_block() {
        let chain = linear_chain(40).await;
        let (tracker, fixture) = tracker(chain.clone());
        let chain_lock = fixture.chain_lock(42, block(42));

        assert_eq!(tracker.process_chain_lock(chain_lock).await.expect("valid"), ChainLockOutcome::AwaitingBlock);
        assert_eq!(tracker.state().await, ChainLockState::HaveSignatureNoBlock);
        assert_eq!(tracker.enforced_chain_lock().await, None);

        assert!(!tracker.on_block_connected(block(41), 41).await);
        chain.add_block(block(41), block(40), 41).await;
        chain.add_block(block(42), block(41), 42).await;
        assert!(tracker.on_block_connected(block(42), 42).await);
        assert_eq!(tracker.state().await, ChainLockState::Enforced);
        assert!(!tracker.on_block_connected(block(42), 42).await);
    }

    #[tokio::test]
    async fn conflicting_locks_are_rejected() {
        let (tracker, fixture) = tracker(linear_chain(60).await);
        tracker.process_chain_lock(fixture.chain_lock(50, block(50))).await.expect("valid");

        let same_height = fixture.chain_lock(50, fork_block(50));
        assert_matches!(
            tracker.process_chain_lock(same_height).await,
            Err(ValidationError::ConflictingChainLock { height: 50, .. })
        );
    }

    #[tokio::test]
    async fn higher_lock_on_a_fork_is_rejected() {
        let chain = linear_chain(60).await;
        chain.add_block(fork_block(49), block(48), 49).await;
        chain.add_block(fork_block(50), fork_block(49), 50).await;
        chain.add_block(fork_block(51), fork_block(50), 51).await;
        let (tracker, fixture) = tracker(chain);
        tracker.process_chain_lock(fixture.chain_lock(50, block(50))).await.expect("valid");

        assert_matches!(
            tracker.process_chain_lock(fixture.chain_lock(51, fork_block(51))).await,
            Err(ValidationError::ChainLockForked { height: 51, .. })
        );
        assert_eq!(tracker.best_chain_lock().await.map(|cl| cl.block_height), Some(50));
    }

    #[tokio::test]
    async fn awaited_lock_on_a_fork_is_dropped_when_its_block_connects() {
        let chain = linear_chain(60).await;
        let (tracker, fixture) = tracker(chain.clone());
        let enforced = fixture.chain_lock(50, block(50));
        tracker.process_chain_lock(enforced).await.expect("valid");

        let fork_lock = fixture.chain_lock(62, fork_block(62));
        assert_eq!(tracker.process_chain_lock(fork_lock).await.expect("valid"), ChainLockOutcome::AwaitingBlock);
        assert_eq!(tracker.state().await, ChainLockState::HaveSignatureNoBlock);

        chain.add_block(fork_block(49), block(48), 49).await;
        for height in 50..=62 {
            chain.add_block(fork_block(height), fork_block(height - 1), height).await;
        }
        assert!(!tracker.on_block_connected(fork_block(62), 62).await);
        assert_eq!(tracker.enforced_chain_lock().await, Some(enforced));
        assert_eq!(tracker.best_chain_lock().await, Some(enforced));
        assert_eq!(tracker.state().await, ChainLockState::Enforced);
        assert!(!tracker.is_block_chain_locked(fork_block(62), 62).await);
    }

    #[test]
    fn same_height_lock_conflicts_with_the_best_one() {
        let fixture = QuorumFixture::regtest(20);
        let best = fixture.chain_lock(50, block(50));
        let other = fixture.chain_lock(50, fork_block(50));
        assert_matches!(
            compare_with_best(Some(best), &other),
            Err(ValidationError::ConflictingChainLock { height: 50, existing, new })
                if existing == block(50) && new == fork_block(50)
        );
        assert_matches!(compare_with_best(Some(best), &best), Ok(Some(ChainLockOutcome::Ignored)));
        let higher = fixture.chain_lock(51, block(51));
        assert_matches!(compare_with_best(Some(best), &higher), Ok(None));
        assert_matches!(compare_with_best(None, &other), Ok(None));
    }

    #[tokio::test]
    async fn bad_signatures_are_rejected() {
        let (tracker, fixture) = tracker(linear_chain(60).await);
        let mut chain_lock = fixture.chain_lock(50, block(50));
        chain_lock.signature = fixture.chain_lock(51, block(51)).signature;
        assert_matches!(tracker.process_chain_lock(chain_lock).await, Err(ValidationError::InvalidChainLock(_)));
        assert_eq!(tracker.state().await, ChainLockState::Idle);
    }

    #[tokio::test]
    async fn unverifiable_locks_are_queued_and_retried() {
        let chain = linear_chain(60).await;
        let fixture = QuorumFixture::regtest(20);
        let engine = Arc::new(RwLock::new(MasternodeListEngine::new(Network::Regtest)));
        let tracker = ChainLockTracker::new(engine.clone(), chain, true, 2);

        let locks: Vec<_> = [48, 49, 50].into_iter().map(|h| fixture.chain_lock(h, block(h))).collect();
        for chain_lock in &locks {
            assert_eq!(tracker.process_chain_lock(*chain_lock).await.expect("queued"), ChainLockOutcome::Queued);
        }
        // the oldest one was dropped
        assert_eq!(tracker.pending_count().await, 2);

        *engine.write().await = fixture.engine.clone();
        assert_eq!(tracker.process_pending().await, 2);
        assert_eq!(tracker.pending_count().await, 0);
        assert_eq!(tracker.enforced_chain_lock().await, Some(locks[2]));
    }

    #[tokio::test]
    async fn reorgs_below_an_enforced_lock_are_violations() {
        let (tracker, fixture) = tracker(linear_chain(60).await);
        assert!(!tracker.would_violate_chain_lock(30, 60).await);
        tracker.process_chain_lock(fixture.chain_lock(50, block(50))).await.expect("valid");

        assert!(tracker.would_violate_chain_lock(45, 55).await);
        assert!(tracker.would_violate_chain_lock(50, 50).await);
        assert!(!tracker.would_violate_chain_lock(51, 60).await);
    }

    #[tokio::test]
    async fn enforcement_can_be_disabled() {
        let fixture = QuorumFixture::regtest(20);
        let engine = Arc::new(RwLock::new(fixture.engine.clone()));
        let tracker = ChainLockTracker::new(engine, linear_chain(60).await, false, 4);
        tracker.process_chain_lock(fixture.chain_lock(50, block(50))).await.expect("valid");

        assert!(!tracker.would_violate_chain_lock(45, 55).await);
        assert!(!tracker.has_conflicting_chain_lock(40, fork_block(40)).await);
        assert!(tracker.is_block_chain_locked(block(50), 50).await);
    }
}
