//! Chain lock enforcement against competing forks, driven through the workers.

mod common;

use common::{Quorums, block, fork_block, main_chain, wait_for};
use dash_spv::{ChainLockOutcome, ChainLockState, LlmqConfig, ValidationError, WorkerHandle};

const FORK: u8 = 0xcc;

#[tokio::test]
async fn blocks_off_the_enforced_chain_conflict() {
    let quorums = Quorums::regtest(20);
    let chain = main_chain(60).await;
    // a fork leaving the main chain after block 30
    chain.add_block(fork_block(FORK, 31), block(30), 31).await;
    for height in 32..=45 {
        chain.add_block(fork_block(FORK, height), fork_block(FORK, height - 1), height).await;
    }
    let (services, _) = quorums.services(chain);
    let chain_locks = services.chain_locks.clone();
    let workers = WorkerHandle::spawn(&LlmqConfig::regtest(), services);

    let chain_lock = quorums.chain_lock(50, block(50));
    workers.submit_chain_lock(chain_lock).expect("queued");
    wait_for("the chain lock to be enforced", || {
        let chain_locks = chain_locks.clone();
        async move { chain_locks.state().await == ChainLockState::Enforced }
    })
    .await;
    assert_eq!(chain_locks.enforced_chain_lock().await, Some(chain_lock));

    assert!(chain_locks.has_conflicting_chain_lock(40, fork_block(FORK, 40)).await);
    assert!(chain_locks.has_conflicting_chain_lock(31, fork_block(FORK, 31)).await);
    assert!(!chain_locks.has_conflicting_chain_lock(40, block(40)).await);
    assert!(!chain_locks.has_conflicting_chain_lock(30, block(30)).await);
    // nothing above the lock can conflict with it
    assert!(!chain_locks.has_conflicting_chain_lock(55, fork_block(FORK, 55)).await);

    assert!(chain_locks.is_block_chain_locked(block(40), 40).await);
    assert!(!chain_locks.is_block_chain_locked(fork_block(FORK, 40), 40).await);
    assert!(chain_locks.would_violate_chain_lock(31, 60).await);

    workers.shutdown().await.expect("clean shutdown");
}

#[tokio::test]
async fn locks_on_a_competing_fork_are_refused() {
    let quorums = Quorums::regtest(20);
    let chain = main_chain(60).await;
    chain.add_block(fork_block(FORK, 49), block(48), 49).await;
    for height in 50..=55 {
        chain.add_block(fork_block(FORK, height), fork_block(FORK, height - 1), height).await;
    }
    let (services, _) = quorums.services(chain);
    let chain_locks = services.chain_locks;

    let outcome = chain_locks.process_chain_lock(quorums.chain_lock(50, block(50))).await.expect("valid");
    assert_eq!(outcome, ChainLockOutcome::Enforced);

    let same_height = chain_locks.process_chain_lock(quorums.chain_lock(50, fork_block(FORK, 50))).await;
    assert!(matches!(same_height, Err(ValidationError::ConflictingChainLock { height: 50, .. })));

    let higher = chain_locks.process_chain_lock(quorums.chain_lock(55, fork_block(FORK, 55))).await;
    assert!(matches!(higher, Err(ValidationError::ChainLockForked { height: 55, .. })));

    // the main chain keeps advancing
    let next = quorums.chain_lock(58, block(58));
    assert_eq!(chain_locks.process_chain_lock(next).await.expect("valid"), ChainLockOutcome::Enforced);
    assert_eq!(chain_locks.best_chain_lock().await, Some(next));
    assert!(chain_locks.has_conflicting_chain_lock(52, fork_block(FORK, 52)).await);
}
