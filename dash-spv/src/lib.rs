//! Chain lock, InstantSend and recovered signature services on top of the Dash LLMQ engine.
//!
//! The [`dashcore`] engine holds the masternode lists and quorums. This crate shares it
//! between the tasks of a host process and builds the consumers of quorum signatures on it:
//!
//! - [`MasternodeSync`] feeds `mnlistdiff` and `qrinfo` messages into the shared engine;
//! - [`SigningManager`] verifies and caches recovered signatures;
//! - [`ChainLockTracker`] verifies chain locks and enforces the best one;
//! - [`InstantSendTracker`] assembles, verifies and stores InstantSend locks;
//! - [`WorkerHandle`] runs all of them as background tasks.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use async_trait::async_trait;
//! use dash_spv::{
//!     ChainLockTracker, InMemoryChain, InstantSendTracker, LlmqConfig, LlmqServices,
//!     MasternodeSync, SigningManager, SigningRequester, SigningResult, WorkerHandle,
//! };
//! use dashcore::sml::llmq_type::LLMQType;
//! use dashcore::{QuorumSigningRequestId, Sha256dHash};
//!
//! struct Peers;
//!
//! #[async_trait]
//! impl SigningRequester for Peers {
//!     async fn request_signature(
//!         &self,
//!         _llmq_type: LLMQType,
//!         _id: QuorumSigningRequestId,
//!         _msg_hash: Sha256dHash,
//!     ) -> SigningResult<()> {
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = LlmqConfig::testnet();
//!     let sync = MasternodeSync::new(&config)?;
//!     let engine = sync.engine();
//!     let services = LlmqServices {
//!         signing: Arc::new(SigningManager::new(engine.clone(), config.pending_queue_capacity)),
//!         chain_locks: Arc::new(ChainLockTracker::new(
//!             engine.clone(),
//!             Arc::new(InMemoryChain::new()),
//!             config.enforce_chain_locks,
//!             config.max_pending_chain_locks,
//!         )),
//!         instant_send: Arc::new(InstantSendTracker::new(
//!             engine,
//!             Arc::new(Peers),
//!             config.max_pending_instant_locks,
//!         )),
//!     };
//!     let workers = WorkerHandle::spawn(&config, services);
//!
//!     // feed diffs through `sync`, relay peer messages through `workers`
//!
//!     workers.shutdown().await?;
//!     Ok(())
//! }
//! ```

pub mod chainlock;
pub mod config;
pub mod engine;
pub mod error;
pub mod instantsend;
pub mod logging;
pub mod signing;
pub mod workers;

#[cfg(test)]
mod test_utils;

pub use chainlock::{BlockLookup, ChainLockOutcome, ChainLockState, ChainLockTracker, InMemoryChain};
pub use config::{LlmqConfig, SyncMode};
pub use engine::{MasternodeSync, SharedEngine};
pub use error::{
    ConfigError, LoggingError, LoggingResult, SigningError, SigningResult, SpvError, StorageError,
    ValidationError, ValidationResult,
};
pub use instantsend::{InstantLockOutcome, InstantSendConflict, InstantSendTracker, SigningRequester};
pub use logging::{LogFileConfig, LoggingConfig, LoggingGuard, init_console_logging, init_logging};
pub use signing::{PendingRecoveredSig, SigningManager};
pub use workers::{LlmqServices, WorkerHandle};

// Re-export the engine crate
pub use dashcore;
pub use tracing::level_filters::LevelFilter;
