//! Shared access to the masternode list engine.
//!
//! Diffs and quorum rotation info arrive from peer tasks while the signing manager and the
//! lock trackers read the engine concurrently. Writers hold the lock only for the duration
//! of one synchronous engine call.

use std::sync::Arc;

use dashcore::network::message_qrinfo::QRInfo;
use dashcore::network::message_sml::MnListDiff;
use dashcore::prelude::CoreBlockHeight;
use dashcore::sml::masternode_list_engine::MasternodeListEngine;
use dashcore::BlockHash;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::config::LlmqConfig;
use crate::error::{ConfigError, Result};

/// The engine as shared between the services.
pub type SharedEngine = Arc<RwLock<MasternodeListEngine>>;

/// Feeds masternode list data received from peers into the shared engine.
#[derive(Debug, Clone)]
pub struct MasternodeSync {
    engine: SharedEngine,
    verify_quorums: bool,
}

impl MasternodeSync {
    /// An empty engine set up from a validated `config`.
    pub fn new(config: &LlmqConfig) -> Result<Self> {
        config.validate().map_err(ConfigError::Invalid)?;
        Ok(Self::with_engine(config.masternode_list_engine(), config.verify_quorums))
    }

    /// Wraps an engine restored by the host, for example from a checkpoint.
    pub fn with_engine(engine: MasternodeListEngine, verify_quorums: bool) -> Self {
        MasternodeSync {
            engine: Arc::new(RwLock::new(engine)),
            verify_quorums,
        }
    }

    pub fn engine(&self) -> SharedEngine {
        self.engine.clone()
    }

    /// Applies a `mnlistdiff`. Rejected diffs are logged with the recovery they ask for.
    pub async fn apply_diff(&self, diff: &MnListDiff) -> Result<()> {
        let result = self.engine.write().await.apply_diff(diff, self.verify_quorums);
        match result {
            Ok(()) => {
                debug!(block_hash = %diff.block_hash, "masternode list diff applied");
                Ok(())
            }
            Err(e) => {
                warn!(
                    block_hash = %diff.block_hash,
                    base_block_hash = %diff.base_block_hash,
                    recovery = ?e.recovery_flags(),
                    "masternode list diff rejected: {}",
                    e
                );
                Err(e.into())
            }
        }
    }

    /// Feeds a `qrinfo` message. Heights of unknown commitment blocks are resolved through
    /// `fetch_block_height`.
    pub async fn feed_qr_info<FH>(&self, qr_info: QRInfo, fetch_block_height: Option<FH>) -> Result<()>
    where
        FH: Fn(&BlockHash) -> Option<CoreBlockHeight>,
    {
        let result =
            self.engine.write().await.feed_qr_info(qr_info, self.verify_quorums, fetch_block_height);
        if let Err(e) = &result {
            warn!(recovery = ?e.recovery_flags(), "quorum rotation info rejected: {}", e);
        }
        Ok(result?)
    }

    pub async fn feed_block_height(&self, height: CoreBlockHeight, block_hash: BlockHash) {
        self.engine.write().await.feed_block_height(height, block_hash);
    }

    /// Height of the newest masternode list.
    pub async fn tip_height(&self) -> Option<CoreBlockHeight> {
        self.engine.read().await.latest_masternode_list().map(|list| list.known_height)
    }
}

#[cfg(test)]
mod tests {
    use dashcore::Network;

    use super::*;
    use crate::config::SyncMode;
    use crate::error::SpvError;
    use crate::test_utils::block;

    #[tokio::test]
    async fn config_reaches_the_shared_engine() {
        let config = LlmqConfig::testnet().with_sync_mode(SyncMode::Minimal).with_strict_height_check(false);
        let sync = MasternodeSync::new(&config).expect("valid config");
        let engine = sync.engine();
        {
            let engine = engine.read().await;
            assert_eq!(engine.network, Network::Testnet);
            assert!(!engine.strict_height_check);
        }
        assert_eq!(sync.tip_height().await, None);

        sync.feed_block_height(12, block(12)).await;
        assert_eq!(engine.read().await.block_heights.get(&block(12)), Some(&12));
    }

    #[test]
    fn invalid_config_is_refused() {
        let config = LlmqConfig::regtest().with_pending_queue_capacity(0);
        assert!(matches!(MasternodeSync::new(&config), Err(SpvError::Config(ConfigError::Invalid(_)))));
    }
}
