//! Configuration of the LLMQ services.

use std::time::Duration;

use dashcore::Network;
use dashcore::sml::masternode_list_engine::{MasternodeListCachePolicy, MasternodeListEngine};

/// How much masternode list history the engine keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// Only what quorum rotation needs, plus the latest list.
    Minimal,
    /// A window of recent lists on top of what rotation needs.
    Full,
}

impl SyncMode {
    pub fn cache_policy(&self) -> MasternodeListCachePolicy {
        match self {
            SyncMode::Minimal => MasternodeListCachePolicy::minimal(),
            SyncMode::Full => MasternodeListCachePolicy::full(),
        }
    }
}

/// Configuration of the masternode list engine and the services built on it.
#[derive(Debug, Clone)]
pub struct LlmqConfig {
    /// Network the quorums belong to.
    pub network: Network,

    /// Size of the masternode list cache.
    pub sync_mode: SyncMode,

    /// Whether to verify quorum commitments while applying diffs.
    pub verify_quorums: bool,

    /// Whether quorum verification also checks the recovered threshold signature.
    pub verify_threshold_signatures: bool,

    /// Whether every diff must advance the list by exactly one block.
    ///
    /// Bootstrapping from a checkpoint applies diffs that skip blocks and needs this off.
    pub strict_height_check: bool,

    /// Whether enforced chain locks reject conflicting reorgs.
    pub enforce_chain_locks: bool,

    /// How long recovered signatures and InstantSend locks are kept.
    pub max_recovered_sig_age: Duration,

    /// Interval of the cleanup worker.
    pub cleanup_interval: Duration,

    /// Capacity of the channels feeding the workers.
    pub pending_queue_capacity: usize,

    /// InstantSend locks waiting for the quorum data to verify them.
    pub max_pending_instant_locks: usize,

    /// Chain locks waiting for the masternode list to verify them.
    pub max_pending_chain_locks: usize,
}

impl Default for LlmqConfig {
    fn default() -> Self {
        Self {
            network: Network::Dash,
            sync_mode: SyncMode::Full,
            verify_quorums: true,
            verify_threshold_signatures: true,
            strict_height_check: true,
            enforce_chain_locks: true,
            max_recovered_sig_age: Duration::from_secs(60 * 60 * 24 * 7),
            cleanup_interval: Duration::from_secs(5),
            pending_queue_capacity: 1000,
            max_pending_instant_locks: 1000,
            max_pending_chain_locks: 100,
        }
    }
}

impl LlmqConfig {
    /// Create a new configuration for the given network.
    pub fn new(network: Network) -> Self {
        Self {
            network,
            ..Self::default()
        }
    }

    /// Create a configuration for mainnet.
    pub fn mainnet() -> Self {
        Self::new(Network::Dash)
    }

    /// Create a configuration for testnet.
    pub fn testnet() -> Self {
        Self::new(Network::Testnet)
    }

    /// Create a configuration for regtest.
    pub fn regtest() -> Self {
        Self::new(Network::Regtest)
    }

    pub fn with_sync_mode(mut self, sync_mode: SyncMode) -> Self {
        self.sync_mode = sync_mode;
        self
    }

    pub fn with_verify_quorums(mut self, verify: bool) -> Self {
        self.verify_quorums = verify;
        self
    }

    pub fn with_verify_threshold_signatures(mut self, verify: bool) -> Self {
        self.verify_threshold_signatures = verify;
        self
    }

    pub fn with_strict_height_check(mut self, strict: bool) -> Self {
        self.strict_height_check = strict;
        self
    }

    pub fn with_enforce_chain_locks(mut self, enforce: bool) -> Self {
        self.enforce_chain_locks = enforce;
        self
    }

    pub fn with_max_recovered_sig_age(mut self, age: Duration) -> Self {
        self.max_recovered_sig_age = age;
        self
    }

    pub fn with_cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval = interval;
        self
    }

    pub fn with_pending_queue_capacity(mut self, capacity: usize) -> Self {
        self.pending_queue_capacity = capacity;
        self
    }

    pub fn with_max_pending_instant_locks(mut self, max: usize) -> Self {
        self.max_pending_instant_locks = max;
        self
    }

    pub fn with_max_pending_chain_locks(mut self, max: usize) -> Self {
        self.max_pending_chain_locks = max;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.pending_queue_capacity == 0 {
            return Err("pending_queue_capacity must be > 0".to_string());
        }
        if self.cleanup_interval.is_zero() {
            return Err("cleanup_interval must be > 0".to_string());
        }
        if self.max_recovered_sig_age < self.cleanup_interval {
            return Err("max_recovered_sig_age must not be shorter than cleanup_interval".to_string());
        }
        if self.max_pending_chain_locks == 0 {
            return Err("max_pending_chain_locks must be > 0".to_string());
        }
        if self.max_pending_instant_locks == 0 {
            return Err("max_pending_instant_locks must be > 0".to_string());
        }
        Ok(())
    }

    /// An empty engine set up for this configuration.
    pub fn masternode_list_engine(&self) -> MasternodeListEngine {
        MasternodeListEngine::new(self.network)
            .with_cache_policy(self.sync_mode.cache_policy())
            .with_strict_height_check(self.strict_height_check)
            .with_threshold_signature_verification(self.verify_threshold_signatures)
    }
}
