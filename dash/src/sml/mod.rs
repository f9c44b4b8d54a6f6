//! Simplified masternode lists and the quorums they carry.
//!
//! [`masternode_list::MasternodeList`] is an immutable snapshot built by applying
//! [`MnListDiff`](crate::network::message_sml::MnListDiff)s.
//! [`masternode_list_engine::MasternodeListEngine`] keeps the snapshots a client needs,
//! validates quorum commitments against their committees and verifies the chain locks,
//! instant send locks and recovered signatures those quorums produce.

pub mod address;
pub mod error;
pub mod llmq_entry_verification;
pub mod llmq_type;
pub mod masternode_list;
pub mod masternode_list_engine;
pub mod masternode_list_entry;
pub mod message_verification_error;
pub mod quorum_entry;
pub mod quorum_validation_error;
