use crate::network::Network;
use crate::sml::llmq_type::LLMQType;

/// Quorum types each network uses for its signing duties.
pub trait NetworkLLMQExt {
    /// Quorum type signing classic (non deterministic) InstantSend locks.
    fn is_llmq_type(&self) -> LLMQType;
    /// Quorum type signing deterministic InstantSend locks.
    fn isd_llmq_type(&self) -> LLMQType;
    fn chain_locks_type(&self) -> LLMQType;
    fn platform_type(&self) -> LLMQType;

    /// Every quorum type a client on this network has to track.
    fn enabled_llmq_types(&self) -> Vec<LLMQType> {
        let mut types = vec![
            self.is_llmq_type(),
            self.isd_llmq_type(),
            self.chain_locks_type(),
            self.platform_type(),
        ];
        types.sort();
        types.dedup();
        types
    }
}

impl NetworkLLMQExt for Network {
    fn is_llmq_type(&self) -> LLMQType {
        match self {
            Network::Dash | Network::Testnet => LLMQType::Llmqtype50_60,
            Network::Devnet => LLMQType::LlmqtypeDevnet,
            Network::Regtest => LLMQType::LlmqtypeTestInstantSend,
        }
    }

    fn isd_llmq_type(&self) -> LLMQType {
        match self {
            Network::Dash | Network::Testnet => LLMQType::Llmqtype60_75,
            Network::Devnet => LLMQType::LlmqtypeDevnetDIP0024,
            Network::Regtest => LLMQType::LlmqtypeTestDIP0024,
        }
    }

    fn chain_locks_type(&self) -> LLMQType {
        match self {
            Network::Dash => LLMQType::Llmqtype400_60,
            Network::Testnet => LLMQType::Llmqtype50_60,
            Network::Devnet => LLMQType::LlmqtypeDevnet,
            Network::Regtest => LLMQType::LlmqtypeTest,
        }
    }

    fn platform_type(&self) -> LLMQType {
        match self {
            Network::Dash => LLMQType::Llmqtype100_67,
            Network::Testnet => LLMQType::Llmqtype25_67,
            Network::Devnet => LLMQType::LlmqtypeDevnet,
            Network::Regtest => LLMQType::LlmqtypeTest,
        }
    }
}
