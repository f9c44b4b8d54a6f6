//! Error types for the LLMQ services.

use std::io;

use dashcore::sml::error::SmlError;
use dashcore::sml::llmq_type::LLMQType;
use dashcore::sml::message_verification_error::MessageVerificationError;
use dashcore::{BlockHash, OutPoint, QuorumSigningRequestId, Txid};
use thiserror::Error;

/// Main error type for the LLMQ services.
#[derive(Debug, Error)]
pub enum SpvError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Logging error: {0}")]
    Logging(#[from] LoggingError),

    #[error("Signing error: {0}")]
    Signing(#[from] SigningError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Masternode list engine error: {0}")]
    Engine(#[from] SmlError),

    #[error("Worker task failed: {0}")]
    Worker(String),
}

/// Logging-related errors.
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Failed to create log directory: {0}")]
    DirectoryCreation(#[from] io::Error),

    #[error("Failed to initialize tracing subscriber: {0}")]
    SubscriberInit(String),

    #[error("Failed to rotate log file: {0}")]
    RotationFailed(String),
}

/// Errors of the bounded queues and caches kept by the services.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("Queue {0} is full (capacity {1})")]
    QueueFull(&'static str, usize),

    #[error("Queue {0} is closed")]
    QueueClosed(&'static str),
}

/// Validation-related errors.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Invalid ChainLock: {0}")]
    InvalidChainLock(String),

    #[error("Conflicting ChainLock at height {height}: existing {existing} vs new {new}")]
    ConflictingChainLock {
        height: u32,
        existing: BlockHash,
        new: BlockHash,
    },

    #[error("ChainLock for block {new} at height {height} forks away from the enforced lock on {enforced}")]
    ChainLockForked {
        height: u32,
        enforced: BlockHash,
        new: BlockHash,
    },

    #[error("Invalid InstantLock: {0}")]
    InvalidInstantLock(String),

    #[error("Recovered signature for input {0} does not sign transaction {1}")]
    InputSignatureMismatch(OutPoint, Txid),

    #[error("Message verification failed: {0}")]
    MessageVerification(#[from] MessageVerificationError),
}

/// Errors of the recovered signature cache.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SigningError {
    #[error("Recovered signature for request {id} of type {llmq_type} conflicts with a known one")]
    ConflictingRecoveredSig {
        llmq_type: LLMQType,
        id: QuorumSigningRequestId,
    },

    #[error("Recovered signature for request {id} of type {llmq_type} is not valid")]
    InvalidRecoveredSig {
        llmq_type: LLMQType,
        id: QuorumSigningRequestId,
    },

    #[error("Signing request failed: {0}")]
    RequestFailed(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Configuration errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Type alias for Result with SpvError.
pub type Result<T> = std::result::Result<T, SpvError>;

/// Type alias for validation operation results.
pub type ValidationResult<T> = std::result::Result<T, ValidationError>;

/// Type alias for storage operation results.
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Type alias for signing operation results.
pub type SigningResult<T> = std::result::Result<T, SigningError>;

/// Type alias for logging operation results.
pub type LoggingResult<T> = std::result::Result<T, LoggingError>;

impl SpvError {
    /// Returns a static string naming the error category.
    pub fn category(&self) -> &'static str {
        match self {
            SpvError::Validation(_) => "validation",
            SpvError::Storage(_) => "storage",
            SpvError::Logging(_) => "logging",
            SpvError::Signing(_) => "signing",
            SpvError::Config(_) => "config",
            SpvError::Engine(_) => "engine",
            SpvError::Worker(_) => "worker",
        }
    }
}
