//! Failure taxonomy of the orchestration engine.

use ethers::types::H256;
use thiserror::Error;

use crate::tokens::short_hash;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("Failed to initialize provider for chain {chain_id} after {attempts} attempts: {reason}")]
    ProviderInit {
        chain_id: u64,
        attempts: u32,
        reason: String,
    },

    #[error("Invalid wallet address: {address}")]
    InvalidAddress { address: String },

    #[error("Process stopped")]
    Cancelled,

    #[error("RPC call {operation} failed: {message}")]
    Provider { operation: String, message: String },

    #[error("Invalid amount '{amount}': {reason}")]
    InvalidAmount { amount: String, reason: String },

    #[error("Nonce conflict, cached nonce reset: {message}")]
    NonceConflict { message: String },

    #[error("Insufficient balance for {symbol}: {available} < {required}")]
    InsufficientBalance {
        symbol: String,
        available: String,
        required: String,
    },

    #[error("Invalid quote response: {reason}")]
    InvalidQuote { reason: String },

    #[error("Insufficient ETH for gas + value: {available} < {required}")]
    InsufficientGas { available: String, required: String },

    #[error("Transaction submission failed: {message}")]
    Submission { message: String },

    #[error("Transaction reverted: {}", short_hash(.hash))]
    Reverted { hash: H256 },

    #[error("Transaction confirmation timed out after {timeout_secs}s: {}", short_hash(.hash))]
    ConfirmationTimeout { hash: H256, timeout_secs: u64 },

    #[error("Approve transaction reverted for {symbol}: {}", short_hash(.hash))]
    ApprovalReverted { symbol: String, hash: H256 },
}

impl EngineError {
    pub fn provider(operation: &str, err: impl std::fmt::Display) -> Self {
        EngineError::Provider {
            operation: operation.to_string(),
            message: err.to_string(),
        }
    }

    /// Local gates that fail before anything is signed. Never retried automatically.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            EngineError::InsufficientBalance { .. }
                | EngineError::InvalidQuote { .. }
                | EngineError::InsufficientGas { .. }
                | EngineError::InvalidAmount { .. }
        )
    }
}
