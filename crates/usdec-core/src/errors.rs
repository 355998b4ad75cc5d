//! Error types for USDEC

use thiserror::Error;

use crate::types::{ChainId, TxHash};

/// Core errors that can occur in the USDEC workspace
#[derive(Debug, Error)]
pub enum Error {
    #[error("Chain error: {0}")]
    Chain(#[from] ChainError),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// How an error should be presented and recovered from.
///
/// Local classes (`Input`, `Ineligible`) never reach the chain client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Malformed or out-of-range amount, surfaced inline
    Input,
    /// Structural gate failure (chain, allowlist, vault minimum, preview)
    Ineligible,
    /// Chain client refused the call before signing
    Simulation,
    /// User declined in the wallet
    SignatureRejected,
    /// Transaction broadcast failed, reverted, or was dropped
    Submission,
}

/// Parse errors for the primitive newtypes
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypeError {
    #[error("Invalid address: {address}")]
    InvalidAddress { address: String },

    #[error("Invalid transaction hash: {hash}")]
    InvalidTxHash { hash: String },

    #[error("Invalid raw token units: {value}")]
    InvalidUnits { value: String },
}

/// User-typed amount rejected by the validator
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
    #[error("Enter an amount")]
    Empty,

    #[error("Invalid amount: {input}")]
    Malformed { input: String },

    #[error("Amount cannot be negative: {input}")]
    Negative { input: String },

    #[error("At most {max} decimal places allowed: {input}")]
    TooManyDecimals { input: String, max: u8 },

    #[error("Amount must be at least {min}")]
    BelowMinimum { min: String },

    #[error("Amount must be at most {max}")]
    AboveMaximum { max: String },
}

/// Reasons a mint or redeem is structurally blocked.
///
/// Each variant has its own message so the user can tell causes apart.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Ineligibility {
    #[error("Connect a wallet to continue")]
    WalletNotConnected,

    #[error("Switch to the expected network (chain {expected}, connected to {actual})")]
    WrongChain { expected: ChainId, actual: ChainId },

    #[error("Not allow-listed")]
    NotAllowlisted,

    #[error("Amount must be between {min} and {max}")]
    AmountOutOfRange { min: String, max: String },

    #[error("Vault deposit {net} is below the vault minimum {minimum}")]
    BelowVaultMinimum { net: String, minimum: String },

    #[error("Deposit too small to mint any shares; try a larger amount.")]
    ZeroPreviewShares,

    #[error("Vault unavailable, try again later.")]
    VaultUnavailable,
}

/// Chain client errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    #[error("User rejected the request: {reason}")]
    UserRejected { reason: String },

    #[error("Simulation failed: {reason}")]
    Simulation { reason: String },

    #[error("Transaction submission failed: {reason}")]
    Submission { reason: String },

    #[error("Transaction {hash} was dropped")]
    Dropped { hash: TxHash },

    #[error("Chain client unreachable: {reason}")]
    Transport { reason: String },

    #[error("Unexpected return value from {method}: {message}")]
    UnexpectedValue { method: String, message: String },
}

impl ChainError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::UserRejected { .. } => ErrorClass::SignatureRejected,
            Self::Simulation { .. } => ErrorClass::Simulation,
            Self::Submission { .. }
            | Self::Dropped { .. }
            | Self::Transport { .. }
            | Self::UnexpectedValue { .. } => ErrorClass::Submission,
        }
    }
}

/// Protocol-level validation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error(transparent)]
    InvalidAmount(#[from] AmountError),

    #[error(transparent)]
    Ineligible(#[from] Ineligibility),

    #[error("Insufficient {token} balance: need {required}, have {available}")]
    InsufficientBalance {
        token: String,
        required: String,
        available: String,
    },

    #[error("Redeem not allowed: {reason}")]
    PolicyViolation { reason: String },

    #[error("Protocol state unavailable: {reason}")]
    StateUnavailable { reason: String },
}

impl ProtocolError {
    /// Stable machine-readable error code
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidAmount(_) => "invalid_amount",
            Self::Ineligible(Ineligibility::WalletNotConnected) => "wallet_not_connected",
            Self::Ineligible(Ineligibility::WrongChain { .. }) => "wrong_chain",
            Self::Ineligible(Ineligibility::NotAllowlisted) => "not_allowlisted",
            Self::Ineligible(Ineligibility::AmountOutOfRange { .. }) => "amount_out_of_range",
            Self::Ineligible(Ineligibility::BelowVaultMinimum { .. }) => "below_vault_minimum",
            Self::Ineligible(Ineligibility::ZeroPreviewShares) => "zero_preview_shares",
            Self::Ineligible(Ineligibility::VaultUnavailable) => "vault_unavailable",
            Self::InsufficientBalance { .. } => "insufficient_balance",
            Self::PolicyViolation { .. } => "policy_violation",
            Self::StateUnavailable { .. } => "state_unavailable",
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            Self::InvalidAmount(_) => ErrorClass::Input,
            Self::Ineligible(_)
            | Self::InsufficientBalance { .. }
            | Self::PolicyViolation { .. }
            | Self::StateUnavailable { .. } => ErrorClass::Ineligible,
        }
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Result type alias for USDEC operations
pub type Result<T> = std::result::Result<T, Error>;
