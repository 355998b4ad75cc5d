//! chain-client: Abstraction over the EVM chain the orchestrator talks to
//!
//! The orchestrator never signs or broadcasts itself. It hands a
//! [`ContractCall`] to a [`ChainClient`], which simulates it, asks the wallet
//! for a signature, broadcasts, and later reports the receipt. Production
//! wires this to a wallet provider; tests use [`mock::MockChain`].

pub mod calls;

#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use usdec_core::{Address, BlockNumber, ChainError, TokenAmount, TxHash};

pub use calls::{methods, read_amount};

/// Result type for chain client operations
pub type Result<T> = std::result::Result<T, ChainError>;

/// Argument of a contract call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum CallArg {
    Address(Address),
    Uint(TokenAmount),
}

impl fmt::Display for CallArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Address(addr) => write!(f, "{}", addr),
            Self::Uint(amount) => write!(f, "{}", amount),
        }
    }
}

/// A contract method invocation: `contract.method(args...)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractCall {
    pub contract: Address,
    pub method: String,
    pub args: Vec<CallArg>,
}

impl ContractCall {
    pub fn new(contract: Address, method: impl Into<String>, args: Vec<CallArg>) -> Self {
        Self {
            contract,
            method: method.into(),
            args,
        }
    }

    /// Argument at `index` as an address, if it is one
    pub fn address_arg(&self, index: usize) -> Option<&Address> {
        match self.args.get(index) {
            Some(CallArg::Address(addr)) => Some(addr),
            _ => None,
        }
    }

    /// Argument at `index` as an amount, if it is one
    pub fn uint_arg(&self, index: usize) -> Option<&TokenAmount> {
        match self.args.get(index) {
            Some(CallArg::Uint(amount)) => Some(amount),
            _ => None,
        }
    }
}

impl fmt::Display for ContractCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let args: Vec<String> = self.args.iter().map(|a| a.to_string()).collect();
        write!(f, "{}.{}({})", self.contract, self.method, args.join(", "))
    }
}

/// Value returned by a read call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum CallValue {
    Uint(TokenAmount),
    Bool(bool),
    Address(Address),
}

/// Final status of a mined transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReceiptStatus {
    Success,
    Reverted,
}

/// Receipt for a mined transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxReceipt {
    pub hash: TxHash,
    pub status: ReceiptStatus,
    pub block_number: BlockNumber,
}

impl TxReceipt {
    pub fn is_success(&self) -> bool {
        self.status == ReceiptStatus::Success
    }
}

/// Read/write access to the chain on behalf of the connected wallet.
///
/// Error contract:
/// - `simulate` reports a would-revert call as [`ChainError::Simulation`].
/// - `write` reports a declined signature as [`ChainError::UserRejected`] and a
///   broadcast failure as [`ChainError::Submission`].
/// - `wait_for_receipt` has no timeout; a transaction evicted from the
///   mempool is [`ChainError::Dropped`].
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Execute a view call
    async fn read(&self, call: &ContractCall) -> Result<CallValue>;

    /// Dry-run a state-changing call as `from` without signing it
    async fn simulate(&self, from: &Address, call: &ContractCall) -> Result<()>;

    /// Request a signature from `from` and broadcast; returns once the hash is known
    async fn write(&self, from: &Address, call: &ContractCall) -> Result<TxHash>;

    /// Wait until `hash` is included in a block
    async fn wait_for_receipt(&self, hash: &TxHash) -> Result<TxReceipt>;
}
