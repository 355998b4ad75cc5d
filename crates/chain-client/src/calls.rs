//! Typed read helpers over [`ChainClient::read`]

use usdec_core::{ChainError, TokenAmount};

use crate::{CallValue, ChainClient, ContractCall, Result};

/// Contract method names used by the USDEC flows
pub mod methods {
    pub const BALANCE_OF: &str = "balanceOf";
    pub const ALLOWANCE: &str = "allowance";
    pub const APPROVE: &str = "approve";
    pub const PREVIEW_DEPOSIT: &str = "previewDeposit";
    pub const MINT: &str = "mint";
    pub const REDEEM: &str = "redeem";
}

/// Read a uint256-returning view call as a [`TokenAmount`]
pub async fn read_amount(client: &dyn ChainClient, call: &ContractCall) -> Result<TokenAmount> {
    match client.read(call).await? {
        CallValue::Uint(amount) => Ok(amount),
        other => {
            tracing::warn!(call = %call, value = ?other, "Read returned a non-uint value");
            Err(ChainError::UnexpectedValue {
                method: call.method.clone(),
                message: format!("expected uint, got {:?}", other),
            })
        }
    }
}
