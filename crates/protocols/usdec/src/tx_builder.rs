//! USDEC Transaction Building
//!
//! Builds the approve, mint and redeem contract calls, plus the view calls
//! the flows read. Pre-submission checks live here too: nothing leaves this
//! module as a [`PreparedTx`] unless the local gates passed.

use chain_client::{methods, CallArg, ContractCall};
use serde::{Deserialize, Serialize};
use usdec_core::{Address, ChainError, Ineligibility, ProtocolError, TokenAmount};

use crate::calculator::MintAssessment;
use crate::constants::ContractAddresses;
use crate::policy::{RedeemContext, RedeemPolicy};

/// Kind of state-changing transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxKind {
    Approve,
    Mint,
    Redeem,
}

impl TxKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Mint => "mint",
            Self::Redeem => "redeem",
        }
    }

    /// Capitalized label for notifications
    pub fn label(&self) -> &'static str {
        match self {
            Self::Approve => "Approve",
            Self::Mint => "Mint",
            Self::Redeem => "Redeem",
        }
    }
}

impl std::fmt::Display for TxKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated call ready to hand to the chain client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreparedTx {
    pub kind: TxKind,
    pub call: ContractCall,
    /// Amount bound to this transaction
    pub amount: TokenAmount,
}

/// `usdc.approve(usdec, amount)`
pub fn approve_call(contracts: &ContractAddresses, amount: &TokenAmount) -> ContractCall {
    ContractCall::new(
        contracts.usdc.clone(),
        methods::APPROVE,
        vec![
            CallArg::Address(contracts.usdec.clone()),
            CallArg::Uint(amount.clone()),
        ],
    )
}

/// `usdec.mint(gross)`; the token contract takes the fee itself
pub fn mint_call(contracts: &ContractAddresses, gross: &TokenAmount) -> ContractCall {
    ContractCall::new(
        contracts.usdec.clone(),
        methods::MINT,
        vec![CallArg::Uint(gross.clone())],
    )
}

/// `usdec.redeem(amount)`
pub fn redeem_call(contracts: &ContractAddresses, amount: &TokenAmount) -> ContractCall {
    ContractCall::new(
        contracts.usdec.clone(),
        methods::REDEEM,
        vec![CallArg::Uint(amount.clone())],
    )
}

/// `token.balanceOf(owner)`
pub fn balance_call(token: &Address, owner: &Address) -> ContractCall {
    ContractCall::new(
        token.clone(),
        methods::BALANCE_OF,
        vec![CallArg::Address(owner.clone())],
    )
}

/// `vault.previewDeposit(net)`
pub fn preview_call(contracts: &ContractAddresses, net: &TokenAmount) -> ContractCall {
    ContractCall::new(
        contracts.vault.clone(),
        methods::PREVIEW_DEPOSIT,
        vec![CallArg::Uint(net.clone())],
    )
}

/// Fail with the first blocking gate, if any
pub fn validate_mint(assessment: &MintAssessment) -> Result<(), ProtocolError> {
    match assessment.first_blocker() {
        Some(cause) => Err(cause.clone().into()),
        None => Ok(()),
    }
}

/// Interpret a vault preview read.
///
/// A failed read and a zero-share result are different causes.
pub fn check_preview(
    preview: Result<TokenAmount, ChainError>,
) -> Result<TokenAmount, Ineligibility> {
    match preview {
        Ok(shares) if shares.is_zero() => Err(Ineligibility::ZeroPreviewShares),
        Ok(shares) => Ok(shares),
        Err(e) => {
            tracing::warn!(error = %e, "Vault preview unavailable");
            Err(Ineligibility::VaultUnavailable)
        }
    }
}

/// Build an approval for exactly `amount`
pub fn build_approve(contracts: &ContractAddresses, amount: &TokenAmount) -> PreparedTx {
    PreparedTx {
        kind: TxKind::Approve,
        call: approve_call(contracts, amount),
        amount: amount.clone(),
    }
}

/// Build the mint for an assessed gross amount
pub fn build_mint(
    contracts: &ContractAddresses,
    assessment: &MintAssessment,
) -> Result<PreparedTx, ProtocolError> {
    validate_mint(assessment)?;
    let gross = &assessment.breakdown.gross;
    Ok(PreparedTx {
        kind: TxKind::Mint,
        call: mint_call(contracts, gross),
        amount: gross.clone(),
    })
}

/// Check a redeem against the balance and the injected policy
pub fn validate_redeem(
    ctx: &RedeemContext,
    policy: &dyn RedeemPolicy,
    decimals: u8,
) -> Result<(), ProtocolError> {
    if ctx.amount.is_zero() {
        return Err(ProtocolError::PolicyViolation {
            reason: "amount must be greater than zero".to_string(),
        });
    }
    if let Some(balance) = &ctx.balance {
        if ctx.amount > *balance {
            return Err(ProtocolError::InsufficientBalance {
                token: "USDEC".to_string(),
                required: ctx.amount.to_decimal_string(decimals),
                available: balance.to_decimal_string(decimals),
            });
        }
    }
    policy.check(ctx)
}

/// Build a redeem after [`validate_redeem`]
pub fn build_redeem(
    contracts: &ContractAddresses,
    ctx: &RedeemContext,
    policy: &dyn RedeemPolicy,
    decimals: u8,
) -> Result<PreparedTx, ProtocolError> {
    validate_redeem(ctx, policy, decimals)?;
    Ok(PreparedTx {
        kind: TxKind::Redeem,
        call: redeem_call(contracts, &ctx.amount),
        amount: ctx.amount.clone(),
    })
}
