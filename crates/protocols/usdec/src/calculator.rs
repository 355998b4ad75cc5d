//! USDEC Fee & Eligibility Calculations
//!
//! Pure functions: fee split of a gross deposit and the mint eligibility gate.
//! Assessment always returns the full breakdown, even when minting is
//! blocked, so the caller can show why.

use serde::{Deserialize, Serialize};
use usdec_core::constants::BPS_DENOMINATOR;
use usdec_core::{AppConfig, ChainId, ConfigError, Ineligibility, TokenAmount};

use crate::amount::AmountBounds;

/// Split of a gross deposit into protocol fee and vault deposit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeBreakdown {
    pub gross: TokenAmount,
    pub fee_bps: u32,
    pub fee: TokenAmount,
    pub net: TokenAmount,
}

impl FeeBreakdown {
    /// `fee = gross * fee_bps / 10000` (truncating), `net = gross - fee`
    pub fn compute(gross: &TokenAmount, fee_bps: u32) -> Self {
        let fee = gross.mul_bps(fee_bps.min(BPS_DENOMINATOR));
        let net = gross.saturating_sub(&fee);
        Self {
            gross: gross.clone(),
            fee_bps,
            fee,
            net,
        }
    }

    /// e.g. `Fee: 0.11 USDC • Vault: 10.89 USDC`
    pub fn summary(&self, decimals: u8) -> String {
        format!(
            "Fee: {} USDC • Vault: {} USDC",
            self.fee.to_fixed(decimals, 2),
            self.net.to_fixed(decimals, 2)
        )
    }
}

/// Resolved mint parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintParams {
    pub min_input: TokenAmount,
    pub max_input: TokenAmount,
    pub fee_bps: u32,
    pub vault_minimum: TokenAmount,
    pub decimals: u8,
    pub expected_chain: ChainId,
}

impl MintParams {
    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            min_input: config.limits.min_units()?,
            max_input: config.limits.max_units()?,
            fee_bps: config.limits.fee_bps,
            vault_minimum: config.limits.vault_minimum_units()?,
            decimals: config.limits.decimals,
            expected_chain: config.chain.chain_id,
        })
    }

    /// Validator bounds for the mint input
    pub fn bounds(&self) -> AmountBounds {
        AmountBounds::new(
            self.min_input.clone(),
            Some(self.max_input.clone()),
            self.decimals,
        )
    }
}

/// Wallet facts sampled at the moment of assessment
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalletContext {
    pub connected: bool,
    pub chain_id: Option<ChainId>,
    pub allowlisted: bool,
}

/// Individual gate results; all must hold to mint
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibilityGate {
    pub wallet_connected: bool,
    pub correct_chain: bool,
    pub allowlisted: bool,
    pub amount_in_range: bool,
    pub net_above_vault_minimum: bool,
}

impl EligibilityGate {
    pub fn is_eligible(&self) -> bool {
        self.wallet_connected
            && self.correct_chain
            && self.allowlisted
            && self.amount_in_range
            && self.net_above_vault_minimum
    }
}

/// Result of assessing a gross mint amount
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintAssessment {
    pub breakdown: FeeBreakdown,
    pub gate: EligibilityGate,
    /// One entry per failing gate, in gate order
    pub blocking: Vec<Ineligibility>,
}

impl MintAssessment {
    pub fn is_eligible(&self) -> bool {
        self.gate.is_eligible()
    }

    /// First reason minting is blocked
    pub fn first_blocker(&self) -> Option<&Ineligibility> {
        self.blocking.first()
    }
}

/// Compute the fee split and evaluate every gate.
///
/// Never short-circuits: a failing gate still yields a full breakdown.
pub fn assess_mint(
    gross: &TokenAmount,
    params: &MintParams,
    wallet: &WalletContext,
) -> MintAssessment {
    let breakdown = FeeBreakdown::compute(gross, params.fee_bps);

    let correct_chain = wallet.chain_id == Some(params.expected_chain);
    let amount_in_range = *gross >= params.min_input && *gross <= params.max_input;
    let gate = EligibilityGate {
        wallet_connected: wallet.connected,
        correct_chain,
        allowlisted: wallet.allowlisted,
        amount_in_range,
        net_above_vault_minimum: breakdown.net >= params.vault_minimum,
    };

    let mut blocking = Vec::new();
    if !gate.wallet_connected {
        blocking.push(Ineligibility::WalletNotConnected);
    }
    if !gate.correct_chain {
        if let Some(actual) = wallet.chain_id {
            blocking.push(Ineligibility::WrongChain {
                expected: params.expected_chain,
                actual,
            });
        } else if gate.wallet_connected {
            blocking.push(Ineligibility::WalletNotConnected);
        }
    }
    if !gate.allowlisted {
        blocking.push(Ineligibility::NotAllowlisted);
    }
    if !gate.amount_in_range {
        blocking.push(Ineligibility::AmountOutOfRange {
            min: params.min_input.to_decimal_string(params.decimals),
            max: params.max_input.to_decimal_string(params.decimals),
        });
    }
    if !gate.net_above_vault_minimum {
        blocking.push(Ineligibility::BelowVaultMinimum {
            net: breakdown.net.to_decimal_string(params.decimals),
            minimum: params.vault_minimum.to_decimal_string(params.decimals),
        });
    }

    MintAssessment {
        breakdown,
        gate,
        blocking,
    }
}
