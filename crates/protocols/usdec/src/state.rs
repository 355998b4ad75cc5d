//! USDEC mint preview
//!
//! Serializable view of an assessed mint for callers that render it.

use serde::{Deserialize, Serialize};
use usdec_core::{Ineligibility, TokenAmount};

use crate::calculator::{EligibilityGate, MintAssessment};
use crate::fetch::ReadState;

/// Fee split, gate results and vault preview for one gross amount
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintPreview {
    // Amounts
    pub gross: TokenAmount,
    pub fee: TokenAmount,
    pub net: TokenAmount,
    pub fee_bps: u32,

    // Eligibility
    pub gate: EligibilityGate,
    pub can_mint: bool,
    pub blocked_by: Vec<String>,

    // Vault
    pub preview_shares: Option<ReadState<TokenAmount>>,

    /// `Fee: 0.11 USDC • Vault: 10.89 USDC`
    pub summary: String,
}

impl MintPreview {
    /// Combine an assessment with the latest vault preview.
    ///
    /// `preview_shares` is `None` when the vault has no preview call; a
    /// loading preview blocks without a message.
    pub fn build(
        assessment: &MintAssessment,
        preview_shares: Option<ReadState<TokenAmount>>,
        decimals: u8,
    ) -> Self {
        let mut blocked_by: Vec<String> =
            assessment.blocking.iter().map(|b| b.to_string()).collect();

        let preview_ok = match &preview_shares {
            None => true,
            Some(ReadState::Loading) => false,
            Some(ReadState::Error(_)) => {
                blocked_by.push(Ineligibility::VaultUnavailable.to_string());
                false
            }
            Some(ReadState::Value(shares)) if shares.is_zero() => {
                blocked_by.push(Ineligibility::ZeroPreviewShares.to_string());
                false
            }
            Some(ReadState::Value(_)) => true,
        };

        let breakdown = &assessment.breakdown;
        Self {
            gross: breakdown.gross.clone(),
            fee: breakdown.fee.clone(),
            net: breakdown.net.clone(),
            fee_bps: breakdown.fee_bps,
            gate: assessment.gate,
            can_mint: assessment.is_eligible() && preview_ok,
            blocked_by,
            preview_shares,
            summary: breakdown.summary(decimals),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculator::{assess_mint, MintParams, WalletContext};
    use usdec_core::{AppConfig, ChainId};

    fn assessment(gross: u64) -> MintAssessment {
        let params = MintParams::from_config(&AppConfig::default()).unwrap();
        let wallet = WalletContext {
            connected: true,
            chain_id: Some(ChainId::BASE),
            allowlisted: true,
        };
        assess_mint(&TokenAmount::from_units(gross), &params, &wallet)
    }

    #[test]
    fn test_preview_gates_mint() {
        let a = assessment(11_000_000);

        let ok = MintPreview::build(&a, Some(ReadState::Value(TokenAmount::from_units(1))), 6);
        assert!(ok.can_mint);
        assert!(ok.blocked_by.is_empty());

        let zero = MintPreview::build(&a, Some(ReadState::Value(TokenAmount::zero())), 6);
        assert!(!zero.can_mint);
        assert_eq!(
            zero.blocked_by,
            vec!["Deposit too small to mint any shares; try a larger amount.".to_string()]
        );

        let failed = MintPreview::build(&a, Some(ReadState::Error("timeout".into())), 6);
        assert_eq!(
            failed.blocked_by,
            vec!["Vault unavailable, try again later.".to_string()]
        );

        let loading = MintPreview::build(&a, Some(ReadState::Loading), 6);
        assert!(!loading.can_mint);
        assert!(loading.blocked_by.is_empty());

        assert!(MintPreview::build(&a, None, 6).can_mint);
    }

    #[test]
    fn test_ineligible_still_has_breakdown() {
        let preview = MintPreview::build(&assessment(10_000_000), None, 6);
        assert!(!preview.can_mint);
        assert_eq!(preview.net, TokenAmount::from_units(9_900_000));
        assert_eq!(preview.summary, "Fee: 0.10 USDC • Vault: 9.90 USDC");
        assert_eq!(preview.blocked_by.len(), 1);
    }

    #[test]
    fn test_preview_json_shape() {
        let preview = MintPreview::build(
            &assessment(11_000_000),
            Some(ReadState::Value(TokenAmount::from_units(10_890_000))),
            6,
        );
        let json = serde_json::to_value(&preview).unwrap();
        assert_eq!(json["net"], "10890000");
        assert_eq!(json["gate"]["allowlisted"], true);
        assert_eq!(json["preview_shares"]["state"], "value");
        assert_eq!(json["preview_shares"]["value"], "10890000");
    }
}
