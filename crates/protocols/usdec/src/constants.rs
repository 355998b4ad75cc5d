//! USDEC Protocol Constants
//!
//! Contract addresses and protocol parameters.

use usdec_core::{Address, ChainConfig, ConfigError};

/// Base mainnet deployment
pub mod base {
    /// Native USDC on Base
    pub const USDC_ADDRESS: &str = "0x833589fcd6edb6e08f4c7c32d4f71b54bda02913";

    /// Arcadia lending pool (USDC senior tranche) that receives the net deposit
    pub const VAULT_ADDRESS: &str = "0x3ec4a293fb906dd2cd440c20decb250def141df1";

    pub const VAULT_NAME: &str = "Arcadia USDC Senior Tranche";
    pub const VAULT_PLATFORM: &str = "Arcadia Finance";
}

/// Protocol parameters
pub mod params {
    /// Smallest accepted mint input (USDC)
    pub const MIN_INPUT: &str = "11";

    /// Largest accepted mint input (USDC)
    pub const MAX_INPUT: &str = "500";

    /// Mint fee in basis points (100 = 1%)
    pub const MINT_FEE_BPS: u32 = 100;

    /// Smallest net deposit the vault accepts (USDC)
    pub const MIN_VAULT_DEPOSIT: &str = "10";

    /// USDC and USDEC both have 6 decimal places
    pub const DECIMALS: u8 = 6;

    /// Display precision for USDC balances
    pub const USDC_DISPLAY_DP: u8 = 2;

    /// Display precision for USDEC balances
    pub const USDEC_DISPLAY_DP: u8 = 4;
}

/// Resolved contract addresses for one deployment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractAddresses {
    pub usdc: Address,
    /// USDEC token; also the spender of the USDC approval
    pub usdec: Address,
    pub vault: Address,
    pub vault_supports_preview: bool,
}

impl ContractAddresses {
    /// Resolve from configuration; fails if the USDEC address is unset
    pub fn from_config(chain: &ChainConfig) -> Result<Self, ConfigError> {
        if chain.usdec_address.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "usdec_address".to_string(),
                message: "USDEC token address is not configured".to_string(),
            });
        }
        Ok(Self {
            usdc: chain.usdc_address.clone(),
            usdec: chain.usdec_address.clone(),
            vault: chain.vault_address.clone(),
            vault_supports_preview: chain.vault_supports_preview,
        })
    }
}
