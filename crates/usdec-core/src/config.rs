//! Configuration types for USDEC

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;
use crate::types::{constants::TOKEN_DECIMALS, Address, ChainId, TokenAmount};

/// Contract addresses and network settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Chain the contracts live on (Base mainnet by default)
    #[serde(default = "default_chain_id")]
    pub chain_id: ChainId,

    /// Base stable-asset (USDC) token contract
    #[serde(default = "default_usdc_address")]
    pub usdc_address: Address,

    /// Derivative token (USDEC) contract; also the approval spender
    #[serde(default = "zero_address")]
    pub usdec_address: Address,

    /// Yield vault (lending pool) that receives the net deposit
    #[serde(default = "default_vault_address")]
    pub vault_address: Address,

    /// Whether the vault exposes `previewDeposit`
    #[serde(default = "default_true")]
    pub vault_supports_preview: bool,

    /// Block explorer prefix for transaction links
    #[serde(default = "default_explorer_tx_url")]
    pub explorer_tx_url: String,
}

fn default_chain_id() -> ChainId {
    ChainId::BASE
}

fn default_usdc_address() -> Address {
    known_address("0x833589fcd6edb6e08f4c7c32d4f71b54bda02913")
}

fn default_vault_address() -> Address {
    known_address("0x3ec4a293fb906dd2cd440c20decb250def141df1")
}

fn zero_address() -> Address {
    known_address("0x0000000000000000000000000000000000000000")
}

fn known_address(addr: &str) -> Address {
    match Address::parse(addr) {
        Ok(address) => address,
        Err(e) => unreachable!("hard-coded address is valid: {e}"),
    }
}

fn default_true() -> bool {
    true
}

fn default_explorer_tx_url() -> String {
    "https://basescan.org/tx/".to_string()
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            chain_id: default_chain_id(),
            usdc_address: default_usdc_address(),
            usdec_address: zero_address(),
            vault_address: default_vault_address(),
            vault_supports_preview: true,
            explorer_tx_url: default_explorer_tx_url(),
        }
    }
}

/// Mint thresholds, in human decimal strings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MintLimits {
    #[serde(default = "default_min_input")]
    pub min_input: String,

    #[serde(default = "default_max_input")]
    pub max_input: String,

    /// Protocol fee in basis points
    #[serde(default = "default_fee_bps")]
    pub fee_bps: u32,

    /// Smallest net deposit the vault accepts
    #[serde(default = "default_vault_minimum")]
    pub vault_minimum: String,

    #[serde(default = "default_decimals")]
    pub decimals: u8,
}

fn default_min_input() -> String {
    "11".to_string()
}

fn default_max_input() -> String {
    "500".to_string()
}

fn default_fee_bps() -> u32 {
    100
}

fn default_vault_minimum() -> String {
    "10".to_string()
}

fn default_decimals() -> u8 {
    TOKEN_DECIMALS
}

impl Default for MintLimits {
    fn default() -> Self {
        Self {
            min_input: default_min_input(),
            max_input: default_max_input(),
            fee_bps: default_fee_bps(),
            vault_minimum: default_vault_minimum(),
            decimals: default_decimals(),
        }
    }
}

impl MintLimits {
    pub fn min_units(&self) -> Result<TokenAmount, ConfigError> {
        self.resolve("min_input", &self.min_input)
    }

    pub fn max_units(&self) -> Result<TokenAmount, ConfigError> {
        self.resolve("max_input", &self.max_input)
    }

    pub fn vault_minimum_units(&self) -> Result<TokenAmount, ConfigError> {
        self.resolve("vault_minimum", &self.vault_minimum)
    }

    fn resolve(&self, field: &str, value: &str) -> Result<TokenAmount, ConfigError> {
        TokenAmount::parse_decimal(value, self.decimals).map_err(|e| ConfigError::InvalidValue {
            field: field.to_string(),
            message: e.to_string(),
        })
    }
}

/// Whether writes are simulated before the wallet is asked to sign
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrustLevel {
    /// Simulate every write first; a would-revert call never reaches the wallet
    #[default]
    Simulated,
    /// Skip simulation and hand the call straight to the wallet
    Reckless,
}

/// Orchestrator behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    #[serde(default)]
    pub trust_level: TrustLevel,

    /// Move straight to the mint signature once approval confirms
    #[serde(default)]
    pub auto_mint_after_approval: bool,

    /// Seconds a pending transaction must be outstanding before the local
    /// status view may be reset
    #[serde(default = "default_reset_after_secs")]
    pub reset_after_secs: u64,

    /// Number of recent transactions kept in history
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    /// Balance poll interval (seconds)
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

fn default_reset_after_secs() -> u64 {
    300
}

fn default_history_limit() -> usize {
    10
}

fn default_poll_interval_secs() -> u64 {
    15
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            trust_level: TrustLevel::default(),
            auto_mint_after_approval: false,
            reset_after_secs: default_reset_after_secs(),
            history_limit: default_history_limit(),
            poll_interval_secs: default_poll_interval_secs(),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub chain: ChainConfig,

    #[serde(default)]
    pub limits: MintLimits,

    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
}

/// Environment variables that override [`ChainConfig`] fields
pub mod env_vars {
    pub const CHAIN_ID: &str = "USDEC_CHAIN_ID";
    pub const TOKEN_ADDRESS: &str = "USDEC_TOKEN_ADDRESS";
    pub const USDC_ADDRESS: &str = "USDEC_USDC_ADDRESS";
    pub const VAULT_ADDRESS: &str = "USDEC_VAULT_ADDRESS";
}

impl AppConfig {
    /// Parse from JSON; missing fields take their defaults
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Overlay values from the process environment
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Overlay values from an arbitrary lookup (used by tests)
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(env_vars::CHAIN_ID) {
            let id = raw
                .trim()
                .parse::<u64>()
                .map_err(|e| ConfigError::InvalidValue {
                    field: env_vars::CHAIN_ID.to_string(),
                    message: e.to_string(),
                })?;
            self.chain.chain_id = ChainId(id);
        }
        if let Some(raw) = lookup(env_vars::TOKEN_ADDRESS) {
            self.chain.usdec_address = parse_address(env_vars::TOKEN_ADDRESS, &raw)?;
        }
        if let Some(raw) = lookup(env_vars::USDC_ADDRESS) {
            self.chain.usdc_address = parse_address(env_vars::USDC_ADDRESS, &raw)?;
        }
        if let Some(raw) = lookup(env_vars::VAULT_ADDRESS) {
            self.chain.vault_address = parse_address(env_vars::VAULT_ADDRESS, &raw)?;
        }
        self.validate()?;
        Ok(self)
    }

    /// Check limits resolve and are ordered
    pub fn validate(&self) -> Result<(), ConfigError> {
        let min = self.limits.min_units()?;
        let max = self.limits.max_units()?;
        self.limits.vault_minimum_units()?;
        if min > max {
            return Err(ConfigError::InvalidValue {
                field: "limits".to_string(),
                message: format!(
                    "min_input {} exceeds max_input {}",
                    self.limits.min_input, self.limits.max_input
                ),
            });
        }
        if self.limits.fee_bps > crate::types::constants::BPS_DENOMINATOR {
            return Err(ConfigError::InvalidValue {
                field: "fee_bps".to_string(),
                message: format!("{} exceeds 10000", self.limits.fee_bps),
            });
        }
        if self.orchestrator.history_limit == 0 {
            return Err(ConfigError::InvalidValue {
                field: "history_limit".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Fails if the USDEC token address was never configured
    pub fn require_token_address(&self) -> Result<&Address, ConfigError> {
        if self.chain.usdec_address.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: env_vars::TOKEN_ADDRESS.to_string(),
                message: "USDEC token address is not configured".to_string(),
            });
        }
        Ok(&self.chain.usdec_address)
    }
}

fn parse_address(field: &str, raw: &str) -> Result<Address, ConfigError> {
    Address::parse(raw).map_err(|e| ConfigError::InvalidValue {
        field: field.to_string(),
        message: e.to_string(),
    })
}
