//! USDEC Protocol Implementation
//!
//! Mints USDEC from USDC: the gross deposit pays a basis-point fee and the
//! rest is deposited into an Arcadia lending vault. USDEC redeems back to
//! USDC.
//!
//! This crate is the stateless half of the flow: amount parsing, fee and
//! eligibility, allowance resolution, contract-call construction and
//! balance reads. Sequencing lives in the app crate.
//!
//! ```ignore
//! let params = MintParams::from_config(&config)?;
//! let gross = TokenAmount::parse_decimal("11", params.decimals)?;
//! let assessment = assess_mint(&gross, &params, &wallet);
//! let tx = tx_builder::build_mint(&contracts, &assessment)?;
//! ```

pub mod allowance;
pub mod amount;
pub mod calculator;
pub mod constants;
pub mod fetch;
pub mod policy;
pub mod state;
pub mod tx_builder;

pub use allowance::{AllowanceResolver, AllowanceState};
pub use amount::*;
pub use calculator::*;
pub use constants::*;
pub use fetch::{
    display_balance, fetch_balance, fetch_preview_shares, BalanceReader, BalanceSnapshot,
    PollTarget, PreviewQuote, ReadState,
};
pub use policy::*;
pub use state::MintPreview;
pub use tx_builder::{PreparedTx, TxKind};
