//! Redeem policy
//!
//! Whether a redeem carries its own minimum or a lock period after minting is
//! a product decision, so it is injected rather than fixed. The default is
//! [`Unrestricted`].

use std::fmt::Debug;

use usdec_core::{ProtocolError, TokenAmount};

/// Facts a policy may look at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedeemContext {
    pub amount: TokenAmount,
    /// Last known USDEC balance, if loaded
    pub balance: Option<TokenAmount>,
    /// Unix seconds of the last confirmed mint in this session
    pub last_mint_at: Option<u64>,
    /// Unix seconds now
    pub now: u64,
}

/// Rule applied before a redeem is submitted
pub trait RedeemPolicy: Send + Sync + Debug {
    fn check(&self, ctx: &RedeemContext) -> Result<(), ProtocolError>;

    /// Short human description
    fn describe(&self) -> String;
}

/// No restriction beyond a positive amount and sufficient balance
#[derive(Debug, Clone, Copy, Default)]
pub struct Unrestricted;

impl RedeemPolicy for Unrestricted {
    fn check(&self, _ctx: &RedeemContext) -> Result<(), ProtocolError> {
        Ok(())
    }

    fn describe(&self) -> String {
        "unrestricted".to_string()
    }
}

/// Redeem amount must be at least `minimum`
#[derive(Debug, Clone)]
pub struct MinimumRedeem {
    pub minimum: TokenAmount,
    pub decimals: u8,
}

impl MinimumRedeem {
    pub fn new(minimum: TokenAmount, decimals: u8) -> Self {
        Self { minimum, decimals }
    }
}

impl RedeemPolicy for MinimumRedeem {
    fn check(&self, ctx: &RedeemContext) -> Result<(), ProtocolError> {
        if ctx.amount < self.minimum {
            return Err(ProtocolError::PolicyViolation {
                reason: format!(
                    "minimum redeem is {} USDEC",
                    self.minimum.to_decimal_string(self.decimals)
                ),
            });
        }
        Ok(())
    }

    fn describe(&self) -> String {
        format!(
            "minimum {} USDEC",
            self.minimum.to_decimal_string(self.decimals)
        )
    }
}

/// No redeem within `lock_secs` of the last mint
#[derive(Debug, Clone, Copy)]
pub struct LockPeriod {
    pub lock_secs: u64,
}

impl LockPeriod {
    pub const THIRTY_DAYS: u64 = 30 * 24 * 60 * 60;

    pub fn new(lock_secs: u64) -> Self {
        Self { lock_secs }
    }
}

impl RedeemPolicy for LockPeriod {
    fn check(&self, ctx: &RedeemContext) -> Result<(), ProtocolError> {
        let Some(minted_at) = ctx.last_mint_at else {
            return Ok(());
        };
        let unlocks_at = minted_at.saturating_add(self.lock_secs);
        if ctx.now < unlocks_at {
            return Err(ProtocolError::PolicyViolation {
                reason: format!("locked for another {}s", unlocks_at - ctx.now),
            });
        }
        Ok(())
    }

    fn describe(&self) -> String {
        format!("{}s lock after mint", self.lock_secs)
    }
}

/// Every inner policy must pass
#[derive(Debug, Default)]
pub struct AllOf(pub Vec<Box<dyn RedeemPolicy>>);

impl RedeemPolicy for AllOf {
    fn check(&self, ctx: &RedeemContext) -> Result<(), ProtocolError> {
        self.0.iter().try_for_each(|p| p.check(ctx))
    }

    fn describe(&self) -> String {
        let parts: Vec<String> = self.0.iter().map(|p| p.describe()).collect();
        parts.join(" and ")
    }
}
