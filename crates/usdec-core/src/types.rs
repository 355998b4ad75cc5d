//! Core type definitions for USDEC

use std::fmt;
use std::str::FromStr;

use num_bigint::BigUint;
use num_traits::{ToPrimitive, Zero};
use serde::{Deserialize, Serialize};

use crate::errors::{AmountError, TypeError};

/// EVM account or contract address, stored lower-cased (`0x` + 40 hex chars)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    /// Parse and normalize an address. Mixed-case (checksummed) input is accepted.
    pub fn parse(addr: &str) -> Result<Self, TypeError> {
        let normalized = addr.trim().to_ascii_lowercase();
        let body = normalized
            .strip_prefix("0x")
            .ok_or_else(|| TypeError::InvalidAddress {
                address: addr.to_string(),
            })?;
        if body.len() != 40 || hex::decode(body).is_err() {
            return Err(TypeError::InvalidAddress {
                address: addr.to_string(),
            });
        }
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0[2..].bytes().all(|b| b == b'0')
    }
}

impl TryFrom<String> for Address {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Address> for String {
    fn from(value: Address) -> Self {
        value.0
    }
}

impl FromStr for Address {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Transaction hash (32 bytes, `0x`-prefixed hex)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TxHash(String);

impl TxHash {
    pub fn parse(hash: &str) -> Result<Self, TypeError> {
        let normalized = hash.trim().to_ascii_lowercase();
        let valid = normalized
            .strip_prefix("0x")
            .is_some_and(|body| body.len() == 64 && hex::decode(body).is_ok());
        if !valid {
            return Err(TypeError::InvalidTxHash {
                hash: hash.to_string(),
            });
        }
        Ok(Self(normalized))
    }

    /// Build a hash from raw bytes
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(format!("0x{}", hex::encode(bytes)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for TxHash {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<TxHash> for String {
    fn from(value: TxHash) -> Self {
        value.0
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// EVM chain id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChainId(pub u64);

impl ChainId {
    pub const BASE: ChainId = ChainId(8453);
    pub const BASE_SEPOLIA: ChainId = ChainId(84532);
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Block number
pub type BlockNumber = u64;

/// Non-negative token amount in the token's smallest unit.
///
/// Backed by an arbitrary-precision integer so uint256 values read from chain
/// are never truncated. Serializes as a base-10 string of raw units.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TokenAmount(BigUint);

impl TokenAmount {
    pub fn zero() -> Self {
        Self(BigUint::zero())
    }

    pub fn from_units(units: u64) -> Self {
        Self(BigUint::from(units))
    }

    pub fn units(&self) -> &BigUint {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Raw units as u128, if they fit
    pub fn to_u128(&self) -> Option<u128> {
        self.0.to_u128()
    }

    pub fn checked_sub(&self, other: &TokenAmount) -> Option<TokenAmount> {
        if other.0 > self.0 {
            None
        } else {
            Some(Self(&self.0 - &other.0))
        }
    }

    pub fn saturating_sub(&self, other: &TokenAmount) -> TokenAmount {
        self.checked_sub(other).unwrap_or_default()
    }

    /// `self * bps / 10000`, truncating
    pub fn mul_bps(&self, bps: u32) -> TokenAmount {
        Self(&self.0 * BigUint::from(bps) / BigUint::from(10_000u32))
    }

    /// Parse a human decimal string (e.g. `"10.89"`) into raw units.
    ///
    /// Pure string arithmetic: the integer and fractional digits are
    /// concatenated, with the fraction right-padded to `decimals` digits.
    /// Accepts `^\d*(\.\d{1,decimals})?$`, excluding the empty string and a
    /// lone `.`.
    pub fn parse_decimal(input: &str, decimals: u8) -> Result<Self, AmountError> {
        if input.is_empty() {
            return Err(AmountError::Empty);
        }
        if input.starts_with('-') {
            return Err(AmountError::Negative {
                input: input.to_string(),
            });
        }

        let (int_part, frac_part) = match input.split_once('.') {
            Some((int_part, frac_part)) => (int_part, Some(frac_part)),
            None => (input, None),
        };

        let malformed = || AmountError::Malformed {
            input: input.to_string(),
        };

        if !int_part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(malformed());
        }

        let frac_digits = match frac_part {
            None => "",
            Some(frac) => {
                if frac.is_empty() || !frac.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(malformed());
                }
                if frac.len() > decimals as usize {
                    return Err(AmountError::TooManyDecimals {
                        input: input.to_string(),
                        max: decimals,
                    });
                }
                frac
            }
        };

        let mut digits = String::with_capacity(int_part.len() + decimals as usize + 1);
        digits.push('0');
        digits.push_str(int_part);
        digits.push_str(frac_digits);
        for _ in frac_digits.len()..decimals as usize {
            digits.push('0');
        }

        BigUint::parse_bytes(digits.as_bytes(), 10)
            .map(Self)
            .ok_or_else(malformed)
    }

    /// Exact decimal rendering with trailing fractional zeros trimmed
    /// (`10_890_000` at 6 decimals is `"10.89"`).
    pub fn to_decimal_string(&self, decimals: u8) -> String {
        let (int_part, frac_part) = self.split_digits(&self.0, decimals);
        let frac_trimmed = frac_part.trim_end_matches('0');
        if frac_trimmed.is_empty() {
            int_part
        } else {
            format!("{}.{}", int_part, frac_trimmed)
        }
    }

    /// Fixed-point display rounded half-up to `dp` places (`"10.89"` at dp = 2).
    pub fn to_fixed(&self, decimals: u8, dp: u8) -> String {
        if dp >= decimals {
            let (int_part, frac_part) = self.split_digits(&self.0, decimals);
            let padding = "0".repeat((dp - decimals) as usize);
            return if dp == 0 {
                int_part
            } else {
                format!("{}.{}{}", int_part, frac_part, padding)
            };
        }

        let divisor = BigUint::from(10u32).pow((decimals - dp) as u32);
        let half = &divisor / BigUint::from(2u32);
        let rounded = (&self.0 + half) / divisor;
        let (int_part, frac_part) = self.split_digits(&rounded, dp);
        if dp == 0 {
            int_part
        } else {
            format!("{}.{}", int_part, frac_part)
        }
    }

    fn split_digits(&self, units: &BigUint, decimals: u8) -> (String, String) {
        let raw = units.to_string();
        let decimals = decimals as usize;
        if decimals == 0 {
            return (raw, String::new());
        }
        let padded = if raw.len() <= decimals {
            format!("{}{}", "0".repeat(decimals + 1 - raw.len()), raw)
        } else {
            raw
        };
        let (int_part, frac_part) = padded.split_at(padded.len() - decimals);
        (int_part.to_string(), frac_part.to_string())
    }
}

impl From<u64> for TokenAmount {
    fn from(units: u64) -> Self {
        Self::from_units(units)
    }
}

impl From<BigUint> for TokenAmount {
    fn from(units: BigUint) -> Self {
        Self(units)
    }
}

impl std::ops::Add for &TokenAmount {
    type Output = TokenAmount;

    fn add(self, rhs: Self) -> TokenAmount {
        TokenAmount(&self.0 + &rhs.0)
    }
}

impl FromStr for TokenAmount {
    type Err = TypeError;

    /// Parse raw base-10 units (no decimal point)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(TypeError::InvalidUnits {
                value: s.to_string(),
            });
        }
        BigUint::parse_bytes(s.as_bytes(), 10)
            .map(Self)
            .ok_or_else(|| TypeError::InvalidUnits {
                value: s.to_string(),
            })
    }
}

impl TryFrom<String> for TokenAmount {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TokenAmount> for String {
    fn from(value: TokenAmount) -> Self {
        value.0.to_string()
    }
}

impl fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Constants
pub mod constants {
    /// USDC and USDEC both use 6 decimals
    pub const TOKEN_DECIMALS: u8 = 6;

    /// Basis-point denominator (100% = 10_000 bps)
    pub const BPS_DENOMINATOR: u32 = 10_000;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_normalization() {
        let checksummed = Address::parse("0x3ec4a293Fb906DD2Cd440c20dECB250DeF141dF1").unwrap();
        let lower = Address::parse("0x3ec4a293fb906dd2cd440c20decb250def141df1").unwrap();
        assert_eq!(checksummed, lower);
        assert_eq!(
            checksummed.as_str(),
            "0x3ec4a293fb906dd2cd440c20decb250def141df1"
        );
    }

    #[test]
    fn test_address_rejects_bad_input() {
        assert!(Address::parse("3ec4a293fb906dd2cd440c20decb250def141df1").is_err());
        assert!(Address::parse("0x3ec4").is_err());
        assert!(Address::parse("0xzzc4a293fb906dd2cd440c20decb250def141df1").is_err());
    }

    #[test]
    fn test_tx_hash_parse() {
        let hash = TxHash::from_bytes([0xab; 32]);
        assert_eq!(TxHash::parse(hash.as_str()).unwrap(), hash);
        assert!(TxHash::parse("0x1234").is_err());
    }

    #[test]
    fn test_parse_decimal_exact() {
        assert_eq!(
            TokenAmount::parse_decimal("10.89", 6).unwrap(),
            TokenAmount::from_units(10_890_000)
        );
        assert_eq!(
            TokenAmount::parse_decimal(".5", 6).unwrap(),
            TokenAmount::from_units(500_000)
        );
        assert_eq!(
            TokenAmount::parse_decimal("0.000001", 6).unwrap(),
            TokenAmount::from_units(1)
        );
        assert_eq!(
            TokenAmount::parse_decimal("007", 6).unwrap(),
            TokenAmount::from_units(7_000_000)
        );
    }

    #[test]
    fn test_parse_decimal_keeps_sixth_digit() {
        // 0.1 + 0.2 style inputs that lose the last digit through f64 scaling
        assert_eq!(
            TokenAmount::parse_decimal("4.35", 6).unwrap(),
            TokenAmount::from_units(4_350_000)
        );
        assert_eq!(
            TokenAmount::parse_decimal("1.000003", 6).unwrap(),
            TokenAmount::from_units(1_000_003)
        );
        assert_eq!(
            TokenAmount::parse_decimal("123456789.999999", 6).unwrap(),
            TokenAmount::from_units(123_456_789_999_999)
        );
    }

    #[test]
    fn test_parse_decimal_rejections() {
        assert!(matches!(
            TokenAmount::parse_decimal("", 6),
            Err(AmountError::Empty)
        ));
        assert!(matches!(
            TokenAmount::parse_decimal("-1", 6),
            Err(AmountError::Negative { .. })
        ));
        assert!(matches!(
            TokenAmount::parse_decimal("1.1234567", 6),
            Err(AmountError::TooManyDecimals { max: 6, .. })
        ));
        for bad in [".", "5.", "1e6", "1,5", " 1", "1.2.3", "abc", "+1"] {
            assert!(
                matches!(
                    TokenAmount::parse_decimal(bad, 6),
                    Err(AmountError::Malformed { .. })
                ),
                "{bad:?} should be malformed"
            );
        }
    }

    #[test]
    fn test_round_trip_stability() {
        for input in ["0", "11", "10.89", "0.000001", "500", "1.5", "000.100000", ".25"] {
            let parsed = TokenAmount::parse_decimal(input, 6).unwrap();
            let formatted = parsed.to_decimal_string(6);
            assert_eq!(TokenAmount::parse_decimal(&formatted, 6).unwrap(), parsed);
        }
    }

    #[test]
    fn test_decimal_string_trims_zeros() {
        assert_eq!(TokenAmount::from_units(10_890_000).to_decimal_string(6), "10.89");
        assert_eq!(TokenAmount::from_units(11_000_000).to_decimal_string(6), "11");
        assert_eq!(TokenAmount::from_units(1).to_decimal_string(6), "0.000001");
        assert_eq!(TokenAmount::zero().to_decimal_string(6), "0");
    }

    #[test]
    fn test_to_fixed_rounding() {
        assert_eq!(TokenAmount::from_units(110_000).to_fixed(6, 2), "0.11");
        assert_eq!(TokenAmount::from_units(10_895_000).to_fixed(6, 2), "10.90");
        assert_eq!(TokenAmount::from_units(10_894_999).to_fixed(6, 2), "10.89");
        assert_eq!(TokenAmount::from_units(1_234_567).to_fixed(6, 4), "1.2346");
        assert_eq!(TokenAmount::zero().to_fixed(6, 2), "0.00");
        assert_eq!(TokenAmount::from_units(5).to_fixed(6, 8), "0.00000500");
    }

    #[test]
    fn test_mul_bps_truncates() {
        assert_eq!(
            TokenAmount::from_units(11_000_000).mul_bps(100),
            TokenAmount::from_units(110_000)
        );
        assert_eq!(TokenAmount::from_units(99).mul_bps(100), TokenAmount::zero());
    }

    #[test]
    fn test_token_amount_serde_as_string() {
        let amount = TokenAmount::from_units(10_890_000);
        let json = serde_json::to_string(&amount).unwrap();
        assert_eq!(json, "\"10890000\"");
        let parsed: TokenAmount = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, amount);
    }

    #[test]
    fn test_checked_sub() {
        let a = TokenAmount::from_units(5);
        let b = TokenAmount::from_units(7);
        assert!(a.checked_sub(&b).is_none());
        assert_eq!(b.checked_sub(&a), Some(TokenAmount::from_units(2)));
        assert_eq!(a.saturating_sub(&b), TokenAmount::zero());
    }
}
