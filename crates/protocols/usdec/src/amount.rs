//! Amount validation
//!
//! Converts user-typed decimal strings into exact token units. Parsing is
//! pure string arithmetic (see [`TokenAmount::parse_decimal`]); nothing here
//! goes through `f64`.

use usdec_core::{AmountError, TokenAmount};

/// Accepted range for an amount
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmountBounds {
    pub min: TokenAmount,
    /// `None` means unbounded
    pub max: Option<TokenAmount>,
    pub decimals: u8,
}

impl AmountBounds {
    pub fn new(min: TokenAmount, max: Option<TokenAmount>, decimals: u8) -> Self {
        Self { min, max, decimals }
    }

    /// Any amount of at least one raw unit
    pub fn positive(decimals: u8) -> Self {
        Self {
            min: TokenAmount::from_units(1),
            max: None,
            decimals,
        }
    }
}

/// How an empty input is treated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyInput {
    /// Empty is an error
    Reject,
    /// Empty means "nothing entered yet" and yields `Ok(None)`
    Allow,
}

/// Parse without range checks
pub fn parse_amount(
    raw: &str,
    decimals: u8,
    empty: EmptyInput,
) -> Result<Option<TokenAmount>, AmountError> {
    if raw.is_empty() && empty == EmptyInput::Allow {
        return Ok(None);
    }
    TokenAmount::parse_decimal(raw, decimals).map(Some)
}

/// Reject amounts outside `bounds`
pub fn check_range(amount: &TokenAmount, bounds: &AmountBounds) -> Result<(), AmountError> {
    if *amount < bounds.min {
        return Err(AmountError::BelowMinimum {
            min: bounds.min.to_decimal_string(bounds.decimals),
        });
    }
    if let Some(max) = &bounds.max {
        if amount > max {
            return Err(AmountError::AboveMaximum {
                max: max.to_decimal_string(bounds.decimals),
            });
        }
    }
    Ok(())
}

/// Parse and range-check a typed amount.
///
/// Returns `Ok(None)` only for an empty input under [`EmptyInput::Allow`].
pub fn validate_amount(
    raw: &str,
    bounds: &AmountBounds,
    empty: EmptyInput,
) -> Result<Option<TokenAmount>, AmountError> {
    let Some(amount) = parse_amount(raw, bounds.decimals, empty)? else {
        return Ok(None);
    };
    check_range(&amount, bounds)?;
    Ok(Some(amount))
}

/// Whether `raw` is a plausible partially-typed amount (`^\d*(\.\d{0,decimals})?$`).
///
/// Looser than [`validate_amount`]: `"5."` passes here so the user can keep
/// typing, but is not a valid amount.
pub fn is_acceptable_keystroke(raw: &str, decimals: u8) -> bool {
    let (int_part, frac_part) = match raw.split_once('.') {
        Some((int_part, frac_part)) => (int_part, Some(frac_part)),
        None => (raw, None),
    };
    int_part.bytes().all(|b| b.is_ascii_digit())
        && frac_part.map_or(true, |frac| {
            frac.len() <= decimals as usize && frac.bytes().all(|b| b.is_ascii_digit())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mint_bounds() -> AmountBounds {
        AmountBounds::new(
            TokenAmount::from_units(11_000_000),
            Some(TokenAmount::from_units(500_000_000)),
            6,
        )
    }

    #[test]
    fn test_validate_in_range() {
        let amount = validate_amount("11", &mint_bounds(), EmptyInput::Reject).unwrap();
        assert_eq!(amount, Some(TokenAmount::from_units(11_000_000)));

        let amount = validate_amount("500.000000", &mint_bounds(), EmptyInput::Reject).unwrap();
        assert_eq!(amount, Some(TokenAmount::from_units(500_000_000)));
    }

    #[test]
    fn test_validate_out_of_range() {
        assert_eq!(
            validate_amount("10.999999", &mint_bounds(), EmptyInput::Reject),
            Err(AmountError::BelowMinimum {
                min: "11".to_string()
            })
        );
        assert_eq!(
            validate_amount("500.000001", &mint_bounds(), EmptyInput::Reject),
            Err(AmountError::AboveMaximum {
                max: "500".to_string()
            })
        );
    }

    #[test]
    fn test_empty_modes() {
        assert_eq!(
            validate_amount("", &mint_bounds(), EmptyInput::Reject),
            Err(AmountError::Empty)
        );
        assert_eq!(
            validate_amount("", &mint_bounds(), EmptyInput::Allow),
            Ok(None)
        );
    }

    #[test]
    fn test_malformed_rejected_before_range() {
        assert!(matches!(
            validate_amount("12.3456789", &mint_bounds(), EmptyInput::Reject),
            Err(AmountError::TooManyDecimals { .. })
        ));
        assert!(matches!(
            validate_amount("-20", &mint_bounds(), EmptyInput::Allow),
            Err(AmountError::Negative { .. })
        ));
        assert!(matches!(
            validate_amount("twelve", &mint_bounds(), EmptyInput::Reject),
            Err(AmountError::Malformed { .. })
        ));
    }

    #[test]
    fn test_positive_bounds() {
        let bounds = AmountBounds::positive(6);
        assert!(validate_amount("0", &bounds, EmptyInput::Reject).is_err());
        assert!(validate_amount("0.000001", &bounds, EmptyInput::Reject).is_ok());
        assert!(validate_amount("1000000000", &bounds, EmptyInput::Reject).is_ok());
    }

    #[test]
    fn test_keystroke_filter() {
        assert!(is_acceptable_keystroke("", 6));
        assert!(is_acceptable_keystroke("5.", 6));
        assert!(is_acceptable_keystroke("5.123456", 6));
        assert!(!is_acceptable_keystroke("5.1234567", 6));
        assert!(!is_acceptable_keystroke("5a", 6));
        assert!(!is_acceptable_keystroke("1.2.3", 6));
    }
}
