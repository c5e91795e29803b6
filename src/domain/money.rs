//! Money codec
//!
//! Amounts are persisted as `i64` hundredths of a currency unit (`1.50` is
//! stored as `150`). Conversion in both directions works on the decimal
//! digits directly; no floating point value is ever involved.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Number of fractional digits carried by every amount.
const SCALE: usize = 2;

/// Errors that can occur when decoding a display amount
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MoneyError {
    #[error("Amount is empty")]
    Empty,

    #[error("Amount contains an invalid character: {0:?}")]
    InvalidCharacter(char),

    #[error("Amount contains more than one decimal point")]
    MultipleDecimalPoints,

    #[error("Using more than {SCALE} decimal places is forbidden (got {0})")]
    TooManyDecimals(usize),

    #[error("Amount is too large")]
    Overflow,
}

/// Render an internal amount (hundredths) in display format.
///
/// `0` renders as `"0.00"`, `23` as `"0.23"`, `100` as `"1.00"`.
/// Negative inputs render with a leading minus sign.
pub fn to_display(internal: i64) -> String {
    let magnitude = internal.unsigned_abs().to_string();
    let padded = if magnitude.len() <= SCALE {
        format!("{:0>width$}", magnitude, width = SCALE + 1)
    } else {
        magnitude
    };

    let (units, cents) = padded.split_at(padded.len() - SCALE);
    let sign = if internal < 0 { "-" } else { "" };
    format!("{sign}{units}.{cents}")
}

/// Parse a display amount into hundredths.
///
/// Accepts leading zeros, an optional decimal point and at most two
/// fractional digits. Missing fractional digits are padded with zeros, so
/// `"1.1"` becomes `110` and `"00101.12"` becomes `10112`.
pub fn to_internal(display: &str) -> Result<i64, MoneyError> {
    if display.is_empty() {
        return Err(MoneyError::Empty);
    }

    let mut total: i64 = 0;
    let mut digits = 0usize;
    let mut fractional_digits = 0usize;
    let mut after_point = false;

    for character in display.chars() {
        match character {
            '.' if after_point => return Err(MoneyError::MultipleDecimalPoints),
            '.' => after_point = true,
            '0'..='9' => {
                let digit = i64::from(character as u8 - b'0');
                total = total
                    .checked_mul(10)
                    .and_then(|value| value.checked_add(digit))
                    .ok_or(MoneyError::Overflow)?;
                digits += 1;
                if after_point {
                    fractional_digits += 1;
                }
            }
            other => return Err(MoneyError::InvalidCharacter(other)),
        }
    }

    if digits == 0 {
        return Err(MoneyError::Empty);
    }
    if fractional_digits > SCALE {
        return Err(MoneyError::TooManyDecimals(fractional_digits));
    }

    for _ in fractional_digits..SCALE {
        total = total.checked_mul(10).ok_or(MoneyError::Overflow)?;
    }

    Ok(total)
}

/// Amount represents a validated, non-negative monetary value in hundredths.
///
/// # Example
/// ```
/// use digital_wallet::domain::Amount;
///
/// let amount: Amount = "101.11".parse().unwrap();
/// assert_eq!(amount.cents(), 10111);
/// assert_eq!(amount.to_string(), "101.11");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Amount(i64);

impl Amount {
    /// Zero amount
    pub const ZERO: Amount = Amount(0);

    /// Wrap an internal value. Negative values are rejected.
    pub fn from_cents(cents: i64) -> Option<Self> {
        (cents >= 0).then_some(Self(cents))
    }

    /// Value in hundredths, as persisted.
    pub fn cents(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&to_display(self.0))
    }
}

impl FromStr for Amount {
    type Err = MoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        to_internal(s).map(Self)
    }
}

impl TryFrom<String> for Amount {
    type Error = MoneyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Amount::from_str(&value)
    }
}

impl From<Amount> for String {
    fn from(amount: Amount) -> Self {
        amount.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_display() {
        assert_eq!(to_display(0), "0.00");
        assert_eq!(to_display(5), "0.05");
        assert_eq!(to_display(23), "0.23");
        assert_eq!(to_display(100), "1.00");
        assert_eq!(to_display(150), "1.50");
        assert_eq!(to_display(11111), "111.11");
        assert_eq!(to_display(-5000), "-50.00");
    }

    #[test]
    fn test_to_internal() {
        assert_eq!(to_internal("1"), Ok(100));
        assert_eq!(to_internal("01"), Ok(100));
        assert_eq!(to_internal("1.0"), Ok(100));
        assert_eq!(to_internal("1.00"), Ok(100));
        assert_eq!(to_internal("1.1"), Ok(110));
        assert_eq!(to_internal("00101.12"), Ok(10112));
        assert_eq!(to_internal("0.05"), Ok(5));
        assert_eq!(to_internal("0"), Ok(0));
    }

    #[test]
    fn test_to_internal_rejects_third_decimal() {
        assert_eq!(to_internal("00101.123"), Err(MoneyError::TooManyDecimals(3)));
        assert_eq!(to_internal("1.000"), Err(MoneyError::TooManyDecimals(3)));
    }

    #[test]
    fn test_to_internal_rejects_malformed() {
        assert_eq!(to_internal(""), Err(MoneyError::Empty));
        assert_eq!(to_internal("."), Err(MoneyError::Empty));
        assert_eq!(to_internal("-1"), Err(MoneyError::InvalidCharacter('-')));
        assert_eq!(to_internal("1e5"), Err(MoneyError::InvalidCharacter('e')));
        assert_eq!(to_internal("1.2.3"), Err(MoneyError::MultipleDecimalPoints));
        assert_eq!(to_internal("99999999999999999999"), Err(MoneyError::Overflow));
    }

    #[test]
    fn test_round_trip() {
        let samples = [0, 1, 9, 10, 99, 100, 101, 12345, 1_000_000_007, i64::MAX / 1000];
        for n in samples {
            assert_eq!(to_internal(&to_display(n)), Ok(n), "round trip failed for {}", n);
        }
    }

    #[test]
    fn test_amount_serde_as_string() {
        let amount: Amount = serde_json::from_str("\"10.5\"").unwrap();
        assert_eq!(amount.cents(), 1050);
        assert_eq!(serde_json::to_string(&amount).unwrap(), "\"10.50\"");

        let invalid: Result<Amount, _> = serde_json::from_str("\"10.555\"");
        assert!(invalid.is_err());
    }

    #[test]
    fn test_amount_from_cents_rejects_negative() {
        assert!(Amount::from_cents(-1).is_none());
        assert_eq!(Amount::from_cents(0), Some(Amount::ZERO));
    }
}
