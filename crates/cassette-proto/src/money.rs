//! Exact money arithmetic for track prices and wallet balances.
//!
//! Amounts are carried as integer base units (wei, 10^-18 of a coin) so that
//! catalog prices like "0.001" subtract exactly — no float drift in a payment
//! path. Parsing and display speak the decimal coin string; serialization
//! uses the same string so stored JSON stays human-readable.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

const WEI_PER_COIN: u128 = 1_000_000_000_000_000_000;
const FRACTION_DIGITS: usize = 18;

/// An exact, non-negative money value in base units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Amount(u128);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    pub const fn from_wei(wei: u128) -> Self {
        Amount(wei)
    }

    pub const fn as_wei(&self) -> u128 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(&self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Amount)
    }

    pub fn checked_sub(&self, other: Amount) -> Option<Amount> {
        self.0.checked_sub(other.0).map(Amount)
    }
}

/// Error for a string that is not a well-formed decimal coin amount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseAmountError(String);

impl fmt::Display for ParseAmountError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid amount: {}", self.0)
    }
}

impl std::error::Error for ParseAmountError {}

impl FromStr for Amount {
    type Err = ParseAmountError;

    /// Parses a decimal coin string ("0.001", "10", "1.5") into base units.
    /// At most 18 fractional digits; anything finer than wei is rejected
    /// rather than rounded.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ParseAmountError(s.to_string()));
        }

        let (whole, frac) = match s.split_once('.') {
            Some((w, f)) => (w, f),
            None => (s, ""),
        };

        if whole.is_empty() && frac.is_empty() {
            return Err(ParseAmountError(s.to_string()));
        }
        if frac.len() > FRACTION_DIGITS {
            return Err(ParseAmountError(s.to_string()));
        }

        let whole_units: u128 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| ParseAmountError(s.to_string()))?
        };

        let frac_units: u128 = if frac.is_empty() {
            0
        } else {
            let padded = format!("{:0<width$}", frac, width = FRACTION_DIGITS);
            padded.parse().map_err(|_| ParseAmountError(s.to_string()))?
        };

        let wei = whole_units
            .checked_mul(WEI_PER_COIN)
            .and_then(|w| w.checked_add(frac_units))
            .ok_or_else(|| ParseAmountError(s.to_string()))?;

        Ok(Amount(wei))
    }
}

impl fmt::Display for Amount {
    /// Renders the shortest decimal coin string: "0.001", "10", "1.5".
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / WEI_PER_COIN;
        let frac = self.0 % WEI_PER_COIN;
        if frac == 0 {
            return write!(f, "{}", whole);
        }
        let frac_str = format!("{:0>width$}", frac, width = FRACTION_DIGITS);
        write!(f, "{}.{}", whole, frac_str.trim_end_matches('0'))
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
