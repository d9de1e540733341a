//! Fixed-point money with two decimal places
//!
//! Amounts are held in minor units (cents) so line and cart totals are exact.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

const MINOR_PER_UNIT: i64 = 100;

/// A non-negative amount of money in minor units
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    /// Largest price a product may carry (ten digits, two of them decimals)
    pub const MAX_PRICE: Money = Money(99_999_999_99);

    /// Largest line or cart total (seventeen digits, two of them decimals)
    pub const MAX_TOTAL: Money = Money(999_999_999_999_999_99);

    pub const fn from_minor(minor: i64) -> Self {
        Self(minor)
    }

    pub const fn from_units(units: i64) -> Self {
        Self(units * MINOR_PER_UNIT)
    }

    pub const fn minor(&self) -> i64 {
        self.0
    }

    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Price of `quantity` items at this unit price
    pub fn checked_mul(self, quantity: u32) -> Option<Money> {
        self.0.checked_mul(i64::from(quantity)).map(Money)
    }

    pub fn checked_add(self, rhs: Money) -> Option<Money> {
        self.0.checked_add(rhs.0).map(Money)
    }

    /// Whether this amount fits a line or cart total
    pub const fn is_valid_total(&self) -> bool {
        self.0 >= 0 && self.0 <= Self::MAX_TOTAL.0
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{:02}",
            self.0 / MINOR_PER_UNIT,
            self.0 % MINOR_PER_UNIT
        )
    }
}

/// Reasons an amount string is rejected
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MoneyParseError {
    #[error("amount is empty")]
    Empty,
    #[error("amount must be a non-negative decimal number")]
    NotANumber,
    #[error("amount has more than two decimal places")]
    TooPrecise,
    #[error("amount is too large")]
    Overflow,
}

impl FromStr for Money {
    type Err = MoneyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(MoneyParseError::Empty);
        }

        let (whole, frac) = match s.split_once('.') {
            Some((whole, frac)) => (whole, frac),
            None => (s, ""),
        };
        if whole.is_empty() && frac.is_empty() {
            return Err(MoneyParseError::NotANumber);
        }
        let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if !all_digits(whole) || !all_digits(frac) {
            return Err(MoneyParseError::NotANumber);
        }
        if frac.len() > 2 {
            return Err(MoneyParseError::TooPrecise);
        }

        let units: i64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| MoneyParseError::Overflow)?
        };
        let cents: i64 = match frac.len() {
            0 => 0,
            1 => frac.parse::<i64>().map_err(|_| MoneyParseError::NotANumber)? * 10,
            _ => frac.parse().map_err(|_| MoneyParseError::NotANumber)?,
        };

        units
            .checked_mul(MINOR_PER_UNIT)
            .and_then(|minor| minor.checked_add(cents))
            .map(Money)
            .ok_or(MoneyParseError::Overflow)
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct MoneyVisitor;

        impl Visitor<'_> for MoneyVisitor {
            type Value = Money;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a decimal string such as \"12.50\" or a whole number")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Money, E> {
                v.parse().map_err(E::custom)
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Money, E> {
                i64::try_from(v)
                    .ok()
                    .and_then(|units| units.checked_mul(MINOR_PER_UNIT))
                    .map(Money)
                    .ok_or_else(|| E::custom(MoneyParseError::Overflow))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Money, E> {
                let v = u64::try_from(v).map_err(|_| E::custom(MoneyParseError::NotANumber))?;
                self.visit_u64(v)
            }
        }

        deserializer.deserialize_any(MoneyVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_forms() {
        assert_eq!("12".parse::<Money>().unwrap(), Money::from_minor(1200));
        assert_eq!("12.5".parse::<Money>().unwrap(), Money::from_minor(1250));
        assert_eq!("12.05".parse::<Money>().unwrap(), Money::from_minor(1205));
        assert_eq!(".5".parse::<Money>().unwrap(), Money::from_minor(50));
        assert_eq!("0.00".parse::<Money>().unwrap(), Money::ZERO);
    }

    #[test]
    fn test_parse_rejects() {
        assert_eq!("".parse::<Money>(), Err(MoneyParseError::Empty));
        assert_eq!("-1".parse::<Money>(), Err(MoneyParseError::NotANumber));
        assert_eq!("1.234".parse::<Money>(), Err(MoneyParseError::TooPrecise));
        assert_eq!("1e3".parse::<Money>(), Err(MoneyParseError::NotANumber));
        assert_eq!(".".parse::<Money>(), Err(MoneyParseError::NotANumber));
    }

    #[test]
    fn test_display_pads_cents() {
        assert_eq!(Money::from_minor(1205).to_string(), "12.05");
        assert_eq!(Money::from_minor(7).to_string(), "0.07");
        assert_eq!(Money::MAX_PRICE.to_string(), "99999999.99");
    }

    #[test]
    fn test_arithmetic() {
        let price = Money::from_minor(1999);
        assert_eq!(price.checked_mul(3), Some(Money::from_minor(5997)));
        assert_eq!(
            price.checked_add(Money::from_units(1)),
            Some(Money::from_minor(2099))
        );
        assert_eq!(Money::from_minor(i64::MAX).checked_add(Money::from_minor(1)), None);
        assert!(Money::MAX_TOTAL.is_valid_total());
        assert!(!Money::MAX_TOTAL.checked_add(Money::from_minor(1)).unwrap().is_valid_total());
    }

    #[test]
    fn test_serde() {
        let json = serde_json::to_string(&Money::from_minor(1250)).unwrap();
        assert_eq!(json, "\"12.50\"");
        let from_str: Money = serde_json::from_str("\"3.10\"").unwrap();
        assert_eq!(from_str, Money::from_minor(310));
        let from_int: Money = serde_json::from_str("4").unwrap();
        assert_eq!(from_int, Money::from_units(4));
        assert!(serde_json::from_str::<Money>("-4").is_err());
        assert!(serde_json::from_str::<Money>("4.5").is_err());
    }
}
