//! Player prices and squad budgets

use rust_decimal::{prelude::ToPrimitive, Decimal};
use serde::{Deserialize, Serialize};
use std::iter::Sum;
use std::ops::{Add, Sub};
use std::str::FromStr;

use crate::RulesError;

/// Price in millions, held as whole tenths of a million
///
/// Example: 5.5m = 55 tenths, the default 50.0m budget = 500 tenths
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Price {
    tenths: i64,
}

impl Price {
    pub const ZERO: Price = Price { tenths: 0 };

    /// Create a price from tenths of a million
    pub fn from_tenths(tenths: i64) -> Self {
        Self { tenths }
    }

    /// Create a price from whole millions
    pub fn from_millions(millions: i64) -> Self {
        Self { tenths: millions * 10 }
    }

    pub fn to_tenths(self) -> i64 {
        self.tenths
    }

    /// Get the value in millions as a decimal
    pub fn to_decimal(self) -> Decimal {
        Decimal::new(self.tenths, 1)
    }

    /// Create from decimal millions, rounded to one decimal place
    ///
    /// Fails when the value has no `i64` count of tenths.
    pub fn from_decimal(decimal: Decimal) -> Result<Self, RulesError> {
        decimal
            .checked_mul(Decimal::TEN)
            .and_then(|tenths| tenths.round().to_i64())
            .map(Self::from_tenths)
            .ok_or_else(|| RulesError::InvalidPrice(format!("{decimal} is out of range")))
    }

    pub fn is_negative(self) -> bool {
        self.tenths < 0
    }
}

impl Add for Price {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self { tenths: self.tenths.saturating_add(other.tenths) }
    }
}

impl Sub for Price {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self { tenths: self.tenths.saturating_sub(other.tenths) }
    }
}

impl Sum for Price {
    fn sum<I: Iterator<Item = Price>>(iter: I) -> Self {
        iter.fold(Price::ZERO, |acc, p| acc + p)
    }
}

impl TryFrom<Decimal> for Price {
    type Error = RulesError;

    fn try_from(decimal: Decimal) -> Result<Self, Self::Error> {
        Price::from_decimal(decimal)
    }
}

impl From<Price> for Decimal {
    fn from(price: Price) -> Self {
        price.to_decimal()
    }
}

impl FromStr for Price {
    type Err = RulesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_end_matches('m');
        let decimal =
            Decimal::from_str(trimmed).map_err(|e| RulesError::InvalidPrice(format!("{s}: {e}")))?;
        Price::from_decimal(decimal)
    }
}

impl std::fmt::Display for Price {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}m", self.to_decimal())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_creation() {
        let price = Price::from_tenths(55);
        assert_eq!(price.to_decimal(), Decimal::new(55, 1));
        assert_eq!(Price::from_millions(50), Price::from_tenths(500));
    }

    #[test]
    fn test_price_arithmetic() {
        let a = Price::from_tenths(75);
        let b = Price::from_tenths(45);

        assert_eq!(a + b, Price::from_millions(12));
        assert_eq!(a - b, Price::from_millions(3));
        assert_eq!(vec![a, b, b].into_iter().sum::<Price>(), Price::from_tenths(165));
    }

    #[test]
    fn test_decimal_rounding() {
        assert_eq!(Price::from_decimal(Decimal::new(549, 2)), Ok(Price::from_tenths(55)));
        assert_eq!(Price::from_decimal(Decimal::new(5, 0)), Ok(Price::from_tenths(50)));
    }

    #[test]
    fn test_out_of_range_rejected() {
        // More tenths than an i64 holds
        assert!(matches!(
            "2000000000000000000".parse::<Price>(),
            Err(RulesError::InvalidPrice(_))
        ));
        // Scaling Decimal::MAX by ten overflows the decimal itself
        assert!(matches!(
            "79228162514264337593543950335".parse::<Price>(),
            Err(RulesError::InvalidPrice(_))
        ));
        assert!(Price::try_from(Decimal::MAX).is_err());
        assert!(serde_json::from_str::<Price>("\"2000000000000000000\"").is_err());
        assert_eq!(serde_json::from_str::<Price>("\"4.5\"").unwrap(), Price::from_tenths(45));
    }

    #[test]
    fn test_parse_and_display() {
        let price: Price = "7.5m".parse().unwrap();
        assert_eq!(price, Price::from_tenths(75));
        assert_eq!(price.to_string(), "7.5m");
        assert_eq!("50".parse::<Price>().unwrap().to_string(), "50.0m");
        assert!("abc".parse::<Price>().is_err());
    }
}
