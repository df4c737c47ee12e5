//! Fixed-point quantities and percentages
//!
//! Line-item quantities (hours, units) and tax rates are stored as integer
//! hundredths so that invoice totals recompute identically from persisted
//! data.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A quantity stored in hundredths (1.5 hours is 150)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quantity(i64);

impl Quantity {
    pub const fn from_hundredths(hundredths: i64) -> Self {
        Self(hundredths)
    }

    /// A whole number of units
    pub const fn whole(units: i64) -> Self {
        Self(units * 100)
    }

    pub const fn one() -> Self {
        Self(100)
    }

    pub const fn zero() -> Self {
        Self(0)
    }

    pub const fn hundredths(&self) -> i64 {
        self.0
    }

    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Parse "1.5", "2", "0.25"
    pub fn parse(s: &str) -> Result<Self, MeasureParseError> {
        parse_hundredths(s).map(Self)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_hundredths(f, self.0)
    }
}

impl std::iter::Sum for Quantity {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        Self(iter.map(|q| q.0).sum())
    }
}

/// A percentage stored in basis points (8.25% is 825)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Percentage(i64);

impl Percentage {
    pub const fn from_basis_points(bp: i64) -> Self {
        Self(bp)
    }

    /// A whole percentage, e.g. `Percentage::whole(10)` is 10%
    pub const fn whole(percent: i64) -> Self {
        Self(percent * 100)
    }

    pub const fn zero() -> Self {
        Self(0)
    }

    pub const fn basis_points(&self) -> i64 {
        self.0
    }

    pub fn as_f64(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// True when the rate lies within [0, 100]
    pub fn is_valid_rate(&self) -> bool {
        (0..=10_000).contains(&self.0)
    }

    /// Parse "10", "8.25", "8.25%"
    pub fn parse(s: &str) -> Result<Self, MeasureParseError> {
        let s = s.trim();
        let s = s.strip_suffix('%').unwrap_or(s);
        parse_hundredths(s).map(Self)
    }
}

impl fmt::Display for Percentage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_hundredths(f, self.0)?;
        write!(f, "%")
    }
}

fn write_hundredths(f: &mut fmt::Formatter<'_>, value: i64) -> fmt::Result {
    let sign = if value < 0 { "-" } else { "" };
    let abs = value.abs();
    write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
}

fn parse_hundredths(s: &str) -> Result<i64, MeasureParseError> {
    let s = s.trim();
    let invalid = || MeasureParseError(s.to_string());

    let (negative, body) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
    };
    if body.is_empty() {
        return Err(invalid());
    }

    let (whole, frac) = match body.split_once('.') {
        Some((w, f)) => (w, f),
        None => (body, ""),
    };
    let digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
    if frac.len() > 2 || !digits(frac) || !digits(whole) {
        return Err(invalid());
    }

    let whole: i64 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| invalid())?
    };
    let frac: i64 = match frac.len() {
        0 => 0,
        1 => frac.parse::<i64>().map_err(|_| invalid())? * 10,
        _ => frac.parse().map_err(|_| invalid())?,
    };

    let value = whole
        .checked_mul(100)
        .and_then(|v| v.checked_add(frac))
        .ok_or_else(invalid)?;
    Ok(if negative { -value } else { value })
}

/// Error returned when a quantity or percentage string cannot be parsed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeasureParseError(pub String);

impl fmt::Display for MeasureParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid decimal value: {}", self.0)
    }
}

impl std::error::Error for MeasureParseError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantity_parse() {
        assert_eq!(Quantity::parse("1.5").unwrap().hundredths(), 150);
        assert_eq!(Quantity::parse("10").unwrap().hundredths(), 1000);
        assert_eq!(Quantity::parse("0.25").unwrap().hundredths(), 25);
        assert_eq!(Quantity::parse(".5").unwrap().hundredths(), 50);
        assert!(Quantity::parse("1.234").is_err());
        assert!(Quantity::parse("--1").is_err());
        assert!(Quantity::parse("+1").is_err());
        assert!(Quantity::parse("1.€").is_err());
        assert!(Quantity::parse("99999999999999999").is_err());
        assert!(Quantity::parse("abc").is_err());
        assert!(Quantity::parse("").is_err());
    }

    #[test]
    fn test_percentage_parse_and_range() {
        let rate = Percentage::parse("8.25%").unwrap();
        assert_eq!(rate.basis_points(), 825);
        assert!(rate.is_valid_rate());

        assert!(Percentage::whole(100).is_valid_rate());
        assert!(!Percentage::parse("100.01").unwrap().is_valid_rate());
        assert!(!Percentage::parse("-1").unwrap().is_valid_rate());
    }

    #[test]
    fn test_display() {
        assert_eq!(Quantity::from_hundredths(150).to_string(), "1.50");
        assert_eq!(Percentage::whole(10).to_string(), "10.00%");
        assert_eq!(Percentage::from_basis_points(-50).to_string(), "-0.50%");
    }
}
