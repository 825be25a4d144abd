//! # Money Module
//!
//! Provides `Money` (integer cents) and `TaxRate` (basis points).
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  Invoice totals cross two systems and a wire format:                    │
//! │    Source store  ──►  mapper  ──►  Target document                      │
//! │    Target ledger ──►  mapper  ──►  Source payment                       │
//! │                                                                         │
//! │  A float drifts by a cent somewhere on that path and the ledgers        │
//! │  no longer reconcile. Every amount is therefore held in cents (i64)     │
//! │  and every rate in basis points (u32). Text and JSON amounts are        │
//! │  parsed digit by digit, never through f64.                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use syncbridge_core::money::{Money, TaxRate};
//!
//! let ht = Money::parse("1 250,40").unwrap();
//! assert_eq!(ht.cents(), 125_040);
//!
//! let tva = ht.calculate_tax(TaxRate::from_bps(2000));
//! assert_eq!(tva.cents(), 25_008);
//! assert_eq!((ht + tva).to_string(), "1500.48");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

use crate::error::{CoreError, CoreResult};

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (cents).
///
/// Signed, so credit notes and refunds keep their sign through the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the whole-unit portion (truncated toward zero).
    #[inline]
    pub const fn units(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the cents portion (always 0-99).
    #[inline]
    pub const fn cents_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Parses a decimal amount as written by either system.
    ///
    /// ## Accepted Forms
    /// - `.` or `,` as decimal separator: `"12.50"`, `"12,50"`
    /// - spaces and `_` as thousands separators: `"1 250,40"`
    /// - a leading sign: `"-3.2"`, `"+3.2"`
    ///
    /// Digits past the second decimal are rounded half away from zero on the
    /// third decimal; the rest are ignored.
    pub fn parse(input: &str) -> CoreResult<Self> {
        parse_scaled(input).map(Money)
    }

    /// Calculates tax on this amount, rounding half up on the cent.
    ///
    /// Formula: `(amount_cents * bps + 5000) / 10000`
    pub fn calculate_tax(&self, rate: TaxRate) -> Money {
        // i128 so large invoice totals cannot overflow
        let tax_cents = (self.0 as i128 * rate.bps() as i128 + 5000) / 10000;
        Money::from_cents(tax_cents as i64)
    }
}

/// Renders as a plain decimal (`-12.05`), currency-agnostic.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, self.units().abs(), self.cents_part())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Neg for Money {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Money(-self.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// 1 basis point = 0.01%, so 2000 bps = 20% and 550 bps = 5.5%.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TaxRate(u32);

impl TaxRate {
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Creates a tax rate from a percentage (for convenience).
    pub fn from_percentage(pct: f64) -> CoreResult<Self> {
        if !pct.is_finite() || pct < 0.0 {
            return Err(CoreError::InvalidTaxRate(pct.to_string()));
        }
        Ok(TaxRate((pct * 100.0).round() as u32))
    }

    /// Parses a percentage written as text (`"20"`, `"5,5"`).
    pub fn parse(input: &str) -> CoreResult<Self> {
        let bps = parse_scaled(input)?;
        u32::try_from(bps)
            .map(TaxRate)
            .map_err(|_| CoreError::InvalidTaxRate(input.to_string()))
    }

    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }
}

impl fmt::Display for TaxRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}%", self.0 / 100, self.0 % 100)
    }
}

// =============================================================================
// Decimal Parsing
// =============================================================================

/// Parses a decimal string into an integer scaled by 100.
fn parse_scaled(input: &str) -> CoreResult<i64> {
    let invalid = |reason: &str| CoreError::InvalidAmount {
        value: input.to_string(),
        reason: reason.to_string(),
    };

    let cleaned: String = input
        .trim()
        .chars()
        .filter(|c| !matches!(c, ' ' | '_' | '\u{a0}'))
        .collect();

    let (negative, digits) = match cleaned.as_bytes().first() {
        Some(b'-') => (true, &cleaned[1..]),
        Some(b'+') => (false, &cleaned[1..]),
        Some(_) => (false, cleaned.as_str()),
        None => return Err(invalid("empty")),
    };

    let mut parts = digits.splitn(2, ['.', ',']);
    let whole = parts.next().unwrap_or_default();
    let fraction = parts.next().unwrap_or_default();

    if whole.is_empty() && fraction.is_empty() {
        return Err(invalid("no digits"));
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !fraction.chars().all(|c| c.is_ascii_digit())
    {
        return Err(invalid("unexpected character"));
    }

    let whole_value: i64 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| invalid("out of range"))?
    };

    let mut frac_digits = fraction.chars().map(|c| c as i64 - '0' as i64);
    let tenths = frac_digits.next().unwrap_or(0);
    let hundredths = frac_digits.next().unwrap_or(0);
    let round_up = frac_digits.next().unwrap_or(0) >= 5;

    let scaled = whole_value
        .checked_mul(100)
        .and_then(|v| v.checked_add(tenths * 10 + hundredths + i64::from(round_up)))
        .ok_or_else(|| invalid("out of range"))?;

    Ok(if negative { -scaled } else { scaled })
}

// =============================================================================
// Unit Tests
// =============================================================================
