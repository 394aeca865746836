//! # Money Module
//!
//! Provides the `Money` type for handling rupee amounts safely.
//!
//! ## Why Integer Paise?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  Floating point:                                                        │
//! │    1999.99 × 1.2 = 2399.9879999999998  ❌ WRONG!                        │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Paise                                            │
//! │    199999 paise × 12000 bps = 2399988000 (exact, scaled by 10^4)       │
//! │    Rounded once, at the subtotal: 239999 paise = ₹2399.99              │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use tailor_core::money::Money;
//!
//! let price = Money::from_paise(129_900); // ₹1299.00
//! let doubled = price * 2;                // ₹2598.00
//! let total = doubled - Money::from_paise(5_000);
//! assert_eq!(total.paise(), 254_800);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};

/// Paise per rupee.
pub const PAISE_PER_RUPEE: i64 = 100;

/// Scale of basis-point products: `paise × bps` carries four extra digits.
pub const BPS_SCALE: i128 = 10_000;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in paise (1/100 of a rupee).
///
/// Signed so that overpaid orders can report a negative due.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from paise.
    ///
    /// ```rust
    /// use tailor_core::money::Money;
    ///
    /// let price = Money::from_paise(1099); // ₹10.99
    /// assert_eq!(price.paise(), 1099);
    /// ```
    #[inline]
    pub const fn from_paise(paise: i64) -> Self {
        Money(paise)
    }

    /// Creates a Money value from a basis-point-scaled amount, rounding half up.
    ///
    /// `scaled` is `paise × 10_000`; this is the only place where fractional
    /// paise get rounded away. Fails with `AmountOutOfRange` when the result
    /// does not fit in i64 paise.
    ///
    /// ```rust
    /// use tailor_core::money::Money;
    ///
    /// assert_eq!(Money::from_scaled_half_up(12_345_000).unwrap().paise(), 1235);
    /// assert_eq!(Money::from_scaled_half_up(12_344_999).unwrap().paise(), 1234);
    /// assert!(Money::from_scaled_half_up(i128::MAX).is_err());
    /// ```
    pub fn from_scaled_half_up(scaled: i128) -> CoreResult<Self> {
        let half = BPS_SCALE / 2;
        let magnitude = scaled
            .checked_abs()
            .and_then(|abs| abs.checked_add(half))
            .ok_or(CoreError::AmountOutOfRange)?
            / BPS_SCALE;
        let rounded = if scaled >= 0 { magnitude } else { -magnitude };
        i64::try_from(rounded)
            .map(Money)
            .map_err(|_| CoreError::AmountOutOfRange)
    }

    /// Returns the value in paise.
    #[inline]
    pub const fn paise(&self) -> i64 {
        self.0
    }

    /// Returns the whole-rupee portion.
    ///
    /// ```rust
    /// use tailor_core::money::Money;
    ///
    /// assert_eq!(Money::from_paise(1099).rupees(), 10);
    /// assert_eq!(Money::from_paise(-550).rupees(), -5);
    /// ```
    #[inline]
    pub const fn rupees(&self) -> i64 {
        self.0 / PAISE_PER_RUPEE
    }

    /// Returns the paise portion (always 0-99).
    #[inline]
    pub const fn paise_part(&self) -> i64 {
        (self.0 % PAISE_PER_RUPEE).abs()
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
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns `bps` basis points of this amount, rounded half up.
    ///
    /// ```rust
    /// use tailor_core::money::Money;
    ///
    /// let subtotal = Money::from_paise(4_000);
    /// assert_eq!(subtotal.percentage(1_000).unwrap().paise(), 400); // 10%
    /// ```
    pub fn percentage(&self, bps: u32) -> CoreResult<Money> {
        Money::from_scaled_half_up(self.0 as i128 * bps as i128)
    }

    /// Returns the smaller of two amounts.
    #[inline]
    pub fn min(self, other: Money) -> Money {
        if self.0 <= other.0 {
            self
        } else {
            other
        }
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Renders as `₹1234.50` (no digit grouping).
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(
            f,
            "{}₹{}.{:02}",
            sign,
            self.rupees().abs(),
            self.paise_part()
        )
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

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_paise() {
        let money = Money::from_paise(1099);
        assert_eq!(money.paise(), 1099);
        assert_eq!(money.rupees(), 10);
        assert_eq!(money.paise_part(), 99);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Money::from_paise(123_450)), "₹1234.50");
        assert_eq!(format!("{}", Money::from_paise(500)), "₹5.00");
        assert_eq!(format!("{}", Money::from_paise(-550)), "-₹5.50");
        assert_eq!(format!("{}", Money::zero()), "₹0.00");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_paise(1000);
        let b = Money::from_paise(500);

        assert_eq!((a + b).paise(), 1500);
        assert_eq!((a - b).paise(), 500);
        assert_eq!((a * 3).paise(), 3000);

        let mut running = a;
        running += b;
        running -= Money::from_paise(200);
        assert_eq!(running.paise(), 1300);
    }

    #[test]
    fn test_half_up_rounding() {
        // exactly half rounds away from zero
        assert_eq!(Money::from_scaled_half_up(5_000).unwrap().paise(), 1);
        assert_eq!(Money::from_scaled_half_up(4_999).unwrap().paise(), 0);
        assert_eq!(Money::from_scaled_half_up(-5_000).unwrap().paise(), -1);
        assert_eq!(Money::from_scaled_half_up(420_000).unwrap().paise(), 42);
    }

    #[test]
    fn test_scaled_amount_beyond_i64_is_rejected() {
        let max = i64::MAX as i128 * BPS_SCALE;
        assert_eq!(Money::from_scaled_half_up(max).unwrap().paise(), i64::MAX);
        assert!(matches!(
            Money::from_scaled_half_up(max + BPS_SCALE),
            Err(CoreError::AmountOutOfRange)
        ));
        assert!(Money::from_scaled_half_up(i128::MIN).is_err());
    }

    #[test]
    fn test_percentage() {
        let subtotal = Money::from_paise(10_000);
        assert_eq!(subtotal.percentage(1_000).unwrap().paise(), 1_000);
        assert_eq!(subtotal.percentage(2_000).unwrap().paise(), 2_000);

        // 10% of ₹0.05 = 0.5 paise → 1
        assert_eq!(Money::from_paise(5).percentage(1_000).unwrap().paise(), 1);
    }

    #[test]
    fn test_zero_and_checks() {
        let zero = Money::zero();
        assert!(zero.is_zero());
        assert!(!zero.is_positive());
        assert!(!zero.is_negative());

        let negative = Money::from_paise(-100);
        assert!(negative.is_negative());
        assert_eq!(Money::from_paise(3).min(Money::from_paise(2)).paise(), 2);
    }
}
