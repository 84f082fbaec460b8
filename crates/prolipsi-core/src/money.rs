//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In JavaScript/floating point:                                          │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  Checkout: R$ 149,90 × 10% coupon = R$ 14,990000000000002              │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Centavos                                         │
//! │    14990 centavos × 1000 bps / 10000 = 1499 centavos                   │
//! │    Rounding happens once, explicitly, half-up                          │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use prolipsi_core::money::Money;
//!
//! // Create from centavos (preferred)
//! let price = Money::from_cents(14_990); // R$ 149,90
//!
//! // Arithmetic operations
//! let doubled = price * 2;
//! let total = price + Money::from_cents(1_500);
//! assert_eq!(total.cents(), 16_490);
//! assert_eq!(doubled.to_string(), "R$ 299,80");
//! ```
//!
//! JSON coming from browser front-ends carries reais as floats; those cross
//! into this type exactly once, through [`Money::from_reais_lossy`].
//!
//! Arithmetic saturates at the `i64` bounds instead of overflowing, so the
//! calculators built on it never panic on absurd inputs.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

use crate::types::Rate;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in centavos (1/100 of a real).
///
/// ## Design Decisions
/// - **i64 (signed)**: intermediate results (pre-balance totals after a big
///   flat coupon) may go negative before clamping
/// - **Single field tuple struct**: zero-cost abstraction over i64
/// - **Serialized as centavos**: the wire format is an integer
///
/// ## Where Money is Used
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Product.price_cents ──► subtotal ──┐                                   │
/// │  ShippingQuote.price ──► shipping ──┼──► pre-balance ──► total ──► PIX  │
/// │  OrderBump.price ─────► order bump ─┤      total                        │
/// │  Coupon ──────────────► discount ───┘        ▲                          │
/// │  Wallet ──────────────► balance used ────────┘                          │
/// │                                                                         │
/// │  MonthlyInvoice.amount ──► multa + interest ──► amount payable         │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from centavos.
    ///
    /// ## Example
    /// ```rust
    /// use prolipsi_core::money::Money;
    ///
    /// let price = Money::from_cents(1099); // R$ 10,99
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from reais and centavos.
    ///
    /// ## Example
    /// ```rust
    /// use prolipsi_core::money::Money;
    ///
    /// assert_eq!(Money::from_reais_centavos(10, 99).cents(), 1099);
    /// assert_eq!(Money::from_reais_centavos(-5, 50).cents(), -550);
    /// ```
    ///
    /// ## Note
    /// For negative amounts, only the reais part should be negative.
    #[inline]
    pub const fn from_reais_centavos(reais: i64, centavos: i64) -> Self {
        if reais < 0 {
            Money(reais.saturating_mul(100).saturating_sub(centavos))
        } else {
            Money(reais.saturating_mul(100).saturating_add(centavos))
        }
    }

    /// Converts a float amount in reais, rounding to the nearest centavo.
    ///
    /// NaN and infinities become zero. This is the only place a float turns
    /// into money; the calculators downstream never see NaN.
    ///
    /// ## Example
    /// ```rust
    /// use prolipsi_core::money::Money;
    ///
    /// assert_eq!(Money::from_reais_lossy(149.9).cents(), 14_990);
    /// assert_eq!(Money::from_reais_lossy(f64::NAN).cents(), 0);
    /// ```
    pub fn from_reais_lossy(reais: f64) -> Self {
        if !reais.is_finite() {
            return Money::zero();
        }
        Money((reais * 100.0).round() as i64)
    }

    /// Returns the value in centavos.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the whole reais portion.
    #[inline]
    pub const fn reais(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the centavos portion (always 0-99).
    #[inline]
    pub const fn centavos_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns the amount in reais as a float, for payloads that require it.
    ///
    /// Only use at the edge of the system (e.g. Mercado Pago's
    /// `transaction_amount`). Never feed the result back into arithmetic.
    pub fn to_reais_f64(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns the absolute value.
    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Clamps negative values to zero.
    ///
    /// ## Example
    /// ```rust
    /// use prolipsi_core::money::Money;
    ///
    /// assert_eq!(Money::from_cents(-500).max_zero(), Money::zero());
    /// assert_eq!(Money::from_cents(500).max_zero().cents(), 500);
    /// ```
    #[inline]
    pub fn max_zero(self) -> Self {
        Money(self.0.max(0))
    }

    /// Returns the smaller of two amounts.
    #[inline]
    pub fn min(self, other: Money) -> Self {
        Money(self.0.min(other.0))
    }

    /// Applies a rate to this amount, rounding half away from zero.
    ///
    /// ## Example
    /// ```rust
    /// use prolipsi_core::money::Money;
    /// use prolipsi_core::types::Rate;
    ///
    /// let amount = Money::from_cents(20_000); // R$ 200,00
    /// let multa = amount.percentage(Rate::from_bps(200)); // 2%
    /// assert_eq!(multa.cents(), 400); // R$ 4,00
    /// ```
    pub fn percentage(&self, rate: Rate) -> Money {
        Money(div_round_half_up(
            self.0 as i128 * rate.bps() as i128,
            10_000,
        ))
    }

    /// Multiplies money by a quantity, saturating at the `i64` bounds.
    ///
    /// ## Example
    /// ```rust
    /// use prolipsi_core::money::Money;
    ///
    /// let unit_price = Money::from_cents(4_990);
    /// assert_eq!(unit_price.multiply_quantity(3).cents(), 14_970);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0.saturating_mul(qty))
    }
}

/// Integer division rounding half away from zero.
///
/// Shared by every place that scales money by a ratio so the rounding rule
/// lives in one spot.
pub(crate) fn div_round_half_up(numerator: i128, denominator: i128) -> i64 {
    let half = denominator / 2;
    let rounded = if numerator >= 0 {
        numerator.saturating_add(half) / denominator
    } else {
        numerator.saturating_sub(half) / denominator
    };
    rounded.clamp(i64::MIN as i128, i64::MAX as i128) as i64
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Brazilian format: `R$ 1.234,56`.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let digits = self.reais().abs().to_string();

        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, ch) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push('.');
            }
            grouped.push(ch);
        }

        write!(f, "{}R$ {},{:02}", sign, grouped, self.centavos_part())
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
        Money(self.0.saturating_add(other.0))
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 = self.0.saturating_add(other.0);
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0.saturating_sub(other.0))
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 = self.0.saturating_sub(other.0);
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        self.multiply_quantity(qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cents() {
        let money = Money::from_cents(1099);
        assert_eq!(money.cents(), 1099);
        assert_eq!(money.reais(), 10);
        assert_eq!(money.centavos_part(), 99);
    }

    #[test]
    fn test_from_reais_lossy() {
        assert_eq!(Money::from_reais_lossy(0.1 + 0.2).cents(), 30);
        assert_eq!(Money::from_reais_lossy(25.9).cents(), 2590);
        assert_eq!(Money::from_reais_lossy(-3.456).cents(), -346);
        assert_eq!(Money::from_reais_lossy(f64::NAN), Money::zero());
        assert_eq!(Money::from_reais_lossy(f64::INFINITY), Money::zero());
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_cents(1099).to_string(), "R$ 10,99");
        assert_eq!(Money::from_cents(500).to_string(), "R$ 5,00");
        assert_eq!(Money::from_cents(-550).to_string(), "-R$ 5,50");
        assert_eq!(Money::from_cents(0).to_string(), "R$ 0,00");
        assert_eq!(Money::from_cents(123_456).to_string(), "R$ 1.234,56");
        assert_eq!(Money::from_cents(123_456_789).to_string(), "R$ 1.234.567,89");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);
        assert_eq!((a * 3).cents(), 3000);

        let total: Money = vec![a, b, b].into_iter().sum();
        assert_eq!(total.cents(), 2000);
    }

    #[test]
    fn test_arithmetic_saturates() {
        let max = Money::from_cents(i64::MAX);
        assert_eq!(max + Money::from_cents(1), max);
        assert_eq!(Money::from_cents(i64::MIN) - Money::from_cents(1), Money::from_cents(i64::MIN));
        assert_eq!(Money::from_cents(i64::MAX / 2).multiply_quantity(3), max);
        assert_eq!(Money::from_cents(-10) * i64::MAX, Money::from_cents(i64::MIN));

        let mut acc = max;
        acc += max;
        assert_eq!(acc, max);
        acc -= max;
        assert_eq!(acc, Money::zero());
    }

    #[test]
    fn test_percentage_rounds_half_up() {
        // R$ 0,05 × 10% = 0,5 centavo → 1
        assert_eq!(Money::from_cents(5).percentage(Rate::from_bps(1000)).cents(), 1);
        // R$ 0,04 × 10% = 0,4 centavo → 0
        assert_eq!(Money::from_cents(4).percentage(Rate::from_bps(1000)).cents(), 0);
        // Negative amounts round away from zero as well
        assert_eq!(Money::from_cents(-5).percentage(Rate::from_bps(1000)).cents(), -1);
    }

    #[test]
    fn test_zero_and_clamps() {
        assert!(Money::zero().is_zero());
        assert!(Money::from_cents(1).is_positive());
        assert!(Money::from_cents(-1).is_negative());
        assert_eq!(Money::from_cents(-1).max_zero(), Money::zero());
        assert_eq!(Money::from_cents(300).min(Money::from_cents(200)).cents(), 200);
    }
}
