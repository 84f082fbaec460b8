//! # Order Summary Calculator
//!
//! Derives the checkout totals from the current selections. The summary is
//! never stored while the buyer is still choosing: every change to an input
//! re-runs [`calculate_order_summary`].
//!
//! ## Calculation Pipeline
//! ```text
//! unit_price × quantity ─────────────► subtotal ─────┐
//! selected quote (0 if digital) ─────► shipping ─────┤
//! order bump (if selected) ──────────► order_bump ───┤
//! coupon (flat | fraction of         ► discount ─────┤ (−)
//!         subtotal + order_bump)                     │
//!                                                    ▼
//!                                          pre-balance total
//!                                                    │
//! min(requested, wallet, pre-balance) ─► balance_used (−), never < 0
//!                                                    │
//!                                                    ▼
//!                                    total = max(0, pre-balance − balance)
//!                                                    │
//!                                                    ▼
//!                               loyalty_points = floor(total × points rate)
//! ```
//!
//! Every branch is total: negative or missing inputs are clamped to zero
//! instead of producing an error.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::{ProductKind, Rate};

// =============================================================================
// Coupon Discount
// =============================================================================

/// How a coupon reduces the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum CouponDiscount {
    /// Fixed amount off.
    Flat(Money),
    /// Fraction of subtotal + order bump (shipping is never discounted).
    Fraction(Rate),
}

impl CouponDiscount {
    /// Interprets a stored coupon value the way coupon tables hold it:
    /// anything below 1 is a fraction (`0.1` = 10 %), anything else is an
    /// amount in reais (`25` = R$ 25,00). NaN counts as 0.
    ///
    /// ## Example
    /// ```rust
    /// use prolipsi_core::checkout::CouponDiscount;
    /// use prolipsi_core::money::Money;
    /// use prolipsi_core::types::Rate;
    ///
    /// assert_eq!(CouponDiscount::from_stored_value(0.1), CouponDiscount::Fraction(Rate::from_bps(1000)));
    /// assert_eq!(CouponDiscount::from_stored_value(25.0), CouponDiscount::Flat(Money::from_cents(2500)));
    /// ```
    pub fn from_stored_value(value: f64) -> Self {
        let value = if value.is_finite() { value } else { 0.0 };
        if value < 1.0 {
            CouponDiscount::Fraction(Rate::from_fraction(value))
        } else {
            CouponDiscount::Flat(Money::from_reais_lossy(value))
        }
    }

    /// Amount taken off, given the discountable base (subtotal + bump).
    pub fn amount_off(&self, discountable: Money) -> Money {
        match self {
            CouponDiscount::Flat(amount) => amount.max_zero(),
            CouponDiscount::Fraction(rate) => discountable.max_zero().percentage(*rate),
        }
    }
}

// =============================================================================
// Points Rate
// =============================================================================

/// Loyalty points earned per real, stored in thousandths of a point.
///
/// `PointsRate::from_multiplier(1.5)` earns 1.5 points per R$ 1,00.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PointsRate(u32);

impl PointsRate {
    /// One point per real.
    pub const ONE_PER_REAL: PointsRate = PointsRate(1_000);

    #[inline]
    pub const fn from_milli(milli_points_per_real: u32) -> Self {
        PointsRate(milli_points_per_real)
    }

    /// Lossy conversion from a float multiplier; NaN and negatives become 0.
    pub fn from_multiplier(multiplier: f64) -> Self {
        if !multiplier.is_finite() || multiplier <= 0.0 {
            return PointsRate(0);
        }
        PointsRate((multiplier * 1_000.0).round() as u32)
    }

    #[inline]
    pub const fn milli(&self) -> u32 {
        self.0
    }

    /// `floor(total × multiplier)`, never negative.
    pub fn points_for(&self, total: Money) -> i64 {
        let cents = total.cents().max(0) as i128;
        // cents × milli / (100 cents × 1000 milli)
        (cents * self.0 as i128 / 100_000) as i64
    }
}

impl Default for PointsRate {
    fn default() -> Self {
        PointsRate::ONE_PER_REAL
    }
}

// =============================================================================
// Inputs & Summary
// =============================================================================

/// Everything the calculator looks at.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderInputs {
    pub product_kind: ProductKind,
    pub unit_price: Money,
    pub quantity: i64,
    /// Price of the selected shipping quote, if any.
    pub shipping_quote: Option<Money>,
    /// Price of the order bump when the buyer ticked it.
    pub order_bump: Option<Money>,
    pub coupon: Option<CouponDiscount>,
    /// Balance the buyer asked to use.
    pub requested_balance: Money,
    /// Balance available in the buyer's wallet.
    pub wallet_balance: Money,
    pub points_rate: PointsRate,
}

/// Derived checkout totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummary {
    pub subtotal: Money,
    pub shipping: Money,
    pub order_bump: Money,
    pub discount: Money,
    pub balance_used: Money,
    pub total: Money,
    pub loyalty_points: i64,
}

impl OrderSummary {
    /// Amount owed before the wallet balance is applied (may be negative
    /// when a flat coupon exceeds the order).
    pub fn pre_balance_total(&self) -> Money {
        self.subtotal + self.shipping + self.order_bump - self.discount
    }

    /// Whether the wallet balance covers the whole order.
    pub fn is_covered_by_balance(&self) -> bool {
        self.total.is_zero() && self.balance_used.is_positive()
    }
}

/// Computes the order summary.
///
/// ## Example
/// ```rust
/// use prolipsi_core::checkout::{calculate_order_summary, CouponDiscount, OrderInputs};
/// use prolipsi_core::money::Money;
///
/// let summary = calculate_order_summary(&OrderInputs {
///     unit_price: Money::from_cents(15_000),
///     quantity: 1,
///     coupon: Some(CouponDiscount::from_stored_value(0.1)),
///     ..OrderInputs::default()
/// });
/// assert_eq!(summary.discount.cents(), 1_500);
/// assert_eq!(summary.total.cents(), 13_500);
/// ```
pub fn calculate_order_summary(inputs: &OrderInputs) -> OrderSummary {
    let subtotal = inputs
        .unit_price
        .max_zero()
        .multiply_quantity(inputs.quantity.max(0));

    let shipping = match inputs.product_kind {
        ProductKind::Digital => Money::zero(),
        ProductKind::Physical => inputs.shipping_quote.unwrap_or_default().max_zero(),
    };

    let order_bump = inputs.order_bump.unwrap_or_default().max_zero();

    let discount = inputs
        .coupon
        .map(|coupon| coupon.amount_off(subtotal + order_bump))
        .unwrap_or_default();

    let pre_balance_total = subtotal + shipping + order_bump - discount;

    let balance_used = inputs
        .requested_balance
        .min(inputs.wallet_balance)
        .min(pre_balance_total)
        .max_zero();

    let total = (pre_balance_total - balance_used).max_zero();

    OrderSummary {
        subtotal,
        shipping,
        order_bump,
        discount,
        balance_used,
        total,
        loyalty_points: inputs.points_rate.points_for(total),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
