//! # Domain Types
//!
//! Core domain types shared by the checkout, billing and persistence layers.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  Checkout                         Billing (van service)                 │
//! │  ┌─────────────────┐              ┌─────────────────┐                   │
//! │  │ CheckoutProduct │              │ MonthlyInvoice  │                   │
//! │  │ OrderBumpOffer  │              │  amount_cents   │                   │
//! │  │ Customer        │              │  due_day        │                   │
//! │  │ Address         │              │  status         │                   │
//! │  └────────┬────────┘              │  pix_*          │                   │
//! │           │ submit                └─────────────────┘                   │
//! │  ┌────────▼────────┐  ┌──────────┐                                      │
//! │  │     Order       │◄─┤OrderItem │   WalletAccount (credit balance)     │
//! │  │  *_cents        │  └──────────┘                                      │
//! │  │  status         │                                                    │
//! │  │  payment_id     │   Rate (bps) ── PaymentMethod ── PaymentStatus     │
//! │  └─────────────────┘                                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Persisted entities keep amounts as `*_cents: i64` columns and expose
//! [`Money`] accessors, so rows map one-to-one onto the SQLite schema.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Rate
// =============================================================================

/// A percentage in basis points (bps).
///
/// 1 basis point = 0.01% = 1/10000, so 200 bps = 2% and 10000 bps = 100%.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Rate(u32);

impl Rate {
    /// Creates a rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        Rate(bps)
    }

    /// Creates a rate from a percentage (`2.5` → 250 bps).
    ///
    /// NaN, infinities and negative values become zero.
    pub fn from_percentage(pct: f64) -> Self {
        if !pct.is_finite() || pct <= 0.0 {
            return Rate::zero();
        }
        Rate((pct * 100.0).round() as u32)
    }

    /// Creates a rate from a fraction (`0.1` → 1000 bps).
    pub fn from_fraction(fraction: f64) -> Self {
        Rate::from_percentage(fraction * 100.0)
    }

    /// Returns the rate in basis points.
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
        Rate(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for Rate {
    fn default() -> Self {
        Rate::zero()
    }
}

// =============================================================================
// Checkout Catalog
// =============================================================================

/// Whether the item ships physically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ProductKind {
    #[default]
    Physical,
    /// Delivered electronically; never charged shipping.
    Digital,
}

/// The primary product sold by a checkout page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutProduct {
    pub id: String,
    pub name: String,
    /// Price in centavos.
    pub price_cents: i64,
    #[serde(default)]
    pub kind: ProductKind,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl CheckoutProduct {
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    #[inline]
    pub fn is_digital(&self) -> bool {
        self.kind == ProductKind::Digital
    }
}

/// An optional add-on offered next to the primary product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct OrderBumpOffer {
    pub id: String,
    pub name: String,
    pub price_cents: i64,
}

impl OrderBumpOffer {
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }
}

// =============================================================================
// Customer
// =============================================================================

/// Delivery address, as filled from a ViaCEP lookup plus the house number.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub postal_code: String,
    pub street: String,
    pub number: String,
    #[serde(default)]
    pub complement: Option<String>,
    pub neighborhood: String,
    pub city: String,
    /// Two-letter UF code ("SP", "RJ", ...).
    pub state: String,
}

/// Buyer identification collected in the first checkout step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub email: String,
    pub cpf: String,
    pub name: String,
    pub phone: String,
    /// `dd/mm/yyyy`, as typed.
    pub birth_date: String,
    pub has_accepted_terms: bool,
    #[serde(default)]
    pub address: Option<Address>,
}

// =============================================================================
// Payment Method
// =============================================================================

#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[default]
    CreditCard,
    Pix,
    Boleto,
    /// The whole amount was covered by the customer's wallet balance.
    WalletBalance,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::CreditCard => "credit_card",
            PaymentMethod::Pix => "pix",
            PaymentMethod::Boleto => "boleto",
            PaymentMethod::WalletBalance => "wallet_balance",
        }
    }
}

// =============================================================================
// Payment Status
// =============================================================================

/// Outcome reported by the payment provider.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Approved,
    /// Created but not settled yet (PIX waiting for the QR code to be paid,
    /// boleto waiting for compensation, card under review).
    Pending,
    Failed,
}

impl PaymentStatus {
    /// Maps a Mercado Pago payment status string.
    ///
    /// ## Example
    /// ```rust
    /// use prolipsi_core::PaymentStatus;
    ///
    /// assert_eq!(PaymentStatus::from_gateway("approved"), PaymentStatus::Approved);
    /// assert_eq!(PaymentStatus::from_gateway("in_process"), PaymentStatus::Pending);
    /// assert_eq!(PaymentStatus::from_gateway("rejected"), PaymentStatus::Failed);
    /// ```
    pub fn from_gateway(status: &str) -> Self {
        match status {
            "approved" => PaymentStatus::Approved,
            "pending" | "in_process" | "authorized" | "in_mediation" => PaymentStatus::Pending,
            _ => PaymentStatus::Failed,
        }
    }

    /// Whether the checkout may show the success screen.
    pub fn is_accepted(&self) -> bool {
        matches!(self, PaymentStatus::Approved | PaymentStatus::Pending)
    }
}

// =============================================================================
// Order
// =============================================================================

#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    AwaitingPayment,
    Paid,
    Failed,
    Cancelled,
}

impl OrderStatus {
    /// Status an order moves to after the provider reports `status`.
    pub fn after_payment(status: PaymentStatus) -> Self {
        match status {
            PaymentStatus::Approved => OrderStatus::Paid,
            PaymentStatus::Pending => OrderStatus::AwaitingPayment,
            PaymentStatus::Failed => OrderStatus::Failed,
        }
    }
}

/// A submitted checkout. Amounts are frozen from the order summary at the
/// moment of submission.
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    pub customer_email: String,
    pub customer_name: String,
    pub customer_cpf: String,
    pub referral_code: Option<String>,
    pub wallet_owner_id: Option<String>,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub subtotal_cents: i64,
    pub shipping_cents: i64,
    pub order_bump_cents: i64,
    pub discount_cents: i64,
    pub balance_used_cents: i64,
    pub total_cents: i64,
    pub loyalty_points: i64,
    pub coupon_code: Option<String>,
    pub shipping_service: Option<String>,
    /// Provider payment id, once a charge exists.
    pub payment_id: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Order {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    #[inline]
    pub fn balance_used(&self) -> Money {
        Money::from_cents(self.balance_used_cents)
    }

    /// Reference sent to the payment provider and echoed back in webhooks.
    pub fn external_reference(&self) -> String {
        format!("{}{}", ORDER_REFERENCE_PREFIX, self.id)
    }
}

/// Prefix of provider references that point at orders.
pub const ORDER_REFERENCE_PREFIX: &str = "ORD-";

/// Prefix of provider references that point at monthly invoices.
pub const INVOICE_REFERENCE_PREFIX: &str = "PAG-";

/// A line of a submitted order (snapshot pattern: name and price frozen).
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: String,
    pub order_id: String,
    pub product_id: String,
    pub name_snapshot: String,
    pub unit_price_cents: i64,
    pub quantity: i64,
    pub line_total_cents: i64,
    pub is_order_bump: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// Stored credit a customer can apply at checkout.
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct WalletAccount {
    pub owner_id: String,
    pub balance_cents: i64,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl WalletAccount {
    #[inline]
    pub fn balance(&self) -> Money {
        Money::from_cents(self.balance_cents)
    }
}

// =============================================================================
// Monthly Invoice (van service)
// =============================================================================

#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    #[default]
    Pending,
    Paid,
    Cancelled,
}

/// A monthly charge a transport operator bills to a student's guardian.
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyInvoice {
    pub id: String,
    /// The transport operator who receives the payment.
    pub owner_id: String,
    pub student_name: String,
    pub payer_email: Option<String>,
    pub payer_cpf: Option<String>,
    pub amount_cents: i64,
    /// Student's contracted due day; takes priority over `due_date`.
    pub due_day: Option<i64>,
    #[ts(as = "Option<String>")]
    pub due_date: Option<NaiveDate>,
    pub status: InvoiceStatus,
    pub pix_payment_id: Option<String>,
    pub pix_qr_code: Option<String>,
    pub pix_qr_code_base64: Option<String>,
    /// Amount of the last PIX charge, late fees included.
    pub charged_amount_cents: Option<i64>,
    #[ts(as = "Option<String>")]
    pub paid_on: Option<NaiveDate>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl MonthlyInvoice {
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }

    pub fn external_reference(&self) -> String {
        format!("{}{}", INVOICE_REFERENCE_PREFIX, self.id)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_constructors() {
        assert_eq!(Rate::from_percentage(2.0).bps(), 200);
        assert_eq!(Rate::from_percentage(8.25).bps(), 825);
        assert_eq!(Rate::from_fraction(0.1).bps(), 1000);
        assert_eq!(Rate::from_percentage(f64::NAN), Rate::zero());
        assert_eq!(Rate::from_percentage(-3.0), Rate::zero());
        assert!((Rate::from_bps(150).percentage() - 1.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_payment_status_mapping() {
        assert_eq!(PaymentStatus::from_gateway("approved"), PaymentStatus::Approved);
        assert_eq!(PaymentStatus::from_gateway("pending"), PaymentStatus::Pending);
        assert_eq!(PaymentStatus::from_gateway("authorized"), PaymentStatus::Pending);
        assert_eq!(PaymentStatus::from_gateway("cancelled"), PaymentStatus::Failed);
        assert_eq!(PaymentStatus::from_gateway(""), PaymentStatus::Failed);
        assert!(PaymentStatus::Pending.is_accepted());
        assert!(!PaymentStatus::Failed.is_accepted());
    }

    #[test]
    fn test_order_status_after_payment() {
        assert_eq!(OrderStatus::after_payment(PaymentStatus::Approved), OrderStatus::Paid);
        assert_eq!(
            OrderStatus::after_payment(PaymentStatus::Pending),
            OrderStatus::AwaitingPayment
        );
        assert_eq!(OrderStatus::after_payment(PaymentStatus::Failed), OrderStatus::Failed);
    }

    #[test]
    fn test_product_kind_defaults_to_physical() {
        let product: CheckoutProduct =
            serde_json::from_str(r#"{"id":"p1","name":"Kit","priceCents":1000}"#).unwrap();
        assert_eq!(product.kind, ProductKind::Physical);
        assert!(!product.is_digital());
    }

    #[test]
    fn test_payment_method_wire_names() {
        assert_eq!(
            serde_json::to_string(&PaymentMethod::WalletBalance).unwrap(),
            "\"wallet_balance\""
        );
        assert_eq!(PaymentMethod::Pix.as_str(), "pix");
    }
}
