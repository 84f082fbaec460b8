//! # prolipsi-core: Pure Business Logic for RS Prólipsi
//!
//! This crate holds the arithmetic and rules behind the checkout and the
//! van-service billing: order totals, coupons, wallet offsets, loyalty
//! points, late fees on monthly invoices and the fallback shipping table.
//! Every function is pure; callers supply "today" and any fetched data.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     RS Prólipsi Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              Front-ends (checkout, admin, CD, fleet)            │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ JSON over HTTPS                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    checkout-api (axum)                          │   │
//! │  └──────────┬──────────────────┬───────────────────┬──────────────┘   │
//! │             │                  │                   │                   │
//! │  ┌──────────▼─────────┐ ┌──────▼──────────┐ ┌──────▼──────────────┐   │
//! │  │ ★ prolipsi-core ★  │ │  prolipsi-db    │ │  prolipsi-gateway   │   │
//! │  │                    │ │  SQLite         │ │  ViaCEP, frete,     │   │
//! │  │ money  checkout    │ │                 │ │  Mercado Pago       │   │
//! │  │ late_fee shipping  │ └─────────────────┘ └─────────────────────┘   │
//! │  │ postal_code        │                                                │
//! │  │ validation types   │  NO I/O • NO DATABASE • NO NETWORK             │
//! │  └────────────────────┘                                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - Money type with integer centavos (no floating point!)
//! - [`types`] - Domain types (orders, invoices, payment methods, rates)
//! - [`checkout`] - Order summary calculator, coupons, checkout session
//! - [`late_fee`] - Multa and interest on overdue monthly invoices
//! - [`shipping`] - Fallback shipping quotes bucketed by CEP region
//! - [`postal_code`] - CEP parsing and formatting
//! - [`validation`] - Input validation (CPF, e-mail, phone, address)
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use prolipsi_core::checkout::{calculate_order_summary, CouponDiscount, OrderInputs};
//! use prolipsi_core::money::Money;
//!
//! let inputs = OrderInputs {
//!     unit_price: Money::from_cents(10_000),
//!     quantity: 1,
//!     shipping_quote: Some(Money::from_cents(1_500)),
//!     coupon: Some(CouponDiscount::Flat(Money::from_cents(1_000))),
//!     requested_balance: Money::from_cents(20_000),
//!     wallet_balance: Money::from_cents(5_000),
//!     ..OrderInputs::default()
//! };
//!
//! let summary = calculate_order_summary(&inputs);
//! assert_eq!(summary.balance_used.cents(), 5_000);
//! assert_eq!(summary.total.cents(), 5_500);
//! ```

pub mod checkout;
pub mod error;
pub mod late_fee;
pub mod money;
pub mod postal_code;
pub mod shipping;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use postal_code::PostalCode;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum quantity of the primary item in a single checkout.
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Maximum number of card installments offered at checkout.
pub const MAX_INSTALLMENTS: u32 = 12;
