//! # Checkout
//!
//! Everything the hosted checkout needs to go from "buyer opened the link"
//! to "order ready to charge":
//!
//! - [`summary`] - the pure order-total calculator
//! - [`coupon`] - coupon codes and the per-offer coupon book
//! - [`session`] - the step-by-step checkout state and its navigation rules

pub mod coupon;
pub mod session;
pub mod summary;

pub use coupon::{Coupon, CouponBook};
pub use session::{CheckoutOffer, CheckoutSession, CheckoutStep, PaymentIntent};
pub use summary::{calculate_order_summary, CouponDiscount, OrderInputs, OrderSummary, PointsRate};
