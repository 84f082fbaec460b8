//! # HTTP Routes
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  /health                              health.rs                         │
//! │  /addresses/{cep}                     address.rs   ── ViaCEP            │
//! │  /shipping/quotes                     shipping.rs  ── live + fallback   │
//! │  /checkout/sessions/...               checkout.rs  ── session + submit  │
//! │  /orders/{id}                         orders.rs                         │
//! │  /billing/...                         billing.rs   ── invoices, fees    │
//! │  /webhooks/mercado-pago               webhook.rs                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod address;
pub mod billing;
pub mod checkout;
pub mod health;
pub mod orders;
pub mod shipping;
pub mod webhook;

use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Builds the complete router.
pub fn create_router(state: AppState) -> Router {
    let checkout = Router::new()
        .route("/checkout/sessions", post(checkout::open_session))
        .route("/checkout/sessions/{id}", get(checkout::get_session))
        .route("/checkout/sessions/{id}/customer", put(checkout::update_customer))
        .route(
            "/checkout/sessions/{id}/shipping-quotes",
            post(checkout::fetch_shipping_quotes),
        )
        .route("/checkout/sessions/{id}/shipping", put(checkout::select_shipping))
        .route("/checkout/sessions/{id}/order-bump", post(checkout::toggle_order_bump))
        .route(
            "/checkout/sessions/{id}/coupon",
            post(checkout::apply_coupon).delete(checkout::remove_coupon),
        )
        .route("/checkout/sessions/{id}/balance", put(checkout::set_balance))
        .route(
            "/checkout/sessions/{id}/payment-method",
            put(checkout::set_payment_method),
        )
        .route("/checkout/sessions/{id}/step", put(checkout::go_to_step))
        .route("/checkout/sessions/{id}/submit", post(checkout::submit));

    let billing = Router::new()
        .route("/billing/late-fee", post(billing::quote_late_fee))
        .route(
            "/billing/invoices",
            post(billing::create_invoice).get(billing::list_invoices),
        )
        .route("/billing/invoices/{id}/late-fee", get(billing::invoice_late_fee))
        .route("/billing/invoices/{id}/pix", post(billing::create_pix_charge))
        .route(
            "/billing/fee-policies/{owner_id}",
            put(billing::save_fee_policy).get(billing::get_fee_policy),
        );

    Router::new()
        .route("/health", get(health::health_check))
        .route("/addresses/{cep}", get(address::lookup_address))
        .route("/shipping/quotes", post(shipping::quote_shipping))
        .route("/orders/{id}", get(orders::get_order))
        .route("/webhooks/mercado-pago", post(webhook::mercado_pago))
        .merge(checkout)
        .merge(billing)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
