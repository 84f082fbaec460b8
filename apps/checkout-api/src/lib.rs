//! # RS Prólipsi Checkout API
//!
//! HTTP service behind the product checkout and the van-billing screens.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Checkout API                                     │
//! │                                                                         │
//! │  Browser ───► axum (8080) ───► routes ───► prolipsi-core (totals, fees) │
//! │                                  │                                      │
//! │                     ┌────────────┼──────────────┐                       │
//! │                     ▼            ▼              ▼                       │
//! │               SessionStore   prolipsi-db   prolipsi-gateway             │
//! │               (in memory)    (SQLite)      ViaCEP · frete · Mercado Pago│
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration
//! Environment variables:
//! - `HTTP_PORT` - Listen port (default: 8080)
//! - `DATABASE_PATH` - SQLite file (default: ./prolipsi.db)
//! - `CHECKOUT_OFFER_PATH` - TOML file with product, order bump and coupons
//! - `VIACEP_URL` - Address lookup base URL
//! - `SHIPPING_QUOTE_URL` - Live shipping quote endpoint (fallback table when unset)
//! - `SHIPPING_TIMEOUT_MS` - Live quote timeout (default: 3000)
//! - `SHIPPING_ORIGIN_CEP` - Postal code parcels ship from
//! - `MERCADO_PAGO_URL` - Payment API base URL
//! - `MERCADO_PAGO_ACCESS_TOKEN` - Payment API token
//! - `MERCADO_PAGO_NOTIFICATION_URL` - Webhook URL sent with each payment
//! - `SESSION_IDLE_MINUTES` - Idle checkout sessions are dropped after this (default: 60)

pub mod config;
pub mod error;
pub mod routes;
pub mod state;

// Re-exports
pub use config::{ApiConfig, ConfigError, LoadedOffer};
pub use error::{ApiError, ApiResult, ErrorCode};
pub use routes::create_router;
pub use state::{AppState, Clock, SessionStore};
