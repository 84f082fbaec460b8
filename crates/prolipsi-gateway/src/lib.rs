//! # prolipsi-gateway: Outbound HTTP Clients
//!
//! Thin `reqwest` clients for the three external services the checkout
//! talks to. Each one is exposed through a trait so callers can substitute
//! a fake in tests.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  checkout-api                                                           │
//! │       │                                                                 │
//! │       ├── AddressLookup ───► ViaCepClient ──────► viacep.com.br         │
//! │       │                                                                 │
//! │       ├── ShippingQuoter ──► ShippingQuoteClient ► quote service        │
//! │       │        │                                                        │
//! │       │        └── timeout / error / empty ──► prolipsi_core::shipping  │
//! │       │                                        fallback table           │
//! │       │                                                                 │
//! │       └── PaymentGateway ──► MercadoPagoClient ─► api.mercadopago.com   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`config`] - Base URLs, credentials, timeouts
//! - [`viacep`] - Postal code to address
//! - [`shipping`] - Live quotes with fallback
//! - [`mercado_pago`] - Payment creation and status
//! - [`error`] - Gateway error types

pub mod config;
pub mod error;
pub mod mercado_pago;
pub mod shipping;
pub mod viacep;

pub use config::GatewayConfig;
pub use error::{GatewayError, GatewayResult};
pub use mercado_pago::{
    idempotency_key, CardDetails, MercadoPagoClient, Payer, PaymentGateway, PaymentRequest,
    PaymentResponse, PixData,
};
pub use shipping::{
    quote_or_fallback, Package, QuoteOutcome, QuoteSource, ShippingQuoteClient, ShippingQuoter,
};
pub use viacep::{AddressLookup, ViaCepClient};
