//! # Repository Module
//!
//! Database repositories for RS Prólipsi.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  axum handler                                                           │
//! │       │                                                                 │
//! │       │  db.orders().insert_with_items(&order, &items)                 │
//! │       ▼                                                                 │
//! │  OrderRepository ──┐                                                    │
//! │  WalletRepository ─┼── SQL lives here and nowhere else                  │
//! │  InvoiceRepository │                                                    │
//! │  FeePolicyRepository                                                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database                                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Queries are built at runtime with `sqlx::query` / `sqlx::query_as` and
//! positional binds, so the crate builds without a live database.
//!
//! ## Available Repositories
//!
//! - [`OrderRepository`] - Submitted orders, line items, payment status
//! - [`WalletRepository`] - Customer credit balances
//! - [`InvoiceRepository`] - Van-service monthly invoices and PIX charges
//! - [`FeePolicyRepository`] - Per-operator late-fee settings

pub mod fee_policy;
pub mod invoice;
pub mod order;
pub mod wallet;

pub use fee_policy::FeePolicyRepository;
pub use invoice::{InvoiceRepository, PixCharge};
pub use order::OrderRepository;
pub use wallet::WalletRepository;
