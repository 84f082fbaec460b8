//! # prolipsi-db: Database Layer for RS Prólipsi
//!
//! Persistence for checkout orders, customer wallets and the van-service
//! billing tables. SQLite through sqlx, with embedded migrations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      RS Prólipsi Data Flow                              │
//! │                                                                         │
//! │  POST /checkout/sessions/{id}/submit                                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    prolipsi-db (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌────────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories  │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │                │    │  (embedded)  │  │   │
//! │  │   │               │    │ OrderRepo      │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ WalletRepo     │    │ 001_initial  │  │   │
//! │  │   │ WAL, FKs on   │    │ InvoiceRepo    │    │ _schema.sql  │  │   │
//! │  │   │               │    │ FeePolicyRepo  │    │              │  │   │
//! │  │   └───────────────┘    └────────────────┘    └──────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database                             │   │
//! │  │   ./prolipsi.db (DATABASE_PATH)                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use prolipsi_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("prolipsi.db")).await?;
//!
//! let balance = db.wallets().get_balance("cli-42").await?;
//! let policy = db.fee_policies().get_for_owner("op-7").await?.resolve();
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::{
    FeePolicyRepository, InvoiceRepository, OrderRepository, PixCharge, WalletRepository,
};
