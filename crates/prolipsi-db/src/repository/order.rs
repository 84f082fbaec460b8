//! # Order Repository
//!
//! Database operations for submitted checkout orders and their items.
//!
//! ## Order Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Order Lifecycle                                   │
//! │                                                                         │
//! │  1. SUBMIT (one transaction)                                           │
//! │     ├── INSERT orders        { status: awaiting_payment }              │
//! │     ├── INSERT order_items   (name/price snapshots)                    │
//! │     └── UPDATE wallet_accounts  (balance reserved, if used)            │
//! │                                                                         │
//! │  2. CHARGE                                                             │
//! │     └── set_payment_reference() ← provider payment id                  │
//! │                                                                         │
//! │  3. SETTLE (only from awaiting_payment, idempotent)                    │
//! │     ├── mark_paid()    ← approved at submit time or by webhook         │
//! │     └── mark_failed()  ← refused; reserved balance credited back       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! An order therefore holds wallet balance only while it is awaiting
//! payment or paid. Failed orders never keep a debit.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info};

use super::wallet::{credit_in, debit_in};
use crate::error::{DbError, DbResult};
use prolipsi_core::{Money, Order, OrderItem, OrderStatus};

const ORDER_COLUMNS: &str = r#"
    id, customer_email, customer_name, customer_cpf, referral_code, wallet_owner_id,
    status, payment_method,
    subtotal_cents, shipping_cents, order_bump_cents, discount_cents,
    balance_used_cents, total_cents, loyalty_points,
    coupon_code, shipping_service, payment_id,
    created_at, updated_at
"#;

/// Repository for order database operations.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Persists an order with its items.
    ///
    /// When the order uses wallet balance the debit happens in the same
    /// transaction; if the wallet no longer holds enough, nothing is written
    /// and [`DbError::InsufficientBalance`] is returned.
    pub async fn insert_with_items(&self, order: &Order, items: &[OrderItem]) -> DbResult<()> {
        debug!(
            id = %order.id,
            total_cents = order.total_cents,
            items = items.len(),
            "Inserting order"
        );

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO orders (
                id, customer_email, customer_name, customer_cpf, referral_code, wallet_owner_id,
                status, payment_method,
                subtotal_cents, shipping_cents, order_bump_cents, discount_cents,
                balance_used_cents, total_cents, loyalty_points,
                coupon_code, shipping_service, payment_id,
                created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6,
                ?7, ?8,
                ?9, ?10, ?11, ?12,
                ?13, ?14, ?15,
                ?16, ?17, ?18,
                ?19, ?20
            )
            "#,
        )
        .bind(&order.id)
        .bind(&order.customer_email)
        .bind(&order.customer_name)
        .bind(&order.customer_cpf)
        .bind(&order.referral_code)
        .bind(&order.wallet_owner_id)
        .bind(order.status)
        .bind(order.payment_method)
        .bind(order.subtotal_cents)
        .bind(order.shipping_cents)
        .bind(order.order_bump_cents)
        .bind(order.discount_cents)
        .bind(order.balance_used_cents)
        .bind(order.total_cents)
        .bind(order.loyalty_points)
        .bind(&order.coupon_code)
        .bind(&order.shipping_service)
        .bind(&order.payment_id)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut *tx)
        .await?;

        for item in items {
            sqlx::query(
                r#"
                INSERT INTO order_items (
                    id, order_id, product_id, name_snapshot,
                    unit_price_cents, quantity, line_total_cents, is_order_bump, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                "#,
            )
            .bind(&item.id)
            .bind(&item.order_id)
            .bind(&item.product_id)
            .bind(&item.name_snapshot)
            .bind(item.unit_price_cents)
            .bind(item.quantity)
            .bind(item.line_total_cents)
            .bind(item.is_order_bump)
            .bind(item.created_at)
            .execute(&mut *tx)
            .await?;
        }

        let balance_used = order.balance_used();
        if balance_used.is_positive() {
            let owner_id = order.wallet_owner_id.as_deref().ok_or_else(|| {
                DbError::InsufficientBalance {
                    owner_id: String::new(),
                    requested_cents: balance_used.cents(),
                    available_cents: 0,
                }
            })?;
            debit_in(&mut tx, owner_id, balance_used).await?;
        }

        tx.commit().await?;

        info!(id = %order.id, status = ?order.status, "Order stored");
        Ok(())
    }

    /// Gets an order by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Order>> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?1");
        let order = sqlx::query_as::<_, Order>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(order)
    }

    /// Items of an order, primary item first.
    pub async fn get_items(&self, order_id: &str) -> DbResult<Vec<OrderItem>> {
        let items = sqlx::query_as::<_, OrderItem>(
            r#"
            SELECT id, order_id, product_id, name_snapshot,
                   unit_price_cents, quantity, line_total_cents, is_order_bump, created_at
            FROM order_items
            WHERE order_id = ?1
            ORDER BY is_order_bump ASC, created_at ASC
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Stores the provider's payment id.
    pub async fn set_payment_reference(&self, id: &str, payment_id: &str) -> DbResult<()> {
        let result = sqlx::query("UPDATE orders SET payment_id = ?1, updated_at = ?2 WHERE id = ?3")
            .bind(payment_id)
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Order", id));
        }
        Ok(())
    }

    /// Marks an order that is still awaiting payment as paid. Returns
    /// `false` otherwise, so repeated webhooks are harmless.
    pub async fn mark_paid(&self, id: &str) -> DbResult<bool> {
        let result = sqlx::query(
            "UPDATE orders SET status = ?1, updated_at = ?2 WHERE id = ?3 AND status = 'awaiting_payment'",
        )
        .bind(OrderStatus::Paid)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Marks an order that is still awaiting payment as failed and credits
    /// the wallet balance it reserved back, in one transaction.
    ///
    /// Returns `false` without touching the wallet when the order had
    /// already been settled.
    pub async fn mark_failed(&self, id: &str) -> DbResult<bool> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE orders SET status = ?1, updated_at = ?2 WHERE id = ?3 AND status = 'awaiting_payment'",
        )
        .bind(OrderStatus::Failed)
        .bind(Utc::now())
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(false);
        }

        let reserved: Option<(Option<String>, i64)> = sqlx::query_as(
            "SELECT wallet_owner_id, balance_used_cents FROM orders WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        if let Some((Some(owner_id), cents)) = reserved {
            if cents > 0 {
                credit_in(&mut tx, &owner_id, Money::from_cents(cents)).await?;
                info!(id = %id, owner_id = %owner_id, refunded_cents = cents, "Wallet balance released");
            }
        }

        tx.commit().await?;

        info!(id = %id, "Order failed");
        Ok(true)
    }

    /// Most recent orders first.
    pub async fn list_recent(&self, limit: i64) -> DbResult<Vec<Order>> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at DESC LIMIT ?1");
        let orders = sqlx::query_as::<_, Order>(&sql)
            .bind(limit.clamp(1, 500))
            .fetch_all(&self.pool)
            .await?;

        Ok(orders)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use chrono::Duration;
    use prolipsi_core::PaymentMethod;

    fn order(id: &str, balance_used_cents: i64, wallet: Option<&str>) -> Order {
        let now = Utc::now();
        Order {
            id: id.to_string(),
            customer_email: "ana@example.com".to_string(),
            customer_name: "Ana Souza".to_string(),
            customer_cpf: "52998224725".to_string(),
            referral_code: Some("RS-0042".to_string()),
            wallet_owner_id: wallet.map(str::to_string),
            status: OrderStatus::AwaitingPayment,
            payment_method: PaymentMethod::Pix,
            subtotal_cents: 10_000,
            shipping_cents: 1_500,
            order_bump_cents: 0,
            discount_cents: 1_000,
            balance_used_cents,
            total_cents: 10_500 - balance_used_cents,
            loyalty_points: (10_500 - balance_used_cents) / 100,
            coupon_code: Some("RS10".to_string()),
            shipping_service: Some("PAC".to_string()),
            payment_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn item(order_id: &str, bump: bool) -> OrderItem {
        OrderItem {
            id: uuid::Uuid::new_v4().to_string(),
            order_id: order_id.to_string(),
            product_id: if bump { "guia" } else { "kit" }.to_string(),
            name_snapshot: if bump { "Guia" } else { "Kit" }.to_string(),
            unit_price_cents: 10_000,
            quantity: 1,
            line_total_cents: 10_000,
            is_order_bump: bump,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_insert_and_read_back() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.orders();

        repo.insert_with_items(&order("o-1", 0, None), &[item("o-1", true), item("o-1", false)])
            .await
            .unwrap();

        let stored = repo.get_by_id("o-1").await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::AwaitingPayment);
        assert_eq!(stored.payment_method, PaymentMethod::Pix);
        assert_eq!(stored.total(), Money::from_cents(10_500));
        assert_eq!(stored.coupon_code.as_deref(), Some("RS10"));

        let items = repo.get_items("o-1").await.unwrap();
        assert_eq!(items.len(), 2);
        assert!(!items[0].is_order_bump);
        assert!(items[1].is_order_bump);

        assert!(repo.get_by_id("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_balance_debited_with_order() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.wallets().credit("cli-1", Money::from_cents(5_000)).await.unwrap();

        db.orders()
            .insert_with_items(&order("o-2", 4_000, Some("cli-1")), &[item("o-2", false)])
            .await
            .unwrap();

        assert_eq!(
            db.wallets().get_balance("cli-1").await.unwrap(),
            Money::from_cents(1_000)
        );
    }

    #[tokio::test]
    async fn test_insufficient_balance_rolls_back_order() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.wallets().credit("cli-1", Money::from_cents(1_000)).await.unwrap();

        let err = db
            .orders()
            .insert_with_items(&order("o-3", 4_000, Some("cli-1")), &[item("o-3", false)])
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::InsufficientBalance { .. }));

        assert!(db.orders().get_by_id("o-3").await.unwrap().is_none());
        assert!(db.orders().get_items("o-3").await.unwrap().is_empty());
        assert_eq!(
            db.wallets().get_balance("cli-1").await.unwrap(),
            Money::from_cents(1_000)
        );

        let no_wallet = db
            .orders()
            .insert_with_items(&order("o-4", 500, None), &[])
            .await
            .unwrap_err();
        assert!(matches!(no_wallet, DbError::InsufficientBalance { .. }));
    }

    #[tokio::test]
    async fn test_payment_reference_and_status() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.orders();
        repo.insert_with_items(&order("o-5", 0, None), &[]).await.unwrap();

        repo.set_payment_reference("o-5", "123456789").await.unwrap();

        assert!(repo.mark_paid("o-5").await.unwrap());
        assert!(!repo.mark_paid("o-5").await.unwrap());
        assert!(!repo.mark_failed("o-5").await.unwrap());

        let stored = repo.get_by_id("o-5").await.unwrap().unwrap();
        assert_eq!(stored.payment_id.as_deref(), Some("123456789"));
        assert_eq!(stored.status, OrderStatus::Paid);

        assert!(!repo.mark_paid("missing").await.unwrap());
        assert!(matches!(
            repo.set_payment_reference("missing", "1").await,
            Err(DbError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_failed_order_releases_balance_once() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.wallets().credit("cli-1", Money::from_cents(8_000)).await.unwrap();

        let repo = db.orders();
        repo.insert_with_items(&order("o-6", 5_000, Some("cli-1")), &[item("o-6", false)])
            .await
            .unwrap();
        assert_eq!(
            db.wallets().get_balance("cli-1").await.unwrap(),
            Money::from_cents(3_000)
        );

        assert!(repo.mark_failed("o-6").await.unwrap());
        assert!(!repo.mark_failed("o-6").await.unwrap());
        assert!(!repo.mark_paid("o-6").await.unwrap());

        assert_eq!(
            db.wallets().get_balance("cli-1").await.unwrap(),
            Money::from_cents(8_000)
        );
        let stored = repo.get_by_id("o-6").await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Failed);
    }

    #[tokio::test]
    async fn test_list_recent_newest_first() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.orders();

        let mut older = order("old", 0, None);
        older.created_at = Utc::now() - Duration::hours(2);
        repo.insert_with_items(&older, &[]).await.unwrap();
        repo.insert_with_items(&order("new", 0, None), &[]).await.unwrap();

        let recent = repo.list_recent(10).await.unwrap();
        let ids: Vec<_> = recent.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, ["new", "old"]);
    }
}
