//! # Wallet Repository
//!
//! Stored credit a customer may spend at checkout.
//!
//! Balances never go negative: debits are a single conditional `UPDATE`
//! (`... WHERE balance_cents >= ?`), so two checkouts racing for the same
//! balance cannot both succeed.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use prolipsi_core::{Money, WalletAccount};

/// Repository for wallet balances.
#[derive(Debug, Clone)]
pub struct WalletRepository {
    pool: SqlitePool,
}

impl WalletRepository {
    pub fn new(pool: SqlitePool) -> Self {
        WalletRepository { pool }
    }

    /// Returns the wallet row, if the owner ever had one.
    pub async fn get(&self, owner_id: &str) -> DbResult<Option<WalletAccount>> {
        let account = sqlx::query_as::<_, WalletAccount>(
            "SELECT owner_id, balance_cents, updated_at FROM wallet_accounts WHERE owner_id = ?1",
        )
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(account)
    }

    /// Current balance; zero for an unknown owner.
    pub async fn get_balance(&self, owner_id: &str) -> DbResult<Money> {
        let mut conn = self.pool.acquire().await?;
        balance_in(&mut conn, owner_id).await
    }

    /// Adds credit, creating the wallet when needed. Returns the new balance.
    pub async fn credit(&self, owner_id: &str, amount: Money) -> DbResult<Money> {
        if !amount.is_positive() {
            return Err(DbError::InvalidAmount {
                amount_cents: amount.cents(),
            });
        }

        let mut tx = self.pool.begin().await?;
        credit_in(&mut tx, owner_id, amount).await?;
        let balance = balance_in(&mut tx, owner_id).await?;
        tx.commit().await?;

        Ok(balance)
    }

    /// Takes credit out. Fails without changing anything when the wallet
    /// holds less than `amount`. Returns the new balance.
    pub async fn debit(&self, owner_id: &str, amount: Money) -> DbResult<Money> {
        let mut tx = self.pool.begin().await?;
        debit_in(&mut tx, owner_id, amount).await?;
        let balance = balance_in(&mut tx, owner_id).await?;
        tx.commit().await?;
        Ok(balance)
    }
}

pub(crate) async fn balance_in(conn: &mut SqliteConnection, owner_id: &str) -> DbResult<Money> {
    let cents: Option<i64> =
        sqlx::query_scalar("SELECT balance_cents FROM wallet_accounts WHERE owner_id = ?1")
            .bind(owner_id)
            .fetch_optional(&mut *conn)
            .await?;

    Ok(Money::from_cents(cents.unwrap_or(0)))
}

/// Upsert credit usable inside a caller's transaction.
pub(crate) async fn credit_in(
    conn: &mut SqliteConnection,
    owner_id: &str,
    amount: Money,
) -> DbResult<()> {
    debug!(owner_id = %owner_id, amount_cents = amount.cents(), "Crediting wallet");

    sqlx::query(
        r#"
        INSERT INTO wallet_accounts (owner_id, balance_cents, updated_at)
        VALUES (?1, ?2, ?3)
        ON CONFLICT (owner_id) DO UPDATE SET
            balance_cents = balance_cents + excluded.balance_cents,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(owner_id)
    .bind(amount.cents())
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Conditional debit usable inside a caller's transaction.
pub(crate) async fn debit_in(
    conn: &mut SqliteConnection,
    owner_id: &str,
    amount: Money,
) -> DbResult<()> {
    if !amount.is_positive() {
        return Err(DbError::InvalidAmount {
            amount_cents: amount.cents(),
        });
    }

    debug!(owner_id = %owner_id, amount_cents = amount.cents(), "Debiting wallet");

    let result = sqlx::query(
        r#"
        UPDATE wallet_accounts
        SET balance_cents = balance_cents - ?1, updated_at = ?2
        WHERE owner_id = ?3 AND balance_cents >= ?1
        "#,
    )
    .bind(amount.cents())
    .bind(Utc::now())
    .bind(owner_id)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        let available = balance_in(conn, owner_id).await?;
        return Err(DbError::InsufficientBalance {
            owner_id: owner_id.to_string(),
            requested_cents: amount.cents(),
            available_cents: available.cents(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::{Database, DbConfig, DbError};
    use prolipsi_core::Money;

    #[tokio::test]
    async fn test_unknown_owner_has_zero_balance() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        assert_eq!(db.wallets().get_balance("ninguem").await.unwrap(), Money::zero());
        assert!(db.wallets().get("ninguem").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_credit_then_debit() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let wallets = db.wallets();

        assert_eq!(
            wallets.credit("cli-1", Money::from_cents(5_000)).await.unwrap(),
            Money::from_cents(5_000)
        );
        assert_eq!(
            wallets.credit("cli-1", Money::from_cents(2_500)).await.unwrap(),
            Money::from_cents(7_500)
        );
        assert_eq!(
            wallets.debit("cli-1", Money::from_cents(7_000)).await.unwrap(),
            Money::from_cents(500)
        );

        let account = wallets.get("cli-1").await.unwrap().unwrap();
        assert_eq!(account.balance(), Money::from_cents(500));
    }

    #[tokio::test]
    async fn test_debit_never_overdraws() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let wallets = db.wallets();
        wallets.credit("cli-2", Money::from_cents(1_000)).await.unwrap();

        let err = wallets.debit("cli-2", Money::from_cents(1_001)).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::InsufficientBalance { requested_cents: 1_001, available_cents: 1_000, .. }
        ));
        assert_eq!(wallets.get_balance("cli-2").await.unwrap(), Money::from_cents(1_000));

        assert!(matches!(
            wallets.debit("cli-2", Money::zero()).await,
            Err(DbError::InvalidAmount { .. })
        ));
        assert!(matches!(
            wallets.credit("cli-2", Money::from_cents(-5)).await,
            Err(DbError::InvalidAmount { .. })
        ));
    }
}
