//! # Invoice Repository
//!
//! Monthly van-service invoices and the PIX charges generated for them.

use chrono::NaiveDate;
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use prolipsi_core::{InvoiceStatus, MonthlyInvoice, Money};

const INVOICE_COLUMNS: &str = r#"
    id, owner_id, student_name, payer_email, payer_cpf,
    amount_cents, due_day, due_date, status,
    pix_payment_id, pix_qr_code, pix_qr_code_base64, charged_amount_cents,
    paid_on, created_at
"#;

/// PIX charge data returned by the payment provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixCharge {
    pub payment_id: String,
    pub qr_code: Option<String>,
    pub qr_code_base64: Option<String>,
    /// Amount charged, late fees included.
    pub amount: Money,
}

/// Repository for monthly invoices.
#[derive(Debug, Clone)]
pub struct InvoiceRepository {
    pool: SqlitePool,
}

impl InvoiceRepository {
    pub fn new(pool: SqlitePool) -> Self {
        InvoiceRepository { pool }
    }

    pub async fn insert(&self, invoice: &MonthlyInvoice) -> DbResult<()> {
        debug!(id = %invoice.id, owner_id = %invoice.owner_id, "Inserting invoice");

        sqlx::query(
            r#"
            INSERT INTO monthly_invoices (
                id, owner_id, student_name, payer_email, payer_cpf,
                amount_cents, due_day, due_date, status,
                pix_payment_id, pix_qr_code, pix_qr_code_base64, charged_amount_cents,
                paid_on, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
            "#,
        )
        .bind(&invoice.id)
        .bind(&invoice.owner_id)
        .bind(&invoice.student_name)
        .bind(&invoice.payer_email)
        .bind(&invoice.payer_cpf)
        .bind(invoice.amount_cents)
        .bind(invoice.due_day)
        .bind(invoice.due_date)
        .bind(invoice.status)
        .bind(&invoice.pix_payment_id)
        .bind(&invoice.pix_qr_code)
        .bind(&invoice.pix_qr_code_base64)
        .bind(invoice.charged_amount_cents)
        .bind(invoice.paid_on)
        .bind(invoice.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<MonthlyInvoice>> {
        let sql = format!("SELECT {INVOICE_COLUMNS} FROM monthly_invoices WHERE id = ?1");
        let invoice = sqlx::query_as::<_, MonthlyInvoice>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(invoice)
    }

    /// Looks an invoice up by the provider id of its latest PIX charge.
    pub async fn find_by_pix_payment_id(&self, payment_id: &str) -> DbResult<Option<MonthlyInvoice>> {
        let sql = format!("SELECT {INVOICE_COLUMNS} FROM monthly_invoices WHERE pix_payment_id = ?1");
        let invoice = sqlx::query_as::<_, MonthlyInvoice>(&sql)
            .bind(payment_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(invoice)
    }

    /// Invoices of one operator, newest first, optionally filtered by status.
    pub async fn list_by_owner(
        &self,
        owner_id: &str,
        status: Option<InvoiceStatus>,
    ) -> DbResult<Vec<MonthlyInvoice>> {
        let invoices = match status {
            Some(status) => {
                let sql = format!(
                    "SELECT {INVOICE_COLUMNS} FROM monthly_invoices \
                     WHERE owner_id = ?1 AND status = ?2 ORDER BY created_at DESC"
                );
                sqlx::query_as::<_, MonthlyInvoice>(&sql)
                    .bind(owner_id)
                    .bind(status)
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                let sql = format!(
                    "SELECT {INVOICE_COLUMNS} FROM monthly_invoices \
                     WHERE owner_id = ?1 ORDER BY created_at DESC"
                );
                sqlx::query_as::<_, MonthlyInvoice>(&sql)
                    .bind(owner_id)
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        Ok(invoices)
    }

    /// Records the PIX charge created for a pending invoice. A newer charge
    /// replaces the previous one.
    pub async fn attach_pix_charge(&self, id: &str, charge: &PixCharge) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE monthly_invoices
            SET pix_payment_id = ?1, pix_qr_code = ?2, pix_qr_code_base64 = ?3,
                charged_amount_cents = ?4
            WHERE id = ?5 AND status = 'pending'
            "#,
        )
        .bind(&charge.payment_id)
        .bind(&charge.qr_code)
        .bind(&charge.qr_code_base64)
        .bind(charge.amount.cents())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Pending invoice", id));
        }
        Ok(())
    }

    /// Marks a pending invoice as paid. Returns `false` when it was not
    /// pending (already paid or cancelled), so webhook replays are harmless.
    pub async fn mark_paid(&self, id: &str, paid_on: NaiveDate) -> DbResult<bool> {
        let result = sqlx::query(
            "UPDATE monthly_invoices SET status = ?1, paid_on = ?2 WHERE id = ?3 AND status = 'pending'",
        )
        .bind(InvoiceStatus::Paid)
        .bind(paid_on)
        .bind(id)
        .execute(&self.pool)
        .await?;

        let changed = result.rows_affected() > 0;
        if changed {
            info!(id = %id, paid_on = %paid_on, "Invoice paid");
        }
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use chrono::{Duration, Utc};

    fn invoice(id: &str, owner: &str) -> MonthlyInvoice {
        MonthlyInvoice {
            id: id.to_string(),
            owner_id: owner.to_string(),
            student_name: "Pedro Lima".to_string(),
            payer_email: Some("mae.pedro@example.com".to_string()),
            payer_cpf: None,
            amount_cents: 35_000,
            due_day: Some(10),
            due_date: NaiveDate::from_ymd_opt(2024, 6, 10),
            status: InvoiceStatus::Pending,
            pix_payment_id: None,
            pix_qr_code: None,
            pix_qr_code_base64: None,
            charged_amount_cents: None,
            paid_on: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_insert_get_list() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.invoices();

        let mut older = invoice("inv-1", "op-1");
        older.created_at = Utc::now() - Duration::days(30);
        repo.insert(&older).await.unwrap();
        repo.insert(&invoice("inv-2", "op-1")).await.unwrap();
        repo.insert(&invoice("inv-3", "op-2")).await.unwrap();

        let stored = repo.get_by_id("inv-1").await.unwrap().unwrap();
        assert_eq!(stored.amount(), Money::from_cents(35_000));
        assert_eq!(stored.due_day, Some(10));
        assert_eq!(stored.due_date, NaiveDate::from_ymd_opt(2024, 6, 10));

        let list = repo.list_by_owner("op-1", None).await.unwrap();
        let ids: Vec<_> = list.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, ["inv-2", "inv-1"]);

        repo.mark_paid("inv-2", NaiveDate::from_ymd_opt(2024, 6, 12).unwrap())
            .await
            .unwrap();
        let pending = repo
            .list_by_owner("op-1", Some(InvoiceStatus::Pending))
            .await
            .unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, "inv-1");
    }

    #[tokio::test]
    async fn test_pix_charge_and_idempotent_payment() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.invoices();
        repo.insert(&invoice("inv-1", "op-1")).await.unwrap();

        let charge = PixCharge {
            payment_id: "987".to_string(),
            qr_code: Some("00020126...".to_string()),
            qr_code_base64: None,
            amount: Money::from_cents(36_400),
        };
        repo.attach_pix_charge("inv-1", &charge).await.unwrap();

        let found = repo.find_by_pix_payment_id("987").await.unwrap().unwrap();
        assert_eq!(found.id, "inv-1");
        assert!(repo.find_by_pix_payment_id("000").await.unwrap().is_none());

        let paid_on = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        assert!(repo.mark_paid("inv-1", paid_on).await.unwrap());
        assert!(!repo.mark_paid("inv-1", paid_on).await.unwrap());

        let stored = repo.get_by_id("inv-1").await.unwrap().unwrap();
        assert_eq!(stored.status, InvoiceStatus::Paid);
        assert_eq!(stored.pix_payment_id.as_deref(), Some("987"));
        assert_eq!(stored.charged_amount_cents, Some(36_400));
        assert_eq!(stored.paid_on, Some(paid_on));

        assert!(matches!(
            repo.attach_pix_charge("inv-1", &charge).await,
            Err(DbError::NotFound { .. })
        ));
    }
}
