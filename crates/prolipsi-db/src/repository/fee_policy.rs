//! Late-fee settings per transport operator.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use prolipsi_core::late_fee::FeePolicySettings;

#[derive(Debug, Clone)]
pub struct FeePolicyRepository {
    pool: SqlitePool,
}

impl FeePolicyRepository {
    pub fn new(pool: SqlitePool) -> Self {
        FeePolicyRepository { pool }
    }

    /// Stored settings, or all-default settings for an operator who never
    /// saved any.
    pub async fn get_for_owner(&self, owner_id: &str) -> DbResult<FeePolicySettings> {
        let settings = sqlx::query_as::<_, FeePolicySettings>(
            r#"
            SELECT mode, multa_cents, per_day_cents, multa_bps, monthly_interest_bps
            FROM fee_policies
            WHERE owner_id = ?1
            "#,
        )
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(settings.unwrap_or_default())
    }

    pub async fn upsert(&self, owner_id: &str, settings: &FeePolicySettings) -> DbResult<()> {
        debug!(owner_id = %owner_id, mode = ?settings.mode, "Saving fee policy");

        sqlx::query(
            r#"
            INSERT INTO fee_policies (
                owner_id, mode, multa_cents, per_day_cents, multa_bps, monthly_interest_bps, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT (owner_id) DO UPDATE SET
                mode = excluded.mode,
                multa_cents = excluded.multa_cents,
                per_day_cents = excluded.per_day_cents,
                multa_bps = excluded.multa_bps,
                monthly_interest_bps = excluded.monthly_interest_bps,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(owner_id)
        .bind(settings.mode)
        .bind(settings.multa_cents)
        .bind(settings.per_day_cents)
        .bind(settings.multa_bps)
        .bind(settings.monthly_interest_bps)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::{Database, DbConfig};
    use prolipsi_core::late_fee::{FeeMode, FeePolicy, FeePolicySettings};
    use prolipsi_core::types::Rate;

    #[tokio::test]
    async fn test_missing_policy_uses_defaults() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let settings = db.fee_policies().get_for_owner("op-9").await.unwrap();
        assert_eq!(settings, FeePolicySettings::default());
        assert_eq!(settings.resolve(), FeePolicy::default());
    }

    #[tokio::test]
    async fn test_upsert_replaces() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.fee_policies();

        repo.upsert("op-1", &FeePolicySettings { per_day_cents: 300, ..Default::default() })
            .await
            .unwrap();

        let percentage = FeePolicySettings {
            mode: FeeMode::Percentage,
            multa_bps: 200,
            monthly_interest_bps: 100,
            ..Default::default()
        };
        repo.upsert("op-1", &percentage).await.unwrap();

        let stored = repo.get_for_owner("op-1").await.unwrap();
        assert_eq!(stored, percentage);
        assert_eq!(
            stored.resolve(),
            FeePolicy::Percentage {
                multa: Rate::from_bps(200),
                monthly_interest: Rate::from_bps(100)
            }
        );
    }
}
