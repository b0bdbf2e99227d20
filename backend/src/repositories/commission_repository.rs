use crate::error::RepositoryError;
use crate::models::{Commission, CommissionStatus, CommissionSummary};
use sqlx::PgPool;
use uuid::Uuid;

const COMMISSION_COLUMNS: &str = "id, creator_id, promo_code_id, usage_id, amount, status, created_at, paid_at";

/// Repository for creator commissions
pub struct CommissionRepository {
    pool: PgPool,
}

impl CommissionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Commission>, RepositoryError> {
        let sql = format!("SELECT {} FROM commissions WHERE id = $1", COMMISSION_COLUMNS);
        let commission = sqlx::query_as::<_, Commission>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(commission)
    }

    /// A creator's commissions, newest first, optionally by status
    pub async fn list_by_creator(
        &self,
        creator_id: Uuid,
        status: Option<CommissionStatus>,
    ) -> Result<Vec<Commission>, RepositoryError> {
        let sql = format!(
            "SELECT {} FROM commissions \
             WHERE creator_id = $1 AND ($2::TEXT IS NULL OR status = $2) \
             ORDER BY created_at DESC",
            COMMISSION_COLUMNS
        );
        let rows = sqlx::query_as::<_, Commission>(&sql)
            .bind(creator_id)
            .bind(status.map(|s| s.as_str()))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn summary(&self, creator_id: Uuid) -> Result<CommissionSummary, RepositoryError> {
        let summary = sqlx::query_as::<_, CommissionSummary>(
            "SELECT \
                COALESCE(SUM(amount) FILTER (WHERE status = 'pending'), 0) AS pending_total, \
                COALESCE(SUM(amount) FILTER (WHERE status = 'paid'), 0) AS paid_total, \
                COUNT(*) AS count \
             FROM commissions \
             WHERE creator_id = $1",
        )
        .bind(creator_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(summary)
    }

    /// pending -> paid. Any other current state is a business rule violation.
    pub async fn mark_paid(&self, id: Uuid) -> Result<Commission, RepositoryError> {
        let sql = format!(
            "UPDATE commissions SET status = 'paid', paid_at = NOW() \
             WHERE id = $1 AND status = 'pending' \
             RETURNING {}",
            COMMISSION_COLUMNS
        );
        let updated = sqlx::query_as::<_, Commission>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match updated {
            Some(commission) => Ok(commission),
            None => match self.find_by_id(id).await? {
                Some(existing) => Err(RepositoryError::BusinessRule(format!(
                    "Commission is {}, only pending commissions can be paid",
                    existing.status
                ))),
                None => Err(RepositoryError::NotFound("Commission not found".to_string())),
            },
        }
    }
}
