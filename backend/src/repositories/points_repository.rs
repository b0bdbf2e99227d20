//! Repository for the points ledger

use crate::error::RepositoryError;
use crate::leveling::level_for_points;
use crate::models::{PointTransaction, User};
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

pub struct PointsRepository {
    pool: PgPool,
}

/// Result of one ledger write
#[derive(Debug, Clone)]
pub struct PointsCredit {
    pub user: User,
    pub previous_level: i32,
    pub transaction: PointTransaction,
}

/// Lock the user row, move the total and append to the ledger
async fn apply_credit(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    amount: i64,
    reason: &str,
) -> Result<PointsCredit, RepositoryError> {
    // Lock the row so concurrent awards see each other's totals
    let current: Option<(i64, i32)> = sqlx::query_as("SELECT points, level FROM users WHERE id = $1 FOR UPDATE")
        .bind(user_id)
        .fetch_optional(&mut **tx)
        .await?;

    let (points, previous_level) = current.ok_or_else(|| RepositoryError::NotFound("User not found".to_string()))?;

    let new_points = points + amount;
    if new_points < 0 {
        return Err(RepositoryError::BusinessRule(format!(
            "Insufficient points: have {}, need {}",
            points, -amount
        )));
    }
    let new_level = level_for_points(new_points);

    let user = sqlx::query_as::<_, User>(
        "UPDATE users SET points = $2, level = $3, updated_at = NOW() \
         WHERE id = $1 \
         RETURNING id, username, email, password_hash, display_name, avatar_url, bio, role, \
                   points, level, last_daily_bonus_at, created_at, updated_at",
    )
    .bind(user_id)
    .bind(new_points)
    .bind(new_level)
    .fetch_one(&mut **tx)
    .await?;

    let transaction = sqlx::query_as::<_, PointTransaction>(
        "INSERT INTO point_transactions (user_id, amount, reason) \
         VALUES ($1, $2, $3) \
         RETURNING id, user_id, amount, reason, created_at",
    )
    .bind(user_id)
    .bind(amount)
    .bind(reason)
    .fetch_one(&mut **tx)
    .await?;

    Ok(PointsCredit {
        user,
        previous_level,
        transaction,
    })
}

impl PointsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Credit points, recompute the level and write the ledger row in one transaction
    pub async fn credit(&self, user_id: Uuid, amount: i64, reason: &str) -> Result<PointsCredit, RepositoryError> {
        if amount == 0 {
            return Err(RepositoryError::InvalidInput("Point amount cannot be zero".to_string()));
        }

        let mut tx = self.pool.begin().await?;
        let credit = apply_credit(&mut tx, user_id, amount, reason).await?;
        tx.commit().await?;

        Ok(credit)
    }

    /// Daily bonus: credit only if nothing was claimed since `day_start`.
    /// Returns `None` when today's bonus is already taken.
    pub async fn claim_daily(
        &self,
        user_id: Uuid,
        amount: i64,
        reason: &str,
        day_start: DateTime<Utc>,
    ) -> Result<Option<PointsCredit>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let claimed = sqlx::query(
            "UPDATE users SET last_daily_bonus_at = NOW() \
             WHERE id = $1 AND (last_daily_bonus_at IS NULL OR last_daily_bonus_at < $2)",
        )
        .bind(user_id)
        .bind(day_start)
        .execute(&mut *tx)
        .await?
        .rows_affected()
            > 0;

        if !claimed {
            let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
                .bind(user_id)
                .fetch_one(&mut *tx)
                .await?;
            if !exists {
                return Err(RepositoryError::NotFound("User not found".to_string()));
            }
            return Ok(None);
        }

        let credit = apply_credit(&mut tx, user_id, amount, reason).await?;
        tx.commit().await?;

        Ok(Some(credit))
    }

    /// Ledger entries for a user, newest first
    pub async fn history(&self, user_id: Uuid, limit: i64, offset: i64) -> Result<Vec<PointTransaction>, RepositoryError> {
        let rows = sqlx::query_as::<_, PointTransaction>(
            "SELECT id, user_id, amount, reason, created_at \
             FROM point_transactions \
             WHERE user_id = $1 \
             ORDER BY created_at DESC, id \
             LIMIT $2 OFFSET $3",
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    pub async fn count_for_user(&self, user_id: Uuid) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM point_transactions WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Sum of the ledger; always equals `users.points`
    pub async fn ledger_total(&self, user_id: Uuid) -> Result<i64, RepositoryError> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(amount), 0)::BIGINT FROM point_transactions WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(total)
    }
}
