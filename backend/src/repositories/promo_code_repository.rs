//! Repository for promo codes and their redemptions

use crate::error::RepositoryError;
use crate::models::{Commission, PromoCode, PromoCodeUsage};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

const PROMO_COLUMNS: &str = "id, code, creator_id, discount_percent, commission_percent, max_uses, uses_count, \
     expires_at, is_active, created_at";

pub struct PromoCodeRepository {
    pool: PgPool,
}

/// Everything written by one redemption
#[derive(Debug, Clone, Serialize)]
pub struct Redemption {
    pub promo_code: PromoCode,
    pub usage: PromoCodeUsage,
    pub commission: Commission,
}

impl PromoCodeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        code: &str,
        creator_id: Uuid,
        discount_percent: i32,
        commission_percent: i32,
        max_uses: Option<i32>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<PromoCode, RepositoryError> {
        let sql = format!(
            "INSERT INTO promo_codes (code, creator_id, discount_percent, commission_percent, max_uses, expires_at) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {}",
            PROMO_COLUMNS
        );

        let promo = sqlx::query_as::<_, PromoCode>(&sql)
            .bind(code)
            .bind(creator_id)
            .bind(discount_percent)
            .bind(commission_percent)
            .bind(max_uses)
            .bind(expires_at)
            .fetch_one(&self.pool)
            .await?;

        Ok(promo)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<PromoCode>, RepositoryError> {
        let sql = format!("SELECT {} FROM promo_codes WHERE id = $1", PROMO_COLUMNS);
        let promo = sqlx::query_as::<_, PromoCode>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(promo)
    }

    /// Lookup by normalized code
    pub async fn find_by_code(&self, code: &str) -> Result<Option<PromoCode>, RepositoryError> {
        let sql = format!("SELECT {} FROM promo_codes WHERE code = $1", PROMO_COLUMNS);
        let promo = sqlx::query_as::<_, PromoCode>(&sql)
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;
        Ok(promo)
    }

    pub async fn code_exists(&self, code: &str) -> Result<bool, RepositoryError> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM promo_codes WHERE code = $1)")
            .bind(code)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    pub async fn list_by_creator(&self, creator_id: Uuid) -> Result<Vec<PromoCode>, RepositoryError> {
        let sql = format!(
            "SELECT {} FROM promo_codes WHERE creator_id = $1 ORDER BY created_at DESC",
            PROMO_COLUMNS
        );
        let codes = sqlx::query_as::<_, PromoCode>(&sql)
            .bind(creator_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(codes)
    }

    pub async fn has_used(&self, promo_code_id: Uuid, user_id: Uuid) -> Result<bool, RepositoryError> {
        let used: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM promo_code_usages WHERE promo_code_id = $1 AND user_id = $2)",
        )
        .bind(promo_code_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(used)
    }

    /// Redeem a code for a user in one transaction.
    ///
    /// The code row is locked first, so the usage limit holds under
    /// concurrent redemptions. All eligibility checks are repeated against
    /// the locked row.
    pub async fn redeem(&self, code: &str, user_id: Uuid, order_amount: Decimal) -> Result<Redemption, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let sql = format!("SELECT {} FROM promo_codes WHERE code = $1 FOR UPDATE", PROMO_COLUMNS);
        let promo = sqlx::query_as::<_, PromoCode>(&sql)
            .bind(code)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| RepositoryError::NotFound("Promo code not found".to_string()))?;

        let already_used: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM promo_code_usages WHERE promo_code_id = $1 AND user_id = $2)",
        )
        .bind(promo.id)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        promo
            .check_redeemable(user_id, already_used, Utc::now())
            .map_err(|rejection| RepositoryError::BusinessRule(rejection.message().to_string()))?;

        let quote = promo
            .quote(order_amount)
            .ok_or_else(|| RepositoryError::InvalidInput("Order amount is too large".to_string()))?;

        let usage = sqlx::query_as::<_, PromoCodeUsage>(
            "INSERT INTO promo_code_usages (promo_code_id, user_id, order_amount, discount_amount) \
             VALUES ($1, $2, $3, $4) \
             RETURNING id, promo_code_id, user_id, order_amount, discount_amount, used_at",
        )
        .bind(promo.id)
        .bind(user_id)
        .bind(quote.order_amount)
        .bind(quote.discount_amount)
        .fetch_one(&mut *tx)
        .await?;

        let sql = format!(
            "UPDATE promo_codes SET uses_count = uses_count + 1 WHERE id = $1 RETURNING {}",
            PROMO_COLUMNS
        );
        let promo = sqlx::query_as::<_, PromoCode>(&sql)
            .bind(promo.id)
            .fetch_one(&mut *tx)
            .await?;

        let commission = sqlx::query_as::<_, Commission>(
            "INSERT INTO commissions (creator_id, promo_code_id, usage_id, amount, status) \
             VALUES ($1, $2, $3, $4, 'pending') \
             RETURNING id, creator_id, promo_code_id, usage_id, amount, status, created_at, paid_at",
        )
        .bind(promo.creator_id)
        .bind(promo.id)
        .bind(usage.id)
        .bind(quote.commission_amount)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Redemption {
            promo_code: promo,
            usage,
            commission,
        })
    }

    pub async fn deactivate(&self, id: Uuid) -> Result<PromoCode, RepositoryError> {
        let sql = format!(
            "UPDATE promo_codes SET is_active = FALSE WHERE id = $1 RETURNING {}",
            PROMO_COLUMNS
        );
        sqlx::query_as::<_, PromoCode>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| RepositoryError::NotFound("Promo code not found".to_string()))
    }
}
