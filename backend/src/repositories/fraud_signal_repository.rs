use crate::error::RepositoryError;
use crate::models::FraudSignal;
use crate::risk::RiskAssessment;
use sqlx::PgPool;
use uuid::Uuid;

const SIGNAL_COLUMNS: &str = "id, user_id, session_id, event_type, fingerprint_hash, ip_hash, user_agent, \
     risk_score, risk_level, factors, created_at";

/// Hashed, scored signal ready to persist
#[derive(Debug, Clone)]
pub struct NewFraudSignal<'a> {
    pub user_id: Option<Uuid>,
    pub session_id: &'a str,
    pub event_type: &'a str,
    pub fingerprint_hash: Option<&'a str>,
    pub ip_hash: Option<&'a str>,
    pub user_agent: Option<&'a str>,
    pub assessment: &'a RiskAssessment,
}

/// Repository for fraud signals
pub struct FraudSignalRepository {
    pool: PgPool,
}

impl FraudSignalRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, signal: &NewFraudSignal<'_>) -> Result<FraudSignal, RepositoryError> {
        let factors = serde_json::to_value(&signal.assessment.factors)
            .map_err(|e| RepositoryError::InvalidInput(format!("Unserializable risk factors: {}", e)))?;

        let sql = format!(
            "INSERT INTO fraud_signals \
                (user_id, session_id, event_type, fingerprint_hash, ip_hash, user_agent, risk_score, risk_level, factors) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING {}",
            SIGNAL_COLUMNS
        );
        let row = sqlx::query_as::<_, FraudSignal>(&sql)
            .bind(signal.user_id)
            .bind(signal.session_id)
            .bind(signal.event_type)
            .bind(signal.fingerprint_hash)
            .bind(signal.ip_hash)
            .bind(signal.user_agent)
            .bind(signal.assessment.score)
            .bind(signal.assessment.level.as_str())
            .bind(factors)
            .fetch_one(&self.pool)
            .await?;
        Ok(row)
    }

    /// Distinct accounts seen on a device fingerprint in the last 24 hours,
    /// counting `user_id` as one more if it has not been seen yet
    pub async fn distinct_users_on_device(
        &self,
        fingerprint_hash: &str,
        user_id: Option<Uuid>,
    ) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(DISTINCT u) FROM ( \
                SELECT user_id AS u FROM fraud_signals \
                WHERE fingerprint_hash = $1 AND user_id IS NOT NULL \
                  AND created_at > NOW() - INTERVAL '24 hours' \
                UNION SELECT $2::UUID WHERE $2::UUID IS NOT NULL \
             ) seen",
        )
        .bind(fingerprint_hash)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    /// Signals from one session in the last 10 minutes
    pub async fn recent_session_signals(&self, session_id: &str) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM fraud_signals \
             WHERE session_id = $1 AND created_at > NOW() - INTERVAL '10 minutes'",
        )
        .bind(session_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    pub async fn list_for_user(&self, user_id: Uuid, limit: i64) -> Result<Vec<FraudSignal>, RepositoryError> {
        let sql = format!(
            "SELECT {} FROM fraud_signals WHERE user_id = $1 ORDER BY created_at DESC LIMIT $2",
            SIGNAL_COLUMNS
        );
        let rows = sqlx::query_as::<_, FraudSignal>(&sql)
            .bind(user_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }
}
