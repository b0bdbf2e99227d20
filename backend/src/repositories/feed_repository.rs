use crate::error::RepositoryError;
use crate::models::{FeedItem, FeedKind};
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

const FEED_COLUMNS: &str = "id, user_id, kind, message, auction_id, payload, created_at";

/// Repository for the activity feed
pub struct FeedRepository {
    pool: PgPool,
}

impl FeedRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(
        &self,
        kind: FeedKind,
        user_id: Option<Uuid>,
        message: &str,
        auction_id: Option<Uuid>,
        payload: &Value,
    ) -> Result<FeedItem, RepositoryError> {
        let sql = format!(
            "INSERT INTO feed_items (kind, user_id, message, auction_id, payload) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {}",
            FEED_COLUMNS
        );
        let item = sqlx::query_as::<_, FeedItem>(&sql)
            .bind(kind.as_str())
            .bind(user_id)
            .bind(message)
            .bind(auction_id)
            .bind(payload)
            .fetch_one(&self.pool)
            .await?;
        Ok(item)
    }

    /// Newest first, optionally one kind
    pub async fn list(&self, kind: Option<FeedKind>, limit: i64, offset: i64) -> Result<Vec<FeedItem>, RepositoryError> {
        let sql = format!(
            "SELECT {} FROM feed_items \
             WHERE ($1::TEXT IS NULL OR kind = $1) \
             ORDER BY created_at DESC, id \
             LIMIT $2 OFFSET $3",
            FEED_COLUMNS
        );
        let items = sqlx::query_as::<_, FeedItem>(&sql)
            .bind(kind.map(|k| k.as_str()))
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        Ok(items)
    }

    pub async fn count(&self, kind: Option<FeedKind>) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM feed_items WHERE ($1::TEXT IS NULL OR kind = $1)")
            .bind(kind.map(|k| k.as_str()))
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn list_for_user(&self, user_id: Uuid, limit: i64, offset: i64) -> Result<Vec<FeedItem>, RepositoryError> {
        let sql = format!(
            "SELECT {} FROM feed_items \
             WHERE user_id = $1 \
             ORDER BY created_at DESC, id \
             LIMIT $2 OFFSET $3",
            FEED_COLUMNS
        );
        let items = sqlx::query_as::<_, FeedItem>(&sql)
            .bind(user_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        Ok(items)
    }

    pub async fn count_for_user(&self, user_id: Uuid) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM feed_items WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
