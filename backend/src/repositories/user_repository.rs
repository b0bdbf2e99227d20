use crate::error::RepositoryError;
use crate::models::{LeaderboardEntry, ProfileUpdate, User};
use sqlx::PgPool;
use uuid::Uuid;

const USER_COLUMNS: &str = "id, username, email, password_hash, display_name, avatar_url, bio, role, \
     points, level, last_daily_bonus_at, created_at, updated_at";

/// Repository for user data access
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Create a new UserRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new user
    pub async fn create(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
        display_name: Option<&str>,
    ) -> Result<User, RepositoryError> {
        let sql = format!(
            "INSERT INTO users (username, email, password_hash, display_name) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {}",
            USER_COLUMNS
        );

        let user = sqlx::query_as::<_, User>(&sql)
            .bind(username)
            .bind(email)
            .bind(password_hash)
            .bind(display_name)
            .fetch_one(&self.pool)
            .await?;

        Ok(user)
    }

    /// Find a user by UUID
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepositoryError> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Find a user by username or email (case-insensitive)
    pub async fn find_by_identifier(&self, identifier: &str) -> Result<Option<User>, RepositoryError> {
        let sql = format!(
            "SELECT {} FROM users WHERE LOWER(username) = LOWER($1) OR email = LOWER($1)",
            USER_COLUMNS
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(identifier)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Apply a partial profile update; absent fields are left unchanged
    pub async fn update_profile(&self, id: Uuid, update: &ProfileUpdate) -> Result<User, RepositoryError> {
        let sql = format!(
            "UPDATE users SET \
                display_name = COALESCE($2, display_name), \
                avatar_url = COALESCE($3, avatar_url), \
                bio = COALESCE($4, bio), \
                email = COALESCE($5, email), \
                updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {}",
            USER_COLUMNS
        );

        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(update.display_name.as_deref())
            .bind(update.avatar_url.as_deref())
            .bind(update.bio.as_deref())
            .bind(update.email.as_deref())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| RepositoryError::NotFound("User not found".to_string()))
    }

    pub async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound("User not found".to_string()));
        }
        Ok(())
    }

    /// Delete a user; owned rows go with it through ON DELETE CASCADE
    pub async fn delete(&self, id: Uuid) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Users by points, ties broken by who joined first
    pub async fn leaderboard(&self, limit: i64) -> Result<Vec<LeaderboardEntry>, RepositoryError> {
        let entries = sqlx::query_as::<_, LeaderboardEntry>(
            "SELECT id, username, display_name, avatar_url, points, level \
             FROM users \
             ORDER BY points DESC, created_at ASC \
             LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    /// Promote or demote a user
    pub async fn set_role(&self, id: Uuid, role: &str) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE users SET role = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(role)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
