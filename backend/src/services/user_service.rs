use crate::auth::{self, JwtKeys};
use crate::error::{AppError, AppResult};
use crate::leveling::PointAction;
use crate::models::{FeedKind, ProfileUpdate, PublicProfile, User};
use crate::repositories::UserRepository;
use crate::services::{FeedService, PointsService};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

pub const MIN_PASSWORD_LEN: usize = 8;
pub const MAX_PASSWORD_LEN: usize = 128;
pub const MAX_BIO_LEN: usize = 500;
pub const MAX_DISPLAY_NAME_LEN: usize = 64;

/// 3-32 characters of `[A-Za-z0-9_]`
pub fn validate_username(username: &str) -> AppResult<()> {
    let valid = (3..=32).contains(&username.len())
        && username.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid {
        return Err(AppError::Validation(
            "Username must be 3-32 characters of letters, digits or underscores".to_string(),
        ));
    }
    Ok(())
}

/// Shape check only: one `@`, non-empty local part, dotted domain
pub fn validate_email(email: &str) -> AppResult<()> {
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if !valid || email.len() > 254 {
        return Err(AppError::Validation("Invalid email address".to_string()));
    }
    Ok(())
}

pub fn validate_password(password: &str) -> AppResult<()> {
    let len = password.chars().count();
    if !(MIN_PASSWORD_LEN..=MAX_PASSWORD_LEN).contains(&len) {
        return Err(AppError::Validation(format!(
            "Password must be {}-{} characters",
            MIN_PASSWORD_LEN, MAX_PASSWORD_LEN
        )));
    }
    Ok(())
}

pub fn validate_http_url(field: &str, url: &str) -> AppResult<()> {
    if !(url.starts_with("http://") || url.starts_with("https://")) || url.len() > 2048 {
        return Err(AppError::Validation(format!("{} must be an http(s) URL", field)));
    }
    Ok(())
}

/// Trim and validate a profile update; returns the cleaned copy
pub fn clean_profile_update(update: &ProfileUpdate) -> AppResult<ProfileUpdate> {
    let display_name = update.display_name.as_deref().map(str::trim).map(str::to_string);
    if let Some(name) = &display_name {
        if name.is_empty() || name.chars().count() > MAX_DISPLAY_NAME_LEN {
            return Err(AppError::Validation(format!(
                "Display name must be 1-{} characters",
                MAX_DISPLAY_NAME_LEN
            )));
        }
    }

    let bio = update.bio.as_deref().map(str::trim).map(str::to_string);
    if let Some(bio) = &bio {
        if bio.chars().count() > MAX_BIO_LEN {
            return Err(AppError::Validation(format!("Bio must be at most {} characters", MAX_BIO_LEN)));
        }
    }

    let avatar_url = update.avatar_url.as_deref().map(str::trim).map(str::to_string);
    if let Some(url) = &avatar_url {
        validate_http_url("Avatar URL", url)?;
    }

    let email = update.email.as_deref().map(|e| e.trim().to_lowercase());
    if let Some(email) = &email {
        validate_email(email)?;
    }

    Ok(ProfileUpdate {
        display_name,
        avatar_url,
        bio,
        email,
    })
}

/// A user together with a freshly issued access token
#[derive(Debug, Clone)]
pub struct Session {
    pub user: User,
    pub token: String,
}

/// Service for accounts and authentication
pub struct UserService {
    user_repo: Arc<UserRepository>,
    points_service: Arc<PointsService>,
    feed_service: Arc<FeedService>,
    keys: JwtKeys,
}

impl UserService {
    pub fn new(
        user_repo: Arc<UserRepository>,
        points_service: Arc<PointsService>,
        feed_service: Arc<FeedService>,
        keys: JwtKeys,
    ) -> Self {
        Self {
            user_repo,
            points_service,
            feed_service,
            keys,
        }
    }

    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> AppResult<Session> {
        let username = username.trim();
        let email = email.trim().to_lowercase();
        let display_name = display_name.map(str::trim).filter(|d| !d.is_empty());

        validate_username(username)?;
        validate_email(&email)?;
        validate_password(password)?;
        if display_name.map(|d| d.chars().count() > MAX_DISPLAY_NAME_LEN).unwrap_or(false) {
            return Err(AppError::Validation(format!(
                "Display name must be 1-{} characters",
                MAX_DISPLAY_NAME_LEN
            )));
        }

        let password_hash = auth::hash_password(password)?;
        let user = self
            .user_repo
            .create(username, &email, &password_hash, display_name)
            .await?;

        info!("Registered user {} ({})", user.username, user.id);

        let user = match self.points_service.award(user.id, PointAction::Signup).await {
            Ok(outcome) => outcome.user,
            Err(e) => {
                warn!("Failed to award signup bonus to {}: {}", user.id, e);
                user
            }
        };

        self.feed_service
            .publish(
                FeedKind::UserJoined,
                Some(user.id),
                &format!("{} joined Final10", user.username),
                None,
                serde_json::json!({ "username": user.username }),
            )
            .await;

        let token = self.keys.issue(&user)?;
        Ok(Session { user, token })
    }

    /// Unknown user and wrong password produce the same error
    pub async fn login(&self, identifier: &str, password: &str) -> AppResult<Session> {
        let invalid = || AppError::Unauthorized("Invalid credentials".to_string());

        let user = self
            .user_repo
            .find_by_identifier(identifier.trim())
            .await?
            .ok_or_else(invalid)?;

        if !auth::verify_password(password, &user.password_hash)? {
            warn!("Failed login for {}", user.id);
            return Err(invalid());
        }

        let token = self.keys.issue(&user)?;
        info!("User {} logged in", user.id);
        Ok(Session { user, token })
    }

    pub async fn me(&self, user_id: Uuid) -> AppResult<User> {
        self.user_repo
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    pub async fn get_public_profile(&self, user_id: Uuid) -> AppResult<PublicProfile> {
        Ok(self.me(user_id).await?.public_profile())
    }

    pub async fn update_profile(&self, user_id: Uuid, update: &ProfileUpdate) -> AppResult<User> {
        let cleaned = clean_profile_update(update)?;
        let user = self.user_repo.update_profile(user_id, &cleaned).await?;
        info!("Updated profile of {}", user_id);
        Ok(user)
    }

    pub async fn change_password(&self, user_id: Uuid, current: &str, new_password: &str) -> AppResult<()> {
        let user = self.me(user_id).await?;

        if !auth::verify_password(current, &user.password_hash)? {
            return Err(AppError::Unauthorized("Current password is incorrect".to_string()));
        }
        validate_password(new_password)?;

        let hash = auth::hash_password(new_password)?;
        self.user_repo.update_password(user_id, &hash).await?;

        info!("Password changed for {}", user_id);
        Ok(())
    }

    /// Deletes the account after re-checking the password
    pub async fn delete_account(&self, user_id: Uuid, password: &str) -> AppResult<()> {
        let user = self.me(user_id).await?;

        if !auth::verify_password(password, &user.password_hash)? {
            return Err(AppError::Unauthorized("Password is incorrect".to_string()));
        }

        if !self.user_repo.delete(user_id).await? {
            return Err(AppError::NotFound("User not found".to_string()));
        }

        info!("Deleted account {} ({})", user.username, user_id);
        Ok(())
    }
}
