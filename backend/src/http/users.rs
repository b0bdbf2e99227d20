use super::{ApiJson, ApiPath};
use crate::auth::AuthUser;
use crate::error::AppResult;
use crate::models::{ProfileUpdate, PublicProfile, User};
use crate::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct DeleteAccountRequest {
    pub password: String,
}

pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<PublicProfile>> {
    Ok(Json(state.user_service.get_public_profile(id).await?))
}

pub async fn update_me(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ApiJson(update): ApiJson<ProfileUpdate>,
) -> AppResult<Json<User>> {
    Ok(Json(state.user_service.update_profile(user.id, &update).await?))
}

pub async fn change_password(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ApiJson(req): ApiJson<ChangePasswordRequest>,
) -> AppResult<StatusCode> {
    state
        .user_service
        .change_password(user.id, &req.current_password, &req.new_password)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_me(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ApiJson(req): ApiJson<DeleteAccountRequest>,
) -> AppResult<StatusCode> {
    state.user_service.delete_account(user.id, &req.password).await?;
    Ok(StatusCode::NO_CONTENT)
}
