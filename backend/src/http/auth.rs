use super::ApiJson;
use crate::auth::AuthUser;
use crate::error::AppResult;
use crate::leveling::LevelProgress;
use crate::models::User;
use crate::services::Session;
use crate::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Username or email
    #[serde(alias = "username", alias = "email")]
    pub identifier: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub user: User,
    pub token: String,
    pub progress: LevelProgress,
}

impl From<Session> for SessionResponse {
    fn from(session: Session) -> Self {
        Self {
            progress: session.user.progress(),
            user: session.user,
            token: session.token,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user: User,
    pub progress: LevelProgress,
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> AppResult<(StatusCode, Json<SessionResponse>)> {
    let session = state
        .user_service
        .register(&req.username, &req.email, &req.password, req.display_name.as_deref())
        .await?;

    Ok((StatusCode::CREATED, Json(session.into())))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> AppResult<Json<SessionResponse>> {
    let session = state.user_service.login(&req.identifier, &req.password).await?;
    Ok(Json(session.into()))
}

pub async fn me(State(state): State<Arc<AppState>>, user: AuthUser) -> AppResult<Json<MeResponse>> {
    let user = state.user_service.me(user.id).await?;
    Ok(Json(MeResponse {
        progress: user.progress(),
        user,
    }))
}
