use super::ApiQuery;
use crate::auth::AuthUser;
use crate::error::AppResult;
use crate::leveling::LevelProgress;
use crate::models::{LeaderboardEntry, Page, Pagination, PointTransaction};
use crate::services::AwardOutcome;
use crate::AppState;
use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Default, Deserialize)]
pub struct LeaderboardQuery {
    pub limit: Option<i64>,
}

pub async fn me(State(state): State<Arc<AppState>>, user: AuthUser) -> AppResult<Json<LevelProgress>> {
    Ok(Json(state.points_service.progress(user.id).await?))
}

pub async fn history(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ApiQuery(pagination): ApiQuery<Pagination>,
) -> AppResult<Json<Page<PointTransaction>>> {
    Ok(Json(state.points_service.history(user.id, pagination).await?))
}

pub async fn daily(State(state): State<Arc<AppState>>, user: AuthUser) -> AppResult<Json<AwardOutcome>> {
    Ok(Json(state.points_service.claim_daily_bonus(user.id).await?))
}

pub async fn leaderboard(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<LeaderboardQuery>,
) -> AppResult<Json<Vec<LeaderboardEntry>>> {
    Ok(Json(state.points_service.leaderboard(query.limit).await?))
}
