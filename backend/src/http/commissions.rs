use super::{ApiPath, ApiQuery};
use crate::auth::{AdminUser, AuthUser};
use crate::error::AppResult;
use crate::models::{Commission, CommissionStatus, CommissionSummary};
use crate::AppState;
use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Default, Deserialize)]
pub struct CommissionQuery {
    pub status: Option<CommissionStatus>,
}

pub async fn mine(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ApiQuery(query): ApiQuery<CommissionQuery>,
) -> AppResult<Json<Vec<Commission>>> {
    Ok(Json(state.promo_service.commissions_mine(user.id, query.status).await?))
}

pub async fn summary(State(state): State<Arc<AppState>>, user: AuthUser) -> AppResult<Json<CommissionSummary>> {
    Ok(Json(state.promo_service.commission_summary(user.id).await?))
}

pub async fn pay(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<Commission>> {
    Ok(Json(state.promo_service.mark_commission_paid(id, &admin).await?))
}
