use super::{ApiJson, ApiPath};
use crate::auth::{AdminUser, MaybeAuthUser};
use crate::error::AppResult;
use crate::models::FraudSignalInput;
use crate::services::fraud_service::forwarded_client_ip;
use crate::services::{RecordedSignal, UserRiskReport};
use crate::AppState;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use std::sync::Arc;
use uuid::Uuid;

pub async fn record(
    State(state): State<Arc<AppState>>,
    MaybeAuthUser(user): MaybeAuthUser,
    headers: HeaderMap,
    ApiJson(input): ApiJson<FraudSignalInput>,
) -> AppResult<(StatusCode, Json<RecordedSignal>)> {
    let forwarded_ip = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(forwarded_client_ip);

    let recorded = state
        .fraud_service
        .record(&input, user.map(|u| u.id), forwarded_ip)
        .await?;

    Ok((StatusCode::CREATED, Json(recorded)))
}

pub async fn user_report(
    State(state): State<Arc<AppState>>,
    AdminUser(_admin): AdminUser,
    ApiPath(user_id): ApiPath<Uuid>,
) -> AppResult<Json<UserRiskReport>> {
    Ok(Json(state.fraud_service.user_report(user_id).await?))
}
