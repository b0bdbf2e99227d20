use super::{ApiJson, ApiPath};
use crate::auth::AuthUser;
use crate::error::AppResult;
use crate::models::{NewPromoCode, PromoCode, PromoCodeUsage, PromoQuote};
use crate::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct PromoRequest {
    pub code: String,
    pub order_amount: Decimal,
}

/// What the redeemer sees; the creator's commission stays private
#[derive(Debug, Serialize)]
pub struct RedeemResponse {
    pub code: String,
    pub usage: PromoCodeUsage,
    pub final_amount: Decimal,
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ApiJson(new): ApiJson<NewPromoCode>,
) -> AppResult<(StatusCode, Json<PromoCode>)> {
    let promo = state.promo_service.create(&user, &new).await?;
    Ok((StatusCode::CREATED, Json(promo)))
}

pub async fn mine(State(state): State<Arc<AppState>>, user: AuthUser) -> AppResult<Json<Vec<PromoCode>>> {
    Ok(Json(state.promo_service.list_mine(user.id).await?))
}

pub async fn validate(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ApiJson(req): ApiJson<PromoRequest>,
) -> AppResult<Json<PromoQuote>> {
    Ok(Json(
        state
            .promo_service
            .validate(&req.code, user.id, req.order_amount)
            .await?,
    ))
}

pub async fn redeem(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ApiJson(req): ApiJson<PromoRequest>,
) -> AppResult<(StatusCode, Json<RedeemResponse>)> {
    let redemption = state.promo_service.redeem(&req.code, &user, req.order_amount).await?;
    let usage = redemption.usage;

    Ok((
        StatusCode::CREATED,
        Json(RedeemResponse {
            code: redemption.promo_code.code,
            final_amount: usage.order_amount - usage.discount_amount,
            usage,
        }),
    ))
}

pub async fn deactivate(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<PromoCode>> {
    Ok(Json(state.promo_service.deactivate(id, &user).await?))
}
