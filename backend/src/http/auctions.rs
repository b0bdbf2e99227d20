use super::{ApiJson, ApiPath, ApiQuery};
use crate::aggregation::{AggregatedResults, ResultOrder};
use crate::auth::{AuthUser, MaybeAuthUser};
use crate::error::AppResult;
use crate::models::{Auction, AuctionFilter, AuctionUpdate, NewAuction, Page, Pagination};
use crate::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: String,
    pub limit: Option<usize>,
    #[serde(default)]
    pub order: ResultOrder,
    /// Mirror results into stored auctions; honored for signed-in callers only
    #[serde(default)]
    pub persist: bool,
}

pub async fn list(
    State(state): State<Arc<AppState>>,
    ApiQuery(filter): ApiQuery<AuctionFilter>,
    ApiQuery(pagination): ApiQuery<Pagination>,
) -> AppResult<Json<Page<Auction>>> {
    Ok(Json(state.auction_service.list(&filter, pagination).await?))
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ApiJson(new): ApiJson<NewAuction>,
) -> AppResult<(StatusCode, Json<Auction>)> {
    let auction = state.auction_service.create(&user, &new).await?;
    Ok((StatusCode::CREATED, Json(auction)))
}

pub async fn search(
    State(state): State<Arc<AppState>>,
    MaybeAuthUser(user): MaybeAuthUser,
    ApiQuery(params): ApiQuery<SearchParams>,
) -> AppResult<Json<AggregatedResults>> {
    let persist = params.persist && user.is_some();
    let results = state
        .auction_service
        .search_marketplaces(&params.q, params.limit, params.order, persist)
        .await?;
    Ok(Json(results))
}

pub async fn get(State(state): State<Arc<AppState>>, ApiPath(id): ApiPath<Uuid>) -> AppResult<Json<Auction>> {
    Ok(Json(state.auction_service.get(id).await?))
}

pub async fn update(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(update): ApiJson<AuctionUpdate>,
) -> AppResult<Json<Auction>> {
    Ok(Json(state.auction_service.update(id, &user, &update).await?))
}

pub async fn delete(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<StatusCode> {
    state.auction_service.delete(id, &user).await?;
    Ok(StatusCode::NO_CONTENT)
}
