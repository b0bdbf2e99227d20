use super::{ApiPath, ApiQuery};
use crate::error::AppResult;
use crate::models::{FeedItem, FeedKind, Page, Pagination};
use crate::AppState;
use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Default, Deserialize)]
pub struct FeedQuery {
    pub kind: Option<FeedKind>,
}

pub async fn list(
    State(state): State<Arc<AppState>>,
    ApiQuery(pagination): ApiQuery<Pagination>,
    ApiQuery(query): ApiQuery<FeedQuery>,
) -> AppResult<Json<Page<FeedItem>>> {
    Ok(Json(state.feed_service.list(pagination, query.kind).await?))
}

pub async fn for_user(
    State(state): State<Arc<AppState>>,
    ApiPath(user_id): ApiPath<Uuid>,
    ApiQuery(pagination): ApiQuery<Pagination>,
) -> AppResult<Json<Page<FeedItem>>> {
    Ok(Json(state.feed_service.list_for_user(user_id, pagination).await?))
}
