use crate::error::AppResult;
use crate::models::{FeedItem, FeedKind, Page, Pagination};
use crate::repositories::FeedRepository;
use crate::websocket::WebSocketServer;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

/// Service for the activity feed
pub struct FeedService {
    feed_repo: Arc<FeedRepository>,
    ws_server: Arc<WebSocketServer>,
}

impl FeedService {
    pub fn new(feed_repo: Arc<FeedRepository>, ws_server: Arc<WebSocketServer>) -> Self {
        Self { feed_repo, ws_server }
    }

    /// Store a feed item and push it to live subscribers
    pub async fn post(
        &self,
        kind: FeedKind,
        user_id: Option<Uuid>,
        message: &str,
        auction_id: Option<Uuid>,
        payload: Value,
    ) -> AppResult<FeedItem> {
        let item = self
            .feed_repo
            .insert(kind, user_id, message, auction_id, &payload)
            .await?;

        debug!("Feed item {} ({})", item.id, item.kind);
        self.ws_server.broadcast_feed_item(&item).await;

        Ok(item)
    }

    /// Like `post`, for side effects of another operation: a failure is logged, not returned
    pub async fn publish(
        &self,
        kind: FeedKind,
        user_id: Option<Uuid>,
        message: &str,
        auction_id: Option<Uuid>,
        payload: Value,
    ) {
        if let Err(e) = self.post(kind, user_id, message, auction_id, payload).await {
            warn!("Failed to post {} feed item: {}", kind.as_str(), e);
        }
    }

    pub async fn list(&self, pagination: Pagination, kind: Option<FeedKind>) -> AppResult<Page<FeedItem>> {
        pagination.validate()?;
        let items = self
            .feed_repo
            .list(kind, pagination.limit(), pagination.offset())
            .await?;
        let total = self.feed_repo.count(kind).await?;

        Ok(Page::new(items, pagination, total))
    }

    pub async fn list_for_user(&self, user_id: Uuid, pagination: Pagination) -> AppResult<Page<FeedItem>> {
        pagination.validate()?;
        let items = self
            .feed_repo
            .list_for_user(user_id, pagination.limit(), pagination.offset())
            .await?;
        let total = self.feed_repo.count_for_user(user_id).await?;

        Ok(Page::new(items, pagination, total))
    }
}
