use crate::aggregation::{AggregatedResults, Aggregator, ResultOrder};
use crate::auth::AuthUser;
use crate::error::{AppError, AppResult};
use crate::leveling::PointAction;
use crate::models::{
    Auction, AuctionFilter, AuctionUpdate, FeedKind, NewAuction, Page, Pagination, MAX_MONEY,
};
use crate::repositories::AuctionRepository;
use crate::services::{FeedService, PointsService};
use crate::websocket::WebSocketServer;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

pub const MIN_TITLE_LEN: usize = 3;
pub const MAX_TITLE_LEN: usize = 200;
pub const MAX_SEARCH_RESULTS: usize = 100;
pub const DEFAULT_SEARCH_RESULTS: usize = 50;

fn validate_title(title: &str) -> AppResult<()> {
    let len = title.trim().chars().count();
    if !(MIN_TITLE_LEN..=MAX_TITLE_LEN).contains(&len) {
        return Err(AppError::Validation(format!(
            "Title must be {}-{} characters",
            MIN_TITLE_LEN, MAX_TITLE_LEN
        )));
    }
    Ok(())
}

fn validate_price(price: Decimal) -> AppResult<()> {
    if price.is_sign_negative() {
        return Err(AppError::Validation("Price cannot be negative".to_string()));
    }
    if price.scale() > 2 {
        return Err(AppError::Validation("Price can have at most 2 decimal places".to_string()));
    }
    if price > MAX_MONEY {
        return Err(AppError::Validation(format!("Price cannot exceed {}", MAX_MONEY)));
    }
    Ok(())
}

fn validate_ends_at(ends_at: Option<DateTime<Utc>>) -> AppResult<()> {
    if matches!(ends_at, Some(at) if at <= Utc::now()) {
        return Err(AppError::Validation("End time must be in the future".to_string()));
    }
    Ok(())
}

/// Three-letter code, uppercased; USD when absent
fn normalize_currency(currency: Option<&str>) -> AppResult<String> {
    match currency.map(str::trim).filter(|c| !c.is_empty()) {
        None => Ok("USD".to_string()),
        Some(code) if code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic()) => {
            Ok(code.to_ascii_uppercase())
        }
        Some(code) => Err(AppError::Validation(format!("Invalid currency code: {}", code))),
    }
}

/// Validate a new listing and return its normalized currency
pub fn validate_new_auction(new: &NewAuction) -> AppResult<String> {
    validate_title(&new.title)?;
    validate_price(new.starting_price)?;
    validate_ends_at(new.ends_at)?;
    if let Some(url) = new.image_url.as_deref() {
        crate::services::user_service::validate_http_url("Image URL", url)?;
    }
    normalize_currency(new.currency.as_deref())
}

pub fn validate_auction_update(update: &AuctionUpdate) -> AppResult<()> {
    if let Some(title) = update.title.as_deref() {
        validate_title(title)?;
    }
    if let Some(price) = update.current_price {
        validate_price(price)?;
    }
    validate_ends_at(update.ends_at)?;
    if let Some(url) = update.image_url.as_deref() {
        crate::services::user_service::validate_http_url("Image URL", url)?;
    }
    Ok(())
}

pub fn validate_filter(filter: &AuctionFilter) -> AppResult<()> {
    if let (Some(min), Some(max)) = (filter.min_price, filter.max_price) {
        if min > max {
            return Err(AppError::Validation("min_price cannot exceed max_price".to_string()));
        }
    }
    Ok(())
}

/// Service for auction listings
pub struct AuctionService {
    auction_repo: Arc<AuctionRepository>,
    points_service: Arc<PointsService>,
    feed_service: Arc<FeedService>,
    aggregator: Arc<Aggregator>,
    ws_server: Arc<WebSocketServer>,
}

impl AuctionService {
    pub fn new(
        auction_repo: Arc<AuctionRepository>,
        points_service: Arc<PointsService>,
        feed_service: Arc<FeedService>,
        aggregator: Arc<Aggregator>,
        ws_server: Arc<WebSocketServer>,
    ) -> Self {
        Self {
            auction_repo,
            points_service,
            feed_service,
            aggregator,
            ws_server,
        }
    }

    /// Create a local listing
    pub async fn create(&self, seller: &AuthUser, new: &NewAuction) -> AppResult<Auction> {
        let currency = validate_new_auction(new)?;

        let auction = self.auction_repo.create_local(seller.id, new, &currency).await?;
        info!("Created auction {} ({}) by {}", auction.title, auction.id, seller.id);

        if let Err(e) = self.points_service.award(seller.id, PointAction::CreateListing).await {
            warn!("Failed to award listing points to {}: {}", seller.id, e);
        }

        self.feed_service
            .publish(
                FeedKind::AuctionListed,
                Some(seller.id),
                &format!("{} listed {}", seller.username, auction.title),
                Some(auction.id),
                serde_json::json!({
                    "title": auction.title,
                    "price": auction.current_price,
                    "currency": auction.currency,
                }),
            )
            .await;

        Ok(auction)
    }

    pub async fn get(&self, id: Uuid) -> AppResult<Auction> {
        self.auction_repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Auction not found".to_string()))
    }

    pub async fn list(&self, filter: &AuctionFilter, pagination: Pagination) -> AppResult<Page<Auction>> {
        validate_filter(filter)?;
        pagination.validate()?;

        let items = self.auction_repo.list(filter, pagination).await?;
        let total = self.auction_repo.count(filter).await?;

        Ok(Page::new(items, pagination, total))
    }

    /// Load an auction the actor is allowed to modify
    async fn get_modifiable(&self, id: Uuid, actor: &AuthUser) -> AppResult<Auction> {
        let auction = self.get(id).await?;

        if !auction.is_editable() {
            return Err(AppError::Forbidden(
                "Listings mirrored from external marketplaces are read-only".to_string(),
            ));
        }
        if !auction.is_owned_by(actor.id) && !actor.is_admin() {
            return Err(AppError::Forbidden("Only the seller can modify this auction".to_string()));
        }

        Ok(auction)
    }

    pub async fn update(&self, id: Uuid, actor: &AuthUser, update: &AuctionUpdate) -> AppResult<Auction> {
        validate_auction_update(update)?;
        self.get_modifiable(id, actor).await?;

        let auction = self.auction_repo.update(id, update).await?;
        info!("Updated auction {} by {}", id, actor.id);

        self.ws_server.broadcast_auction_updated(&auction).await;
        Ok(auction)
    }

    pub async fn delete(&self, id: Uuid, actor: &AuthUser) -> AppResult<()> {
        self.get_modifiable(id, actor).await?;

        if !self.auction_repo.delete(id).await? {
            return Err(AppError::NotFound("Auction not found".to_string()));
        }

        info!("Deleted auction {} by {}", id, actor.id);
        Ok(())
    }

    /// Live search across external marketplaces; `persist` mirrors results into `auctions`
    pub async fn search_marketplaces(
        &self,
        query: &str,
        limit: Option<usize>,
        order: ResultOrder,
        persist: bool,
    ) -> AppResult<AggregatedResults> {
        if !self.aggregator.has_sources() {
            return Err(AppError::ExternalService("No marketplace sources configured".to_string()));
        }

        let limit = limit.unwrap_or(DEFAULT_SEARCH_RESULTS).clamp(1, MAX_SEARCH_RESULTS);
        let results = self.aggregator.search(query, limit, order).await?;

        if persist {
            let stored = self.persist_listings(&results).await;
            info!("Persisted {} of {} listings for '{}'", stored, results.listings.len(), results.query);
        }

        Ok(results)
    }

    /// Upsert every listing; a failed row is logged and skipped
    async fn persist_listings(&self, results: &AggregatedResults) -> usize {
        let mut stored = 0;
        for listing in &results.listings {
            match self.auction_repo.upsert_external(listing).await {
                Ok(auction) => {
                    stored += 1;
                    self.ws_server.broadcast_auction_updated(&auction).await;
                }
                Err(e) => warn!(
                    "Failed to store {} listing {}: {}",
                    listing.marketplace, listing.external_id, e
                ),
            }
        }
        stored
    }

    /// Mark active auctions past their end time as ended
    pub async fn end_expired(&self) -> AppResult<usize> {
        let ended = self.auction_repo.end_expired().await?;
        if !ended.is_empty() {
            info!("Ended {} expired auctions", ended.len());
        }

        for id in &ended {
            if let Ok(Some(auction)) = self.auction_repo.find_by_id(*id).await {
                self.ws_server.broadcast_auction_updated(&auction).await;
            }
        }

        Ok(ended.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn new_auction(title: &str, cents: i64) -> NewAuction {
        NewAuction {
            title: title.to_string(),
            description: None,
            image_url: None,
            starting_price: Decimal::new(cents, 2),
            currency: None,
            ends_at: Some(Utc::now() + Duration::days(3)),
        }
    }

    #[test]
    fn test_validate_new_auction() {
        assert_eq!(validate_new_auction(&new_auction("Polaroid SX-70", 12000)).unwrap(), "USD");
        assert!(validate_new_auction(&new_auction("ab", 100)).is_err());
        assert!(validate_new_auction(&new_auction("Polaroid SX-70", -1)).is_err());

        let mut past = new_auction("Polaroid SX-70", 100);
        past.ends_at = Some(Utc::now() - Duration::minutes(1));
        assert!(validate_new_auction(&past).is_err());
    }

    #[test]
    fn test_price_scale() {
        assert!(validate_price(Decimal::new(1999, 2)).is_ok());
        assert!(validate_price(Decimal::new(19999, 3)).is_err());
        assert!(validate_price(Decimal::ZERO).is_ok());
    }

    #[test]
    fn test_price_upper_bound() {
        assert!(validate_price(MAX_MONEY).is_ok());
        assert!(validate_price(MAX_MONEY + Decimal::new(1, 2)).is_err());
        assert!(validate_new_auction(&new_auction("Polaroid SX-70", 1_000_000_000_000_000)).is_err());

        let update = AuctionUpdate {
            current_price: Some(Decimal::new(10_000_000_000_000, 0)),
            ..Default::default()
        };
        assert!(validate_auction_update(&update).is_err());
    }

    #[test]
    fn test_update_rejects_past_end_time() {
        let mut update = AuctionUpdate {
            ends_at: Some(Utc::now() - Duration::hours(1)),
            ..Default::default()
        };
        assert!(matches!(validate_auction_update(&update), Err(AppError::Validation(_))));

        update.ends_at = Some(Utc::now() + Duration::days(1));
        assert!(validate_auction_update(&update).is_ok());
        assert!(validate_auction_update(&AuctionUpdate::default()).is_ok());
    }

    #[test]
    fn test_currency_normalization() {
        assert_eq!(normalize_currency(Some("eur")).unwrap(), "EUR");
        assert_eq!(normalize_currency(Some("  ")).unwrap(), "USD");
        assert!(normalize_currency(Some("EURO")).is_err());
        assert!(normalize_currency(Some("U$D")).is_err());
    }

    #[test]
    fn test_filter_price_range() {
        let filter = AuctionFilter {
            min_price: Some(Decimal::new(50, 0)),
            max_price: Some(Decimal::new(10, 0)),
            ..Default::default()
        };
        assert!(validate_filter(&filter).is_err());
        assert!(validate_filter(&AuctionFilter::default()).is_ok());
    }
}
