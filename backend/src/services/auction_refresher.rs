use crate::aggregation::ResultOrder;
use crate::error::AppResult;
use crate::services::auction_service::MAX_SEARCH_RESULTS;
use crate::services::AuctionService;
use std::sync::Arc;
use std::time::Duration;
use tokio::time;
use tracing::{error, info, warn};

/// Background task that re-runs tracked marketplace searches and ends expired auctions
pub struct AuctionRefresher {
    auction_service: Arc<AuctionService>,
    tracked_queries: Vec<String>,
    refresh_interval: Duration,
    per_query_limit: usize,
}

/// Totals for one pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshSummary {
    pub queries_run: usize,
    pub queries_failed: usize,
    pub listings_seen: usize,
    pub auctions_ended: usize,
}

impl AuctionRefresher {
    pub fn new(auction_service: Arc<AuctionService>, tracked_queries: Vec<String>) -> Self {
        Self {
            auction_service,
            tracked_queries,
            refresh_interval: Duration::from_secs(900),
            per_query_limit: MAX_SEARCH_RESULTS,
        }
    }

    /// Set refresh interval
    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    /// Run forever on the configured interval
    pub async fn start(self) {
        let mut interval = time::interval(self.refresh_interval);
        info!(
            "Auction refresher started: {} tracked queries, every {:?}",
            self.tracked_queries.len(),
            self.refresh_interval
        );

        loop {
            interval.tick().await;

            match self.refresh_once().await {
                Ok(summary) => info!(
                    "Refresh pass: {} queries ({} failed), {} listings, {} auctions ended",
                    summary.queries_run, summary.queries_failed, summary.listings_seen, summary.auctions_ended
                ),
                Err(e) => error!("Error in auction refresher: {}", e),
            }
        }
    }

    /// One pass: every tracked query with persistence on, then the expiry sweep
    pub async fn refresh_once(&self) -> AppResult<RefreshSummary> {
        let mut summary = RefreshSummary::default();

        for query in &self.tracked_queries {
            summary.queries_run += 1;
            match self
                .auction_service
                .search_marketplaces(query, Some(self.per_query_limit), ResultOrder::PriceAsc, true)
                .await
            {
                Ok(results) => {
                    summary.listings_seen += results.listings.len();
                    for failed in results.failed_sources() {
                        warn!(
                            "Refresh of '{}' missed {}: {}",
                            query,
                            failed.marketplace,
                            failed.error.as_deref().unwrap_or("unknown error")
                        );
                    }
                }
                Err(e) => {
                    summary.queries_failed += 1;
                    warn!("Refresh of '{}' failed: {}", query, e);
                }
            }
        }

        summary.auctions_ended = self.auction_service.end_expired().await?;
        Ok(summary)
    }
}
