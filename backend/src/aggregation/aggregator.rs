use super::normalize::normalize_listing;
use super::source::{HttpMarketplaceSource, MarketplaceSource, SearchQuery};
use crate::config::AggregationConfig;
use crate::error::{AppError, AppResult};
use crate::models::{AggregatedListing, Marketplace};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{info, warn};

/// How merged results are ordered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultOrder {
    #[default]
    PriceAsc,
    PriceDesc,
    EndingSoon,
    Relevance,
}

/// Outcome of querying one source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceReport {
    pub marketplace: Marketplace,
    pub count: usize,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatedResults {
    pub query: String,
    pub listings: Vec<AggregatedListing>,
    pub sources: Vec<SourceReport>,
}

impl AggregatedResults {
    pub fn failed_sources(&self) -> impl Iterator<Item = &SourceReport> {
        self.sources.iter().filter(|s| s.error.is_some())
    }
}

/// Queries every configured marketplace and merges the answers
pub struct Aggregator {
    sources: Vec<Arc<dyn MarketplaceSource>>,
    timeout: Duration,
    per_source_limit: usize,
}

impl Aggregator {
    pub fn new(sources: Vec<Arc<dyn MarketplaceSource>>, timeout: Duration, per_source_limit: usize) -> Self {
        Self {
            sources,
            timeout,
            per_source_limit: per_source_limit.max(1),
        }
    }

    /// One HTTP source per configured scraper service
    pub fn from_config(config: &AggregationConfig) -> AppResult<Self> {
        let mut sources: Vec<Arc<dyn MarketplaceSource>> = Vec::with_capacity(config.sources.len());
        for source in &config.sources {
            sources.push(Arc::new(HttpMarketplaceSource::new(
                source.marketplace,
                source.base_url.clone(),
                config.timeout(),
            )?));
        }

        Ok(Self::new(sources, config.timeout(), config.per_source_limit))
    }

    pub fn has_sources(&self) -> bool {
        !self.sources.is_empty()
    }

    pub fn marketplaces(&self) -> Vec<Marketplace> {
        self.sources.iter().map(|s| s.marketplace()).collect()
    }

    /// Fan out to every source; `limit` caps the merged list
    pub async fn search(&self, text: &str, limit: usize, order: ResultOrder) -> AppResult<AggregatedResults> {
        let text = text.trim();
        if text.is_empty() {
            return Err(AppError::Validation("Search query is required".to_string()));
        }

        let query = SearchQuery {
            text: text.to_string(),
            limit: self.per_source_limit,
        };

        let calls = self.sources.iter().map(|source| {
            let source = Arc::clone(source);
            let query = &query;
            async move {
                let marketplace = source.marketplace();
                let result = match timeout(self.timeout, source.search(query)).await {
                    Ok(result) => result,
                    Err(_) => Err(AppError::ExternalService(format!(
                        "{} timed out after {:?}",
                        marketplace, self.timeout
                    ))),
                };
                (marketplace, result)
            }
        });

        let mut listings = Vec::new();
        let mut reports = Vec::with_capacity(self.sources.len());

        for (marketplace, result) in join_all(calls).await {
            match result {
                Ok(raw) => {
                    let normalized: Vec<AggregatedListing> = raw
                        .iter()
                        .filter_map(|item| normalize_listing(marketplace, item))
                        .collect();

                    if normalized.len() < raw.len() {
                        warn!(
                            "Dropped {} unusable listings from {}",
                            raw.len() - normalized.len(),
                            marketplace
                        );
                    }

                    reports.push(SourceReport {
                        marketplace,
                        count: normalized.len(),
                        error: None,
                    });
                    listings.extend(normalized);
                }
                Err(e) => {
                    warn!("Marketplace {} failed for '{}': {}", marketplace, text, e);
                    reports.push(SourceReport {
                        marketplace,
                        count: 0,
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        let mut merged = merge(listings, text, order);
        merged.truncate(limit);

        info!(
            "Aggregated '{}': {} listings from {} sources ({} failed)",
            text,
            merged.len(),
            reports.len(),
            reports.iter().filter(|r| r.error.is_some()).count()
        );

        Ok(AggregatedResults {
            query: text.to_string(),
            listings: merged,
            sources: reports,
        })
    }
}

/// De-duplicate by (marketplace, external_id), first occurrence wins, then order
pub fn merge(listings: Vec<AggregatedListing>, query: &str, order: ResultOrder) -> Vec<AggregatedListing> {
    let mut seen = HashSet::new();
    let mut unique: Vec<AggregatedListing> = listings
        .into_iter()
        .filter(|l| seen.insert((l.marketplace, l.external_id.clone())))
        .collect();

    match order {
        ResultOrder::PriceAsc => unique.sort_by(|a, b| a.price.cmp(&b.price)),
        ResultOrder::PriceDesc => unique.sort_by(|a, b| b.price.cmp(&a.price)),
        // Undated listings go last
        ResultOrder::EndingSoon => unique.sort_by(|a, b| match (a.ends_at, b.ends_at) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => a.price.cmp(&b.price),
        }),
        ResultOrder::Relevance => {
            let needle = query.to_lowercase();
            unique.sort_by_key(|l| (!l.title.to_lowercase().contains(&needle), l.price));
        }
    }

    unique
}
