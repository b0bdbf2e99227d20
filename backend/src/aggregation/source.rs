use crate::error::{AppError, AppResult};
use crate::models::Marketplace;
use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// What to ask every marketplace for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub text: String,
    pub limit: usize,
}

/// Price as scraper services send it: a number or display text like "$1,200"
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PriceValue {
    Number(f64),
    Text(String),
}

/// Raw listing as returned by a scraper service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalListing {
    pub id: String,
    pub title: String,
    pub price: PriceValue,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub bids: Option<i32>,
    #[serde(default)]
    pub ends_at: Option<DateTime<Utc>>,
}

/// A scraper service for one marketplace
#[async_trait]
pub trait MarketplaceSource: Send + Sync {
    fn marketplace(&self) -> Marketplace;

    async fn search(&self, query: &SearchQuery) -> AppResult<Vec<ExternalListing>>;
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SearchResponse {
    Bare(Vec<ExternalListing>),
    Wrapped { listings: Vec<ExternalListing> },
}

impl SearchResponse {
    fn into_listings(self) -> Vec<ExternalListing> {
        match self {
            SearchResponse::Bare(listings) | SearchResponse::Wrapped { listings } => listings,
        }
    }
}

/// Talks to a scraper service over `GET {base_url}/search?q=&limit=`
pub struct HttpMarketplaceSource {
    marketplace: Marketplace,
    base_url: String,
    client: reqwest::Client,
}

impl HttpMarketplaceSource {
    pub fn new(marketplace: Marketplace, base_url: impl Into<String>, timeout: Duration) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("final10-backend/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            marketplace,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn fetch(&self, query: &SearchQuery) -> anyhow::Result<Vec<ExternalListing>> {
        let url = format!("{}/search", self.base_url);
        let limit = query.limit.to_string();

        let response = self
            .client
            .get(&url)
            .query(&[("q", query.text.as_str()), ("limit", limit.as_str())])
            .send()
            .await
            .with_context(|| format!("request to {} failed", url))?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("{} responded with {}", url, status);
        }

        let body: SearchResponse = response
            .json()
            .await
            .with_context(|| format!("invalid listing payload from {}", url))?;

        Ok(body.into_listings())
    }
}

#[async_trait]
impl MarketplaceSource for HttpMarketplaceSource {
    fn marketplace(&self) -> Marketplace {
        self.marketplace
    }

    async fn search(&self, query: &SearchQuery) -> AppResult<Vec<ExternalListing>> {
        debug!("Querying {} scraper for '{}'", self.marketplace, query.text);

        self.fetch(query)
            .await
            .map_err(|e| AppError::ExternalService(format!("{}: {:#}", self.marketplace, e)))
    }
}
