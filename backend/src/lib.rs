//! Final10 Backend Library
//!
//! This module exposes the backend components for use by the binary, tests
//! and other consumers.

pub mod aggregation;
pub mod auth;
pub mod config;
pub mod database;
pub mod error;
pub mod http;
pub mod leveling;
pub mod models;
pub mod repositories;
pub mod risk;
pub mod services;
pub mod websocket;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{AppError, AppResult};

use aggregation::Aggregator;
use auth::JwtKeys;
use database::Database;
use repositories::*;
use services::*;
use std::sync::Arc;
use websocket::WebSocketServer;

/// Application state containing all repositories and services
pub struct AppState {
    pub config: AppConfig,
    pub database: Database,
    pub keys: JwtKeys,
    pub user_repo: Arc<UserRepository>,
    pub points_repo: Arc<PointsRepository>,
    pub auction_repo: Arc<AuctionRepository>,
    pub promo_repo: Arc<PromoCodeRepository>,
    pub commission_repo: Arc<CommissionRepository>,
    pub feed_repo: Arc<FeedRepository>,
    pub fraud_signal_repo: Arc<FraudSignalRepository>,
    pub ws_server: Arc<WebSocketServer>,
    pub aggregator: Arc<Aggregator>,
    pub feed_service: Arc<FeedService>,
    pub points_service: Arc<PointsService>,
    pub user_service: Arc<UserService>,
    pub auction_service: Arc<AuctionService>,
    pub promo_service: Arc<PromoService>,
    pub fraud_service: Arc<FraudService>,
}

impl AppState {
    /// Create a new AppState with initialized repositories and services
    pub fn new(
        pool: sqlx::PgPool,
        config: AppConfig,
        aggregator: Arc<Aggregator>,
        ws_server: Arc<WebSocketServer>,
    ) -> Self {
        let database = Database::new(pool.clone());
        let keys = JwtKeys::new(&config.auth.jwt_secret, config.auth.token_ttl_hours);

        let user_repo = Arc::new(UserRepository::new(pool.clone()));
        let points_repo = Arc::new(PointsRepository::new(pool.clone()));
        let auction_repo = Arc::new(AuctionRepository::new(pool.clone()));
        let promo_repo = Arc::new(PromoCodeRepository::new(pool.clone()));
        let commission_repo = Arc::new(CommissionRepository::new(pool.clone()));
        let feed_repo = Arc::new(FeedRepository::new(pool.clone()));
        let fraud_signal_repo = Arc::new(FraudSignalRepository::new(pool));

        let feed_service = Arc::new(FeedService::new(feed_repo.clone(), ws_server.clone()));
        let points_service = Arc::new(PointsService::new(
            points_repo.clone(),
            user_repo.clone(),
            feed_service.clone(),
        ));
        let user_service = Arc::new(UserService::new(
            user_repo.clone(),
            points_service.clone(),
            feed_service.clone(),
            keys.clone(),
        ));
        let auction_service = Arc::new(AuctionService::new(
            auction_repo.clone(),
            points_service.clone(),
            feed_service.clone(),
            aggregator.clone(),
            ws_server.clone(),
        ));
        let promo_service = Arc::new(PromoService::new(
            promo_repo.clone(),
            commission_repo.clone(),
            points_service.clone(),
            feed_service.clone(),
        ));
        let fraud_service = Arc::new(FraudService::new(fraud_signal_repo.clone(), user_repo.clone()));

        Self {
            config,
            database,
            keys,
            user_repo,
            points_repo,
            auction_repo,
            promo_repo,
            commission_repo,
            feed_repo,
            fraud_signal_repo,
            ws_server,
            aggregator,
            feed_service,
            points_service,
            user_service,
            auction_service,
            promo_service,
            fraud_service,
        }
    }
}
