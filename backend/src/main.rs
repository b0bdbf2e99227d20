//! Final10 Backend Service
//!
//! Main entry point for the Final10 auction marketplace backend.
//! This service provides:
//! - REST API under `/api` for accounts, auctions, points, promo codes and fraud signals
//! - WebSocket hub for the live activity feed and auction updates
//! - Background refresh of tracked marketplace searches

use final10_backend::aggregation::Aggregator;
use final10_backend::database::{create_pool, run_migrations};
use final10_backend::services::AuctionRefresher;
use final10_backend::websocket::WebSocketServer;
use final10_backend::{http, AppConfig, AppError, AppResult, AppState};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "final10_backend={},sqlx=warn,tower_http=info",
            config.log_level
        )
        .into()
    });

    if config.log_format == "json" {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> AppResult<()> {
    // Load environment variables first
    dotenv::dotenv().ok();

    // Load configuration
    let config = AppConfig::from_env().map_err(|e| {
        eprintln!("Configuration error: {}", e);
        AppError::Config(e)
    })?;

    init_tracing(&config);

    info!("╔══════════════════════════════════════════════════════════╗");
    info!("║           Final10 Backend Service Starting               ║");
    info!("╚══════════════════════════════════════════════════════════╝");
    info!("Environment: {}", config.environment);
    info!("Log level: {}", config.log_level);
    info!("HTTP port: {}", config.http_port);
    if let Some(ws_port) = config.ws_port {
        info!("WebSocket port: {}", ws_port);
    }
    if config.auth.uses_dev_secret() {
        warn!("JWT_SECRET not set, using the development secret");
    }

    // =========================================================================
    // DATABASE SETUP
    // =========================================================================
    info!("Connecting to database...");

    let pool = create_pool(&config.database).await.map_err(|e| {
        error!("Failed to create database pool: {}", e);
        AppError::Database(e)
    })?;

    info!("Database connection pool created successfully");
    info!("Max connections: {}", config.database.max_connections);

    info!("Running database migrations...");
    run_migrations(&pool, None).await.map_err(|e| {
        error!("Database migration failed: {}", e);
        AppError::Database(e)
    })?;

    info!("Database migrations completed successfully");

    // =========================================================================
    // CORE SERVICES INITIALIZATION
    // =========================================================================
    info!("Initializing core services...");

    let aggregator = Arc::new(Aggregator::from_config(&config.aggregation)?);
    if aggregator.has_sources() {
        info!("✓ Marketplace aggregator initialized: {:?}", aggregator.marketplaces());
    } else {
        warn!("MARKETPLACE_SOURCES not configured - marketplace search disabled");
    }

    let ws_server = Arc::new(WebSocketServer::new());
    info!("✓ WebSocket hub initialized");

    let app_state = Arc::new(AppState::new(
        pool,
        config.clone(),
        aggregator.clone(),
        ws_server.clone(),
    ));
    info!("✓ Application state initialized");

    // =========================================================================
    // BACKGROUND TASKS
    // =========================================================================
    let refresher_handle = if aggregator.has_sources() && !config.aggregation.tracked_queries.is_empty() {
        let refresher = AuctionRefresher::new(
            app_state.auction_service.clone(),
            config.aggregation.tracked_queries.clone(),
        )
        .with_refresh_interval(config.aggregation.refresh_interval());

        let handle = tokio::spawn(async move {
            refresher.start().await;
        });
        info!(
            "✓ Auction refresher started ({}s interval)",
            config.aggregation.refresh_interval_secs
        );
        Some(handle)
    } else {
        info!("No tracked queries - auction refresher not started");
        None
    };

    // =========================================================================
    // START SERVERS
    // =========================================================================
    let ws_handle = match config.ws_port {
        Some(ws_port) => {
            let ws_addr = SocketAddr::from(([0, 0, 0, 0], ws_port));
            let hub = ws_server.clone();
            let handle = tokio::spawn(async move {
                if let Err(e) = hub.run(ws_addr).await {
                    error!("WebSocket server error: {}", e);
                }
            });
            info!("✓ WebSocket server starting on {}", ws_addr);
            Some(handle)
        }
        None => {
            warn!("WS_PORT not configured - WebSocket server not started");
            None
        }
    };

    let http_addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    let listener = TcpListener::bind(http_addr)
        .await
        .map_err(|e| AppError::Message(format!("Failed to bind HTTP server: {}", e)))?;

    let app = http::router(app_state.clone());
    let http_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("HTTP server error: {}", e);
        }
    });

    // =========================================================================
    // READY
    // =========================================================================
    info!("╔══════════════════════════════════════════════════════════╗");
    info!("║           Final10 Backend Service Ready!                 ║");
    info!("╠══════════════════════════════════════════════════════════╣");
    info!("║  REST API:     {}/api", http_addr);
    if let Some(ws_port) = config.ws_port {
        info!("║  WebSocket:    0.0.0.0:{}", ws_port);
    }
    info!("║  Environment:  {}", config.environment);
    info!("╚══════════════════════════════════════════════════════════╝");
    info!("Press Ctrl+C to shutdown gracefully");

    // =========================================================================
    // SHUTDOWN HANDLING
    // =========================================================================
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received, shutting down gracefully...");
        }
        _ = http_handle => {
            error!("HTTP server exited unexpectedly");
        }
        _ = async {
            match refresher_handle {
                Some(handle) => { handle.await.ok(); }
                // Never completes if the refresher is not running
                None => futures::future::pending::<()>().await,
            }
        } => {
            error!("Auction refresher exited unexpectedly");
        }
        _ = async {
            match ws_handle {
                Some(handle) => { handle.await.ok(); }
                None => futures::future::pending::<()>().await,
            }
        } => {
            error!("WebSocket server exited unexpectedly");
        }
    }

    app_state.database.pool().close().await;
    info!("Final10 backend service shutdown complete");
    Ok(())
}
