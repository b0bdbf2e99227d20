//! REST API under `/api`.
//!
//! Handlers stay thin: they extract and authenticate, call one service
//! method and shape the JSON response. Every failure goes out through
//! [`AppError`]'s `IntoResponse`, including malformed bodies, query strings
//! and path parameters, which are rejected with 400 and the usual
//! `{"error": ...}` body.

pub mod auctions;
pub mod auth;
pub mod commissions;
pub mod feed;
pub mod fraud;
pub mod points;
pub mod promo_codes;
pub mod users;

use crate::error::AppError;
use crate::AppState;
use axum::async_trait;
use axum::extract::{FromRequest, FromRequestParts, Path, Query, Request, State};
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::request::Parts;
use axum::http::{HeaderValue, Method};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

/// JSON body extractor whose rejection is an [`AppError`]
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(AppError::Validation(rejection.body_text())),
        }
    }
}

/// Query string extractor whose rejection is an [`AppError`]
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiQuery<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Query::<T>::from_request_parts(parts, state).await {
            Ok(Query(value)) => Ok(ApiQuery(value)),
            Err(rejection) => Err(AppError::Validation(rejection.body_text())),
        }
    }
}

/// Path parameter extractor whose rejection is an [`AppError`]
#[derive(Debug, Clone, Copy)]
pub struct ApiPath<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for ApiPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Path::<T>::from_request_parts(parts, state).await {
            Ok(Path(value)) => Ok(ApiPath(value)),
            Err(rejection) => Err(AppError::Validation(rejection.body_text())),
        }
    }
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Readiness: the database answers a trivial query
async fn ready(State(state): State<Arc<AppState>>) -> Result<Json<Value>, AppError> {
    state.database.ping().await?;
    Ok(Json(json!({ "status": "ready" })))
}

async fn not_found() -> AppError {
    AppError::NotFound("Route not found".to_string())
}

fn cors_layer(origin: Option<&str>) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    match origin.map(HeaderValue::from_str) {
        Some(Ok(origin)) => base.allow_origin(origin),
        Some(Err(_)) => {
            warn!("Ignoring unparsable CORS_ORIGIN, allowing any origin");
            base.allow_origin(Any)
        }
        None => base.allow_origin(Any),
    }
}

/// Build the full API router
pub fn router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(state.config.cors_origin.as_deref());

    let api = Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(ready))
        // Auth
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/me", get(auth::me))
        // Users
        .route("/users/me", put(users::update_me).delete(users::delete_me))
        .route("/users/me/password", put(users::change_password))
        .route("/users/:id", get(users::get_profile))
        // Auctions
        .route("/auctions", get(auctions::list).post(auctions::create))
        .route("/auctions/search", get(auctions::search))
        .route(
            "/auctions/:id",
            get(auctions::get).put(auctions::update).delete(auctions::delete),
        )
        // Points
        .route("/points/me", get(points::me))
        .route("/points/history", get(points::history))
        .route("/points/daily", post(points::daily))
        .route("/points/leaderboard", get(points::leaderboard))
        // Promo codes
        .route("/promo-codes", post(promo_codes::create))
        .route("/promo-codes/mine", get(promo_codes::mine))
        .route("/promo-codes/validate", post(promo_codes::validate))
        .route("/promo-codes/redeem", post(promo_codes::redeem))
        .route("/promo-codes/:id", delete(promo_codes::deactivate))
        // Commissions
        .route("/commissions/mine", get(commissions::mine))
        .route("/commissions/summary", get(commissions::summary))
        .route("/commissions/:id/pay", post(commissions::pay))
        // Feed
        .route("/feed", get(feed::list))
        .route("/feed/users/:id", get(feed::for_user))
        // Fraud signals
        .route("/fraud/signals", post(fraud::record))
        .route("/fraud/users/:id", get(fraud::user_report));

    Router::new()
        .nest("/api", api)
        .fallback(not_found)
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
