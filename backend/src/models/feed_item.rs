use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

/// Kind of activity shown in the feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedKind {
    AuctionListed,
    LevelUp,
    PromoRedeemed,
    UserJoined,
}

impl FeedKind {
    /// Convert from database string
    pub fn from_str(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "auction_listed" => Ok(FeedKind::AuctionListed),
            "level_up" => Ok(FeedKind::LevelUp),
            "promo_redeemed" => Ok(FeedKind::PromoRedeemed),
            "user_joined" => Ok(FeedKind::UserJoined),
            _ => Err(format!("Invalid feed kind: {}", s)),
        }
    }

    /// Convert to database string
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedKind::AuctionListed => "auction_listed",
            FeedKind::LevelUp => "level_up",
            FeedKind::PromoRedeemed => "promo_redeemed",
            FeedKind::UserJoined => "user_joined",
        }
    }
}

/// Activity feed entry
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FeedItem {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub kind: String, // Stored as TEXT, use FeedKind enum for type safety
    pub message: String,
    pub auction_id: Option<Uuid>,
    pub payload: Value, // JSONB
    pub created_at: DateTime<Utc>,
}

impl FeedItem {
    pub fn kind_enum(&self) -> Option<FeedKind> {
        FeedKind::from_str(&self.kind).ok()
    }
}
