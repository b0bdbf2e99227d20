use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Where a listing comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Marketplace {
    Local,
    Ebay,
    Mercari,
    Facebook,
}

impl Marketplace {
    /// Convert from database string
    pub fn from_str(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Marketplace::Local),
            "ebay" => Ok(Marketplace::Ebay),
            "mercari" => Ok(Marketplace::Mercari),
            "facebook" => Ok(Marketplace::Facebook),
            _ => Err(format!("Invalid marketplace: {}", s)),
        }
    }

    /// Convert to database string
    pub fn as_str(&self) -> &'static str {
        match self {
            Marketplace::Local => "local",
            Marketplace::Ebay => "ebay",
            Marketplace::Mercari => "mercari",
            Marketplace::Facebook => "facebook",
        }
    }

    pub fn is_external(&self) -> bool {
        *self != Marketplace::Local
    }
}

impl From<String> for Marketplace {
    fn from(s: String) -> Self {
        Self::from_str(&s).unwrap_or(Marketplace::Local)
    }
}

impl std::fmt::Display for Marketplace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Auction status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuctionStatus {
    Active,
    Ended,
    Cancelled,
}

impl AuctionStatus {
    /// Convert from database string
    pub fn from_str(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "active" => Ok(AuctionStatus::Active),
            "ended" => Ok(AuctionStatus::Ended),
            "cancelled" => Ok(AuctionStatus::Cancelled),
            _ => Err(format!("Invalid status: {}", s)),
        }
    }

    /// Convert to database string
    pub fn as_str(&self) -> &'static str {
        match self {
            AuctionStatus::Active => "active",
            AuctionStatus::Ended => "ended",
            AuctionStatus::Cancelled => "cancelled",
        }
    }
}

impl From<String> for AuctionStatus {
    fn from(s: String) -> Self {
        Self::from_str(&s).unwrap_or(AuctionStatus::Active)
    }
}

/// Auction listing, local or mirrored from an external marketplace
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Auction {
    pub id: Uuid,
    pub source: String, // Stored as TEXT, use Marketplace enum for type safety
    pub external_id: Option<String>,
    pub seller_id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub listing_url: Option<String>,
    pub current_price: Decimal,
    pub currency: String,
    pub bid_count: i32,
    pub status: String, // Stored as TEXT, use AuctionStatus enum for type safety
    pub ends_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Auction {
    /// Get source as an enum
    pub fn source_enum(&self) -> Marketplace {
        Marketplace::from_str(&self.source).unwrap_or(Marketplace::Local)
    }

    /// Get status as an enum
    pub fn status_enum(&self) -> AuctionStatus {
        AuctionStatus::from_str(&self.status).unwrap_or(AuctionStatus::Active)
    }

    pub fn is_active(&self) -> bool {
        self.status_enum() == AuctionStatus::Active
    }

    /// External listings mirror another site and cannot be edited here
    pub fn is_editable(&self) -> bool {
        !self.source_enum().is_external()
    }

    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.seller_id == Some(user_id)
    }
}

/// Fields for a new local listing
#[derive(Debug, Clone, Deserialize)]
pub struct NewAuction {
    pub title: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub starting_price: Decimal,
    pub currency: Option<String>,
    pub ends_at: Option<DateTime<Utc>>,
}

/// Editable listing fields; `None` leaves a field untouched
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuctionUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub current_price: Option<Decimal>,
    pub status: Option<AuctionStatus>,
    pub ends_at: Option<DateTime<Utc>>,
}

/// A normalized external listing ready to be upserted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedListing {
    pub marketplace: Marketplace,
    pub external_id: String,
    pub title: String,
    pub price: Decimal,
    pub currency: String,
    pub listing_url: Option<String>,
    pub image_url: Option<String>,
    pub bid_count: i32,
    pub ends_at: Option<DateTime<Utc>>,
}

/// Sort orders for stored listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuctionSort {
    #[default]
    Newest,
    PriceAsc,
    PriceDesc,
    EndingSoon,
}

impl AuctionSort {
    /// ORDER BY clause; only ever built from this enum
    pub fn order_clause(&self) -> &'static str {
        match self {
            AuctionSort::Newest => "created_at DESC, id",
            AuctionSort::PriceAsc => "current_price ASC, created_at DESC",
            AuctionSort::PriceDesc => "current_price DESC, created_at DESC",
            AuctionSort::EndingSoon => "ends_at ASC NULLS LAST, created_at DESC",
        }
    }
}

/// Filters for listing stored auctions
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuctionFilter {
    pub source: Option<Marketplace>,
    pub status: Option<AuctionStatus>,
    pub q: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub seller_id: Option<Uuid>,
    #[serde(default)]
    pub sort: AuctionSort,
}
