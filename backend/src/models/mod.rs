//! Domain models for the Final10 backend.
//!
//! This module contains all database-backed models representing
//! the core entities of the marketplace.

pub mod auction;
pub mod commission;
pub mod feed_item;
pub mod fraud_signal;
pub mod page;
pub mod points;
pub mod promo_code;
pub mod user;

// Re-export all models for convenient access
pub use auction::{
    AggregatedListing, Auction, AuctionFilter, AuctionSort, AuctionStatus, AuctionUpdate,
    Marketplace, NewAuction,
};
pub use commission::{Commission, CommissionStatus, CommissionSummary};
pub use feed_item::{FeedItem, FeedKind};
pub use fraud_signal::{FraudSignal, FraudSignalInput};
pub use page::{Page, Pagination, MAX_PAGE};
pub use points::PointTransaction;
pub use promo_code::{NewPromoCode, PromoCode, PromoCodeUsage, PromoQuote, PromoRejection};
pub use user::{LeaderboardEntry, ProfileUpdate, PublicProfile, Role, User};

use rust_decimal::Decimal;

/// Largest value a `NUMERIC(12,2)` money column holds (9 999 999 999.99)
pub const MAX_MONEY: Decimal = Decimal::from_parts(0xD4A5_0FFF, 0xE8, 0, false, 2);
