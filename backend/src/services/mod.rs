pub mod auction_refresher;
pub mod auction_service;
pub mod feed_service;
pub mod fraud_service;
pub mod points_service;
pub mod promo_service;
pub mod user_service;

pub use auction_refresher::{AuctionRefresher, RefreshSummary};
pub use auction_service::AuctionService;
pub use feed_service::FeedService;
pub use fraud_service::{FraudService, RecordedSignal, UserRiskReport};
pub use points_service::{AwardOutcome, PointsService};
pub use promo_service::PromoService;
pub use user_service::{Session, UserService};
