pub mod auction_repository;
pub mod commission_repository;
pub mod feed_repository;
pub mod fraud_signal_repository;
pub mod points_repository;
pub mod promo_code_repository;
pub mod user_repository;

// Re-export all repositories for convenient access
pub use auction_repository::AuctionRepository;
pub use commission_repository::CommissionRepository;
pub use feed_repository::FeedRepository;
pub use fraud_signal_repository::{FraudSignalRepository, NewFraudSignal};
pub use points_repository::{PointsCredit, PointsRepository};
pub use promo_code_repository::{PromoCodeRepository, Redemption};
pub use user_repository::UserRepository;
