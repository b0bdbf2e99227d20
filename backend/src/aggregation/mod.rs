//! Fan-out search across external marketplace scraper services.
//!
//! Each marketplace is reached through a [`MarketplaceSource`]. The
//! [`Aggregator`] queries every source concurrently, normalizes what comes
//! back into [`AggregatedListing`](crate::models::AggregatedListing)s and
//! merges them into one ordered list. A slow or broken source only costs its
//! own results: it is reported in the [`SourceReport`] list instead of
//! failing the search.

pub mod aggregator;
pub mod normalize;
pub mod source;

pub use aggregator::{AggregatedResults, Aggregator, ResultOrder, SourceReport};
pub use normalize::{normalize_listing, normalize_title, parse_price};
pub use source::{ExternalListing, HttpMarketplaceSource, MarketplaceSource, PriceValue, SearchQuery};
