//! Repository for auction listings, local and mirrored

use crate::error::RepositoryError;
use crate::models::{AggregatedListing, Auction, AuctionFilter, AuctionUpdate, NewAuction, Pagination};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

const AUCTION_COLUMNS: &str = "id, source, external_id, seller_id, title, description, image_url, listing_url, \
     current_price, currency, bid_count, status, ends_at, created_at, updated_at";

pub struct AuctionRepository {
    pool: PgPool,
}

/// Append the WHERE clause shared by list and count
fn push_filters<'a>(builder: &mut QueryBuilder<'a, Postgres>, filter: &'a AuctionFilter) {
    builder.push(" WHERE TRUE");

    if let Some(source) = filter.source {
        builder.push(" AND source = ").push_bind(source.as_str());
    }
    if let Some(status) = filter.status {
        builder.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(q) = filter.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
        builder
            .push(" AND title ILIKE ")
            .push_bind(format!("%{}%", escape_like(q)));
    }
    if let Some(min) = filter.min_price {
        builder.push(" AND current_price >= ").push_bind(min);
    }
    if let Some(max) = filter.max_price {
        builder.push(" AND current_price <= ").push_bind(max);
    }
    if let Some(seller_id) = filter.seller_id {
        builder.push(" AND seller_id = ").push_bind(seller_id);
    }
}

/// Escape LIKE wildcards in user input
fn escape_like(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

impl AuctionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a local listing
    pub async fn create_local(&self, seller_id: Uuid, new: &NewAuction, currency: &str) -> Result<Auction, RepositoryError> {
        let sql = format!(
            "INSERT INTO auctions (source, seller_id, title, description, image_url, current_price, currency, ends_at) \
             VALUES ('local', $1, $2, $3, $4, $5, $6, $7) \
             RETURNING {}",
            AUCTION_COLUMNS
        );

        let auction = sqlx::query_as::<_, Auction>(&sql)
            .bind(seller_id)
            .bind(new.title.trim())
            .bind(new.description.as_deref())
            .bind(new.image_url.as_deref())
            .bind(new.starting_price)
            .bind(currency)
            .bind(new.ends_at)
            .fetch_one(&self.pool)
            .await?;

        Ok(auction)
    }

    /// Insert or refresh a mirrored listing keyed by (source, external_id)
    pub async fn upsert_external(&self, listing: &AggregatedListing) -> Result<Auction, RepositoryError> {
        let sql = format!(
            "INSERT INTO auctions \
                (source, external_id, title, image_url, listing_url, current_price, currency, bid_count, ends_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             ON CONFLICT (source, external_id) DO UPDATE SET \
                title = EXCLUDED.title, \
                image_url = EXCLUDED.image_url, \
                listing_url = EXCLUDED.listing_url, \
                current_price = EXCLUDED.current_price, \
                currency = EXCLUDED.currency, \
                bid_count = EXCLUDED.bid_count, \
                ends_at = EXCLUDED.ends_at, \
                updated_at = NOW() \
             RETURNING {}",
            AUCTION_COLUMNS
        );

        let auction = sqlx::query_as::<_, Auction>(&sql)
            .bind(listing.marketplace.as_str())
            .bind(&listing.external_id)
            .bind(&listing.title)
            .bind(listing.image_url.as_deref())
            .bind(listing.listing_url.as_deref())
            .bind(listing.price)
            .bind(&listing.currency)
            .bind(listing.bid_count)
            .bind(listing.ends_at)
            .fetch_one(&self.pool)
            .await?;

        Ok(auction)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Auction>, RepositoryError> {
        let sql = format!("SELECT {} FROM auctions WHERE id = $1", AUCTION_COLUMNS);
        let auction = sqlx::query_as::<_, Auction>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(auction)
    }

    /// Filtered, sorted page of listings
    pub async fn list(&self, filter: &AuctionFilter, pagination: Pagination) -> Result<Vec<Auction>, RepositoryError> {
        let mut builder = QueryBuilder::<Postgres>::new(format!("SELECT {} FROM auctions", AUCTION_COLUMNS));
        push_filters(&mut builder, filter);
        builder
            .push(" ORDER BY ")
            .push(filter.sort.order_clause())
            .push(" LIMIT ")
            .push_bind(pagination.limit())
            .push(" OFFSET ")
            .push_bind(pagination.offset());

        let auctions = builder.build_query_as::<Auction>().fetch_all(&self.pool).await?;
        Ok(auctions)
    }

    pub async fn count(&self, filter: &AuctionFilter) -> Result<i64, RepositoryError> {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM auctions");
        push_filters(&mut builder, filter);

        let count = builder.build_query_scalar::<i64>().fetch_one(&self.pool).await?;
        Ok(count)
    }

    /// Apply a partial update; absent fields are left unchanged
    pub async fn update(&self, id: Uuid, update: &AuctionUpdate) -> Result<Auction, RepositoryError> {
        let sql = format!(
            "UPDATE auctions SET \
                title = COALESCE($2, title), \
                description = COALESCE($3, description), \
                image_url = COALESCE($4, image_url), \
                current_price = COALESCE($5, current_price), \
                status = COALESCE($6, status), \
                ends_at = COALESCE($7, ends_at), \
                updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {}",
            AUCTION_COLUMNS
        );

        sqlx::query_as::<_, Auction>(&sql)
            .bind(id)
            .bind(update.title.as_deref().map(str::trim))
            .bind(update.description.as_deref())
            .bind(update.image_url.as_deref())
            .bind(update.current_price)
            .bind(update.status.map(|s| s.as_str()))
            .bind(update.ends_at)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| RepositoryError::NotFound("Auction not found".to_string()))
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM auctions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Mark active listings past their end time as ended
    pub async fn end_expired(&self) -> Result<Vec<Uuid>, RepositoryError> {
        let ids: Vec<Uuid> = sqlx::query_scalar(
            "UPDATE auctions SET status = 'ended', updated_at = NOW() \
             WHERE status = 'active' AND ends_at IS NOT NULL AND ends_at < NOW() \
             RETURNING id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }
}
