mod helpers;

use chrono::{Duration, Utc};
use final10_backend::error::RepositoryError;
use final10_backend::models::*;
use final10_backend::repositories::*;
use final10_backend::risk::{RiskAssessment, RiskLevel};
use helpers::*;
use rust_decimal::Decimal;
use sqlx::{PgPool, Row};

// ============================================================================
// Connection Pool Tests
// ============================================================================

#[sqlx::test]
async fn test_connection_pool_creation(pool: PgPool) {
    let row = sqlx::query("SELECT 1 as test")
        .fetch_one(&pool)
        .await
        .expect("Query failed");

    let value: i32 = row.get("test");
    assert_eq!(value, 1);
}

// ============================================================================
// Migration Tests
// ============================================================================

#[sqlx::test]
async fn test_migrations_ran(pool: PgPool) {
    let tables = vec![
        "users",
        "point_transactions",
        "auctions",
        "promo_codes",
        "promo_code_usages",
        "commissions",
        "feed_items",
        "fraud_signals",
    ];

    for table in tables {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT FROM information_schema.tables WHERE table_name = $1)",
        )
        .bind(table)
        .fetch_one(&pool)
        .await
        .expect("Query failed");

        assert!(exists, "Table {} should exist", table);
    }
}

// ============================================================================
// User Repository Tests
// ============================================================================

#[sqlx::test]
async fn test_user_create(pool: PgPool) {
    let db = TestDatabase::from_pool(pool).await;

    let user = create_test_user(&db, "vintage_vera").await;

    assert_eq!(user.username, "vintage_vera");
    assert_eq!(user.email, "vintage_vera@example.com");
    assert_eq!(user.points, 0);
    assert_eq!(user.level, 1);
    assert_eq!(user.role_enum(), Role::User);
    assert!(user.last_daily_bonus_at.is_none());
}

#[sqlx::test]
async fn test_user_duplicate_username(pool: PgPool) {
    let db = TestDatabase::from_pool(pool).await;
    create_test_user(&db, "dup").await;

    let result = db.user_repo.create("dup", "other@example.com", "hash", None).await;
    match result {
        Err(RepositoryError::Duplicate(msg)) => assert_eq!(msg, "Username is already taken"),
        unexpected => panic!("Expected duplicate error, got {:?}", unexpected),
    }
}

#[sqlx::test]
async fn test_username_unique_ignoring_case(pool: PgPool) {
    let db = TestDatabase::from_pool(pool).await;
    let alice = create_test_user(&db, "Alice").await;

    let result = db.user_repo.create("alice", "second@example.com", "hash", None).await;
    match result {
        Err(RepositoryError::Duplicate(msg)) => assert_eq!(msg, "Username is already taken"),
        unexpected => panic!("Expected duplicate error, got {:?}", unexpected),
    }

    let session = db.state.user_service.login("ALICE", TEST_PASSWORD).await.unwrap();
    assert_eq!(session.user.id, alice.id);
}

#[sqlx::test]
async fn test_user_find_by_identifier(pool: PgPool) {
    let db = TestDatabase::from_pool(pool).await;
    let user = create_test_user(&db, "Camera_Carl").await;

    let by_name = db.user_repo.find_by_identifier("camera_carl").await.unwrap();
    assert_eq!(by_name.map(|u| u.id), Some(user.id));

    let by_email = db.user_repo.find_by_identifier("CAMERA_CARL@EXAMPLE.COM").await.unwrap();
    assert_eq!(by_email.map(|u| u.id), Some(user.id));

    assert!(db.user_repo.find_by_identifier("nobody").await.unwrap().is_none());
}

#[sqlx::test]
async fn test_user_update_profile_keeps_unset_fields(pool: PgPool) {
    let db = TestDatabase::from_pool(pool).await;
    let user = create_test_user(&db, "profile_pat").await;

    let updated = db
        .user_repo
        .update_profile(
            user.id,
            &ProfileUpdate {
                bio: Some("Collector of film cameras".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.bio.as_deref(), Some("Collector of film cameras"));
    assert_eq!(updated.email, user.email);
    assert!(updated.updated_at >= user.updated_at);
}

#[sqlx::test]
async fn test_leaderboard_order(pool: PgPool) {
    let db = TestDatabase::from_pool(pool).await;
    let low = create_test_user(&db, "low").await;
    let high = create_test_user(&db, "high").await;
    let mid = create_test_user(&db, "mid").await;

    db.points_repo.credit(low.id, 10, "test").await.unwrap();
    db.points_repo.credit(high.id, 300, "test").await.unwrap();
    db.points_repo.credit(mid.id, 120, "test").await.unwrap();

    let board = db.user_repo.leaderboard(2).await.unwrap();
    let names: Vec<_> = board.iter().map(|e| e.username.as_str()).collect();
    assert_eq!(names, vec!["high", "mid"]);
    assert_eq!(board[0].level, 3);
}

// ============================================================================
// Points Repository Tests
// ============================================================================

#[sqlx::test]
async fn test_points_credit_updates_level_and_ledger(pool: PgPool) {
    let db = TestDatabase::from_pool(pool).await;
    let user = create_test_user(&db, "earner").await;

    let first = db.points_repo.credit(user.id, 60, "signup").await.unwrap();
    assert_eq!(first.previous_level, 1);
    assert_eq!(first.user.points, 60);
    assert_eq!(first.user.level, 1);

    let second = db.points_repo.credit(user.id, 45, "create_listing").await.unwrap();
    assert_eq!(second.previous_level, 1);
    assert_eq!(second.user.points, 105);
    assert_eq!(second.user.level, 2);
    assert_eq!(second.transaction.amount, 45);
    assert_eq!(second.transaction.reason, "create_listing");

    assert_eq!(db.points_repo.ledger_total(user.id).await.unwrap(), 105);
    assert_eq!(db.points_repo.count_for_user(user.id).await.unwrap(), 2);

    let history = db.points_repo.history(user.id, 10, 0).await.unwrap();
    assert_eq!(history[0].reason, "create_listing");
}

#[sqlx::test]
async fn test_points_cannot_go_negative(pool: PgPool) {
    let db = TestDatabase::from_pool(pool).await;
    let user = create_test_user(&db, "spender").await;
    db.points_repo.credit(user.id, 20, "signup").await.unwrap();

    let result = db.points_repo.credit(user.id, -50, "correction").await;
    assert!(matches!(result, Err(RepositoryError::BusinessRule(_))));

    // Nothing written
    assert_eq!(db.points_repo.ledger_total(user.id).await.unwrap(), 20);
    assert_eq!(db.points_repo.count_for_user(user.id).await.unwrap(), 1);
}

#[sqlx::test]
async fn test_points_zero_and_unknown_user(pool: PgPool) {
    let db = TestDatabase::from_pool(pool).await;
    let user = create_test_user(&db, "zero").await;

    assert!(matches!(
        db.points_repo.credit(user.id, 0, "noop").await,
        Err(RepositoryError::InvalidInput(_))
    ));
    assert!(matches!(
        db.points_repo.credit(uuid::Uuid::new_v4(), 10, "ghost").await,
        Err(RepositoryError::NotFound(_))
    ));
}

#[sqlx::test]
async fn test_claim_daily_once_per_day(pool: PgPool) {
    let db = TestDatabase::from_pool(pool).await;
    let user = create_test_user(&db, "daily_dan").await;
    let day_start = final10_backend::services::points_service::utc_day_start(Utc::now());

    let first = db.points_repo.claim_daily(user.id, 10, "daily_login", day_start).await.unwrap();
    assert_eq!(first.map(|c| c.user.points), Some(10));

    let second = db.points_repo.claim_daily(user.id, 10, "daily_login", day_start).await.unwrap();
    assert!(second.is_none());

    // A claim stamped before today's boundary no longer blocks
    sqlx::query("UPDATE users SET last_daily_bonus_at = $2 WHERE id = $1")
        .bind(user.id)
        .bind(day_start - Duration::hours(1))
        .execute(&db.pool)
        .await
        .unwrap();
    let third = db.points_repo.claim_daily(user.id, 10, "daily_login", day_start).await.unwrap();
    assert_eq!(third.map(|c| c.user.points), Some(20));

    assert!(matches!(
        db.points_repo.claim_daily(uuid::Uuid::new_v4(), 10, "daily_login", day_start).await,
        Err(RepositoryError::NotFound(_))
    ));
}

// ============================================================================
// Auction Repository Tests
// ============================================================================

#[sqlx::test]
async fn test_auction_create_and_filter(pool: PgPool) {
    let db = TestDatabase::from_pool(pool).await;
    let seller = create_test_user(&db, "seller").await;

    create_test_auction(&db, seller.id, "Polaroid SX-70 Land Camera", Decimal::new(12000, 2)).await;
    create_test_auction(&db, seller.id, "Nintendo 64 with 100% controller", Decimal::new(8000, 2)).await;
    create_test_auction(&db, seller.id, "Leica M3 body", Decimal::new(150000, 2)).await;

    let filter = AuctionFilter {
        q: Some("camera".to_string()),
        ..Default::default()
    };
    let found = db.auction_repo.list(&filter, Pagination::default()).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].source_enum(), Marketplace::Local);
    assert_eq!(db.auction_repo.count(&filter).await.unwrap(), 1);

    // Wildcards in the query are matched literally
    let percent = AuctionFilter {
        q: Some("100%".to_string()),
        ..Default::default()
    };
    assert_eq!(db.auction_repo.count(&percent).await.unwrap(), 1);

    let priced = AuctionFilter {
        max_price: Some(Decimal::new(130, 0)),
        sort: AuctionSort::PriceAsc,
        ..Default::default()
    };
    let cheap = db.auction_repo.list(&priced, Pagination::default()).await.unwrap();
    let prices: Vec<_> = cheap.iter().map(|a| a.current_price).collect();
    assert_eq!(prices, vec![Decimal::new(8000, 2), Decimal::new(12000, 2)]);

    let page = db.auction_repo.list(&AuctionFilter::default(), Pagination::new(2, 2)).await.unwrap();
    assert_eq!(page.len(), 1);
}

#[sqlx::test]
async fn test_price_past_column_range_is_invalid_input(pool: PgPool) {
    let db = TestDatabase::from_pool(pool).await;
    let seller = create_test_user(&db, "big_spender").await;

    let new = NewAuction {
        title: "Gold-plated Game Boy".to_string(),
        description: None,
        image_url: None,
        starting_price: Decimal::new(10_000_000_000_000, 0),
        currency: None,
        ends_at: None,
    };
    match db.auction_repo.create_local(seller.id, &new, "USD").await {
        Err(RepositoryError::InvalidInput(_)) => {}
        unexpected => panic!("Expected invalid input, got {:?}", unexpected),
    }
}

#[sqlx::test]
async fn test_pages_past_limit_rejected(pool: PgPool) {
    let db = TestDatabase::from_pool(pool).await;
    let user = create_test_user(&db, "pager").await;
    let far = Pagination::new(i64::MAX, 20);

    assert!(db.state.feed_service.list(far, None).await.is_err());
    assert!(db.state.points_service.history(user.id, far).await.is_err());
    assert!(db
        .state
        .auction_service
        .list(&AuctionFilter::default(), far)
        .await
        .is_err());

    let last = Pagination::new(MAX_PAGE, 20);
    let page = db.state.feed_service.list(last, None).await.unwrap();
    assert!(page.items.is_empty());
}

#[sqlx::test]
async fn test_upsert_external_is_idempotent(pool: PgPool) {
    let db = TestDatabase::from_pool(pool).await;

    let listing = external_listing(Marketplace::Ebay, "eb-1", "Game Boy Color", Decimal::new(4500, 2));
    let first = db.auction_repo.upsert_external(&listing).await.unwrap();
    assert_eq!(first.source, "ebay");
    assert!(first.seller_id.is_none());
    assert!(!first.is_editable());

    let mut repriced = listing.clone();
    repriced.price = Decimal::new(5200, 2);
    repriced.bid_count = 4;
    let second = db.auction_repo.upsert_external(&repriced).await.unwrap();

    assert_eq!(second.id, first.id);
    assert_eq!(second.current_price, Decimal::new(5200, 2));
    assert_eq!(second.bid_count, 4);

    // Same external id on another marketplace is a different listing
    let other = external_listing(Marketplace::Mercari, "eb-1", "Game Boy Color", Decimal::new(4000, 2));
    let third = db.auction_repo.upsert_external(&other).await.unwrap();
    assert_ne!(third.id, first.id);

    let ebay_only = AuctionFilter {
        source: Some(Marketplace::Ebay),
        ..Default::default()
    };
    assert_eq!(db.auction_repo.count(&ebay_only).await.unwrap(), 1);
}

#[sqlx::test]
async fn test_end_expired(pool: PgPool) {
    let db = TestDatabase::from_pool(pool).await;
    let seller = create_test_user(&db, "expiring").await;
    let live = create_test_auction(&db, seller.id, "Still running", Decimal::new(100, 0)).await;
    let stale = create_test_auction(&db, seller.id, "Already over", Decimal::new(100, 0)).await;

    sqlx::query("UPDATE auctions SET ends_at = NOW() - INTERVAL '1 hour' WHERE id = $1")
        .bind(stale.id)
        .execute(&db.pool)
        .await
        .unwrap();

    let ended = db.auction_repo.end_expired().await.unwrap();
    assert_eq!(ended, vec![stale.id]);

    let stale = db.auction_repo.find_by_id(stale.id).await.unwrap().unwrap();
    assert_eq!(stale.status_enum(), AuctionStatus::Ended);
    let live = db.auction_repo.find_by_id(live.id).await.unwrap().unwrap();
    assert!(live.is_active());

    assert!(db.auction_repo.end_expired().await.unwrap().is_empty());
}

// ============================================================================
// Promo Code Repository Tests
// ============================================================================

#[sqlx::test]
async fn test_redeem_writes_usage_and_commission(pool: PgPool) {
    let db = TestDatabase::from_pool(pool).await;
    let creator = create_test_user(&db, "creator").await;
    let buyer = create_test_user(&db, "buyer").await;
    create_test_promo(&db, "SPRING10", creator.id, Some(5)).await;

    let redemption = db
        .promo_repo
        .redeem("SPRING10", buyer.id, Decimal::new(20000, 2))
        .await
        .unwrap();

    assert_eq!(redemption.promo_code.uses_count, 1);
    assert_eq!(redemption.usage.discount_amount, Decimal::new(2000, 2));
    // Commission is 5% of the discounted 180.00
    assert_eq!(redemption.commission.amount, Decimal::new(900, 2));
    assert_eq!(redemption.commission.creator_id, creator.id);
    assert!(redemption.commission.is_pending());
    assert!(db.promo_repo.has_used(redemption.promo_code.id, buyer.id).await.unwrap());
}

#[sqlx::test]
async fn test_redeem_rejections(pool: PgPool) {
    let db = TestDatabase::from_pool(pool).await;
    let creator = create_test_user(&db, "creator").await;
    let buyer = create_test_user(&db, "buyer").await;
    let other = create_test_user(&db, "other").await;
    let promo = create_test_promo(&db, "ONCEONLY", creator.id, Some(1)).await;

    // Own code
    let own = db.promo_repo.redeem("ONCEONLY", creator.id, Decimal::new(50, 0)).await;
    assert!(matches!(own, Err(RepositoryError::BusinessRule(_))));

    db.promo_repo.redeem("ONCEONLY", buyer.id, Decimal::new(50, 0)).await.unwrap();

    // Exhausted
    match db.promo_repo.redeem("ONCEONLY", other.id, Decimal::new(50, 0)).await {
        Err(RepositoryError::BusinessRule(msg)) => {
            assert_eq!(msg, PromoRejection::Exhausted.message())
        }
        unexpected => panic!("Expected exhausted, got {:?}", unexpected),
    }

    // Inactive
    let reusable = create_test_promo(&db, "REUSABLE", creator.id, None).await;
    db.promo_repo.deactivate(reusable.id).await.unwrap();
    assert!(matches!(
        db.promo_repo.redeem("REUSABLE", other.id, Decimal::new(50, 0)).await,
        Err(RepositoryError::BusinessRule(_))
    ));

    assert!(matches!(
        db.promo_repo.redeem("MISSING", other.id, Decimal::new(50, 0)).await,
        Err(RepositoryError::NotFound(_))
    ));

    let promo = db.promo_repo.find_by_id(promo.id).await.unwrap().unwrap();
    assert_eq!(promo.uses_count, 1);
}

#[sqlx::test]
async fn test_redeem_twice_by_same_user(pool: PgPool) {
    let db = TestDatabase::from_pool(pool).await;
    let creator = create_test_user(&db, "creator").await;
    let buyer = create_test_user(&db, "buyer").await;
    create_test_promo(&db, "REPEAT", creator.id, None).await;

    db.promo_repo.redeem("REPEAT", buyer.id, Decimal::new(10, 0)).await.unwrap();
    match db.promo_repo.redeem("REPEAT", buyer.id, Decimal::new(10, 0)).await {
        Err(RepositoryError::BusinessRule(msg)) => {
            assert_eq!(msg, PromoRejection::AlreadyUsed.message())
        }
        unexpected => panic!("Expected already used, got {:?}", unexpected),
    }
}

#[sqlx::test]
async fn test_concurrent_redemptions_respect_limit(pool: PgPool) {
    let db = TestDatabase::from_pool(pool).await;
    let creator = create_test_user(&db, "creator").await;
    let promo = create_test_promo(&db, "RUSH", creator.id, Some(2)).await;

    let mut buyers = Vec::new();
    for i in 0..5 {
        buyers.push(create_test_user(&db, &format!("rush_buyer_{}", i)).await);
    }

    let attempts = buyers.iter().map(|b| {
        let repo = db.promo_repo.clone();
        let id = b.id;
        async move { repo.redeem("RUSH", id, Decimal::new(30, 0)).await }
    });
    let results = futures::future::join_all(attempts).await;

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 2);
    let promo = db.promo_repo.find_by_id(promo.id).await.unwrap().unwrap();
    assert_eq!(promo.uses_count, 2);
}

// ============================================================================
// Commission Repository Tests
// ============================================================================

#[sqlx::test]
async fn test_commission_summary_and_payout(pool: PgPool) {
    let db = TestDatabase::from_pool(pool).await;
    let creator = create_test_user(&db, "creator").await;
    let a = create_test_user(&db, "buyer_a").await;
    let b = create_test_user(&db, "buyer_b").await;
    create_test_promo(&db, "EARN5", creator.id, None).await;

    let first = db.promo_repo.redeem("EARN5", a.id, Decimal::new(100, 0)).await.unwrap();
    db.promo_repo.redeem("EARN5", b.id, Decimal::new(40, 0)).await.unwrap();

    let paid = db.commission_repo.mark_paid(first.commission.id).await.unwrap();
    assert_eq!(paid.status_enum(), CommissionStatus::Paid);
    assert!(paid.paid_at.is_some());

    assert!(matches!(
        db.commission_repo.mark_paid(first.commission.id).await,
        Err(RepositoryError::BusinessRule(_))
    ));
    assert!(matches!(
        db.commission_repo.mark_paid(uuid::Uuid::new_v4()).await,
        Err(RepositoryError::NotFound(_))
    ));

    let summary = db.commission_repo.summary(creator.id).await.unwrap();
    assert_eq!(summary.count, 2);
    assert_eq!(summary.paid_total, Decimal::new(450, 2));
    assert_eq!(summary.pending_total, Decimal::new(180, 2));

    let pending = db
        .commission_repo
        .list_by_creator(creator.id, Some(CommissionStatus::Pending))
        .await
        .unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(db.commission_repo.list_by_creator(creator.id, None).await.unwrap().len(), 2);
}

// ============================================================================
// Feed and Cascade Tests
// ============================================================================

#[sqlx::test]
async fn test_feed_filter_by_kind(pool: PgPool) {
    let db = TestDatabase::from_pool(pool).await;
    let user = create_test_user(&db, "poster").await;

    db.feed_repo
        .insert(FeedKind::UserJoined, Some(user.id), "poster joined", None, &serde_json::json!({}))
        .await
        .unwrap();
    db.feed_repo
        .insert(FeedKind::LevelUp, Some(user.id), "poster reached level 2", None, &serde_json::json!({"level": 2}))
        .await
        .unwrap();

    assert_eq!(db.feed_repo.count(None).await.unwrap(), 2);
    assert_eq!(db.feed_repo.count(Some(FeedKind::LevelUp)).await.unwrap(), 1);

    let items = db.feed_repo.list(None, 10, 0).await.unwrap();
    assert_eq!(items[0].kind_enum(), Some(FeedKind::LevelUp));
    assert_eq!(db.feed_repo.count_for_user(user.id).await.unwrap(), 2);
}

#[sqlx::test]
async fn test_delete_user_cascades(pool: PgPool) {
    let db = TestDatabase::from_pool(pool).await;
    let user = create_test_user(&db, "leaving").await;
    let auction = create_test_auction(&db, user.id, "Farewell lot", Decimal::new(5, 0)).await;
    db.points_repo.credit(user.id, 50, "signup").await.unwrap();
    db.feed_repo
        .insert(FeedKind::UserJoined, Some(user.id), "leaving joined", None, &serde_json::json!({}))
        .await
        .unwrap();

    let assessment = RiskAssessment {
        score: 0,
        level: RiskLevel::Low,
        factors: Vec::new(),
    };
    let signal = db
        .fraud_signal_repo
        .insert(&NewFraudSignal {
            user_id: Some(user.id),
            session_id: "sess-1",
            event_type: "login",
            fingerprint_hash: None,
            ip_hash: None,
            user_agent: None,
            assessment: &assessment,
        })
        .await
        .unwrap();

    assert!(db.user_repo.delete(user.id).await.unwrap());
    assert!(!db.user_repo.delete(user.id).await.unwrap());

    assert!(db.auction_repo.find_by_id(auction.id).await.unwrap().is_none());
    assert_eq!(db.points_repo.count_for_user(user.id).await.unwrap(), 0);
    assert_eq!(db.feed_repo.count(None).await.unwrap(), 0);

    // Signals survive for review, detached from the account
    let user_id: Option<uuid::Uuid> = sqlx::query_scalar("SELECT user_id FROM fraud_signals WHERE id = $1")
        .bind(signal.id)
        .fetch_one(&db.pool)
        .await
        .unwrap();
    assert!(user_id.is_none());
}

// ============================================================================
// Fraud Signal Repository Tests
// ============================================================================

#[sqlx::test]
async fn test_distinct_users_on_device(pool: PgPool) {
    let db = TestDatabase::from_pool(pool).await;
    let a = create_test_user(&db, "device_a").await;
    let b = create_test_user(&db, "device_b").await;
    let c = create_test_user(&db, "device_c").await;
    let assessment = RiskAssessment {
        score: 0,
        level: RiskLevel::Low,
        factors: Vec::new(),
    };

    for user in [&a, &b, &a] {
        db.fraud_signal_repo
            .insert(&NewFraudSignal {
                user_id: Some(user.id),
                session_id: "shared-session",
                event_type: "login",
                fingerprint_hash: Some("fp-hash"),
                ip_hash: None,
                user_agent: Some("Mozilla/5.0"),
                assessment: &assessment,
            })
            .await
            .unwrap();
    }

    assert_eq!(db.fraud_signal_repo.distinct_users_on_device("fp-hash", Some(a.id)).await.unwrap(), 2);
    assert_eq!(db.fraud_signal_repo.distinct_users_on_device("fp-hash", Some(c.id)).await.unwrap(), 3);
    assert_eq!(db.fraud_signal_repo.distinct_users_on_device("other", None).await.unwrap(), 0);
    assert_eq!(db.fraud_signal_repo.recent_session_signals("shared-session").await.unwrap(), 3);
    assert_eq!(db.fraud_signal_repo.list_for_user(a.id, 10).await.unwrap().len(), 2);
}
