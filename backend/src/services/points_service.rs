use crate::error::{AppError, AppResult};
use crate::leveling::{self, LevelProgress, PointAction};
use crate::models::{FeedKind, LeaderboardEntry, Page, Pagination, PointTransaction, User};
use crate::repositories::{PointsCredit, PointsRepository, UserRepository};
use crate::services::FeedService;
use chrono::{DateTime, Duration, NaiveTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

pub const MAX_LEADERBOARD_SIZE: i64 = 100;

/// What an award did to a user
#[derive(Debug, Clone, Serialize)]
pub struct AwardOutcome {
    pub user: User,
    pub awarded: i64,
    pub previous_level: i32,
    pub leveled_up: bool,
    pub progress: LevelProgress,
}

impl From<PointsCredit> for AwardOutcome {
    fn from(credit: PointsCredit) -> Self {
        let leveled_up = credit.user.level > credit.previous_level;
        Self {
            progress: credit.user.progress(),
            awarded: credit.transaction.amount,
            previous_level: credit.previous_level,
            leveled_up,
            user: credit.user,
        }
    }
}

/// Start of the UTC calendar day containing `now`
pub fn utc_day_start(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive().and_time(NaiveTime::MIN).and_utc()
}

/// Service for points, levels and the leaderboard
pub struct PointsService {
    points_repo: Arc<PointsRepository>,
    user_repo: Arc<UserRepository>,
    feed_service: Arc<FeedService>,
}

impl PointsService {
    pub fn new(points_repo: Arc<PointsRepository>, user_repo: Arc<UserRepository>, feed_service: Arc<FeedService>) -> Self {
        Self {
            points_repo,
            user_repo,
            feed_service,
        }
    }

    /// Credit the points for an action
    pub async fn award(&self, user_id: Uuid, action: PointAction) -> AppResult<AwardOutcome> {
        let credit = self
            .points_repo
            .credit(user_id, action.points(), action.as_str())
            .await?;

        let outcome = AwardOutcome::from(credit);
        info!(
            "Awarded {} points to {} for {} (total {})",
            outcome.awarded,
            user_id,
            action.as_str(),
            outcome.user.points
        );

        self.announce_level_up(&outcome).await;
        Ok(outcome)
    }

    /// Once per UTC calendar day
    pub async fn claim_daily_bonus(&self, user_id: Uuid) -> AppResult<AwardOutcome> {
        let now = Utc::now();
        let day_start = utc_day_start(now);
        let action = PointAction::DailyLogin;

        let credit = self
            .points_repo
            .claim_daily(user_id, action.points(), action.as_str(), day_start)
            .await?;

        match credit {
            Some(credit) => {
                let outcome = AwardOutcome::from(credit);
                info!("Daily bonus claimed by {}", user_id);
                self.announce_level_up(&outcome).await;
                Ok(outcome)
            }
            None => {
                let next = day_start + Duration::days(1);
                Err(AppError::Conflict(format!(
                    "Daily bonus already claimed, next claim available at {}",
                    next.to_rfc3339()
                )))
            }
        }
    }

    async fn announce_level_up(&self, outcome: &AwardOutcome) {
        if !outcome.leveled_up {
            return;
        }

        let user = &outcome.user;
        info!("User {} reached level {}", user.id, user.level);
        self.feed_service
            .publish(
                FeedKind::LevelUp,
                Some(user.id),
                &format!("{} reached level {}", user.username, user.level),
                None,
                serde_json::json!({
                    "previous_level": outcome.previous_level,
                    "level": user.level,
                    "points": user.points,
                }),
            )
            .await;
    }

    pub async fn history(&self, user_id: Uuid, pagination: Pagination) -> AppResult<Page<PointTransaction>> {
        pagination.validate()?;
        let items = self
            .points_repo
            .history(user_id, pagination.limit(), pagination.offset())
            .await?;
        let total = self.points_repo.count_for_user(user_id).await?;

        Ok(Page::new(items, pagination, total))
    }

    pub async fn leaderboard(&self, limit: Option<i64>) -> AppResult<Vec<LeaderboardEntry>> {
        let limit = limit.unwrap_or(10).clamp(1, MAX_LEADERBOARD_SIZE);
        Ok(self.user_repo.leaderboard(limit).await?)
    }

    pub async fn progress(&self, user_id: Uuid) -> AppResult<LevelProgress> {
        let user = self
            .user_repo
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        Ok(leveling::progress(user.points))
    }
}
