use serde::{Deserialize, Serialize};

/// Cumulative points needed to reach levels 1 through 10
pub const LEVEL_THRESHOLDS: [i64; 10] = [0, 100, 250, 500, 1000, 2000, 3500, 5500, 8000, 11000];

/// Cost of each level past the end of the table
pub const POINTS_PER_LEVEL_AFTER_TABLE: i64 = 4000;

const TABLE_MAX_LEVEL: i32 = LEVEL_THRESHOLDS.len() as i32;

/// Actions that earn points
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointAction {
    Signup,
    DailyLogin,
    CreateListing,
    RedeemPromoCode,
    /// Credited to a code's creator when someone redeems it
    PromoCodeReferral,
}

impl PointAction {
    pub fn points(&self) -> i64 {
        match self {
            PointAction::Signup => 50,
            PointAction::DailyLogin => 10,
            PointAction::CreateListing => 25,
            PointAction::RedeemPromoCode => 15,
            PointAction::PromoCodeReferral => 30,
        }
    }

    /// Ledger reason string
    pub fn as_str(&self) -> &'static str {
        match self {
            PointAction::Signup => "signup",
            PointAction::DailyLogin => "daily_login",
            PointAction::CreateListing => "create_listing",
            PointAction::RedeemPromoCode => "redeem_promo_code",
            PointAction::PromoCodeReferral => "promo_code_referral",
        }
    }
}

/// Points required to reach `level`; levels below 1 are treated as 1
pub fn points_for_level(level: i32) -> i64 {
    let level = level.max(1);
    if level <= TABLE_MAX_LEVEL {
        LEVEL_THRESHOLDS[(level - 1) as usize]
    } else {
        let last = LEVEL_THRESHOLDS[LEVEL_THRESHOLDS.len() - 1];
        last + (level - TABLE_MAX_LEVEL) as i64 * POINTS_PER_LEVEL_AFTER_TABLE
    }
}

/// Highest level whose threshold `points` has reached
pub fn level_for_points(points: i64) -> i32 {
    let points = points.max(0);
    let last = LEVEL_THRESHOLDS[LEVEL_THRESHOLDS.len() - 1];

    if points >= last {
        let extra = (points - last) / POINTS_PER_LEVEL_AFTER_TABLE;
        return TABLE_MAX_LEVEL + extra as i32;
    }

    LEVEL_THRESHOLDS
        .iter()
        .rposition(|&threshold| points >= threshold)
        .map(|idx| idx as i32 + 1)
        .unwrap_or(1)
}

/// Where a point total sits between two levels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelProgress {
    pub level: i32,
    pub points: i64,
    pub level_floor: i64,
    pub next_level_at: i64,
    pub points_to_next: i64,
    /// 0.0 to 100.0, share of the current level already earned
    pub percent: f64,
}

pub fn progress(points: i64) -> LevelProgress {
    let points = points.max(0);
    let level = level_for_points(points);
    let level_floor = points_for_level(level);
    let next_level_at = points_for_level(level + 1);
    let span = (next_level_at - level_floor).max(1);
    let earned = points - level_floor;
    let percent = ((earned as f64 / span as f64) * 1000.0).round() / 10.0;

    LevelProgress {
        level,
        points,
        level_floor,
        next_level_at,
        points_to_next: next_level_at - points,
        percent,
    }
}
