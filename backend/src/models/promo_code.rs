//! Promo codes, their redemptions, and the commissions they earn creators.

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Promo code owned by a creator
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PromoCode {
    pub id: Uuid,
    pub code: String,
    pub creator_id: Uuid,
    pub discount_percent: i32,
    pub commission_percent: i32,
    pub max_uses: Option<i32>,
    pub uses_count: i32,
    pub expires_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Why a code cannot be applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PromoRejection {
    Inactive,
    Expired,
    Exhausted,
    OwnCode,
    AlreadyUsed,
}

impl PromoRejection {
    pub fn message(&self) -> &'static str {
        match self {
            PromoRejection::Inactive => "Promo code is no longer active",
            PromoRejection::Expired => "Promo code has expired",
            PromoRejection::Exhausted => "Promo code has reached its usage limit",
            PromoRejection::OwnCode => "You cannot redeem your own promo code",
            PromoRejection::AlreadyUsed => "You have already used this promo code",
        }
    }
}

/// Price breakdown for applying a code to an order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromoQuote {
    pub code: String,
    pub order_amount: Decimal,
    pub discount_amount: Decimal,
    pub final_amount: Decimal,
    pub commission_amount: Decimal,
}

fn round_cents(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

fn percent_of(amount: Decimal, percent: i32) -> Option<Decimal> {
    amount
        .checked_mul(Decimal::from(percent))
        .and_then(|scaled| scaled.checked_div(Decimal::ONE_HUNDRED))
        .map(round_cents)
}

impl PromoCode {
    /// Uppercase, trimmed form used for storage and lookups
    pub fn normalize(code: &str) -> String {
        code.trim().to_uppercase()
    }

    /// `[A-Z0-9]{4,20}` after normalization
    pub fn is_valid_format(code: &str) -> bool {
        (4..=20).contains(&code.len())
            && code
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map(|at| at <= now).unwrap_or(false)
    }

    pub fn is_exhausted(&self) -> bool {
        self.max_uses
            .map(|max| self.uses_count >= max)
            .unwrap_or(false)
    }

    /// Checks that do not need the usage table; `already_used` is looked up by the caller
    pub fn check_redeemable(
        &self,
        user_id: Uuid,
        already_used: bool,
        now: DateTime<Utc>,
    ) -> Result<(), PromoRejection> {
        if !self.is_active {
            return Err(PromoRejection::Inactive);
        }
        if self.is_expired_at(now) {
            return Err(PromoRejection::Expired);
        }
        if self.is_exhausted() {
            return Err(PromoRejection::Exhausted);
        }
        if self.creator_id == user_id {
            return Err(PromoRejection::OwnCode);
        }
        if already_used {
            return Err(PromoRejection::AlreadyUsed);
        }
        Ok(())
    }

    /// Commission is taken from what the buyer actually pays.
    ///
    /// `None` when the arithmetic overflows a `Decimal`.
    pub fn quote(&self, order_amount: Decimal) -> Option<PromoQuote> {
        let discount_amount = percent_of(order_amount, self.discount_percent)?.min(order_amount);
        let final_amount = order_amount - discount_amount;
        let commission_amount = percent_of(final_amount, self.commission_percent)?;

        Some(PromoQuote {
            code: self.code.clone(),
            order_amount,
            discount_amount,
            final_amount,
            commission_amount,
        })
    }
}

/// Fields for a new promo code
#[derive(Debug, Clone, Deserialize)]
pub struct NewPromoCode {
    pub code: Option<String>,
    pub discount_percent: i32,
    pub commission_percent: i32,
    pub max_uses: Option<i32>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// One redemption of a code by a user
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PromoCodeUsage {
    pub id: Uuid,
    pub promo_code_id: Uuid,
    pub user_id: Uuid,
    pub order_amount: Decimal,
    pub discount_amount: Decimal,
    pub used_at: DateTime<Utc>,
}
