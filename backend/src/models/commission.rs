use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Commission payout status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommissionStatus {
    Pending,
    Paid,
    Cancelled,
}

impl CommissionStatus {
    /// Convert from database string
    pub fn from_str(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(CommissionStatus::Pending),
            "paid" => Ok(CommissionStatus::Paid),
            "cancelled" => Ok(CommissionStatus::Cancelled),
            _ => Err(format!("Invalid commission status: {}", s)),
        }
    }

    /// Convert to database string
    pub fn as_str(&self) -> &'static str {
        match self {
            CommissionStatus::Pending => "pending",
            CommissionStatus::Paid => "paid",
            CommissionStatus::Cancelled => "cancelled",
        }
    }
}

impl From<String> for CommissionStatus {
    fn from(s: String) -> Self {
        Self::from_str(&s).unwrap_or(CommissionStatus::Pending)
    }
}

/// Commission earned by a creator for one redemption of their code
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Commission {
    pub id: Uuid,
    pub creator_id: Uuid,
    pub promo_code_id: Uuid,
    pub usage_id: Uuid,
    pub amount: Decimal,
    pub status: String, // Stored as TEXT, use CommissionStatus enum for type safety
    pub created_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
}

impl Commission {
    pub fn status_enum(&self) -> CommissionStatus {
        CommissionStatus::from_str(&self.status).unwrap_or(CommissionStatus::Pending)
    }

    pub fn is_pending(&self) -> bool {
        self.status_enum() == CommissionStatus::Pending
    }
}

/// Totals across a creator's commissions
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CommissionSummary {
    pub pending_total: Decimal,
    pub paid_total: Decimal,
    pub count: i64,
}
