use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

/// Persisted fraud signal with the assessment it received
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FraudSignal {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub session_id: String,
    pub event_type: String,
    pub fingerprint_hash: Option<String>,
    pub ip_hash: Option<String>,
    pub user_agent: Option<String>,
    pub risk_score: i32,
    pub risk_level: String, // Stored as TEXT, use risk::RiskLevel for type safety
    pub factors: Value,     // JSONB array of factor names
    pub created_at: DateTime<Utc>,
}

/// Signal as submitted by the client SDK
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FraudSignalInput {
    pub session_id: String,
    pub event_type: String,
    pub device_fingerprint: Option<String>,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
    pub is_proxy: Option<bool>,
}
