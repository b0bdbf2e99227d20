use crate::error::{AppError, AppResult};
use crate::models::{FraudSignal, FraudSignalInput};
use crate::repositories::{FraudSignalRepository, NewFraudSignal, UserRepository};
use crate::risk::{self, RiskAssessment, RiskLevel, SignalContext};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

pub const MAX_FIELD_LEN: usize = 256;
const MAX_USER_AGENT_LEN: usize = 512;
const REPORT_SIZE: i64 = 50;

/// Response to a recorded signal
#[derive(Debug, Clone, Serialize)]
pub struct RecordedSignal {
    pub id: Uuid,
    #[serde(flatten)]
    pub assessment: RiskAssessment,
}

/// Admin view of a user's recent signals
#[derive(Debug, Clone, Serialize)]
pub struct UserRiskReport {
    pub user_id: Uuid,
    pub max_score: i32,
    pub level: RiskLevel,
    pub signals: Vec<FraudSignal>,
}

pub fn validate_signal(input: &FraudSignalInput) -> AppResult<()> {
    for (field, value) in [("session_id", &input.session_id), ("event_type", &input.event_type)] {
        let value = value.trim();
        if value.is_empty() || value.len() > MAX_FIELD_LEN {
            return Err(AppError::Validation(format!(
                "{} must be 1-{} characters",
                field, MAX_FIELD_LEN
            )));
        }
    }
    if matches!(&input.device_fingerprint, Some(f) if f.len() > MAX_FIELD_LEN) {
        return Err(AppError::Validation("device_fingerprint is too long".to_string()));
    }
    Ok(())
}

/// First address in an `X-Forwarded-For` header
pub fn forwarded_client_ip(header: &str) -> Option<String> {
    header
        .split(',')
        .map(str::trim)
        .find(|ip| !ip.is_empty())
        .map(str::to_string)
}

/// Service for fraud-signal intake and reports
pub struct FraudService {
    signal_repo: Arc<FraudSignalRepository>,
    user_repo: Arc<UserRepository>,
}

impl FraudService {
    pub fn new(signal_repo: Arc<FraudSignalRepository>, user_repo: Arc<UserRepository>) -> Self {
        Self { signal_repo, user_repo }
    }

    /// Score a signal against recent history and store it.
    ///
    /// `forwarded_ip` is used when the payload carries no `ip_address`.
    pub async fn record(
        &self,
        input: &FraudSignalInput,
        user_id: Option<Uuid>,
        forwarded_ip: Option<String>,
    ) -> AppResult<RecordedSignal> {
        validate_signal(input)?;

        let session_id = input.session_id.trim();
        let fingerprint_hash = input
            .device_fingerprint
            .as_deref()
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .map(risk::hash_identifier);
        let ip_hash = input
            .ip_address
            .clone()
            .filter(|ip| !ip.trim().is_empty())
            .or(forwarded_ip)
            .map(|ip| risk::hash_identifier(&ip));
        let user_agent: Option<String> = input
            .user_agent
            .as_deref()
            .map(|ua| ua.chars().take(MAX_USER_AGENT_LEN).collect());

        let users_on_device = match &fingerprint_hash {
            Some(hash) => self.signal_repo.distinct_users_on_device(hash, user_id).await?,
            None => 0,
        };
        let context = SignalContext {
            users_on_device,
            // Include the signal being recorded
            recent_session_signals: self.signal_repo.recent_session_signals(session_id).await? + 1,
        };

        let assessment = risk::assess(input, &context);

        let row = self
            .signal_repo
            .insert(&NewFraudSignal {
                user_id,
                session_id,
                event_type: input.event_type.trim(),
                fingerprint_hash: fingerprint_hash.as_deref(),
                ip_hash: ip_hash.as_deref(),
                user_agent: user_agent.as_deref(),
                assessment: &assessment,
            })
            .await?;

        if assessment.level == RiskLevel::High {
            warn!(
                "High-risk signal {} (score {}, session {}, user {:?}): {:?}",
                row.id, assessment.score, session_id, user_id, assessment.factors
            );
        } else {
            info!("Recorded signal {} with score {}", row.id, assessment.score);
        }

        Ok(RecordedSignal {
            id: row.id,
            assessment,
        })
    }

    pub async fn user_report(&self, user_id: Uuid) -> AppResult<UserRiskReport> {
        if self.user_repo.find_by_id(user_id).await?.is_none() {
            return Err(AppError::NotFound("User not found".to_string()));
        }

        let signals = self.signal_repo.list_for_user(user_id, REPORT_SIZE).await?;
        let max_score = signals.iter().map(|s| s.risk_score).max().unwrap_or(0);

        Ok(UserRiskReport {
            user_id,
            max_score,
            level: RiskLevel::from_score(max_score),
            signals,
        })
    }
}
