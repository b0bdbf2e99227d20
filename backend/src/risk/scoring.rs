use crate::models::FraudSignalInput;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Distinct accounts on one device within 24h that mark it as shared
pub const SHARED_DEVICE_USERS: i64 = 3;

/// Signals per session within 10 minutes above which activity is too fast
pub const VELOCITY_LIMIT: i64 = 20;

const HEADLESS_MARKERS: [&str; 5] = ["headlesschrome", "phantomjs", "selenium", "puppeteer", "playwright"];
const AUTOMATION_MARKERS: [&str; 6] = ["curl/", "wget/", "python-requests", "python-urllib", "go-http-client", "okhttp"];

/// Coarse risk bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn from_score(score: i32) -> Self {
        match score {
            s if s < 30 => RiskLevel::Low,
            s if s < 60 => RiskLevel::Medium,
            _ => RiskLevel::High,
        }
    }

    /// Convert from database string
    pub fn from_str(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "low" => Ok(RiskLevel::Low),
            "medium" => Ok(RiskLevel::Medium),
            "high" => Ok(RiskLevel::High),
            _ => Err(format!("Invalid risk level: {}", s)),
        }
    }

    /// Convert to database string
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }
}

/// Individual rule that fired
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskFactor {
    HeadlessBrowser,
    AutomationClient,
    MissingFingerprint,
    Proxy,
    SharedDevice,
    HighVelocity,
}

impl RiskFactor {
    pub fn weight(&self) -> i32 {
        match self {
            RiskFactor::HeadlessBrowser => 35,
            RiskFactor::AutomationClient => 25,
            RiskFactor::MissingFingerprint => 10,
            RiskFactor::Proxy => 20,
            RiskFactor::SharedDevice => 25,
            RiskFactor::HighVelocity => 20,
        }
    }
}

/// History gathered from stored signals before scoring
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SignalContext {
    /// Distinct users seen with this fingerprint in the last 24 hours
    pub users_on_device: i64,
    /// Signals from this session in the last 10 minutes
    pub recent_session_signals: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub score: i32,
    pub level: RiskLevel,
    pub factors: Vec<RiskFactor>,
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

/// Score a signal against its context; pure so the rules stay testable
pub fn assess(input: &FraudSignalInput, context: &SignalContext) -> RiskAssessment {
    let mut factors = Vec::new();

    let user_agent = input
        .user_agent
        .as_deref()
        .map(str::to_lowercase)
        .unwrap_or_default();

    if contains_any(&user_agent, &HEADLESS_MARKERS) {
        factors.push(RiskFactor::HeadlessBrowser);
    } else if user_agent.is_empty() || contains_any(&user_agent, &AUTOMATION_MARKERS) {
        factors.push(RiskFactor::AutomationClient);
    }

    let has_fingerprint = input
        .device_fingerprint
        .as_deref()
        .map(|f| !f.trim().is_empty())
        .unwrap_or(false);
    if !has_fingerprint {
        factors.push(RiskFactor::MissingFingerprint);
    }

    if input.is_proxy.unwrap_or(false) {
        factors.push(RiskFactor::Proxy);
    }

    if context.users_on_device >= SHARED_DEVICE_USERS {
        factors.push(RiskFactor::SharedDevice);
    }

    if context.recent_session_signals > VELOCITY_LIMIT {
        factors.push(RiskFactor::HighVelocity);
    }

    let score = factors.iter().map(RiskFactor::weight).sum::<i32>().min(100);

    RiskAssessment {
        score,
        level: RiskLevel::from_score(score),
        factors,
    }
}

/// SHA-256 hex digest; raw fingerprints and IPs are never stored
pub fn hash_identifier(value: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(value.trim().as_bytes());
    hex::encode(hasher.finalize())
}
