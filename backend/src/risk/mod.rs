//! Rule-based scoring for client fraud signals.

pub mod scoring;

pub use scoring::{assess, hash_identifier, RiskAssessment, RiskFactor, RiskLevel, SignalContext};
