use serde::{Deserialize, Serialize};

use crate::error::LockError;

/// Tuning for lock acquisition.
///
/// Field names also accept the camelCase spelling used by Redlock option
/// objects, so `{"driftFactor": 0.01, "retryCount": 10}` parses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LockConfig {
    /// Lease duration in milliseconds
    #[serde(alias = "ttlMs", alias = "duration")]
    pub ttl_ms: u64,
    /// Retries after the first attempt
    #[serde(alias = "retryCount")]
    pub retry_count: u32,
    /// Total time budget for retries; `None` means only `retry_count` bounds them
    #[serde(alias = "retryBudgetMs")]
    pub retry_budget_ms: Option<u64>,
    #[serde(alias = "retryDelayMs", alias = "retryDelay")]
    pub retry_delay_ms: u64,
    /// Retry delays are spread uniformly over `delay ± jitter`
    #[serde(alias = "retryJitterMs", alias = "retryJitter")]
    pub retry_jitter_ms: u64,
    /// Fraction of the ttl reserved for clock drift
    #[serde(alias = "driftFactor")]
    pub drift_factor: f64,
    /// Extend the lease before writing when less than this is left
    #[serde(alias = "automaticExtensionThreshold", alias = "extensionThresholdMs")]
    pub extension_threshold_ms: u64,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            ttl_ms: 5_000,
            retry_count: 10,
            retry_budget_ms: None,
            retry_delay_ms: 200,
            retry_jitter_ms: 200,
            drift_factor: 0.01,
            extension_threshold_ms: 500,
        }
    }
}

impl LockConfig {
    pub fn from_json(json: &str) -> Result<Self, LockError> {
        let config: LockConfig = serde_json::from_str(json)
            .map_err(|e| LockError::Config(format!("invalid lock config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: &str) -> Result<Self, LockError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| LockError::Config(format!("failed to read '{}': {}", path, e)))?;
        Self::from_json(&raw)
    }

    pub fn validate(&self) -> Result<(), LockError> {
        if self.ttl_ms == 0 {
            return Err(LockError::Config("ttl_ms must be greater than 0".into()));
        }
        if !(0.0..1.0).contains(&self.drift_factor) {
            return Err(LockError::Config(format!(
                "drift_factor must be in [0, 1), got {}",
                self.drift_factor
            )));
        }
        Ok(())
    }
}
