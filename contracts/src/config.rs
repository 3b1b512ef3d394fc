//! Registry configuration.
//!
//! A registry's active window and initial lock-tier menu can be loaded from
//! JSON instead of being seeded call by call:
//!
//! ```json
//! {
//!   "active_from": "2026-01-01T00:00:00Z",
//!   "active_until": null,
//!   "locks": [
//!     { "interval_secs": 60, "reward_percent": 0 },
//!     { "interval_secs": 300, "reward_percent": 10 }
//!   ]
//! }
//! ```

use anyhow::{ensure, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

use lockvault_protocol::config::{MAX_LOCK_INTERVAL_SECS, MAX_REWARD_PERCENT};

use crate::vault_registry::{ActiveWindow, LockTier};

/// Settings a vault registry is deployed with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Start of the creation and lock window.
    pub active_from: DateTime<Utc>,
    /// End of the window (exclusive); `None` leaves it open.
    #[serde(default)]
    pub active_until: Option<DateTime<Utc>>,
    /// Initial lock-tier menu, in index order.
    #[serde(default)]
    pub locks: Vec<LockTier>,
}

impl RegistryConfig {
    /// Parses and validates a JSON configuration.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).context("invalid registry config JSON")?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and validates a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read registry config {}", path.display()))?;
        Self::from_json_str(&raw).with_context(|| format!("in {}", path.display()))
    }

    /// Checks the window is non-empty and every tier's percentage and
    /// interval are in range.
    pub fn validate(&self) -> Result<()> {
        if let Some(until) = self.active_until {
            ensure!(
                until > self.active_from,
                "active window is empty: {} .. {}",
                self.active_from,
                until
            );
        }
        for (index, tier) in self.locks.iter().enumerate() {
            ensure!(
                tier.reward_percent <= MAX_REWARD_PERCENT,
                "lock tier {index} has reward {}% (max {MAX_REWARD_PERCENT}%)",
                tier.reward_percent
            );
            ensure!(
                tier.interval_secs <= MAX_LOCK_INTERVAL_SECS,
                "lock tier {index} has interval {}s (max {MAX_LOCK_INTERVAL_SECS}s)",
                tier.interval_secs
            );
        }
        Ok(())
    }

    /// The configured active window.
    pub fn window(&self) -> ActiveWindow {
        ActiveWindow {
            from: self.active_from,
            until: self.active_until,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"{
        "active_from": "2026-01-01T00:00:00Z",
        "locks": [
            { "interval_secs": 60, "reward_percent": 0 },
            { "interval_secs": 300, "reward_percent": 10 },
            { "interval_secs": 600, "reward_percent": 20 }
        ]
    }"#;

    #[test]
    fn parses_sample() {
        let config = RegistryConfig::from_json_str(SAMPLE).unwrap();
        assert_eq!(config.locks.len(), 3);
        assert_eq!(config.locks[2].reward_percent, 20);
        assert!(config.active_until.is_none());
        assert!(config.window().contains(config.active_from));
    }

    #[test]
    fn rejects_invalid_percent() {
        let json = r#"{ "active_from": "2026-01-01T00:00:00Z",
                        "locks": [{ "interval_secs": 60, "reward_percent": 101 }] }"#;
        let err = RegistryConfig::from_json_str(json).unwrap_err();
        assert!(err.to_string().contains("lock tier 0"));
    }

    #[test]
    fn rejects_oversized_interval() {
        let json = r#"{ "active_from": "2026-01-01T00:00:00Z",
                        "locks": [{ "interval_secs": 60, "reward_percent": 0 },
                                  { "interval_secs": 18446744073709551615, "reward_percent": 10 }] }"#;
        let err = RegistryConfig::from_json_str(json).unwrap_err();
        assert!(err.to_string().contains("lock tier 1"));
    }

    #[test]
    fn rejects_empty_window() {
        let json = r#"{ "active_from": "2026-01-02T00:00:00Z",
                        "active_until": "2026-01-01T00:00:00Z" }"#;
        assert!(RegistryConfig::from_json_str(json).is_err());
    }

    #[test]
    fn load_reports_path() {
        let err = RegistryConfig::load("/nonexistent/registry.json").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/registry.json"));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let config = RegistryConfig::load(file.path()).unwrap();
        assert_eq!(config.locks.len(), 3);
    }
}
