//! Config - TOML からの tactic 設定
//!
//! ```toml
//! [catch_all]
//! interval_secs = 3
//! concurrency = 1
//!
//! [[tactics]]
//! type = "email"
//! interval_ms = 500
//! concurrency = 2
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::{Tactic, TaskType, TypeTactic};
use crate::error::MqError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MqConfig {
    /// Overrides the default catch-all tactic (3s, cap 1).
    pub catch_all: Option<TacticConfig>,
    pub tactics: Vec<TypeTacticConfig>,
}

/// Interval is given in seconds or milliseconds, not both. Missing interval
/// means the default 3s; missing or zero concurrency means 1.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TacticConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval_ms: Option<u64>,
    #[serde(default)]
    pub concurrency: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeTacticConfig {
    #[serde(rename = "type")]
    pub task_type: String,
    #[serde(flatten)]
    pub tactic: TacticConfig,
}

impl TacticConfig {
    pub fn to_tactic(&self) -> Result<Tactic, MqError> {
        let interval = match (self.interval_secs, self.interval_ms) {
            (Some(_), Some(_)) => {
                return Err(MqError::Config(
                    "set either interval_secs or interval_ms, not both".to_string(),
                ));
            }
            (Some(secs), None) => Duration::from_secs(secs),
            (None, Some(ms)) => Duration::from_millis(ms),
            (None, None) => Tactic::DEFAULT_INTERVAL,
        };
        Tactic::new(interval, self.concurrency)
    }
}

impl MqConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, MqError> {
        toml::from_str(s).map_err(|e| MqError::Config(format!("toml: {e}")))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, MqError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| MqError::Config(format!("read {}: {e}", path.display())))?;
        Self::from_toml_str(&raw)
    }

    pub fn catch_all_tactic(&self) -> Result<Option<Tactic>, MqError> {
        self.catch_all.as_ref().map(TacticConfig::to_tactic).transpose()
    }

    /// Explicit bindings, validated. The catch-all goes in `[catch_all]`.
    pub fn type_tactics(&self) -> Result<Vec<TypeTactic>, MqError> {
        self.tactics
            .iter()
            .map(|entry| {
                if entry.task_type.is_empty() {
                    return Err(MqError::Config(
                        "tactic type must not be empty; use [catch_all]".to_string(),
                    ));
                }
                let tactic = entry.tactic.to_tactic().map_err(|e| {
                    MqError::Config(format!("tactic for '{}': {e}", entry.task_type))
                })?;
                Ok(TypeTactic::new(TaskType::new(&entry.task_type), tactic))
            })
            .collect()
    }
}
