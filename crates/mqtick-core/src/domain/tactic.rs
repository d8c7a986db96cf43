//! Tactic - 種別ごとのポーリング方針（interval + 同時実行上限）

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::TaskType;
use crate::error::MqError;

/// Polling policy for one task type.
///
/// Invariants: `0 < interval <= MAX_INTERVAL`, `concurrency >= 1`.
/// Deserialization goes through [`Tactic::new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawTactic")]
pub struct Tactic {
    interval: Duration,
    concurrency: u32,
}

#[derive(Deserialize)]
struct RawTactic {
    interval: Duration,
    concurrency: u32,
}

impl TryFrom<RawTactic> for Tactic {
    type Error = MqError;

    fn try_from(raw: RawTactic) -> Result<Self, Self::Error> {
        Tactic::new(raw.interval, raw.concurrency)
    }
}

impl Tactic {
    pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(3);
    pub const DEFAULT_CONCURRENCY: u32 = 1;
    /// One year. Keeps `Instant + interval` far from overflow.
    pub const MAX_INTERVAL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

    /// A zero `concurrency` is treated as unset and becomes 1.
    pub fn new(interval: Duration, concurrency: u32) -> Result<Self, MqError> {
        if interval.is_zero() {
            return Err(MqError::InvalidTactic(
                "interval must be greater than zero".to_string(),
            ));
        }
        if interval > Self::MAX_INTERVAL {
            return Err(MqError::InvalidTactic(format!(
                "interval {interval:?} exceeds the maximum of {:?}",
                Self::MAX_INTERVAL
            )));
        }
        Ok(Self {
            interval,
            concurrency: concurrency.max(1),
        })
    }

    pub fn every_secs(secs: u64) -> Result<Self, MqError> {
        Self::new(Duration::from_secs(secs), Self::DEFAULT_CONCURRENCY)
    }

    pub fn with_concurrency(mut self, concurrency: u32) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn concurrency(&self) -> u32 {
        self.concurrency
    }
}

impl Default for Tactic {
    fn default() -> Self {
        Self {
            interval: Self::DEFAULT_INTERVAL,
            concurrency: Self::DEFAULT_CONCURRENCY,
        }
    }
}

/// A tactic bound to a task type (or to the catch-all type).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeTactic {
    pub task_type: TaskType,
    pub tactic: Tactic,
}

impl TypeTactic {
    pub fn new(task_type: impl Into<TaskType>, tactic: Tactic) -> Self {
        Self {
            task_type: task_type.into(),
            tactic,
        }
    }

    /// The binding every registry starts with: catch-all, 3s, cap 1.
    pub fn default_catch_all() -> Self {
        Self::new(TaskType::catch_all(), Tactic::default())
    }
}
