//! TaskType - メッセージの種別タグ
//!
//! 空文字列は catch-all（明示的な tactic を持たない全種別）を表します。

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskType(String);

impl TaskType {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// The empty type, bound to the catch-all tactic.
    pub fn catch_all() -> Self {
        Self(String::new())
    }

    pub fn is_catch_all(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_catch_all() {
            f.write_str("*")
        } else {
            self.0.fmt(f)
        }
    }
}

impl From<&str> for TaskType {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for TaskType {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&TaskType> for TaskType {
    fn from(t: &TaskType) -> Self {
        t.clone()
    }
}
