use serde::{Deserialize, Serialize};

use crate::domain::MessageStatus;

/// Message counts per status for one task type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub init: usize,
    pub processing: usize,
    pub succeed: usize,
    pub failed: usize,
}

impl StatusCounts {
    pub fn add(&mut self, status: MessageStatus, n: usize) {
        match status {
            MessageStatus::Init => self.init += n,
            MessageStatus::Processing => self.processing += n,
            MessageStatus::Succeed => self.succeed += n,
            MessageStatus::Failed => self.failed += n,
        }
    }

    pub fn total(&self) -> usize {
        self.init + self.processing + self.succeed + self.failed
    }

    /// Every message reached SUCCEED or FAILED.
    pub fn is_settled(&self) -> bool {
        self.init == 0 && self.processing == 0
    }
}
