//! Message - キューに積まれる作業単位
//!
//! - `MessageDraft`: producer が渡す内容（type + body + 作成時刻）。ID はまだ無い
//! - `Message`: store が ID と status を付与した後の正本

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{MessageId, MessageStatus, TaskType};

/// Task payload: a string-keyed mapping of opaque JSON values.
pub type Body = serde_json::Map<String, serde_json::Value>;

/// A message that has not been saved yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageDraft {
    pub task_type: TaskType,
    pub body: Body,
    pub created_at: DateTime<Utc>,
}

impl MessageDraft {
    pub fn new(task_type: impl Into<TaskType>, body: Body, created_at: DateTime<Utc>) -> Self {
        Self {
            task_type: task_type.into(),
            body,
            created_at,
        }
    }
}

/// A persisted message.
///
/// `id` and `created_at` never change after save; `status` only moves forward
/// (see [`MessageStatus::can_transition_to`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub task_type: TaskType,
    pub body: Body,
    pub status: MessageStatus,
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Materialise a draft as a fresh `Init` message.
    pub fn from_draft(id: MessageId, draft: MessageDraft) -> Self {
        Self {
            id,
            task_type: draft.task_type,
            body: draft.body,
            status: MessageStatus::Init,
            created_at: draft.created_at,
        }
    }

    /// The body as a JSON object value (handy for `serde_json::from_value`).
    pub fn body_value(&self) -> serde_json::Value {
        serde_json::Value::Object(self.body.clone())
    }
}
