use thiserror::Error;

use crate::domain::{MessageId, MessageStatus, TaskType};

/// Errors raised by a [`MessageStore`](crate::ports::MessageStore) backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("message not found: {0}")]
    NotFound(MessageId),

    /// The stored status no longer matches what the caller observed
    /// (another tick claimed or finished the message first).
    #[error("status conflict for {id}: expected {expected}, found {actual}")]
    Conflict {
        id: MessageId,
        expected: MessageStatus,
        actual: MessageStatus,
    },

    #[error("illegal transition for {id}: {from} -> {to}")]
    IllegalTransition {
        id: MessageId,
        from: MessageStatus,
        to: MessageStatus,
    },

    #[error("store backend: {0}")]
    Backend(String),
}

#[derive(Debug, Error)]
pub enum MqError {
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A handler reported failure. The detail is logged, never stored.
    #[error("handler failed: {0}")]
    Handler(String),

    #[error("invalid tactic: {0}")]
    InvalidTactic(String),

    #[error("config: {0}")]
    Config(String),

    #[error("no handler registered for task types: {0:?}")]
    MissingHandlers(Vec<TaskType>),
}

impl MqError {
    pub fn handler(detail: impl std::fmt::Display) -> Self {
        MqError::Handler(detail.to_string())
    }
}
