//! MessageStore port - メッセージ状態の正本（source of truth）
//!
//! scheduler が触る共有可変リソースはここだけです。
//! 複数の tactic の tick から同時に読み書きされる前提で実装してください。
//!
//! # 実装
//! - `InMemoryStore`（impls/memory_store.rs）: Vec + 線形走査のリファレンス実装
//! - 本番用のバックエンドは (type, status) と (type, created_at) に index を張る想定

use async_trait::async_trait;

use crate::domain::{Message, MessageDraft, MessageId, MessageStatus, TaskType};
use crate::error::StoreError;
use crate::observability::StatusCounts;

/// Result of one claim attempt for a task type.
#[derive(Debug)]
pub enum Claim {
    /// The oldest `Init` message, now `Processing`.
    Claimed(Message),

    /// `Processing` count was already at or above the cap.
    AtCapacity { processing: usize },

    /// Nothing in `Init` for this type.
    Empty,

    /// Another tick moved the message first. Nothing to do.
    Contended,

    /// The store refused the `Processing` transition. The caller must fail
    /// the message.
    Rejected { message: Message, error: StoreError },
}

#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Persist a draft as a fresh `Init` message and return its new id.
    async fn save(&self, draft: MessageDraft) -> Result<MessageId, StoreError>;

    /// The oldest message (by `created_at`) matching type and status.
    /// Must not mutate state.
    async fn find(
        &self,
        task_type: &TaskType,
        status: MessageStatus,
    ) -> Result<Option<Message>, StoreError>;

    async fn count(&self, task_type: &TaskType, status: MessageStatus)
        -> Result<usize, StoreError>;

    /// Set the status of `message` by id and return the stored result.
    ///
    /// `message.status` is the status the caller observed; a mismatch with the
    /// stored one is a [`StoreError::Conflict`]. Unknown ids are
    /// [`StoreError::NotFound`], non-lifecycle edges
    /// [`StoreError::IllegalTransition`].
    async fn update(&self, message: &Message, status: MessageStatus)
        -> Result<Message, StoreError>;

    async fn get(&self, id: MessageId) -> Result<Option<Message>, StoreError>;

    async fn counts(&self, task_type: &TaskType) -> Result<StatusCounts, StoreError> {
        let mut counts = StatusCounts::default();
        for status in MessageStatus::ALL {
            counts.add(status, self.count(task_type, status).await?);
        }
        Ok(counts)
    }

    /// Claim the oldest `Init` message of `task_type` if fewer than `cap`
    /// messages of that type are `Processing`.
    ///
    /// The default composes count -> find -> update and is advisory only:
    /// concurrent claims may overshoot the cap. Backends that can do this in
    /// one transaction should override it.
    async fn claim(&self, task_type: &TaskType, cap: usize) -> Result<Claim, StoreError> {
        let processing = self.count(task_type, MessageStatus::Processing).await?;
        if processing >= cap {
            return Ok(Claim::AtCapacity { processing });
        }

        let Some(message) = self.find(task_type, MessageStatus::Init).await? else {
            return Ok(Claim::Empty);
        };

        match self.update(&message, MessageStatus::Processing).await {
            Ok(claimed) => Ok(Claim::Claimed(claimed)),
            Err(StoreError::Conflict { .. }) => Ok(Claim::Contended),
            Err(error) => Ok(Claim::Rejected { message, error }),
        }
    }
}
