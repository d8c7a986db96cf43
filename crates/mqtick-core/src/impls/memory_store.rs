//! InMemoryStore - リファレンス実装の MessageStore
//!
//! # 実装詳細
//! - `Vec<Message>` に挿入順で保持し、全クエリは線形走査
//! - tokio の Mutex で排他制御（ロックを跨いで await しない）
//! - `claim` は count→find→update を 1 回のロック内で行うので、上限を超えない
//!
//! 小規模向けです。件数が増える用途では index を持つバックエンドを使ってください。

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{Message, MessageDraft, MessageId, MessageStatus, TaskType};
use crate::error::StoreError;
use crate::ports::{Claim, IdGenerator, MessageStore, SystemClock, UlidGenerator};

struct InMemoryState {
    /// Insertion order doubles as the FIFO tie-breaker for equal `created_at`.
    messages: Vec<Message>,
}

impl InMemoryState {
    fn oldest(&self, task_type: &TaskType, status: MessageStatus) -> Option<usize> {
        self.messages
            .iter()
            .enumerate()
            .filter(|(_, m)| m.task_type == *task_type && m.status == status)
            .min_by_key(|(_, m)| m.created_at)
            .map(|(idx, _)| idx)
    }

    fn count(&self, task_type: &TaskType, status: MessageStatus) -> usize {
        self.messages
            .iter()
            .filter(|m| m.task_type == *task_type && m.status == status)
            .count()
    }

    fn transition(
        &mut self,
        id: MessageId,
        expected: MessageStatus,
        next: MessageStatus,
    ) -> Result<Message, StoreError> {
        let stored = self
            .messages
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or(StoreError::NotFound(id))?;

        if stored.status != expected {
            return Err(StoreError::Conflict {
                id,
                expected,
                actual: stored.status,
            });
        }
        if !stored.status.can_transition_to(next) {
            return Err(StoreError::IllegalTransition {
                id,
                from: stored.status,
                to: next,
            });
        }

        stored.status = next;
        Ok(stored.clone())
    }
}

pub struct InMemoryStore {
    state: Mutex<InMemoryState>,
    ids: Arc<dyn IdGenerator>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::with_id_generator(Arc::new(UlidGenerator::new(SystemClock)))
    }

    pub fn with_id_generator(ids: Arc<dyn IdGenerator>) -> Self {
        Self {
            state: Mutex::new(InMemoryState {
                messages: Vec::new(),
            }),
            ids,
        }
    }

    /// Every stored message in insertion order.
    pub async fn all(&self) -> Vec<Message> {
        self.state.lock().await.messages.clone()
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.messages.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageStore for InMemoryStore {
    async fn save(&self, draft: MessageDraft) -> Result<MessageId, StoreError> {
        let mut state = self.state.lock().await;
        let mut id = self.ids.generate_message_id();
        while state.messages.iter().any(|m| m.id == id) {
            id = self.ids.generate_message_id();
        }
        state.messages.push(Message::from_draft(id, draft));
        Ok(id)
    }

    async fn find(
        &self,
        task_type: &TaskType,
        status: MessageStatus,
    ) -> Result<Option<Message>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .oldest(task_type, status)
            .map(|idx| state.messages[idx].clone()))
    }

    async fn count(
        &self,
        task_type: &TaskType,
        status: MessageStatus,
    ) -> Result<usize, StoreError> {
        Ok(self.state.lock().await.count(task_type, status))
    }

    async fn update(
        &self,
        message: &Message,
        status: MessageStatus,
    ) -> Result<Message, StoreError> {
        self.state
            .lock()
            .await
            .transition(message.id, message.status, status)
    }

    async fn get(&self, id: MessageId) -> Result<Option<Message>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.messages.iter().find(|m| m.id == id).cloned())
    }

    async fn claim(&self, task_type: &TaskType, cap: usize) -> Result<Claim, StoreError> {
        let mut state = self.state.lock().await;

        let processing = state.count(task_type, MessageStatus::Processing);
        if processing >= cap {
            return Ok(Claim::AtCapacity { processing });
        }

        let Some(idx) = state.oldest(task_type, MessageStatus::Init) else {
            return Ok(Claim::Empty);
        };
        let message = &mut state.messages[idx];
        message.status = MessageStatus::Processing;
        Ok(Claim::Claimed(message.clone()))
    }
}
