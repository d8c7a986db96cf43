//! Dispatcher - 1 tick 分の処理
//!
//! # フロー（handler ごと）
//! 1. MessageStore::claim() で PROCESSING 数の確認 + 最古の INIT を PROCESSING へ
//! 2. 遷移が拒否されたら FAILED にして終了（handler は呼ばない）
//! 3. handler を別 task で起動（tick を待たせない）
//! 4. 成功なら SUCCEED、失敗なら FAILED
//!
//! エラーはすべてここで吸収し、メッセージの終端状態に変換します。

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use super::in_flight::InFlight;
use crate::domain::{Message, MessageId, MessageStatus, TypeTactic};
use crate::error::MqError;
use crate::ports::{Claim, MessageStore};
use crate::registry::{HandlerBinding, Registries};

/// What one dispatch attempt ended up doing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attempt {
    /// Claimed and handed to the handler.
    Dispatched(MessageId),
    /// Processing count already at the cap.
    AtCapacity,
    /// No INIT message of the handler's type.
    Idle,
    /// Another tick claimed the message first.
    Contended,
    /// The store refused the claim; the message was failed.
    Rejected(MessageId),
    /// The store could not be queried; nothing changed.
    StoreUnavailable,
}

pub struct Dispatcher {
    store: Arc<dyn MessageStore>,
    in_flight: Arc<InFlight>,
}

impl Dispatcher {
    pub fn new(store: Arc<dyn MessageStore>, in_flight: Arc<InFlight>) -> Self {
        Self { store, in_flight }
    }

    pub fn in_flight(&self) -> &Arc<InFlight> {
        &self.in_flight
    }

    /// Run one tick of `binding`'s timer against a registry snapshot.
    pub async fn run_tick(&self, binding: &TypeTactic, registries: &Registries) -> Vec<Attempt> {
        let owned = registries.owned_by(&binding.task_type);
        let mut attempts = Vec::with_capacity(owned.len());
        for handler in &owned {
            let cap = registries.tactics.resolve(&handler.task_type).concurrency();
            attempts.push(self.dispatch(handler, cap as usize).await);
        }
        debug!(
            tactic = %binding.task_type,
            handlers = owned.len(),
            dispatched = attempts.iter().filter(|a| matches!(a, Attempt::Dispatched(_))).count(),
            "tick"
        );
        attempts
    }

    /// One admission-checked dispatch attempt for one handler.
    pub async fn dispatch(&self, binding: &HandlerBinding, cap: usize) -> Attempt {
        let task_type = &binding.task_type;
        let claim = match self.store.claim(task_type, cap).await {
            Ok(claim) => claim,
            Err(e) => {
                warn!(%task_type, error = %e, "store query failed, skipping");
                return Attempt::StoreUnavailable;
            }
        };

        let message = match claim {
            Claim::Claimed(message) => message,
            Claim::AtCapacity { processing } => {
                debug!(%task_type, processing, cap, "at capacity");
                return Attempt::AtCapacity;
            }
            Claim::Empty => return Attempt::Idle,
            Claim::Contended => return Attempt::Contended,
            Claim::Rejected { message, error } => {
                error!(%task_type, message_id = %message.id, %error, "claim rejected");
                let id = message.id;
                if let Err(e) = self.store.update(&message, MessageStatus::Failed).await {
                    error!(%task_type, message_id = %id, error = %e, "could not mark message failed");
                }
                return Attempt::Rejected(id);
            }
        };

        let id = message.id;
        debug!(%task_type, message_id = %id, "dispatching");
        let guard = self.in_flight.enter();
        let store = Arc::clone(&self.store);
        let handler = Arc::clone(&binding.handler);
        tokio::spawn(async move {
            let _guard = guard;
            let outcome = invoke(handler, message.clone()).await;
            finish(store.as_ref(), &message, outcome).await;
        });
        Attempt::Dispatched(id)
    }
}

/// Run the handler on its own task so a panic surfaces as a failure
/// instead of leaving the message in PROCESSING.
async fn invoke(
    handler: Arc<dyn crate::typed::MessageHandler>,
    message: Message,
) -> Result<(), MqError> {
    match tokio::spawn(async move { handler.handle(&message).await }).await {
        Ok(outcome) => outcome,
        Err(join) => Err(MqError::handler(format!("handler task aborted: {join}"))),
    }
}

async fn finish(store: &dyn MessageStore, message: &Message, outcome: Result<(), MqError>) {
    let task_type = &message.task_type;
    let status = match &outcome {
        Ok(()) => {
            info!(%task_type, message_id = %message.id, "message succeeded");
            MessageStatus::Succeed
        }
        Err(e) => {
            warn!(%task_type, message_id = %message.id, error = %e, "message failed");
            MessageStatus::Failed
        }
    };

    let Err(e) = store.update(message, status).await else {
        return;
    };
    error!(%task_type, message_id = %message.id, %status, error = %e, "status update failed");
    if status == MessageStatus::Succeed
        && let Err(e) = store.update(message, MessageStatus::Failed).await
    {
        error!(%task_type, message_id = %message.id, error = %e, "could not mark message failed");
    }
}
