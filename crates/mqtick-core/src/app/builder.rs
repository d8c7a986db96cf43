//! MessageQueueBuilder - MessageQueue の構築とワイヤリング
//!
//! # Fail-fast 設計
//! - expect_types() で期待される task_type を登録
//! - build() 時に「期待集合 ⊆ handler 登録済み集合」をチェック
//! - 不足があれば MqError::MissingHandlers を返す

use std::sync::Arc;

use super::mq::MessageQueue;
use crate::config::MqConfig;
use crate::domain::{Tactic, TaskType};
use crate::error::MqError;
use crate::impls::InMemoryStore;
use crate::ports::{Clock, MessageStore, SystemClock};
use crate::registry::{HandlerRegistry, Registries, TacticRegistry};
use crate::typed::{FnHandler, Handler, MessageHandler, Task, TypedHandler};

/// # 使用例
/// ```ignore
/// let mq = MessageQueue::builder()
///     .store(Arc::new(MyDbStore::connect(url).await?))
///     .tactic("email", Tactic::every_secs(1)?.with_concurrency(4))
///     .register::<SendEmail, _>(SendEmailHandler)?
///     .expect_types(&["email"])
///     .build()?;
/// mq.start().await;
/// ```
pub struct MessageQueueBuilder {
    store: Option<Arc<dyn MessageStore>>,
    clock: Arc<dyn Clock>,
    tactics: TacticRegistry,
    handlers: HandlerRegistry,
    expected_types: Option<Vec<TaskType>>,
}

impl MessageQueueBuilder {
    pub fn new() -> Self {
        Self {
            store: None,
            clock: Arc::new(SystemClock),
            tactics: TacticRegistry::new(),
            handlers: HandlerRegistry::new(),
            expected_types: None,
        }
    }

    /// Storage backend. Defaults to [`InMemoryStore`].
    pub fn store(mut self, store: Arc<dyn MessageStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Clock used to stamp `created_at` on enqueue.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn catch_all(mut self, tactic: Tactic) -> Self {
        self.tactics.upsert(TaskType::catch_all(), tactic);
        self
    }

    pub fn tactic(mut self, task_type: impl Into<TaskType>, tactic: Tactic) -> Self {
        self.tactics.upsert(task_type.into(), tactic);
        self
    }

    /// Apply `[catch_all]` and `[[tactics]]` from a config file.
    pub fn config(mut self, config: &MqConfig) -> Result<Self, MqError> {
        if let Some(tactic) = config.catch_all_tactic()? {
            self.tactics.upsert(TaskType::catch_all(), tactic);
        }
        for binding in config.type_tactics()? {
            self.tactics.upsert(binding.task_type, binding.tactic);
        }
        Ok(self)
    }

    pub fn handler(
        mut self,
        task_type: impl Into<TaskType>,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<Self, MqError> {
        self.handlers.register(task_type.into(), handler)?;
        Ok(self)
    }

    pub fn handler_fn<F, Fut>(self, task_type: impl Into<TaskType>, f: F) -> Result<Self, MqError>
    where
        F: Fn(crate::domain::Message) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<(), MqError>> + Send + 'static,
    {
        self.handler(task_type, Arc::new(FnHandler::new(f)))
    }

    pub fn register<T: Task, H: Handler<T> + 'static>(self, handler: H) -> Result<Self, MqError> {
        self.handler(T::TYPE, Arc::new(TypedHandler::<T, H>::new(handler)))
    }

    /// Types that must have at least one handler when `build()` runs.
    pub fn expect_types(mut self, task_types: &[&str]) -> Self {
        self.expected_types = Some(task_types.iter().map(|t| TaskType::new(*t)).collect());
        self
    }

    pub fn build(self) -> Result<MessageQueue, MqError> {
        if let Some(expected) = &self.expected_types {
            let registered = self.handlers.types();
            let missing: Vec<TaskType> = expected
                .iter()
                .filter(|t| !registered.contains(*t))
                .cloned()
                .collect();
            if !missing.is_empty() {
                return Err(MqError::MissingHandlers(missing));
            }
        }

        let store = self
            .store
            .unwrap_or_else(|| Arc::new(InMemoryStore::new()) as Arc<dyn MessageStore>);
        let registries = Registries {
            tactics: self.tactics,
            handlers: self.handlers,
        };
        Ok(MessageQueue::from_parts(store, self.clock, registries))
    }
}

impl Default for MessageQueueBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Message;
    use crate::typed::task::fixtures::SendEmail;
    use async_trait::async_trait;
    use std::time::Duration;

    struct SendEmailHandler;

    #[async_trait]
    impl Handler<SendEmail> for SendEmailHandler {
        async fn handle(&self, _task: SendEmail) -> Result<(), MqError> {
            Ok(())
        }
    }

    #[test]
    fn build_success() {
        let mq = MessageQueueBuilder::new()
            .register::<SendEmail, _>(SendEmailHandler)
            .unwrap()
            .expect_types(&[SendEmail::TYPE])
            .build();
        assert!(mq.is_ok());
    }

    #[test]
    fn build_missing_task_types() {
        let mq = MessageQueueBuilder::new()
            .register::<SendEmail, _>(SendEmailHandler)
            .unwrap()
            .expect_types(&[SendEmail::TYPE, "sms"])
            .build();
        assert!(matches!(
            mq,
            Err(MqError::MissingHandlers(missing)) if missing == vec![TaskType::new("sms")]
        ));
    }

    #[tokio::test]
    async fn config_and_explicit_tactics_are_merged() {
        let config = MqConfig::from_toml_str(
            r#"
            [catch_all]
            interval_secs = 10

            [[tactics]]
            type = "email"
            interval_secs = 2
            concurrency = 4
            "#,
        )
        .unwrap();

        let mq = MessageQueueBuilder::new()
            .config(&config)
            .unwrap()
            .tactic("sms", Tactic::every_secs(1).unwrap())
            .handler_fn("sms", |_m: Message| async { Ok::<(), MqError>(()) })
            .unwrap()
            .build()
            .unwrap();

        let tactics = mq.tactics().await;
        assert_eq!(tactics.len(), 3);
        assert_eq!(tactics.catch_all().interval(), Duration::from_secs(10));
        assert_eq!(tactics.resolve(&TaskType::new("email")).concurrency(), 4);
        assert_eq!(
            tactics.resolve(&TaskType::new("sms")).interval(),
            Duration::from_secs(1)
        );
    }
}
