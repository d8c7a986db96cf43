//! MessageQueue - クライアントが触る facade
//!
//! - enqueue / push: created_at を付けて store に保存（INIT）
//! - register_*: handler を追加（timer は再起動しない。次の tick から有効）
//! - configure_tactic: upsert して timer を再起動
//! - start / stop / shutdown: timer のライフサイクル

use std::future::Future;
use std::sync::Arc;

use tracing::{debug, info};

use super::builder::MessageQueueBuilder;
use super::dispatch::Dispatcher;
use super::in_flight::InFlight;
use super::scheduler::Scheduler;
use crate::domain::{Body, Message, MessageDraft, MessageId, Tactic, TaskType};
use crate::error::MqError;
use crate::impls::InMemoryStore;
use crate::observability::StatusCounts;
use crate::ports::{Clock, MessageStore, SystemClock};
use crate::registry::{Registries, SharedRegistries, TacticRegistry, Upsert};
use crate::typed::{FnHandler, Handler, MessageHandler, Task, TypedHandler};

pub struct MessageQueue {
    store: Arc<dyn MessageStore>,
    clock: Arc<dyn Clock>,
    registries: Arc<SharedRegistries>,
    scheduler: Scheduler,
}

impl MessageQueue {
    /// In-memory store, system clock, default catch-all tactic. Not started.
    pub fn new() -> Self {
        Self::from_parts(
            Arc::new(InMemoryStore::new()),
            Arc::new(SystemClock),
            Registries::default(),
        )
    }

    pub fn builder() -> MessageQueueBuilder {
        MessageQueueBuilder::new()
    }

    pub(crate) fn from_parts(
        store: Arc<dyn MessageStore>,
        clock: Arc<dyn Clock>,
        registries: Registries,
    ) -> Self {
        let registries = Arc::new(SharedRegistries::new(registries));
        let dispatcher = Arc::new(Dispatcher::new(Arc::clone(&store), InFlight::new()));
        let scheduler = Scheduler::new(dispatcher, Arc::clone(&registries));
        Self {
            store,
            clock,
            registries,
            scheduler,
        }
    }

    /// Stamp `created_at`, save as INIT. Processing outcomes never come back
    /// here; only a failed save does.
    pub async fn enqueue(
        &self,
        task_type: impl Into<TaskType>,
        body: Body,
    ) -> Result<MessageId, MqError> {
        let draft = MessageDraft::new(task_type, body, self.clock.now());
        let task_type = draft.task_type.clone();
        let id = self.store.save(draft).await?;
        debug!(%task_type, message_id = %id, "enqueued");
        Ok(id)
    }

    /// Enqueue a typed task under `T::TYPE`. `T` must serialize to a JSON object.
    pub async fn push<T: Task>(&self, task: &T) -> Result<MessageId, MqError> {
        let body = match serde_json::to_value(task) {
            Ok(serde_json::Value::Object(body)) => body,
            Ok(other) => {
                return Err(MqError::Config(format!(
                    "body of '{}' must be a JSON object, got {other}",
                    T::TYPE
                )));
            }
            Err(e) => return Err(MqError::Config(format!("json encode: {e}"))),
        };
        self.enqueue(T::TYPE, body).await
    }

    pub async fn register_handler(
        &self,
        task_type: impl Into<TaskType>,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<(), MqError> {
        let task_type = task_type.into();
        self.registries
            .update(|r| r.handlers.register(task_type.clone(), handler))
            .await?;
        info!(%task_type, "handler registered");
        Ok(())
    }

    pub async fn register_fn<F, Fut>(
        &self,
        task_type: impl Into<TaskType>,
        f: F,
    ) -> Result<(), MqError>
    where
        F: Fn(Message) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), MqError>> + Send + 'static,
    {
        self.register_handler(task_type, Arc::new(FnHandler::new(f)))
            .await
    }

    pub async fn register<T: Task, H: Handler<T> + 'static>(
        &self,
        handler: H,
    ) -> Result<(), MqError> {
        self.register_handler(T::TYPE, Arc::new(TypedHandler::<T, H>::new(handler)))
            .await
    }

    /// Upsert the tactic for `task_type` (empty type: the catch-all) and
    /// restart the timers so it applies from the next cycle.
    pub async fn configure_tactic(&self, task_type: impl Into<TaskType>, tactic: Tactic) {
        let task_type = task_type.into();
        let upsert = self
            .registries
            .update(|r| r.tactics.upsert(task_type.clone(), tactic))
            .await;
        match upsert {
            Upsert::Inserted => info!(%task_type, ?tactic, "tactic added"),
            Upsert::Replaced { previous } => {
                info!(%task_type, ?previous, ?tactic, "tactic rewritten")
            }
            Upsert::Unchanged => debug!(%task_type, "tactic unchanged"),
        }
        self.scheduler.restart().await;
    }

    pub async fn start(&self) {
        self.scheduler.start().await;
    }

    /// Cancel the timers. In-flight handlers keep running to completion.
    pub async fn stop(&self) -> bool {
        self.scheduler.stop().await
    }

    /// Stop and wait for in-flight ticks and handlers to drain.
    pub async fn shutdown(&self) {
        self.scheduler.shutdown().await;
    }

    pub async fn is_running(&self) -> bool {
        self.scheduler.is_running().await
    }

    pub fn store(&self) -> &Arc<dyn MessageStore> {
        &self.store
    }

    pub async fn get(&self, id: MessageId) -> Result<Option<Message>, MqError> {
        Ok(self.store.get(id).await?)
    }

    pub async fn counts(&self, task_type: impl Into<TaskType>) -> Result<StatusCounts, MqError> {
        Ok(self.store.counts(&task_type.into()).await?)
    }

    pub async fn tactics(&self) -> TacticRegistry {
        self.registries.snapshot().await.tactics.clone()
    }
}

impl Default for MessageQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MessageStatus;
    use crate::ports::FixedClock;
    use crate::typed::task::fixtures::SendEmail;
    use chrono::{Duration as ChronoDuration, TimeZone, Utc};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::time::sleep;

    fn clock() -> Arc<FixedClock> {
        Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        ))
    }

    fn mq_with(clock: Arc<FixedClock>) -> MessageQueue {
        MessageQueue::builder().clock(clock).build().unwrap()
    }

    async fn enqueue_n(mq: &MessageQueue, clock: &FixedClock, ty: &str, n: usize) -> Vec<MessageId> {
        let mut ids = Vec::new();
        for _ in 0..n {
            ids.push(mq.enqueue(ty, Body::new()).await.unwrap());
            clock.advance(ChronoDuration::seconds(1));
        }
        ids
    }

    async fn status(mq: &MessageQueue, id: MessageId) -> MessageStatus {
        mq.get(id).await.unwrap().unwrap().status
    }

    /// Records call order and the highest number of overlapping calls.
    #[derive(Default)]
    struct Probe {
        order: Mutex<Vec<MessageId>>,
        current: AtomicUsize,
        peak: AtomicUsize,
    }

    impl Probe {
        fn handler(self: &Arc<Self>, work: Duration) -> Arc<dyn MessageHandler> {
            let probe = Arc::clone(self);
            Arc::new(FnHandler::new(move |m: Message| {
                let probe = Arc::clone(&probe);
                async move {
                    probe.order.lock().unwrap().push(m.id);
                    let now = probe.current.fetch_add(1, Ordering::SeqCst) + 1;
                    probe.peak.fetch_max(now, Ordering::SeqCst);
                    sleep(work).await;
                    probe.current.fetch_sub(1, Ordering::SeqCst);
                    Ok::<(), MqError>(())
                }
            }))
        }

        fn calls(&self) -> usize {
            self.order.lock().unwrap().len()
        }
    }

    #[tokio::test]
    async fn enqueue_saves_init_message_with_clock_time() {
        let clock = clock();
        let mq = mq_with(Arc::clone(&clock));
        let mut body = Body::new();
        body.insert("to".into(), "a@example.com".into());

        let id = mq.enqueue("email", body.clone()).await.unwrap();
        let message = mq.get(id).await.unwrap().unwrap();

        assert_eq!(message.status, MessageStatus::Init);
        assert_eq!(message.task_type, TaskType::new("email"));
        assert_eq!(message.body, body);
        assert_eq!(message.created_at, clock.now());
    }

    #[tokio::test]
    async fn push_uses_task_type_and_serialized_body() {
        let mq = MessageQueue::new();
        let id = mq
            .push(&SendEmail {
                to: "b@example.com".into(),
            })
            .await
            .unwrap();

        let message = mq.get(id).await.unwrap().unwrap();
        assert_eq!(message.task_type.as_str(), SendEmail::TYPE);
        assert_eq!(message.body["to"], "b@example.com");
    }

    #[tokio::test(start_paused = true)]
    async fn email_scenario_processes_oldest_first_one_at_a_time() {
        let clock = clock();
        let mq = mq_with(Arc::clone(&clock));
        let ids = enqueue_n(&mq, &clock, "email", 3).await;
        let probe = Arc::new(Probe::default());
        mq.register_handler("email", probe.handler(Duration::ZERO))
            .await
            .unwrap();
        mq.configure_tactic("email", Tactic::every_secs(1).unwrap())
            .await;
        mq.start().await;

        sleep(Duration::from_millis(3500)).await;

        let counts = mq.counts("email").await.unwrap();
        assert_eq!(counts.succeed, 3);
        assert_eq!(*probe.order.lock().unwrap(), ids);
        assert_eq!(probe.peak.load(Ordering::SeqCst), 1);
        mq.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn slow_handler_never_overlaps_under_cap_one() {
        let clock = clock();
        let mq = mq_with(Arc::clone(&clock));
        let ids = enqueue_n(&mq, &clock, "email", 3).await;
        let probe = Arc::new(Probe::default());
        mq.register_handler("email", probe.handler(Duration::from_millis(1500)))
            .await
            .unwrap();
        mq.configure_tactic("email", Tactic::every_secs(1).unwrap())
            .await;
        mq.start().await;

        sleep(Duration::from_millis(1500)).await;
        // t=1 で 1 件目を取得、t=1.5 ではまだ処理中
        let counts = mq.counts("email").await.unwrap();
        assert_eq!(counts.processing, 1);
        assert_eq!(counts.init, 2);

        sleep(Duration::from_secs(10)).await;
        assert_eq!(mq.counts("email").await.unwrap().succeed, 3);
        assert_eq!(*probe.order.lock().unwrap(), ids);
        assert_eq!(probe.peak.load(Ordering::SeqCst), 1);
        mq.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn unbound_type_runs_on_catch_all_interval() {
        let mq = MessageQueue::new();
        let id = mq.enqueue("sms", Body::new()).await.unwrap();
        let probe = Arc::new(Probe::default());
        mq.register_handler("sms", probe.handler(Duration::ZERO))
            .await
            .unwrap();
        mq.start().await;

        sleep(Duration::from_millis(2500)).await;
        assert_eq!(status(&mq, id).await, MessageStatus::Init);

        sleep(Duration::from_secs(1)).await;
        assert!(status(&mq, id).await.is_terminal());
        assert_eq!(status(&mq, id).await, MessageStatus::Succeed);
        mq.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn failed_message_is_never_retried() {
        let mq = MessageQueue::new();
        let id = mq.enqueue("x", Body::new()).await.unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        mq.register_fn("x", move |_m: Message| {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), MqError>(MqError::handler("always fails")) }
        })
        .await
        .unwrap();
        mq.configure_tactic("x", Tactic::every_secs(1).unwrap()).await;
        mq.start().await;

        sleep(Duration::from_millis(1500)).await;
        assert_eq!(status(&mq, id).await, MessageStatus::Failed);

        sleep(Duration::from_secs(30)).await;
        assert_eq!(status(&mq, id).await, MessageStatus::Failed);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        mq.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn catch_all_timer_never_dispatches_a_bound_type() {
        let mq = MessageQueue::builder()
            .catch_all(Tactic::every_secs(1).unwrap())
            .tactic("email", Tactic::every_secs(100).unwrap())
            .build()
            .unwrap();
        let email = mq.enqueue("email", Body::new()).await.unwrap();
        let sms = mq.enqueue("sms", Body::new()).await.unwrap();
        let probe = Arc::new(Probe::default());
        mq.register_handler("email", probe.handler(Duration::ZERO))
            .await
            .unwrap();
        mq.register_handler("sms", probe.handler(Duration::ZERO))
            .await
            .unwrap();
        mq.start().await;

        sleep(Duration::from_secs(10)).await;
        assert_eq!(status(&mq, sms).await, MessageStatus::Succeed);
        assert_eq!(status(&mq, email).await, MessageStatus::Init);

        sleep(Duration::from_secs(91)).await;
        assert_eq!(status(&mq, email).await, MessageStatus::Succeed);
        mq.shutdown().await;
    }

    #[tokio::test]
    async fn configure_tactic_twice_keeps_one_binding() {
        let mq = MessageQueue::new();
        let tactic = Tactic::every_secs(2).unwrap().with_concurrency(3);
        mq.configure_tactic("email", tactic).await;
        mq.configure_tactic("email", tactic).await;

        let tactics = mq.tactics().await;
        assert_eq!(tactics.len(), 2);
        assert_eq!(tactics.resolve(&TaskType::new("email")), tactic);
    }

    #[tokio::test(start_paused = true)]
    async fn configure_tactic_takes_effect_while_running() {
        let mq = MessageQueue::new();
        let probe = Arc::new(Probe::default());
        mq.register_handler("email", probe.handler(Duration::ZERO))
            .await
            .unwrap();
        mq.start().await;
        let id = mq.enqueue("email", Body::new()).await.unwrap();

        // catch-all は 3s、email 専用の 1s tactic を追加して再起動
        mq.configure_tactic("email", Tactic::every_secs(1).unwrap())
            .await;
        assert!(mq.is_running().await);

        sleep(Duration::from_millis(1500)).await;
        assert_eq!(status(&mq, id).await, MessageStatus::Succeed);
        mq.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn handler_registered_while_running_is_picked_up_next_tick() {
        let mq = MessageQueue::new();
        mq.configure_tactic("email", Tactic::every_secs(1).unwrap())
            .await;
        mq.start().await;
        let id = mq.enqueue("email", Body::new()).await.unwrap();

        sleep(Duration::from_millis(2500)).await;
        assert_eq!(status(&mq, id).await, MessageStatus::Init);

        let probe = Arc::new(Probe::default());
        mq.register_handler("email", probe.handler(Duration::ZERO))
            .await
            .unwrap();
        sleep(Duration::from_secs(1)).await;
        assert_eq!(status(&mq, id).await, MessageStatus::Succeed);
        mq.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn stop_cancels_timers_but_not_running_handlers() {
        let mq = MessageQueue::new();
        let probe = Arc::new(Probe::default());
        mq.register_handler("email", probe.handler(Duration::from_secs(2)))
            .await
            .unwrap();
        mq.configure_tactic("email", Tactic::every_secs(1).unwrap())
            .await;
        let first = mq.enqueue("email", Body::new()).await.unwrap();
        let second = mq.enqueue("email", Body::new()).await.unwrap();
        mq.start().await;

        sleep(Duration::from_millis(1500)).await;
        assert!(mq.stop().await);
        assert!(!mq.is_running().await);
        assert_eq!(status(&mq, first).await, MessageStatus::Processing);

        sleep(Duration::from_secs(10)).await;
        assert_eq!(status(&mq, first).await, MessageStatus::Succeed);
        assert_eq!(status(&mq, second).await, MessageStatus::Init);
        assert_eq!(probe.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_waits_for_in_flight_handlers() {
        let mq = MessageQueue::new();
        let probe = Arc::new(Probe::default());
        mq.register_handler("email", probe.handler(Duration::from_secs(5)))
            .await
            .unwrap();
        mq.configure_tactic("email", Tactic::every_secs(1).unwrap())
            .await;
        let id = mq.enqueue("email", Body::new()).await.unwrap();
        mq.start().await;

        sleep(Duration::from_millis(1500)).await;
        assert_eq!(status(&mq, id).await, MessageStatus::Processing);

        mq.shutdown().await;
        assert_eq!(status(&mq, id).await, MessageStatus::Succeed);
    }

    #[tokio::test]
    async fn stop_when_not_running_is_a_no_op() {
        let mq = MessageQueue::new();
        assert!(!mq.stop().await);
        mq.shutdown().await;
    }

    #[tokio::test]
    async fn catch_all_handler_is_rejected() {
        let mq = MessageQueue::new();
        let result = mq
            .register_fn("", |_m: Message| async { Ok::<(), MqError>(()) })
            .await;
        assert!(matches!(result, Err(MqError::Config(_))));
    }
}
