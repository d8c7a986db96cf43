//! Handler traits - メッセージを処理する関数の定義
//!
//! # 二層構造
//! - **内部（Dyn）**: `MessageHandler` - object-safe, registry に `Arc<dyn _>` で格納
//! - **表層（Typed）**: `Handler<T>` - body を `T` にデコードしてから呼ぶ
//!
//! `TypedHandler<T, H>` と `FnHandler<F>` が表層から内部への type erasure を担います。

use std::future::Future;
use std::marker::PhantomData;

use async_trait::async_trait;

use super::task::Task;
use crate::domain::Message;
use crate::error::MqError;

/// Object-safe handler invoked by the scheduler.
///
/// `Ok(())` moves the message to SUCCEED, any `Err` to FAILED.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, message: &Message) -> Result<(), MqError>;
}

/// Handler は body をデコードした `T` を受け取る
///
/// # 使用例
/// ```ignore
/// struct SendEmailHandler;
///
/// #[async_trait]
/// impl Handler<SendEmail> for SendEmailHandler {
///     async fn handle(&self, task: SendEmail) -> Result<(), MqError> {
///         mailer.send(&task.to).await.map_err(MqError::handler)
///     }
/// }
/// ```
#[async_trait]
pub trait Handler<T: Task>: Send + Sync {
    async fn handle(&self, task: T) -> Result<(), MqError>;
}

pub struct TypedHandler<T: Task, H: Handler<T>> {
    handler: H,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Task, H: Handler<T>> TypedHandler<T, H> {
    pub fn new(handler: H) -> Self {
        Self {
            handler,
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<T: Task, H: Handler<T>> MessageHandler for TypedHandler<T, H> {
    async fn handle(&self, message: &Message) -> Result<(), MqError> {
        let task: T = serde_json::from_value(message.body_value())
            .map_err(|e| MqError::handler(format!("json decode: {e}")))?;
        self.handler.handle(task).await
    }
}

/// Closure handler: `|message| async move { ... }`.
pub struct FnHandler<F> {
    f: F,
}

impl<F> FnHandler<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F, Fut> MessageHandler for FnHandler<F>
where
    F: Fn(Message) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), MqError>> + Send,
{
    async fn handle(&self, message: &Message) -> Result<(), MqError> {
        (self.f)(message.clone()).await
    }
}
