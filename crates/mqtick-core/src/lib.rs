//! mqtick-core
//!
//! タイマー駆動のインプロセス message queue。
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, task_type, status, message, tactic）
//! - **ports**: 抽象化レイヤー（MessageStore, Clock, IdGenerator）
//! - **registry**: tactic / handler の登録とスナップショット
//! - **app**: アプリケーションロジック（MessageQueue, builder, scheduler, dispatch）
//! - **typed**: handler API（MessageHandler, 型付き Task / Handler）
//! - **impls**: 実装（InMemoryStore）
//! - **config**: TOML による tactic 設定

pub mod app;
pub mod config;
pub mod domain;
pub mod error;
pub mod impls;
pub mod observability;
pub mod ports;
pub mod registry;
pub mod typed;

pub use app::{MessageQueue, MessageQueueBuilder};
pub use config::MqConfig;
pub use domain::{Body, Message, MessageId, MessageStatus, Tactic, TaskType};
pub use error::{MqError, StoreError};
pub use impls::InMemoryStore;
pub use observability::StatusCounts;
pub use ports::{Claim, Clock, MessageStore};
pub use typed::{Handler, MessageHandler, Task};
