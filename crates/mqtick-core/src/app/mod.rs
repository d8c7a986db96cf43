//! App - アプリケーション層
//!
//! ports と registry を組み合わせて tick 駆動の配送を実装します。
//!
//! # 主要コンポーネント
//! - **MessageQueue**: クライアント向け facade（enqueue / register / configure）
//! - **MessageQueueBuilder**: 構築とワイヤリング
//! - **Scheduler**: tactic ごとの timer の起動・停止
//! - **Dispatcher**: 1 tick 分の claim → handle → 終端 status の書き込み

pub mod builder;
pub mod dispatch;
pub mod in_flight;
pub mod mq;
pub mod scheduler;
pub mod ticker;

pub use self::builder::MessageQueueBuilder;
pub use self::dispatch::{Attempt, Dispatcher};
pub use self::in_flight::InFlight;
pub use self::mq::MessageQueue;
pub use self::scheduler::Scheduler;
