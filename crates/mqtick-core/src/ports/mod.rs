//! Ports - 抽象化レイヤー
//!
//! scheduler が依存する外部要素（ストレージ、時刻、ID 採番）を trait で切り出します。
//! 実装は `impls` に置きます。

pub mod clock;
pub mod id_generator;
pub mod message_store;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::message_store::{Claim, MessageStore};
