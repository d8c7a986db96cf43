//! Impls - port の実装
//!
//! # 含まれる実装
//! - **InMemoryStore**: Vec + 線形走査の MessageStore
//!
//! 本番用のバックエンド（DB など）は別クレートで `MessageStore` を実装してください。

pub mod memory_store;

pub use self::memory_store::InMemoryStore;
