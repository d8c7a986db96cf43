//! Task trait - 型付きメッセージの定義
//!
//! # Trait Bounds
//! - `Serialize`: body（JSON object）への変換のため
//! - `DeserializeOwned`: body からの復元のため
//! - `Send + Sync + 'static`: tick から spawn されるタスクに渡すため

use serde::Serialize;
use serde::de::DeserializeOwned;

/// Task は task_type と Rust の型を対応付ける
///
/// # 使用例
/// ```ignore
/// #[derive(Serialize, Deserialize)]
/// struct SendEmail {
///     to: String,
/// }
///
/// impl Task for SendEmail {
///     const TYPE: &'static str = "email";
/// }
/// ```
///
/// `T` の JSON 表現は object でなければなりません（body は文字列キーの map）。
pub trait Task: Serialize + DeserializeOwned + Send + Sync + 'static {
    const TYPE: &'static str;
}

#[cfg(test)]
pub(crate) mod fixtures {
    use serde::{Deserialize, Serialize};

    use super::Task;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct SendEmail {
        pub to: String,
    }

    impl Task for SendEmail {
        const TYPE: &'static str = "email";
    }
}
