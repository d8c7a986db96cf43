//! Typed - handler の定義と型付き Task API
//!
//! task_type の typo を型で排除し、body のデコードを handler の外に出します。

pub mod handler;
pub mod task;

pub use self::handler::{FnHandler, Handler, MessageHandler, TypedHandler};
pub use self::task::Task;
