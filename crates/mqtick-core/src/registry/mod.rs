//! Registry - tactic と handler の登録表
//!
//! # 同期の方針（read-copy-on-write）
//! - 設定変更は `SharedRegistries::update` で現在の snapshot を clone → 変更 → 差し替え
//! - tick は開始時に `snapshot()` で `Arc<Registries>` を 1 回だけ取得する
//! - tick の途中で設定が変わっても、その tick が見る内容は変わらない

mod handlers;
mod tactics;

pub use self::handlers::{HandlerBinding, HandlerRegistry};
pub use self::tactics::{TacticRegistry, Upsert};

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::domain::TaskType;

/// One immutable view of both registries.
#[derive(Debug, Clone, Default)]
pub struct Registries {
    pub tactics: TacticRegistry,
    pub handlers: HandlerRegistry,
}

impl Registries {
    /// Handlers the timer of `tactic_type` dispatches.
    ///
    /// - catch-all: every handler whose type has no binding of its own
    /// - otherwise: every handler whose type equals `tactic_type`
    pub fn owned_by(&self, tactic_type: &TaskType) -> Vec<HandlerBinding> {
        self.handlers
            .bindings()
            .iter()
            .filter(|b| {
                if tactic_type.is_catch_all() {
                    !self.tactics.is_bound(&b.task_type)
                } else {
                    b.task_type == *tactic_type
                }
            })
            .cloned()
            .collect()
    }
}

#[derive(Debug, Default)]
pub struct SharedRegistries {
    current: RwLock<Arc<Registries>>,
}

impl SharedRegistries {
    pub fn new(registries: Registries) -> Self {
        Self {
            current: RwLock::new(Arc::new(registries)),
        }
    }

    pub async fn snapshot(&self) -> Arc<Registries> {
        Arc::clone(&*self.current.read().await)
    }

    /// Copy, mutate, publish. Writers are serialised by the write lock.
    pub async fn update<R>(&self, f: impl FnOnce(&mut Registries) -> R) -> R {
        let mut current = self.current.write().await;
        let mut next = Registries::clone(&current);
        let result = f(&mut next);
        *current = Arc::new(next);
        result
    }
}
