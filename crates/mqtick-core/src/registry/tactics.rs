//! TacticRegistry - task_type → Tactic の対応表
//!
//! catch-all（空文字列）の binding は常に 1 件存在します。

use crate::domain::{Tactic, TaskType, TypeTactic};

/// What [`TacticRegistry::upsert`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Inserted,
    Replaced { previous: Tactic },
    Unchanged,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TacticRegistry {
    entries: Vec<TypeTactic>,
}

impl TacticRegistry {
    /// Registry holding only the default catch-all binding (3s, cap 1).
    pub fn new() -> Self {
        Self::with_catch_all(Tactic::default())
    }

    pub fn with_catch_all(tactic: Tactic) -> Self {
        Self {
            entries: vec![TypeTactic::new(TaskType::catch_all(), tactic)],
        }
    }

    /// Insert a binding, or replace the tactic of the existing one.
    pub fn upsert(&mut self, task_type: TaskType, tactic: Tactic) -> Upsert {
        match self.entries.iter_mut().find(|e| e.task_type == task_type) {
            Some(entry) if entry.tactic == tactic => Upsert::Unchanged,
            Some(entry) => {
                let previous = std::mem::replace(&mut entry.tactic, tactic);
                Upsert::Replaced { previous }
            }
            None => {
                self.entries.push(TypeTactic::new(task_type, tactic));
                Upsert::Inserted
            }
        }
    }

    pub fn get(&self, task_type: &TaskType) -> Option<&TypeTactic> {
        self.entries.iter().find(|e| e.task_type == *task_type)
    }

    /// Whether `task_type` has its own binding (the catch-all never counts).
    pub fn is_bound(&self, task_type: &TaskType) -> bool {
        !task_type.is_catch_all() && self.get(task_type).is_some()
    }

    pub fn catch_all(&self) -> Tactic {
        self.get(&TaskType::catch_all())
            .map(|e| e.tactic)
            .unwrap_or_default()
    }

    /// Effective policy for a handler type: its own binding, else catch-all.
    pub fn resolve(&self, task_type: &TaskType) -> Tactic {
        self.get(task_type)
            .map(|e| e.tactic)
            .unwrap_or_else(|| self.catch_all())
    }

    pub fn entries(&self) -> &[TypeTactic] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for TacticRegistry {
    fn default() -> Self {
        Self::new()
    }
}
