use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use crate::domain::TaskType;
use crate::error::MqError;
use crate::typed::MessageHandler;

/// A processing function bound to one task type.
#[derive(Clone)]
pub struct HandlerBinding {
    pub task_type: TaskType,
    pub handler: Arc<dyn MessageHandler>,
}

impl fmt::Debug for HandlerBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerBinding")
            .field("task_type", &self.task_type)
            .finish_non_exhaustive()
    }
}

/// Registry of handler bindings (task_type -> handlers).
///
/// Several handlers may share a type; each is dispatched on its own.
#[derive(Debug, Clone, Default)]
pub struct HandlerRegistry {
    bindings: Vec<HandlerBinding>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a handler. The catch-all type cannot own a handler: its
    /// binding would never be dispatched.
    pub fn register(
        &mut self,
        task_type: TaskType,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<(), MqError> {
        if task_type.is_catch_all() {
            return Err(MqError::Config(
                "handler task type must not be empty".to_string(),
            ));
        }
        self.bindings.push(HandlerBinding { task_type, handler });
        Ok(())
    }

    pub fn bindings(&self) -> &[HandlerBinding] {
        &self.bindings
    }

    pub fn types(&self) -> BTreeSet<TaskType> {
        self.bindings.iter().map(|b| b.task_type.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}
