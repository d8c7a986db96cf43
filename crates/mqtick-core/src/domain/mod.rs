//! Domain model (ids, task types, messages, statuses, tactics).

pub mod ids;
pub mod message;
pub mod status;
pub mod tactic;
pub mod task_type;

pub use ids::MessageId;
pub use message::{Body, Message, MessageDraft};
pub use status::MessageStatus;
pub use tactic::{Tactic, TypeTactic};
pub use task_type::TaskType;
