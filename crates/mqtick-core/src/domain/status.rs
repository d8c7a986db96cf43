//! Message status state machine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a stored message.
///
/// State transitions:
/// - Init -> Processing -> Succeed
/// - Init -> Processing -> Failed
/// - Init -> Failed (the store rejected the Processing transition)
///
/// Succeed and Failed are terminal. There is no retry edge back to Init.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageStatus {
    /// Enqueued, waiting for a tick to pick it up.
    Init,

    /// Claimed by the scheduler; a handler is running.
    Processing,

    /// The handler returned success.
    Succeed,

    /// The handler errored or the store rejected a transition.
    Failed,
}

impl MessageStatus {
    pub const ALL: [MessageStatus; 4] = [
        MessageStatus::Init,
        MessageStatus::Processing,
        MessageStatus::Succeed,
        MessageStatus::Failed,
    ];

    /// Is this a terminal state (no further transitions)?
    pub fn is_terminal(self) -> bool {
        matches!(self, MessageStatus::Succeed | MessageStatus::Failed)
    }

    /// Whether `self -> next` is a forward edge of the lifecycle.
    pub fn can_transition_to(self, next: MessageStatus) -> bool {
        use MessageStatus::*;
        matches!(
            (self, next),
            (Init, Processing) | (Init, Failed) | (Processing, Succeed) | (Processing, Failed)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MessageStatus::Init => "INIT",
            MessageStatus::Processing => "PROCESSING",
            MessageStatus::Succeed => "SUCCEED",
            MessageStatus::Failed => "FAILED",
        }
    }
}

impl fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use MessageStatus::*;

    #[rstest]
    #[case::claim(Init, Processing)]
    #[case::store_rejected(Init, Failed)]
    #[case::handler_ok(Processing, Succeed)]
    #[case::handler_err(Processing, Failed)]
    fn forward_edges_are_allowed(#[case] from: MessageStatus, #[case] to: MessageStatus) {
        assert!(from.can_transition_to(to));
    }

    #[rstest]
    #[case::skip_processing(Init, Succeed)]
    #[case::backward(Processing, Init)]
    #[case::reclaim(Processing, Processing)]
    #[case::retry(Failed, Init)]
    #[case::out_of_succeed(Succeed, Failed)]
    #[case::out_of_failed(Failed, Processing)]
    fn other_edges_are_rejected(#[case] from: MessageStatus, #[case] to: MessageStatus) {
        assert!(!from.can_transition_to(to));
    }

    #[test]
    fn terminal_states_have_no_outgoing_edges() {
        for from in MessageStatus::ALL.into_iter().filter(|s| s.is_terminal()) {
            for to in MessageStatus::ALL {
                assert!(!from.can_transition_to(to), "{from} -> {to}");
            }
        }
    }

    #[test]
    fn serializes_in_upper_case() {
        assert_eq!(serde_json::to_string(&Processing).unwrap(), "\"PROCESSING\"");
        assert_eq!(Succeed.to_string(), "SUCCEED");
    }
}
