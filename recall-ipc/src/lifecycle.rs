//! Server lifecycle state machine: `stopped -> starting ->
//! running -> stopping -> stopped`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerState {
    Stopped,
    Starting,
    Running,
    Stopping,
}

impl ServerState {
    /// Whether `next` is a legal transition from `self`.
    #[must_use]
    pub fn can_transition_to(self, next: ServerState) -> bool {
        matches!(
            (self, next),
            (ServerState::Stopped, ServerState::Starting)
                | (ServerState::Starting, ServerState::Running)
                | (ServerState::Running, ServerState::Stopping)
                | (ServerState::Stopping, ServerState::Stopped)
                // Starting can fail straight back to stopped without ever running.
                | (ServerState::Starting, ServerState::Stopped)
        )
    }
}

/// An observable lifecycle event, broadcast to local subscribers,
/// never sent to clients.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LifecycleEvent {
    Start,
    Stop,
    ClientConnect { client_id: u64 },
    ClientDisconnect { client_id: u64 },
    ClientRejected { reason: String },
    Error { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_transitions_are_accepted() {
        assert!(ServerState::Stopped.can_transition_to(ServerState::Starting));
        assert!(ServerState::Starting.can_transition_to(ServerState::Running));
        assert!(ServerState::Running.can_transition_to(ServerState::Stopping));
        assert!(ServerState::Stopping.can_transition_to(ServerState::Stopped));
    }

    #[test]
    fn skipping_a_state_is_rejected() {
        assert!(!ServerState::Stopped.can_transition_to(ServerState::Running));
        assert!(!ServerState::Running.can_transition_to(ServerState::Stopped));
    }
}
