//! Agent state machine.
//!
//! # States
//! ```text
//! Init → Connected → Monitoring ⇄ { Signing → Submitting → Confirmed } → Monitoring
//!                        │
//!                        ├─→ Error ─(backoff)─→ Monitoring
//!                        └─→ Fatal (terminal)
//! ```

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentState {
    Init,
    Connected,
    Monitoring,
    Signing,
    Submitting,
    Confirmed,
    Error,
    Fatal,
}

impl AgentState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, AgentState::Fatal)
    }

    /// Whether the machine may move from `self` to `next`.
    pub fn can_transition_to(&self, next: AgentState) -> bool {
        use AgentState::*;

        if next == Fatal {
            return !self.is_terminal();
        }
        matches!(
            (self, next),
            (Init, Connected)
                | (Connected, Monitoring)
                | (Monitoring, Monitoring)
                | (Monitoring, Signing)
                | (Monitoring, Error)
                | (Signing, Signing)
                | (Signing, Submitting)
                | (Signing, Monitoring)
                | (Submitting, Confirmed)
                | (Submitting, Monitoring)
                | (Confirmed, Monitoring)
                | (Error, Monitoring)
        )
    }
}

impl std::fmt::Display for AgentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            AgentState::Init => "init",
            AgentState::Connected => "connected",
            AgentState::Monitoring => "monitoring",
            AgentState::Signing => "signing",
            AgentState::Submitting => "submitting",
            AgentState::Confirmed => "confirmed",
            AgentState::Error => "error",
            AgentState::Fatal => "fatal",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_transitions() {
        let path = [
            AgentState::Init,
            AgentState::Connected,
            AgentState::Monitoring,
            AgentState::Signing,
            AgentState::Submitting,
            AgentState::Confirmed,
            AgentState::Monitoring,
        ];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{} -> {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_fatal_is_terminal() {
        assert!(AgentState::Submitting.can_transition_to(AgentState::Fatal));
        assert!(!AgentState::Fatal.can_transition_to(AgentState::Monitoring));
        assert!(!AgentState::Fatal.can_transition_to(AgentState::Fatal));
    }

    #[test]
    fn test_no_shortcuts() {
        assert!(!AgentState::Init.can_transition_to(AgentState::Monitoring));
        assert!(!AgentState::Monitoring.can_transition_to(AgentState::Submitting));
        assert!(!AgentState::Error.can_transition_to(AgentState::Signing));
    }
}
