//! Agent states and the transition table
//!
//! Transitions are data: a fixed table of (state, event) -> (state, side
//! effect) rows. The controller looks rows up, it never hand-codes a jump.

use serde::{Deserialize, Serialize};

/// The five states of one interaction cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentState {
    /// Waiting for the wake phrase
    Idle,
    /// Woken; waiting (bounded) for the request utterance
    Listening,
    /// Resolving and dispatching the request
    Processing,
    /// Speaking the response
    Responding,
    /// A turn failed; apologize and recover
    Error,
}

impl Default for AgentState {
    fn default() -> Self {
        Self::Idle
    }
}

impl std::fmt::Display for AgentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AgentState::Idle => write!(f, "Idle"),
            AgentState::Listening => write!(f, "Listening"),
            AgentState::Processing => write!(f, "Processing"),
            AgentState::Responding => write!(f, "Responding"),
            AgentState::Error => write!(f, "Error"),
        }
    }
}

/// Inputs that drive a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Event {
    WakeDetected,
    UtteranceReceived,
    ListenTimeout,
    IntentResolved,
    ProcessingFailed,
    PlaybackComplete,
    Recovered,
}

/// Work the controller does while taking a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SideEffect {
    None,
    /// Put capture back at full sensitivity
    ResumeCapture,
    /// Log the failure and replace the response with an apology
    LogAndApologize,
}

/// One row of the transition table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: AgentState,
    pub event: Event,
    pub to: AgentState,
    pub effect: SideEffect,
}

const fn row(from: AgentState, event: Event, to: AgentState, effect: SideEffect) -> Transition {
    Transition {
        from,
        event,
        to,
        effect,
    }
}

pub const TRANSITIONS: [Transition; 7] = [
    row(AgentState::Idle, Event::WakeDetected, AgentState::Listening, SideEffect::ResumeCapture),
    row(AgentState::Listening, Event::UtteranceReceived, AgentState::Processing, SideEffect::None),
    row(AgentState::Listening, Event::ListenTimeout, AgentState::Idle, SideEffect::None),
    row(AgentState::Processing, Event::IntentResolved, AgentState::Responding, SideEffect::None),
    row(AgentState::Processing, Event::ProcessingFailed, AgentState::Error, SideEffect::LogAndApologize),
    row(AgentState::Responding, Event::PlaybackComplete, AgentState::Idle, SideEffect::None),
    row(AgentState::Error, Event::Recovered, AgentState::Idle, SideEffect::None),
];

/// Look up the row for `event` in `state`, if the table has one
pub fn next(state: AgentState, event: Event) -> Option<Transition> {
    TRANSITIONS
        .iter()
        .find(|t| t.from == state && t.event == event)
        .copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    const STATES: [AgentState; 5] = [
        AgentState::Idle,
        AgentState::Listening,
        AgentState::Processing,
        AgentState::Responding,
        AgentState::Error,
    ];

    const EVENTS: [Event; 7] = [
        Event::WakeDetected,
        Event::UtteranceReceived,
        Event::ListenTimeout,
        Event::IntentResolved,
        Event::ProcessingFailed,
        Event::PlaybackComplete,
        Event::Recovered,
    ];

    #[test]
    fn test_initial_state() {
        assert_eq!(AgentState::default(), AgentState::Idle);
    }

    #[test]
    fn test_table_is_deterministic() {
        for (i, a) in TRANSITIONS.iter().enumerate() {
            for b in &TRANSITIONS[i + 1..] {
                assert!(
                    !(a.from == b.from && a.event == b.event),
                    "duplicate row for {} / {:?}",
                    a.from,
                    a.event
                );
            }
        }
    }

    #[test]
    fn test_every_pair_enumerated() {
        let mut defined = 0;
        for state in STATES {
            for event in EVENTS {
                if let Some(t) = next(state, event) {
                    assert_eq!(t.from, state);
                    assert_eq!(t.event, event);
                    defined += 1;
                }
            }
        }
        assert_eq!(defined, TRANSITIONS.len());
    }

    #[test]
    fn test_cycle() {
        let mut state = AgentState::Idle;
        for event in [
            Event::WakeDetected,
            Event::UtteranceReceived,
            Event::IntentResolved,
            Event::PlaybackComplete,
        ] {
            state = next(state, event).unwrap().to;
        }
        assert_eq!(state, AgentState::Idle);
    }

    #[test]
    fn test_timeout_returns_to_idle() {
        let t = next(AgentState::Listening, Event::ListenTimeout).unwrap();
        assert_eq!(t.to, AgentState::Idle);
        assert_eq!(t.effect, SideEffect::None);
    }

    #[test]
    fn test_failure_routes_through_error() {
        let t = next(AgentState::Processing, Event::ProcessingFailed).unwrap();
        assert_eq!(t.to, AgentState::Error);
        assert_eq!(t.effect, SideEffect::LogAndApologize);
        assert_eq!(next(AgentState::Error, Event::Recovered).unwrap().to, AgentState::Idle);
    }

    #[test]
    fn test_wake_resumes_capture() {
        let t = next(AgentState::Idle, Event::WakeDetected).unwrap();
        assert_eq!(t.effect, SideEffect::ResumeCapture);
    }

    #[test]
    fn test_undefined_pairs() {
        assert!(next(AgentState::Idle, Event::PlaybackComplete).is_none());
        assert!(next(AgentState::Responding, Event::WakeDetected).is_none());
    }
}
