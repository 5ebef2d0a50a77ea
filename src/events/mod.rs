//! Agent notifications
//!
//! Everything observable about a running agent is broadcast as an
//! [`AgentEvent`]. Sends never block; a receiver that falls behind just
//! misses events.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::lifecycle::Shutdown;
use crate::state::AgentState;

/// Events emitted by the controller and its components
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    /// The controller took a transition
    StateChanged { from: AgentState, to: AgentState },

    /// Wake phrase heard
    WakeDetected {
        /// Wake-phrase similarity, `[0, 100]`
        score: u8,
        /// The request followed the wake phrase in the same utterance
        follow_up: bool,
    },

    /// Synthesis started; the output signal is up
    SpeakingStarted,

    /// Synthesis finished, failed, or was cancelled
    SpeakingStopped,

    /// Capture loop running with the named source
    CaptureStarted { source: String },

    /// Capture swapped sources after repeated faults
    CaptureSourceChanged { from: String, to: String },

    /// Capture loop exited
    CaptureStopped,

    /// A recognized utterance was not queued
    UtteranceDropped { reason: String },
}

impl std::fmt::Display for AgentEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AgentEvent::StateChanged { from, to } => write!(f, "STATE_CHANGED ({from} -> {to})"),
            AgentEvent::WakeDetected { score, .. } => write!(f, "WAKE_DETECTED ({score})"),
            AgentEvent::SpeakingStarted => write!(f, "SPEAKING_STARTED"),
            AgentEvent::SpeakingStopped => write!(f, "SPEAKING_STOPPED"),
            AgentEvent::CaptureStarted { source } => write!(f, "CAPTURE_STARTED ({source})"),
            AgentEvent::CaptureSourceChanged { from, to } => {
                write!(f, "CAPTURE_SOURCE_CHANGED ({from} -> {to})")
            }
            AgentEvent::CaptureStopped => write!(f, "CAPTURE_STOPPED"),
            AgentEvent::UtteranceDropped { reason } => write!(f, "UTTERANCE_DROPPED ({reason})"),
        }
    }
}

/// Face shown by a display collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expression {
    Idle,
    Listening,
    Thinking,
    Speaking,
    Error,
}

impl From<AgentState> for Expression {
    fn from(state: AgentState) -> Self {
        match state {
            AgentState::Idle => Expression::Idle,
            AgentState::Listening => Expression::Listening,
            AgentState::Processing => Expression::Thinking,
            AgentState::Responding => Expression::Speaking,
            AgentState::Error => Expression::Error,
        }
    }
}

impl std::fmt::Display for Expression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Expression::Idle => "idle",
            Expression::Listening => "listening",
            Expression::Thinking => "thinking",
            Expression::Speaking => "speaking",
            Expression::Error => "error",
        };
        f.write_str(name)
    }
}

/// A display collaborator; gets every expression change, returns nothing
pub trait ExpressionRenderer: Send {
    fn render(&mut self, expression: Expression);
}

/// Renderer for kiosks without a screen
#[derive(Debug, Default)]
pub struct HeadlessRenderer {
    current: Option<Expression>,
}

impl HeadlessRenderer {
    pub fn current(&self) -> Option<Expression> {
        self.current
    }
}

impl ExpressionRenderer for HeadlessRenderer {
    fn render(&mut self, expression: Expression) {
        if self.current != Some(expression) {
            info!(%expression, "expression");
            self.current = Some(expression);
        }
    }
}

/// Expression implied by an event, given the last known state
fn expression_for(event: &AgentEvent, state: AgentState) -> Option<Expression> {
    match event {
        AgentEvent::StateChanged { to, .. } => Some(Expression::from(*to)),
        AgentEvent::SpeakingStarted => Some(Expression::Speaking),
        AgentEvent::SpeakingStopped => Some(Expression::from(state)),
        _ => None,
    }
}

/// Feed events to a renderer until shutdown or the channel closes
pub async fn drive_renderer<R: ExpressionRenderer>(
    mut renderer: R,
    mut rx: broadcast::Receiver<AgentEvent>,
    shutdown: Shutdown,
) -> R {
    let mut state = AgentState::Idle;
    renderer.render(Expression::Idle);

    loop {
        let event = tokio::select! {
            _ = shutdown.wait() => break,
            event = rx.recv() => event,
        };

        match event {
            Ok(event) => {
                debug!(%event, "agent event");
                if let AgentEvent::StateChanged { to, .. } = event {
                    state = to;
                }
                if let Some(expression) = expression_for(&event, state) {
                    renderer.render(expression);
                }
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!(skipped = n, "event receiver lagged");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }

    renderer
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder(Vec<Expression>);

    impl ExpressionRenderer for Recorder {
        fn render(&mut self, expression: Expression) {
            self.0.push(expression);
        }
    }

    #[test]
    fn test_event_serialization() {
        let event = AgentEvent::StateChanged {
            from: AgentState::Idle,
            to: AgentState::Listening,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("state_changed"));
        assert!(json.contains("listening"));
    }

    #[test]
    fn test_event_deserialization() {
        let json = r#"{"type":"speaking_started"}"#;
        let event: AgentEvent = serde_json::from_str(json).unwrap();
        assert!(matches!(event, AgentEvent::SpeakingStarted));
    }

    #[test]
    fn test_expression_mapping() {
        assert_eq!(Expression::from(AgentState::Processing), Expression::Thinking);
        assert_eq!(Expression::from(AgentState::Responding), Expression::Speaking);
        assert_eq!(
            expression_for(&AgentEvent::SpeakingStopped, AgentState::Listening),
            Some(Expression::Listening)
        );
        assert_eq!(expression_for(&AgentEvent::CaptureStopped, AgentState::Idle), None);
    }

    #[tokio::test]
    async fn test_renderer_follows_events() {
        let (tx, rx) = broadcast::channel(16);
        let shutdown = Shutdown::new();

        tx.send(AgentEvent::StateChanged {
            from: AgentState::Idle,
            to: AgentState::Listening,
        })
        .unwrap();
        tx.send(AgentEvent::SpeakingStarted).unwrap();
        tx.send(AgentEvent::SpeakingStopped).unwrap();
        drop(tx);

        let recorder = drive_renderer(Recorder::default(), rx, shutdown).await;
        assert_eq!(
            recorder.0,
            [
                Expression::Idle,
                Expression::Listening,
                Expression::Speaking,
                Expression::Listening
            ]
        );
    }

    #[test]
    fn test_headless_renderer_dedupes() {
        let mut renderer = HeadlessRenderer::default();
        renderer.render(Expression::Idle);
        renderer.render(Expression::Idle);
        assert_eq!(renderer.current(), Some(Expression::Idle));
    }
}
