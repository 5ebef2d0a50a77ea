//! Serialized speech output

use tokio::sync::{broadcast, Mutex};
use tracing::{debug, warn};

use super::signal::{OutputGuard, OutputSignal};
use super::synth::{OutputError, Synthesizer};
use crate::events::AgentEvent;

/// Owns the synthesizer; at most one playback at a time.
///
/// The output signal is raised on entry to [`OutputGate::speak`] and lowered
/// when the call's scope ends, whether it returned or was dropped.
pub struct OutputGate {
    synth: Mutex<Box<dyn Synthesizer>>,
    signal: OutputSignal,
    events: broadcast::Sender<AgentEvent>,
}

/// Lowers the signal and reports the end of speech on drop
struct SpeakingScope<'a> {
    guard: Option<OutputGuard>,
    events: &'a broadcast::Sender<AgentEvent>,
    started: bool,
}

impl SpeakingScope<'_> {
    fn start(&mut self) {
        self.started = true;
        let _ = self.events.send(AgentEvent::SpeakingStarted);
    }
}

impl Drop for SpeakingScope<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        if self.started {
            let _ = self.events.send(AgentEvent::SpeakingStopped);
        }
    }
}

impl OutputGate {
    pub fn new(
        synth: Box<dyn Synthesizer>,
        signal: OutputSignal,
        events: broadcast::Sender<AgentEvent>,
    ) -> Self {
        Self {
            synth: Mutex::new(synth),
            signal,
            events,
        }
    }

    pub fn signal(&self) -> &OutputSignal {
        &self.signal
    }

    /// Speak `text`, waiting for any earlier call to finish first.
    ///
    /// Failures are returned for logging; the gate stays usable.
    pub async fn speak(&self, text: &str) -> Result<(), OutputError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(());
        }

        let mut scope = SpeakingScope {
            guard: Some(self.signal.enter()),
            events: &self.events,
            started: false,
        };

        let mut synth = self.synth.lock().await;
        debug!(synth = synth.name(), chars = text.len(), "speaking");
        scope.start();

        let result = synth.speak(text).await;
        if let Err(e) = &result {
            warn!(error = %e, "speech output failed");
        }
        result
    }
}
