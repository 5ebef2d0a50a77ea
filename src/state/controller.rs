//! Top-level orchestration: one wake -> listen -> process -> respond cycle
//! after another until shutdown.
//!
//! The controller is the only writer of [`AgentState`]. Every jump goes
//! through [`machine::next`]; a step that is interrupted by shutdown
//! produces no event and the loop exits.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use super::machine::{self, AgentState, Event, SideEffect};
use crate::capture::{CaptureCoordinator, Utterance, WakeMatcher};
use crate::context::AgentContext;
use crate::dispatch::{response, Dispatcher, Response};
use crate::events::AgentEvent;
use crate::intent::IntentResolver;
use crate::lifecycle::Shutdown;
use crate::output::OutputGate;

/// Upper bound on the shutdown farewell
const FAREWELL_TIMEOUT: Duration = Duration::from_secs(5);

pub struct Controller {
    ctx: AgentContext,
    state: AgentState,
    capture: CaptureCoordinator,
    output: Arc<OutputGate>,
    resolver: IntentResolver,
    dispatcher: Dispatcher,
    wake: WakeMatcher,

    /// Request spoken in the same breath as the wake phrase
    follow_up: Option<Utterance>,
    request: Option<Utterance>,
    response: Option<Response>,
}

impl Controller {
    pub fn new(
        ctx: &AgentContext,
        capture: CaptureCoordinator,
        output: Arc<OutputGate>,
        resolver: IntentResolver,
        dispatcher: Dispatcher,
    ) -> Self {
        let config = &ctx.config;
        let wake = WakeMatcher::new(&config.wake_phrase, &config.wake_variants, config.wake_threshold);

        Self {
            ctx: ctx.clone(),
            state: AgentState::default(),
            capture,
            output,
            resolver,
            dispatcher,
            wake,
            follow_up: None,
            request: None,
            response: None,
        }
    }

    pub fn state(&self) -> AgentState {
        self.state
    }

    /// Handle that stops [`Controller::run`] from any thread
    pub fn shutdown_handle(&self) -> Shutdown {
        self.ctx.shutdown.clone()
    }

    /// Run until shutdown, then release capture and output once
    pub async fn run(mut self) {
        if let Err(e) = self.capture.start() {
            error!(error = %e, "failed to start capture");
        }
        if self.ctx.config.announce {
            self.say(response::BOOT_GREETING).await;
        }
        info!(state = %self.state, "controller running");

        while !self.ctx.shutdown.is_triggered() {
            let Some(event) = self.step().await else {
                break;
            };
            self.apply(event);
        }

        self.release().await;
    }

    /// Do the work of the current state and report what happened
    async fn step(&mut self) -> Option<Event> {
        match self.state {
            AgentState::Idle => self.await_wake().await,
            AgentState::Listening => self.listen().await,
            AgentState::Processing => self.process().await,
            AgentState::Responding => self.respond().await,
            AgentState::Error => self.recover().await,
        }
    }

    fn apply(&mut self, event: Event) {
        let Some(transition) = machine::next(self.state, event) else {
            warn!(state = %self.state, ?event, "no transition for event");
            return;
        };

        info!(from = %transition.from, to = %transition.to, ?event, "state transition");
        self.state = transition.to;
        self.ctx.emit(AgentEvent::StateChanged {
            from: transition.from,
            to: transition.to,
        });

        match transition.effect {
            SideEffect::None => {}
            SideEffect::ResumeCapture => self.capture.resume(),
            SideEffect::LogAndApologize => {
                warn!("turn failed, apologizing");
                self.response = Some(Response::apology(response::ERROR_APOLOGY));
            }
        }
    }

    async fn await_wake(&mut self) -> Option<Event> {
        loop {
            let utterance = tokio::select! {
                _ = self.ctx.shutdown.wait() => return None,
                utterance = self.capture.next() => utterance,
            };

            let Some(wake) = self.wake.detect(&utterance.text) else {
                debug!(text = %utterance.text, "ignoring speech while idle");
                continue;
            };

            info!(score = wake.score, "wake phrase detected");
            self.ctx.emit(AgentEvent::WakeDetected {
                score: wake.score,
                follow_up: wake.follow_up.is_some(),
            });
            self.follow_up = wake.follow_up.map(|text| Utterance {
                text,
                ..utterance
            });
            return Some(Event::WakeDetected);
        }
    }

    async fn listen(&mut self) -> Option<Event> {
        if let Some(utterance) = self.follow_up.take() {
            self.request = Some(utterance);
            return Some(Event::UtteranceReceived);
        }

        if !self.say(response::WAKE_ACK).await {
            return None;
        }

        let timeout = self.ctx.config.listen_timeout;
        tokio::select! {
            _ = self.ctx.shutdown.wait() => None,
            utterance = self.capture.next_timeout(timeout) => match utterance {
                Some(utterance) => {
                    self.request = Some(utterance);
                    Some(Event::UtteranceReceived)
                }
                None => {
                    info!(?timeout, "no request heard");
                    Some(Event::ListenTimeout)
                }
            },
        }
    }

    async fn process(&mut self) -> Option<Event> {
        let Some(request) = self.request.take() else {
            error!("processing without a request");
            return Some(Event::ProcessingFailed);
        };

        let intent = self.resolver.resolve(&request.text);
        info!(
            intent = %intent.intent,
            entities = intent.entities.len(),
            missing = intent.missing.len(),
            "intent resolved"
        );

        // Directory and route lookups may block; keep them off this task
        let dispatcher = self.dispatcher.clone();
        let lookup = tokio::task::spawn_blocking(move || dispatcher.dispatch(&intent));

        let outcome = tokio::select! {
            _ = self.ctx.shutdown.wait() => return None,
            outcome = lookup => outcome,
        };

        match outcome {
            Ok(Ok(response)) => {
                debug!(kind = ?response.kind, "response ready");
                self.response = Some(response);
                Some(Event::IntentResolved)
            }
            Ok(Err(e)) => {
                error!(error = %e, text = %request.text, "dispatch failed");
                Some(Event::ProcessingFailed)
            }
            Err(e) => {
                error!(error = %e, text = %request.text, "dispatch task failed");
                Some(Event::ProcessingFailed)
            }
        }
    }

    async fn respond(&mut self) -> Option<Event> {
        let Some(response) = self.response.take() else {
            warn!("responding without a response");
            return Some(Event::PlaybackComplete);
        };

        self.capture.pause();
        let finished = self.say(&response.text).await;
        self.capture.resume();

        finished.then_some(Event::PlaybackComplete)
    }

    async fn recover(&mut self) -> Option<Event> {
        let apology = self
            .response
            .take()
            .unwrap_or_else(|| Response::apology(response::ERROR_APOLOGY));
        if !self.say(&apology.text).await {
            return None;
        }

        tokio::select! {
            _ = self.ctx.shutdown.wait() => None,
            _ = tokio::time::sleep(self.ctx.config.error_cooldown) => Some(Event::Recovered),
        }
    }

    /// Speak through the gate; `false` if shutdown cut it short.
    ///
    /// Output failures count as finished.
    async fn say(&self, text: &str) -> bool {
        tokio::select! {
            _ = self.ctx.shutdown.wait() => false,
            result = self.output.speak(text) => {
                if result.is_err() {
                    debug!("continuing after output failure");
                }
                true
            }
        }
    }

    async fn release(&mut self) {
        info!(state = %self.state, "controller stopping");
        self.capture.stop().await;

        if self.ctx.config.announce {
            match tokio::time::timeout(FAREWELL_TIMEOUT, self.output.speak(response::SHUTDOWN_FAREWELL)).await {
                Ok(_) => {}
                Err(_) => warn!("farewell timed out"),
            }
        }

        info!("controller stopped");
    }
}
