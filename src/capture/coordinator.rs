//! Always-on capture loop feeding the utterance queue
//!
//! The loop runs as its own task from boot until shutdown. Every recognized
//! utterance goes through one admission check, made under the queue lock:
//! nothing produced while the agent is talking (or just finished talking),
//! or while capture is paused, is queued.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::confidence_log::LowConfidenceLog;
use super::queue::{Offer, Utterance, UtteranceQueue};
use super::source::{CaptureError, UtteranceSource};
use crate::context::AgentContext;
use crate::events::AgentEvent;
use crate::output::OutputSignal;

const STOP_TIMEOUT: Duration = Duration::from_secs(2);

/// Why an utterance was not queued
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Suppression {
    OutputActive,
    PostOutputDrain,
    Paused,
}

impl std::fmt::Display for Suppression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Suppression::OutputActive => write!(f, "output_active"),
            Suppression::PostOutputDrain => write!(f, "post_output_drain"),
            Suppression::Paused => write!(f, "paused"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct RetryPolicy {
    max_retries: u32,
    interval: Duration,
}

/// State shared between the coordinator handle and its loop
struct Shared {
    queue: UtteranceQueue,
    paused: AtomicBool,
    signal: OutputSignal,
    drain: Duration,
    events: broadcast::Sender<AgentEvent>,
}

impl Shared {
    fn admit(&self) -> Result<(), Suppression> {
        if self.signal.is_active() {
            Err(Suppression::OutputActive)
        } else if self.paused.load(Ordering::SeqCst) {
            Err(Suppression::Paused)
        } else if self.signal.within(self.drain) {
            Err(Suppression::PostOutputDrain)
        } else {
            Ok(())
        }
    }

    fn offer(&self, utterance: Utterance) -> Offer<Suppression> {
        let offer = self.queue.offer(utterance, || self.admit());
        match &offer {
            Offer::Queued => debug!("utterance queued"),
            Offer::Evicted(old) => warn!(dropped = %old.text, "utterance queue full, dropped oldest"),
            Offer::Refused(reason) => {
                debug!(%reason, "utterance suppressed");
                let _ = self.events.send(AgentEvent::UtteranceDropped {
                    reason: reason.to_string(),
                });
            }
        }
        offer
    }
}

/// Handle to the capture loop and the queue it feeds
pub struct CaptureCoordinator {
    shared: Arc<Shared>,
    primary: Option<Box<dyn UtteranceSource>>,
    fallback: Option<Box<dyn UtteranceSource>>,
    retry: RetryPolicy,
    confidence_log: LowConfidenceLog,
    session_id: String,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl CaptureCoordinator {
    /// `fallback` takes over for the rest of the process once `primary`
    /// exhausts its retries
    pub fn new(
        ctx: &AgentContext,
        primary: Box<dyn UtteranceSource>,
        fallback: Option<Box<dyn UtteranceSource>>,
    ) -> Self {
        let config = &ctx.config;
        Self {
            shared: Arc::new(Shared {
                queue: UtteranceQueue::new(config.queue_capacity),
                paused: AtomicBool::new(false),
                signal: ctx.output_signal.clone(),
                drain: config.post_output_drain,
                events: ctx.events.clone(),
            }),
            primary: Some(primary),
            fallback,
            retry: RetryPolicy {
                max_retries: config.capture_max_retries,
                interval: config.capture_retry_interval,
            },
            confidence_log: LowConfidenceLog::new(config.low_confidence_log(), config.low_confidence),
            session_id: ctx.session_id.clone(),
            cancel: ctx.shutdown.child_token(),
            task: None,
        }
    }

    /// Spawn the capture loop; it runs until [`CaptureCoordinator::stop`]
    /// or process shutdown
    pub fn start(&mut self) -> Result<(), CaptureError> {
        let Some(primary) = self.primary.take() else {
            return Err(CaptureError::AlreadyRunning);
        };

        info!(source = primary.name(), "capture starting");
        let _ = self.shared.events.send(AgentEvent::CaptureStarted {
            source: primary.name().to_string(),
        });

        self.task = Some(tokio::spawn(capture_loop(
            primary,
            self.fallback.take(),
            Arc::clone(&self.shared),
            self.retry,
            self.confidence_log.clone(),
            self.session_id.clone(),
            self.cancel.clone(),
        )));
        Ok(())
    }

    /// Stop the loop and wait briefly for it; safe to call repeatedly
    pub async fn stop(&mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if tokio::time::timeout(STOP_TIMEOUT, task).await.is_err() {
                warn!("capture loop did not stop in time");
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Drop everything captured from now on; idempotent
    pub fn pause(&self) {
        if !self.shared.paused.swap(true, Ordering::SeqCst) {
            debug!("capture paused");
        }
    }

    /// Queue captured utterances again; idempotent
    pub fn resume(&self) {
        if self.shared.paused.swap(false, Ordering::SeqCst) {
            debug!("capture resumed");
        }
    }

    pub fn is_paused(&self) -> bool {
        self.shared.paused.load(Ordering::SeqCst)
    }

    /// Producer entry point: admit `utterance` into the queue or drop it
    pub fn offer(&self, utterance: Utterance) -> Offer<Suppression> {
        self.shared.offer(utterance)
    }

    /// Wait for the next queued utterance
    pub async fn next(&self) -> Utterance {
        self.shared.queue.pop().await
    }

    /// Wait up to `timeout` for the next queued utterance
    pub async fn next_timeout(&self, timeout: Duration) -> Option<Utterance> {
        self.shared.queue.pop_timeout(timeout).await
    }

    /// Discard anything queued; returns how many were discarded
    pub fn clear(&self) -> usize {
        self.shared.queue.clear()
    }
}

async fn capture_loop(
    mut source: Box<dyn UtteranceSource>,
    mut fallback: Option<Box<dyn UtteranceSource>>,
    shared: Arc<Shared>,
    retry: RetryPolicy,
    confidence_log: LowConfidenceLog,
    session_id: String,
    cancel: CancellationToken,
) {
    let mut failures: u32 = 0;

    loop {
        let next = tokio::select! {
            _ = cancel.cancelled() => break,
            next = source.next_utterance() => next,
        };

        match next {
            Ok(Some(utterance)) => {
                failures = 0;
                debug!(text = %utterance.text, confidence = ?utterance.confidence, "recognized");
                confidence_log.record(&session_id, &utterance).await;
                shared.offer(utterance);
            }
            Ok(None) => {
                info!(source = source.name(), "capture source finished");
                break;
            }
            Err(e) => {
                failures += 1;
                warn!(source = source.name(), error = %e, failures, "capture fault");

                if failures > retry.max_retries {
                    let Some(next_source) = fallback.take() else {
                        error!(source = source.name(), "capture failed with no fallback left");
                        break;
                    };
                    warn!(from = source.name(), to = next_source.name(), "switching capture source");
                    let _ = shared.events.send(AgentEvent::CaptureSourceChanged {
                        from: source.name().to_string(),
                        to: next_source.name().to_string(),
                    });
                    source = next_source;
                    failures = 0;
                    continue;
                }

                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(retry.interval) => {}
                }
            }
        }
    }

    let _ = shared.events.send(AgentEvent::CaptureStopped);
    info!("capture loop stopped");
}
