//! Shared agent context, built once at startup and handed to each component

use std::sync::Arc;

use tokio::sync::broadcast;

use crate::config::Config;
use crate::events::AgentEvent;
use crate::lifecycle::Shutdown;
use crate::output::OutputSignal;

const EVENT_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone)]
pub struct AgentContext {
    pub config: Arc<Config>,
    /// Short id correlating all logs of one process run
    pub session_id: String,
    pub output_signal: OutputSignal,
    pub events: broadcast::Sender<AgentEvent>,
    pub shutdown: Shutdown,
}

impl AgentContext {
    pub fn new(config: Config) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let session_id = uuid::Uuid::new_v4().simple().to_string()[..8].to_string();

        Self {
            config: Arc::new(config),
            session_id,
            output_signal: OutputSignal::new(),
            events,
            shutdown: Shutdown::new(),
        }
    }

    /// Broadcast an event; having no subscribers is fine
    pub fn emit(&self, event: AgentEvent) {
        let _ = self.events.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AgentEvent> {
        self.events.subscribe()
    }
}
