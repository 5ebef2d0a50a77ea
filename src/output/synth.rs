//! Speech synthesizer variants

use std::process::{ExitStatus, Stdio};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::lifecycle::Platform;

#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("failed to start synthesizer `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("synthesizer `{program}` exited with {status}")]
    Exit { program: String, status: ExitStatus },

    #[error("console output failed: {0}")]
    Console(#[from] std::io::Error),
}

/// Something that turns text into audible (or visible) speech.
///
/// `speak` returns when playback has finished. Dropping the future must stop
/// playback.
#[async_trait]
pub trait Synthesizer: Send {
    fn name(&self) -> &str;

    async fn speak(&mut self, text: &str) -> Result<(), OutputError>;
}

/// Runs an external program once per utterance, text as the last argument
#[derive(Debug, Clone)]
pub struct CommandSynthesizer {
    program: String,
    args: Vec<String>,
}

impl CommandSynthesizer {
    /// Parse a whitespace-separated command line; `None` if blank
    pub fn from_command_line(command: &str) -> Option<Self> {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self {
            program,
            args: parts.collect(),
        })
    }

    /// The macOS `say` command
    pub fn say() -> Self {
        Self {
            program: "say".to_string(),
            args: vec!["-r".to_string(), "180".to_string()],
        }
    }
}

#[async_trait]
impl Synthesizer for CommandSynthesizer {
    fn name(&self) -> &str {
        &self.program
    }

    async fn speak(&mut self, text: &str) -> Result<(), OutputError> {
        let status = Command::new(&self.program)
            .args(&self.args)
            .arg(text)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .kill_on_drop(true)
            .status()
            .await
            .map_err(|source| OutputError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !status.success() {
            return Err(OutputError::Exit {
                program: self.program.clone(),
                status,
            });
        }
        Ok(())
    }
}

/// Prints responses to stdout, for headless hosts and development
#[derive(Debug, Default)]
pub struct ConsoleSynthesizer;

#[async_trait]
impl Synthesizer for ConsoleSynthesizer {
    fn name(&self) -> &str {
        "console"
    }

    async fn speak(&mut self, text: &str) -> Result<(), OutputError> {
        let mut stdout = tokio::io::stdout();
        stdout.write_all(format!("[kiosk] {text}\n").as_bytes()).await?;
        stdout.flush().await?;
        Ok(())
    }
}

/// Pick the synthesizer once at startup.
///
/// A configured command wins; macOS falls back to `say`; everything else
/// prints to the console.
pub fn select_synthesizer(platform: Platform, command: Option<&str>) -> Box<dyn Synthesizer> {
    if let Some(synth) = command.and_then(CommandSynthesizer::from_command_line) {
        info!(program = %synth.program, "using configured synthesizer");
        return Box::new(synth);
    }

    match platform {
        Platform::MacOs => {
            info!("using macOS say");
            Box::new(CommandSynthesizer::say())
        }
        Platform::RaspberryPi => {
            warn!("no synthesizer command configured, speaking to console");
            Box::new(ConsoleSynthesizer)
        }
        Platform::Other => {
            debug!("speaking to console");
            Box::new(ConsoleSynthesizer)
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use super::*;
    use crate::output::OutputSignal;

    /// What the double saw during one `speak`
    #[derive(Debug, Clone, PartialEq)]
    pub struct Spoken {
        pub text: String,
        pub signal_active: bool,
    }

    /// Records every call; optionally slow, failing, or hanging on one text
    #[derive(Clone)]
    pub struct RecordingSynth {
        pub spoken: Arc<Mutex<Vec<Spoken>>>,
        pub in_flight: Arc<std::sync::atomic::AtomicUsize>,
        pub max_in_flight: Arc<std::sync::atomic::AtomicUsize>,
        signal: OutputSignal,
        delay: Duration,
        fail: bool,
        hang_on: Option<String>,
    }

    impl RecordingSynth {
        pub fn new(signal: OutputSignal) -> Self {
            Self {
                spoken: Arc::default(),
                in_flight: Arc::default(),
                max_in_flight: Arc::default(),
                signal,
                delay: Duration::ZERO,
                fail: false,
                hang_on: None,
            }
        }

        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        pub fn failing(mut self) -> Self {
            self.fail = true;
            self
        }

        /// Never finish speaking texts that contain `needle`
        pub fn hanging_on(mut self, needle: &str) -> Self {
            self.hang_on = Some(needle.to_string());
            self
        }

        pub fn texts(&self) -> Vec<String> {
            self.spoken
                .lock()
                .unwrap()
                .iter()
                .map(|s| s.text.clone())
                .collect()
        }
    }

    #[async_trait]
    impl Synthesizer for RecordingSynth {
        fn name(&self) -> &str {
            "recording"
        }

        async fn speak(&mut self, text: &str) -> Result<(), OutputError> {
            use std::sync::atomic::Ordering;

            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            self.spoken.lock().unwrap().push(Spoken {
                text: text.to_string(),
                signal_active: self.signal.is_active(),
            });

            let in_flight = Arc::clone(&self.in_flight);
            let _done = on_drop(move || {
                in_flight.fetch_sub(1, Ordering::SeqCst);
            });

            if matches!(&self.hang_on, Some(needle) if text.contains(needle.as_str())) {
                std::future::pending::<()>().await;
            }
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if self.fail {
                return Err(OutputError::Console(std::io::Error::other("speaker unplugged")));
            }
            Ok(())
        }
    }

    struct Deferred<F: FnMut()>(F);

    impl<F: FnMut()> Drop for Deferred<F> {
        fn drop(&mut self) {
            (self.0)()
        }
    }

    fn on_drop<F: FnMut()>(f: F) -> Deferred<F> {
        Deferred(f)
    }
}
