//! Utterance sources
//!
//! Every variant produces the same [`Utterance`] shape; consumers cannot
//! tell a recognizer from a keyboard.

use std::io::BufRead;
use std::process::Stdio;
use std::thread;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tokio::process::{Child, ChildStdout, Command};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::queue::Utterance;

/// Errors from a capture source or the coordinator
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("capture is already running")]
    AlreadyRunning,

    #[error("failed to start recognizer `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("recognizer `{program}` exited")]
    Exited { program: String },

    #[error("capture read failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to spawn input thread: {0}")]
    ThreadSpawn(String),
}

/// Anything that produces recognized utterances
#[async_trait]
pub trait UtteranceSource: Send + Sync {
    fn name(&self) -> &str;

    /// Next utterance; `Ok(None)` once the source is finished for good
    async fn next_utterance(&mut self) -> Result<Option<Utterance>, CaptureError>;
}

/// Source fed through a channel
pub struct ChannelSource {
    name: String,
    rx: mpsc::Receiver<Result<Utterance, CaptureError>>,
}

impl ChannelSource {
    pub fn new(name: impl Into<String>, rx: mpsc::Receiver<Result<Utterance, CaptureError>>) -> Self {
        Self {
            name: name.into(),
            rx,
        }
    }
}

#[async_trait]
impl UtteranceSource for ChannelSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn next_utterance(&mut self) -> Result<Option<Utterance>, CaptureError> {
        match self.rx.recv().await {
            Some(item) => item.map(Some),
            None => Ok(None),
        }
    }
}

/// Typed text from stdin; the fallback when recognition is unavailable.
///
/// The reader thread starts on first use.
#[derive(Default)]
pub struct ConsoleSource {
    inner: Option<ChannelSource>,
}

impl ConsoleSource {
    pub fn new() -> Self {
        Self::default()
    }

    fn spawn_reader() -> Result<ChannelSource, CaptureError> {
        let (tx, rx) = mpsc::channel(16);

        thread::Builder::new()
            .name("console-input".to_string())
            .spawn(move || {
                info!("console input ready, type a request starting with the wake phrase");

                for line in std::io::stdin().lock().lines() {
                    let item = match line {
                        Ok(line) if line.trim().is_empty() => continue,
                        Ok(line) => Ok(Utterance::new(line.trim())),
                        Err(e) => Err(CaptureError::Io(e)),
                    };
                    let failed = item.is_err();
                    if tx.blocking_send(item).is_err() || failed {
                        break;
                    }
                }

                info!("console input thread stopped");
            })
            .map_err(|e| CaptureError::ThreadSpawn(e.to_string()))?;

        Ok(ChannelSource::new("console", rx))
    }
}

#[async_trait]
impl UtteranceSource for ConsoleSource {
    fn name(&self) -> &str {
        "console"
    }

    async fn next_utterance(&mut self) -> Result<Option<Utterance>, CaptureError> {
        if self.inner.is_none() {
            self.inner = Some(Self::spawn_reader()?);
        }
        match self.inner.as_mut() {
            Some(inner) => inner.next_utterance().await,
            None => Ok(None),
        }
    }
}

/// One line of recognizer output in JSON form
#[derive(Debug, Deserialize)]
struct RecognizerLine {
    #[serde(default)]
    text: String,
    #[serde(default)]
    confidence: Option<f32>,
}

/// Parse recognizer output: a JSON object with `text` (and optionally
/// `confidence`), or a plain line of text
fn parse_line(line: &str) -> Option<Utterance> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    if line.starts_with('{') {
        return match serde_json::from_str::<RecognizerLine>(line) {
            Ok(parsed) if !parsed.text.trim().is_empty() => {
                let utterance = Utterance::new(parsed.text.trim());
                Some(match parsed.confidence {
                    Some(c) => utterance.with_confidence(c),
                    None => utterance,
                })
            }
            Ok(_) => None,
            Err(e) => {
                debug!(error = %e, "ignoring malformed recognizer line");
                None
            }
        };
    }

    Some(Utterance::new(line))
}

/// External speech recognizer printing one result per line on stdout.
///
/// Started on first use and restarted on the next call after it exits.
pub struct CommandSource {
    program: String,
    args: Vec<String>,
    running: Option<(Child, Lines<BufReader<ChildStdout>>)>,
}

impl CommandSource {
    /// Parse a whitespace-separated command line; `None` if blank
    pub fn from_command_line(command: &str) -> Option<Self> {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self {
            program,
            args: parts.collect(),
            running: None,
        })
    }

    fn spawn(&self) -> Result<(Child, Lines<BufReader<ChildStdout>>), CaptureError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| CaptureError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let stdout = child.stdout.take().ok_or_else(|| CaptureError::Exited {
            program: self.program.clone(),
        })?;

        info!(program = %self.program, "recognizer started");
        Ok((child, BufReader::new(stdout).lines()))
    }
}

#[async_trait]
impl UtteranceSource for CommandSource {
    fn name(&self) -> &str {
        &self.program
    }

    async fn next_utterance(&mut self) -> Result<Option<Utterance>, CaptureError> {
        loop {
            if self.running.is_none() {
                self.running = Some(self.spawn()?);
            }
            let Some((_, lines)) = self.running.as_mut() else {
                return Ok(None);
            };

            match lines.next_line().await {
                Ok(Some(line)) => {
                    if let Some(utterance) = parse_line(&line) {
                        return Ok(Some(utterance));
                    }
                }
                Ok(None) => {
                    self.running = None;
                    warn!(program = %self.program, "recognizer exited");
                    return Err(CaptureError::Exited {
                        program: self.program.clone(),
                    });
                }
                Err(e) => {
                    self.running = None;
                    return Err(CaptureError::Io(e));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_and_json_lines() {
        assert_eq!(parse_line("  where is the library ").unwrap().text, "where is the library");

        let u = parse_line(r#"{"text": "hey robot", "confidence": 0.42}"#).unwrap();
        assert_eq!(u.text, "hey robot");
        assert_eq!(u.confidence, Some(0.42));

        assert!(parse_line(r#"{"partial": "hey"}"#).is_none());
        assert!(parse_line("{not json").is_none());
        assert!(parse_line("   ").is_none());
    }

    #[tokio::test]
    async fn test_channel_source() {
        let (tx, rx) = mpsc::channel(4);
        let mut source = ChannelSource::new("scripted", rx);

        tx.send(Ok(Utterance::new("hello"))).await.unwrap();
        tx.send(Err(CaptureError::ThreadSpawn("boom".into()))).await.unwrap();
        drop(tx);

        assert_eq!(source.next_utterance().await.unwrap().unwrap().text, "hello");
        assert!(source.next_utterance().await.is_err());
        assert!(source.next_utterance().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_command_source_reads_lines_then_reports_exit() {
        let mut source = CommandSource::from_command_line(
            r#"printf {"text":"hey_robot","confidence":0.9}\nhello\n"#,
        )
        .unwrap();

        let first = source.next_utterance().await.unwrap().unwrap();
        assert_eq!(first.text, "hey_robot");
        assert_eq!(first.confidence, Some(0.9));
        assert_eq!(source.next_utterance().await.unwrap().unwrap().text, "hello");
        assert!(matches!(
            source.next_utterance().await,
            Err(CaptureError::Exited { .. })
        ));
    }

    #[tokio::test]
    async fn test_missing_recognizer_is_spawn_error() {
        let mut source = CommandSource::from_command_line("no-such-recognizer-xyz").unwrap();
        assert!(matches!(
            source.next_utterance().await,
            Err(CaptureError::Spawn { .. })
        ));
    }
}
