//! JSON-lines log of low-confidence recognitions, for vocabulary tuning

use std::path::{Path, PathBuf};

use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use super::queue::Utterance;

#[derive(Debug, Clone)]
pub struct LowConfidenceLog {
    path: PathBuf,
    threshold: f32,
}

#[derive(Serialize)]
struct Entry<'a> {
    session: &'a str,
    #[serde(flatten)]
    utterance: &'a Utterance,
}

impl LowConfidenceLog {
    pub fn new(path: impl Into<PathBuf>, threshold: f32) -> Self {
        Self {
            path: path.into(),
            threshold,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_low(&self, utterance: &Utterance) -> bool {
        matches!(utterance.confidence, Some(c) if c < self.threshold)
    }

    /// Append `utterance` if its confidence is below the threshold.
    ///
    /// Write failures are logged and otherwise ignored.
    pub async fn record(&self, session: &str, utterance: &Utterance) {
        if !self.is_low(utterance) {
            return;
        }
        if let Err(e) = self.append(session, utterance).await {
            debug!(error = %e, path = %self.path.display(), "failed to write low-confidence log");
        }
    }

    async fn append(&self, session: &str, utterance: &Utterance) -> std::io::Result<()> {
        let mut line = serde_json::to_string(&Entry { session, utterance })?;
        line.push('\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await
    }
}
