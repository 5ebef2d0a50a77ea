//! Shutdown coordination and signal handling

use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Process-wide stop request.
///
/// Cloneable and thread-safe: any holder, on any thread, may call
/// [`Shutdown::trigger`] any number of times; every waiter wakes once.
#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    token: CancellationToken,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request shutdown; later calls are no-ops
    pub fn trigger(&self) {
        if !self.token.is_cancelled() {
            info!("shutdown requested");
        }
        self.token.cancel();
    }

    pub fn is_triggered(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once shutdown has been triggered
    pub async fn wait(&self) {
        self.token.cancelled().await;
    }

    /// A token cancelled by this shutdown, or earlier on its own
    pub fn child_token(&self) -> CancellationToken {
        self.token.child_token()
    }
}

/// Wait for SIGTERM or SIGINT
pub async fn wait_for_signal() -> std::io::Result<()> {
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    tokio::select! {
        _ = sigterm.recv() => {
            debug!("received SIGTERM");
        }
        _ = sigint.recv() => {
            debug!("received SIGINT");
        }
    }

    Ok(())
}
