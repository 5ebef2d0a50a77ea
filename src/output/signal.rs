//! The output-active signal
//!
//! True exactly while at least one [`OutputGuard`] is alive. Capture reads it
//! at enqueue time to drop the agent's own voice.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

#[derive(Debug)]
struct Inner {
    in_flight: AtomicUsize,
    /// Milliseconds after `epoch` at which the signal last cleared, plus one;
    /// zero means never
    cleared_at: AtomicU64,
    epoch: Instant,
}

/// Shared handle to the output-active signal
#[derive(Debug, Clone)]
pub struct OutputSignal {
    inner: Arc<Inner>,
}

impl Default for OutputSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputSignal {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                in_flight: AtomicUsize::new(0),
                cleared_at: AtomicU64::new(0),
                epoch: Instant::now(),
            }),
        }
    }

    /// Raise the signal until the returned guard drops
    pub fn enter(&self) -> OutputGuard {
        self.inner.in_flight.fetch_add(1, Ordering::SeqCst);
        OutputGuard {
            inner: Arc::clone(&self.inner),
        }
    }

    pub fn is_active(&self) -> bool {
        self.inner.in_flight.load(Ordering::SeqCst) > 0
    }

    /// Time since the signal last cleared; `None` while active or if it was
    /// never raised
    pub fn quiet_for(&self) -> Option<Duration> {
        if self.is_active() {
            return None;
        }
        match self.inner.cleared_at.load(Ordering::SeqCst) {
            0 => None,
            stamp => {
                let cleared = Duration::from_millis(stamp - 1);
                Some(self.inner.epoch.elapsed().saturating_sub(cleared))
            }
        }
    }

    /// Active, or cleared less than `window` ago
    pub fn within(&self, window: Duration) -> bool {
        if self.is_active() {
            return true;
        }
        matches!(self.quiet_for(), Some(quiet) if quiet < window)
    }
}

/// Scope of one raised signal
#[derive(Debug)]
pub struct OutputGuard {
    inner: Arc<Inner>,
}

impl Drop for OutputGuard {
    fn drop(&mut self) {
        // Stamp before lowering so a reader never sees "inactive, never used"
        let stamp = self.inner.epoch.elapsed().as_millis() as u64 + 1;
        self.inner.cleared_at.store(stamp, Ordering::SeqCst);
        self.inner.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_scope() {
        let signal = OutputSignal::new();
        assert!(!signal.is_active());
        assert_eq!(signal.quiet_for(), None);

        let outer = signal.enter();
        let inner = signal.enter();
        assert!(signal.is_active());
        drop(inner);
        assert!(signal.is_active());
        drop(outer);
        assert!(!signal.is_active());
        assert!(signal.quiet_for().is_some());
    }

    #[test]
    fn test_clears_on_panic_unwind() {
        let signal = OutputSignal::new();
        let handle = signal.clone();
        let result = std::panic::catch_unwind(move || {
            let _guard = handle.enter();
            panic!("synth blew up");
        });
        assert!(result.is_err());
        assert!(!signal.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drain_window() {
        let signal = OutputSignal::new();
        assert!(!signal.within(Duration::from_millis(300)));

        drop(signal.enter());
        assert!(signal.within(Duration::from_millis(300)));

        tokio::time::advance(Duration::from_millis(301)).await;
        assert!(!signal.within(Duration::from_millis(300)));
        assert!(!signal.within(Duration::ZERO));
    }
}
