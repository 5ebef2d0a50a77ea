//! Capture module: recognized speech in, queued utterances out
//!
//! - [`CaptureCoordinator`]: always-on loop with echo suppression
//! - [`UtteranceSource`]: recognizer command, console, or channel
//! - [`WakeMatcher`]: finds the wake phrase in recognized text

mod confidence_log;
mod coordinator;
mod queue;
mod source;
mod wake;

pub use confidence_log::LowConfidenceLog;
pub use coordinator::{CaptureCoordinator, Suppression};
pub use queue::{Offer, Utterance, UtteranceQueue};
pub use source::{CaptureError, ChannelSource, CommandSource, ConsoleSource, UtteranceSource};
pub use wake::{WakeMatch, WakeMatcher};
