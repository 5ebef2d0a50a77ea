//! Process lifecycle: shutdown and host detection

mod platform;
mod shutdown;

pub use platform::Platform;
pub use shutdown::{wait_for_signal, Shutdown};
