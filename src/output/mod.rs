//! Output module: speech synthesis behind a single gate
//!
//! - [`OutputSignal`]: process-wide "the agent is talking" flag
//! - [`OutputGate`]: serializes `speak` calls and scopes the signal
//! - [`Synthesizer`]: external command, macOS `say`, or console

mod gate;
mod signal;
mod synth;

pub use gate::OutputGate;
pub use signal::{OutputGuard, OutputSignal};
pub use synth::{
    select_synthesizer, CommandSynthesizer, ConsoleSynthesizer, OutputError, Synthesizer,
};

#[cfg(test)]
pub(crate) use synth::testing;
