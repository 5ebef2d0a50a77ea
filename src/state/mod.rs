//! Interaction state machine
//!
//! Five states, one cycle per visitor request:
//! - Idle: waiting for the wake phrase
//! - Listening: bounded wait for the request
//! - Processing: resolve and dispatch
//! - Responding: speak the answer
//! - Error: apologize, cool down, back to Idle

mod controller;
mod machine;

pub use controller::Controller;
pub use machine::{next, AgentState, Event, SideEffect, Transition, TRANSITIONS};
