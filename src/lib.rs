//! campus-kiosk: voice-driven campus information kiosk
//!
//! Listens for a wake phrase, classifies the request that follows, answers
//! it from campus records or the campus map, and speaks the answer. Capture
//! runs for the whole process; the controller owns one request at a time.

pub mod campus;
pub mod capture;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod events;
pub mod intent;
pub mod lifecycle;
pub mod output;
pub mod state;
