//! Dispatch module: resolved intent in, spoken response out

mod dispatcher;
pub mod response;

pub use dispatcher::{DispatchError, Dispatcher};
pub use response::{Response, ResponseKind, ResponsePayload};
