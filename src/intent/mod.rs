//! Intent module: classification and entity extraction
//!
//! Turns recognized text into a structured request:
//! - Ordered regex patterns pick the intent (first match wins)
//! - Captured slot values are fuzzy-matched against campus vocabularies
//! - Matches below the acceptance threshold are kept but marked unaccepted

pub mod fuzzy;
mod patterns;
mod resolver;
mod types;

pub use fuzzy::{FuzzyMatch, FuzzyMatcher, DEFAULT_THRESHOLD};
pub use resolver::{EntityThresholds, IntentResolver, Vocabulary};
pub use types::{Entity, EntityKind, IntentType, ResolvedIntent};
