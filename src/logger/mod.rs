//! Logging bootstrap and the tracing-backed identity event sink.

mod identity_events;
mod logger;
pub use identity_events::*;
pub use logger::*;

pub use tracing::{debug, error, info, trace, warn};
