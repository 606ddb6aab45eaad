//! Process-local adapters. Used by the `memory` backend and by tests.

mod event_sink_memory;
mod kv_store_memory;
mod user_store_memory;

pub use event_sink_memory::*;
pub use kv_store_memory::*;
pub use user_store_memory::*;
