// store

mod kv_store;
mod store_error;
mod user_store;

pub use kv_store::*;
pub use store_error::*;
pub use user_store::*;

// sink

mod event_sink;

pub use event_sink::*;
