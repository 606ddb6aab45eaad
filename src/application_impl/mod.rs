mod identity_service_impl;
mod keyed_lock;

pub use identity_service_impl::*;
pub use keyed_lock::*;
