mod event;
mod profile;
mod user;

pub use event::*;
pub use profile::*;
pub use user::*;
