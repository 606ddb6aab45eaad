//! Remote identity provider glue: login strategy metadata and parsing of
//! the provider's profile payload into an [`ExternalProfile`].
//!
//! [`ExternalProfile`]: crate::domain_model::ExternalProfile

mod discord;
mod strategy;

pub use discord::*;
pub use strategy::*;
