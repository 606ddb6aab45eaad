use crate::domain_model::{ExternalProfile, UserId};
use crate::domain_port::StoreError;
use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("profile from provider {found} cannot be resolved by the {expected} resolver")]
    ProviderMismatch { expected: String, found: String },
    #[error("refusing to merge into the account registered with {email}")]
    EmailMergeRefused { email: String },
    #[error("account {user_id} is already linked to another identity")]
    AccountAlreadyLinked { user_id: UserId },
    #[error("identity index entry for {external_id} holds invalid uid {value:?}")]
    CorruptIndex { external_id: String, value: String },
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing configuration: {0}")]
    MissingConfiguration(&'static str),
}

/// What to do when a new external identity carries the email address of an
/// existing local account.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmailMergePolicy {
    /// Link on email equality alone. The provider's claim is trusted as-is.
    #[default]
    Always,
    /// Link only when the provider reports the address as verified.
    VerifiedOnly,
    /// Never link on email; a matching address is refused.
    Never,
}

impl EmailMergePolicy {
    pub fn permits(&self, profile: &ExternalProfile) -> bool {
        match self {
            EmailMergePolicy::Always => true,
            EmailMergePolicy::VerifiedOnly => profile.email_verified == Some(true),
            EmailMergePolicy::Never => false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResolverConfig {
    pub provider: String,
    pub email_merge: EmailMergePolicy,
}

#[async_trait::async_trait]
pub trait IdentityService: Send + Sync {
    /// Map a verified external profile to exactly one local user, creating
    /// and linking records as needed.
    async fn resolve(&self, profile: &ExternalProfile) -> Result<UserId, IdentityError>;

    /// Remove the link between `user_id` and its external identity.
    /// A user that was never linked is left untouched.
    async fn unlink(&self, user_id: UserId) -> Result<(), IdentityError>;

    async fn linked_external_id(&self, user_id: UserId) -> Result<Option<String>, IdentityError>;
}
