use serde::{Deserialize, Serialize};

/// Identity data handed over by a remote OAuth2 provider once the token
/// exchange has succeeded. Built fresh for every login attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalProfile {
    pub id: String,
    pub display_name: String,
    /// Empty when the provider did not disclose an address.
    pub email: String,
    pub email_verified: Option<bool>,
    pub avatar_url: Option<String>,
    pub provider: String,
}

impl ExternalProfile {
    pub fn has_email(&self) -> bool {
        !self.email.trim().is_empty()
    }
}
