use serde::{Deserialize, Serialize};
use std::fmt;

/// Client credentials and the public base URL of the site.
#[derive(Clone, Default, Deserialize)]
pub struct ProviderSettings {
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    #[serde(default)]
    pub base_url: String,
}

impl fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderSettings")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// What the host's authentication pipeline needs to register a login strategy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StrategyDescriptor {
    pub name: String,
    pub url: String,
    pub callback_url: String,
    pub icon: String,
    pub scope: Vec<String>,
    pub authorization_url: String,
    pub token_url: String,
    pub user_route: String,
}

/// Account page entry telling a user whether they are linked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Association {
    pub associated: bool,
    pub url: String,
    pub name: String,
    pub icon: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdminMenuItem {
    pub route: String,
    pub icon: String,
    pub name: String,
}
