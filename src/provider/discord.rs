use super::*;
use crate::application_port::ConfigError;
use crate::domain_model::ExternalProfile;
use serde::Deserialize;

pub const DISCORD: &str = "discord";

const ICON: &str = "fa-pied-piper";
const ADMIN_ROUTE: &str = "/plugins/sso-discord";
const AUTHORIZATION_URL: &str = "https://discordapp.com/api/v6/oauth2/authorize";
const TOKEN_URL: &str = "https://discordapp.com/api/v6/oauth2/token";
const USER_ROUTE: &str = "https://discordapp.com/api/v6/users/@me";
const APP_URL: &str = "https://discordapp.com/channels/@me";
const AVATAR_CDN: &str = "https://cdn.discordapp.com/avatars";
const SCOPE: [&str; 2] = ["identify", "email"];

#[derive(Debug, thiserror::Error)]
pub enum ProfileParseError {
    #[error("malformed profile payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("profile payload has no user id")]
    MissingId,
    #[error("profile payload has no username")]
    MissingUsername,
}

/// The subset of Discord's `users/@me` response we care about.
#[derive(Debug, Deserialize)]
struct DiscordUser {
    id: String,
    username: String,
    avatar: Option<String>,
    verified: Option<bool>,
    email: Option<String>,
}

fn avatar_url(user_id: &str, avatar: &str) -> String {
    let ext = if avatar.starts_with("a_") { "gif" } else { "png" };
    format!("{AVATAR_CDN}/{user_id}/{avatar}.{ext}")
}

/// Parse the body of a `users/@me` response.
pub fn parse_profile(body: &str) -> Result<ExternalProfile, ProfileParseError> {
    let user: DiscordUser = serde_json::from_str(body)?;

    if user.id.trim().is_empty() {
        return Err(ProfileParseError::MissingId);
    }
    if user.username.trim().is_empty() {
        return Err(ProfileParseError::MissingUsername);
    }

    Ok(ExternalProfile {
        avatar_url: user
            .avatar
            .as_deref()
            .filter(|hash| !hash.is_empty())
            .map(|hash| avatar_url(&user.id, hash)),
        id: user.id,
        display_name: user.username,
        email: user.email.unwrap_or_default(),
        email_verified: user.verified,
        provider: DISCORD.to_string(),
    })
}

/// Validated Discord login strategy. Construction is the one place where
/// missing credentials are detected.
#[derive(Debug, Clone)]
pub struct DiscordStrategy {
    settings: ProviderSettings,
}

impl DiscordStrategy {
    pub fn try_new(settings: &ProviderSettings) -> Result<Self, ConfigError> {
        if settings.client_id.trim().is_empty() {
            return Err(ConfigError::MissingConfiguration("discord client_id"));
        }
        if settings.client_secret.trim().is_empty() {
            return Err(ConfigError::MissingConfiguration("discord client_secret"));
        }
        if settings.base_url.trim().is_empty() {
            return Err(ConfigError::MissingConfiguration("base_url"));
        }

        let mut settings = settings.clone();
        settings.base_url = settings.base_url.trim().trim_end_matches('/').to_owned();
        Ok(Self { settings })
    }

    pub fn client_id(&self) -> &str {
        &self.settings.client_id
    }

    pub fn client_secret(&self) -> &str {
        &self.settings.client_secret
    }

    pub fn descriptor(&self) -> StrategyDescriptor {
        StrategyDescriptor {
            name: DISCORD.to_string(),
            url: format!("/auth/{DISCORD}"),
            callback_url: format!("{}/auth/{DISCORD}/callback", self.settings.base_url),
            icon: ICON.to_string(),
            scope: SCOPE.iter().map(|s| s.to_string()).collect(),
            authorization_url: AUTHORIZATION_URL.to_string(),
            token_url: TOKEN_URL.to_string(),
            user_route: USER_ROUTE.to_string(),
        }
    }

    pub fn association(&self, associated: bool) -> Association {
        let url = if associated {
            APP_URL.to_string()
        } else {
            format!("{}/auth/{DISCORD}", self.settings.base_url)
        };
        Association {
            associated,
            url,
            name: DISCORD.to_string(),
            icon: ICON.to_string(),
        }
    }

    pub fn admin_menu_item() -> AdminMenuItem {
        AdminMenuItem {
            route: ADMIN_ROUTE.to_string(),
            icon: ICON.to_string(),
            name: DISCORD.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> ProviderSettings {
        ProviderSettings {
            client_id: "1234".to_string(),
            client_secret: "s3cret".to_string(),
            base_url: "https://forum.example/".to_string(),
        }
    }

    #[test]
    fn parses_me_payload() {
        let body = r#"{
            "id": "80351110224678912",
            "username": "Nelly",
            "global_name": "Nelly N.",
            "avatar": "8342729096ea3675442027381ff50dfe",
            "verified": true,
            "email": "nelly@discord.com",
            "flags": 64
        }"#;

        let profile = parse_profile(body).unwrap();
        assert_eq!(profile.id, "80351110224678912");
        assert_eq!(profile.display_name, "Nelly");
        assert_eq!(profile.email, "nelly@discord.com");
        assert_eq!(profile.email_verified, Some(true));
        assert_eq!(profile.provider, "discord");
        assert_eq!(
            profile.avatar_url.as_deref(),
            Some(
                "https://cdn.discordapp.com/avatars/80351110224678912/8342729096ea3675442027381ff50dfe.png"
            )
        );
    }

    #[test]
    fn animated_avatar_uses_gif() {
        let body = r#"{"id": "1", "username": "a", "avatar": "a_abc"}"#;
        let profile = parse_profile(body).unwrap();
        assert_eq!(
            profile.avatar_url.as_deref(),
            Some("https://cdn.discordapp.com/avatars/1/a_abc.gif")
        );
        assert_eq!(profile.email, "");
        assert!(!profile.has_email());
    }

    #[test]
    fn malformed_payloads_are_rejected() {
        assert!(matches!(
            parse_profile("not json"),
            Err(ProfileParseError::Json(_))
        ));
        assert!(matches!(
            parse_profile(r#"{"username": "a"}"#),
            Err(ProfileParseError::Json(_))
        ));
        assert!(matches!(
            parse_profile(r#"{"id": " ", "username": "a"}"#),
            Err(ProfileParseError::MissingId)
        ));
        assert!(matches!(
            parse_profile(r#"{"id": "1", "username": ""}"#),
            Err(ProfileParseError::MissingUsername)
        ));
    }

    #[test]
    fn missing_credentials_fail_at_construction() {
        let mut s = settings();
        s.client_secret.clear();
        assert!(matches!(
            DiscordStrategy::try_new(&s),
            Err(ConfigError::MissingConfiguration("discord client_secret"))
        ));

        let mut s = settings();
        s.client_id = " ".to_string();
        assert!(matches!(
            DiscordStrategy::try_new(&s),
            Err(ConfigError::MissingConfiguration("discord client_id"))
        ));
    }

    #[test]
    fn descriptor_uses_base_url() {
        let strategy = DiscordStrategy::try_new(&settings()).unwrap();
        let descriptor = strategy.descriptor();
        assert_eq!(descriptor.url, "/auth/discord");
        assert_eq!(
            descriptor.callback_url,
            "https://forum.example/auth/discord/callback"
        );
        assert_eq!(descriptor.scope, vec!["identify", "email"]);
    }

    #[test]
    fn association_points_to_the_right_place() {
        let strategy = DiscordStrategy::try_new(&settings()).unwrap();
        assert_eq!(
            strategy.association(true).url,
            "https://discordapp.com/channels/@me"
        );
        let unlinked = strategy.association(false);
        assert!(!unlinked.associated);
        assert_eq!(unlinked.url, "https://forum.example/auth/discord");
    }

    #[test]
    fn secret_is_not_debug_printed() {
        let printed = format!("{:?}", settings());
        assert!(!printed.contains("s3cret"));
    }
}
