use crate::application_port::EmailMergePolicy;
use crate::provider::ProviderSettings;
use anyhow::{Result, anyhow};
use config::{Config, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub log: Log,
    pub store: Store,
    pub sso: Sso,
}

#[derive(Debug, Deserialize)]
pub struct Log {
    pub filter: String,
}

#[derive(Debug, Deserialize)]
pub struct Store {
    pub backend: String, // "memory" or "real"
    #[serde(default)]
    pub mysql_dsn: String,
    #[serde(default)]
    pub redis_dsn: String,
    #[serde(default)]
    pub redis_prefix: String,
}

#[derive(Debug, Deserialize)]
pub struct Sso {
    #[serde(default)]
    pub email_merge: EmailMergePolicy,
    #[serde(flatten)]
    pub provider: ProviderSettings,
}

#[cfg(debug_assertions)]
const SETTINGS_PATH: &str = "settings/dev.toml";
#[cfg(not(debug_assertions))]
const SETTINGS_PATH: &str = "settings/release.toml";

/// Environment variables such as `SSO__SSO__CLIENT_ID` and
/// `SSO__SSO__CLIENT_SECRET` override the file.
const ENV_PREFIX: &str = "SSO";

pub fn parse_settings(path: Option<&str>) -> Result<Settings> {
    let path = path.unwrap_or(SETTINGS_PATH);

    let settings: Settings = Config::builder()
        .add_source(File::with_name(path))
        .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
        .build()
        .map_err(|e| anyhow!(e))?
        .try_deserialize()
        .map_err(|e| anyhow!(e))?;

    Ok(settings)
}
