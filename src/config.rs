//! Service configuration
//!
//! Loaded from an optional TOML file (`BOTWRAP_CONFIG`, default `config.toml`)
//! overlaid by `BOTWRAP_*` environment variables, `__` separating sections.

use std::env;
use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use serde::Deserialize;

const DEFAULT_ADDRESS_URL: &str = "https://api.dataforsyningen.dk/datavask/adresser";
const DEFAULT_INCIDENTS_URL: &str = "https://api.elnet.danskenergi.dk/api/incidents";
const DEFAULT_LOOKUP_MAX_AGE_DAYS: i64 = 30;
/// Upper bound for `lookup.max_age_days` (one century).
pub const MAX_LOOKUP_MAX_AGE_DAYS: i64 = 36_500;

/// Top-level application configuration loaded from file + environment.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseSection,
    pub auth: AuthSection,
    pub subscriber: SubscriberSection,
    pub address: AddressSection,
    pub incidents: IncidentsSection,
    pub lookup: LookupSection,
    pub logging: LoggingSection,
}

impl AppConfig {
    /// Load configuration from disk and environment.
    ///
    /// Environment variables use the `BOTWRAP_` prefix and `__` between
    /// section and key, e.g. `BOTWRAP_SUBSCRIBER__BASE_URL`.
    pub fn load() -> Result<Self> {
        let config_path = env::var("BOTWRAP_CONFIG").unwrap_or_else(|_| "config.toml".to_string());

        let mut builder = config::Config::builder();

        if Path::new(&config_path).exists() {
            builder = builder.add_source(config::File::from(PathBuf::from(&config_path)));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("BOTWRAP")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder.build()?;
        let mut config: Self = settings.try_deserialize()?;

        if config.logging.level.trim().is_empty() {
            config.logging.level = "info".to_string();
        }

        Ok(config)
    }

    /// Reject configurations the server cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.auth.username.trim().is_empty() {
            bail!("auth.username must be specified");
        }
        if self.auth.password.is_empty() {
            bail!("auth.password must be specified");
        }
        if self.subscriber.base_url.trim().is_empty() {
            bail!("subscriber.base_url must be specified");
        }
        if self.address.base_url.trim().is_empty() {
            bail!("address.base_url must be specified");
        }
        if self.incidents.url.trim().is_empty() {
            bail!("incidents.url must be specified");
        }
        if self.lookup.max_age_days <= 0 {
            bail!("lookup.max_age_days must be positive");
        }
        if self.lookup.max_age_days > MAX_LOOKUP_MAX_AGE_DAYS {
            bail!(
                "lookup.max_age_days must be at most {}",
                MAX_LOOKUP_MAX_AGE_DAYS
            );
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseSection {
    pub path: String,
    pub max_connections: u32,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            path: "customer.db".to_string(),
            max_connections: 5,
        }
    }
}

/// Shared credentials for the bot.
#[derive(Clone, Deserialize, Default)]
#[serde(default)]
pub struct AuthSection {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for AuthSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSection")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct SubscriberSection {
    pub base_url: String,
    /// Query string key carrying the phone number
    pub query_param: String,
    /// Sent verbatim as the `Authorization` header
    pub authorization: Option<String>,
    /// Sent verbatim as the `Cookie` header
    pub cookie: Option<String>,
}

impl Default for SubscriberSection {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            query_param: "phone".to_string(),
            authorization: None,
            cookie: None,
        }
    }
}

impl std::fmt::Debug for SubscriberSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriberSection")
            .field("base_url", &self.base_url)
            .field("query_param", &self.query_param)
            .field("authorization", &self.authorization.as_ref().map(|_| "<redacted>"))
            .field("cookie", &self.cookie.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AddressSection {
    pub base_url: String,
    pub query_param: String,
}

impl Default for AddressSection {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_ADDRESS_URL.to_string(),
            query_param: "betegnelse".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IncidentsSection {
    pub url: String,
}

impl Default for IncidentsSection {
    fn default() -> Self {
        Self {
            url: DEFAULT_INCIDENTS_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LookupSection {
    /// Cached lookups older than this are refreshed from upstream
    pub max_age_days: i64,
}

impl Default for LookupSection {
    fn default() -> Self {
        Self {
            max_age_days: DEFAULT_LOOKUP_MAX_AGE_DAYS,
        }
    }
}

impl LookupSection {
    /// Saturates instead of panicking on values `validate()` would reject.
    pub fn max_age(&self) -> chrono::Duration {
        chrono::TimeDelta::try_days(self.max_age_days).unwrap_or(chrono::TimeDelta::MAX)
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct LoggingSection {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Text,
}
