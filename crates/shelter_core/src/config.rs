//! Connection configuration for the shelter store.
//!
//! # Responsibility
//! - Collect credentials and coordinates from the process environment
//!   (optionally seeded from a `.env` file) or from a JSON file.
//! - Convert them into `Credentials`, `ConnectionTarget` and `RetryPolicy`.
//!
//! # Invariants
//! - The secret is never printed by `Debug`.
//! - The secret has no default; a missing secret is a configuration error.

use serde::Deserialize;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::time::Duration;

use crate::db::{ConnectionTarget, Credentials, RetryPolicy, DEFAULT_AUTH_SOURCE};

pub const ENV_USER: &str = "AAC_USER";
pub const ENV_SECRET: &str = "AAC_PASS";
pub const ENV_HOST: &str = "AAC_HOST";
pub const ENV_PORT: &str = "AAC_PORT";
pub const ENV_DATABASE: &str = "AAC_DB";
pub const ENV_COLLECTION: &str = "AAC_COLLECTION";
pub const ENV_AUTH_SOURCE: &str = "AAC_AUTH_SOURCE";
pub const ENV_CONNECT_ATTEMPTS: &str = "AAC_CONNECT_ATTEMPTS";

const DEFAULT_USER: &str = "aacuser";
const DEFAULT_HOST: &str = "localhost";
const DEFAULT_PORT: u16 = 27017;
const DEFAULT_DATABASE: &str = "aac";
const DEFAULT_COLLECTION: &str = "animals";
const DEFAULT_RETRY_BACKOFF_MS: u64 = 200;

#[derive(Debug)]
pub enum ConfigError {
    MissingSecret,
    InvalidNumber { key: &'static str, value: String },
    Parse(serde_json::Error),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingSecret => write!(f, "store secret not set; export {ENV_SECRET}"),
            Self::InvalidNumber { key, value } => {
                write!(f, "{key} must be a positive integer, got `{value}`")
            }
            Self::Parse(err) => write!(f, "invalid configuration file: {err}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Parse(err) => Some(err),
            _ => None,
        }
    }
}

/// Everything needed to open a shelter session.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ShelterConfig {
    pub username: String,
    pub secret: String,
    pub host: String,
    pub port: u16,
    pub database: String,
    pub collection: String,
    pub auth_source: String,
    pub server_selection_timeout_ms: Option<u64>,
    /// Total connect attempts; 1 disables retry.
    pub connect_attempts: u32,
    pub retry_backoff_ms: u64,
}

impl Default for ShelterConfig {
    fn default() -> Self {
        Self {
            username: DEFAULT_USER.to_string(),
            secret: String::new(),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            database: DEFAULT_DATABASE.to_string(),
            collection: DEFAULT_COLLECTION.to_string(),
            auth_source: DEFAULT_AUTH_SOURCE.to_string(),
            server_selection_timeout_ms: None,
            connect_attempts: 1,
            retry_backoff_ms: DEFAULT_RETRY_BACKOFF_MS,
        }
    }
}

impl Debug for ShelterConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShelterConfig")
            .field("username", &self.username)
            .field("secret", &"****")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("collection", &self.collection)
            .field("auth_source", &self.auth_source)
            .field("server_selection_timeout_ms", &self.server_selection_timeout_ms)
            .field("connect_attempts", &self.connect_attempts)
            .finish()
    }
}

impl ShelterConfig {
    /// Loads `.env` when present, then reads `AAC_*` variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Missing .env is normal outside development checkouts.
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key lookup, falling back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let read = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(username) = read(ENV_USER) {
            config.username = username;
        }
        config.secret = read(ENV_SECRET).ok_or(ConfigError::MissingSecret)?;
        if let Some(host) = read(ENV_HOST) {
            config.host = host;
        }
        if let Some(port) = read(ENV_PORT) {
            config.port = parse_positive(ENV_PORT, &port)?;
        }
        if let Some(database) = read(ENV_DATABASE) {
            config.database = database;
        }
        if let Some(collection) = read(ENV_COLLECTION) {
            config.collection = collection;
        }
        if let Some(auth_source) = read(ENV_AUTH_SOURCE) {
            config.auth_source = auth_source;
        }
        if let Some(attempts) = read(ENV_CONNECT_ATTEMPTS) {
            config.connect_attempts = parse_positive(ENV_CONNECT_ATTEMPTS, &attempts)?;
        }
        Ok(config)
    }

    /// Parses a JSON config document; omitted keys take defaults.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw).map_err(ConfigError::Parse)?;
        if config.secret.is_empty() {
            return Err(ConfigError::MissingSecret);
        }
        Ok(config)
    }

    pub fn credentials(&self) -> Credentials {
        Credentials::new(self.username.as_str(), self.secret.as_str())
    }

    pub fn target(&self) -> ConnectionTarget {
        let mut target = ConnectionTarget::new(
            self.host.as_str(),
            self.port,
            self.database.as_str(),
            self.collection.as_str(),
        );
        target.auth_source = self.auth_source.clone();
        if let Some(timeout_ms) = self.server_selection_timeout_ms {
            target = target.with_server_selection_timeout(Duration::from_millis(timeout_ms));
        }
        target
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        if self.connect_attempts <= 1 {
            return RetryPolicy::none();
        }
        RetryPolicy::exponential(
            self.connect_attempts,
            Duration::from_millis(self.retry_backoff_ms),
        )
    }
}

fn parse_positive<T>(key: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr + PartialEq + Default,
{
    match value.trim().parse::<T>() {
        Ok(parsed) if parsed != T::default() => Ok(parsed),
        _ => Err(ConfigError::InvalidNumber {
            key,
            value: value.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, ShelterConfig, ENV_PORT, ENV_SECRET};
    use crate::db::RetryPolicy;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_fill_everything_but_secret() {
        let config = ShelterConfig::from_lookup(lookup(&[(ENV_SECRET, "s3cret")])).unwrap();
        assert_eq!(config.username, "aacuser");
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 27017);
        assert_eq!(config.database, "aac");
        assert_eq!(config.collection, "animals");
        assert_eq!(config.auth_source, "admin");
        assert_eq!(config.retry_policy(), RetryPolicy::none());
    }

    #[test]
    fn missing_or_blank_secret_is_rejected() {
        let err = ShelterConfig::from_lookup(lookup(&[(ENV_SECRET, "  ")])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingSecret));
    }

    #[test]
    fn invalid_port_is_rejected() {
        let err = ShelterConfig::from_lookup(lookup(&[(ENV_SECRET, "x"), (ENV_PORT, "0")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidNumber { key, .. } if key == ENV_PORT));
    }

    #[test]
    fn json_config_uses_defaults_for_omitted_keys() {
        let config =
            ShelterConfig::from_json_str(r#"{"secret": "pw", "host": "db.internal"}"#).unwrap();
        assert_eq!(config.host, "db.internal");
        assert_eq!(config.port, 27017);
        assert_eq!(config.target().namespace().to_string(), "aac.animals");
    }

    #[test]
    fn debug_never_prints_secret() {
        let config = ShelterConfig::from_lookup(lookup(&[(ENV_SECRET, "hunter2")])).unwrap();
        assert!(!format!("{config:?}").contains("hunter2"));
    }
}
