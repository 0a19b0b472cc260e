//! Configuration for azurearm
//!
//! Handles loading and merging configuration from multiple sources:
//! - Default values
//! - System configuration (/etc/azurearm/azurearm.toml)
//! - User configuration (~/.azurearm.toml, ~/.azurearm/config.toml)
//! - Project configuration (./azurearm.toml)
//! - Environment variables
//!
//! Later files override earlier ones key by key. Credential profiles live
//! under `[profiles.<name>]` and are handed to functions as
//! `connection_auth`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::azure::{ClientConfig, ConnectionAuth};
use crate::error::{Error, Result};

/// Name of the profile built from `AZURE_*` environment variables.
pub const ENVIRONMENT_PROFILE: &str = "environment";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub defaults: Defaults,

    /// HTTP client and long-running operation settings
    pub client: ClientSettings,

    pub logging: LoggingConfig,

    /// Named `connection_auth` tables
    pub profiles: BTreeMap<String, ConnectionAuth>,
}

/// Default configuration values
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Defaults {
    /// Profile used when none is given on the command line
    pub profile: Option<String>,

    /// Level provider errors are logged at (`azurearm_log_level`)
    pub log_level: String,

    /// Cloud for profiles that do not name one
    pub cloud_environment: Option<String>,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            profile: None,
            log_level: "error".to_string(),
            cloud_environment: None,
        }
    }
}

/// Client settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    /// Timeout of a single request
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,

    /// Delay between polls of a long-running operation
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,

    /// Give up on a long-running operation after this long
    #[serde(with = "humantime_serde")]
    pub lro_timeout: Duration,

    pub user_agent: Option<String>,
}

impl Default for ClientSettings {
    fn default() -> Self {
        let defaults = ClientConfig::default();
        Self {
            timeout: defaults.timeout,
            poll_interval: defaults.poll_interval,
            lro_timeout: defaults.lro_timeout,
            user_agent: None,
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Logging settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter used when `-v` is not given, e.g. `info` or `azurearm=debug`
    pub level: Option<String>,

    pub format: LogFormat,
}

impl Config {
    /// Load configuration from all sources. An explicit path replaces the
    /// search path and must exist.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut merged = Value::Object(serde_json::Map::new());

        match config_path {
            Some(path) => merge_values(&mut merged, read_file(path)?),
            None => {
                for path in Self::get_config_paths() {
                    if path.exists() {
                        merge_values(&mut merged, read_file(&path)?);
                    }
                }
            }
        }

        let mut config: Config = serde_json::from_value(merged).map_err(|e| Error::ConfigParse {
            path: config_path.map(Path::to_path_buf).unwrap_or_default(),
            message: e.to_string(),
        })?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from a specific file only, without environment overrides.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let value = read_file(path.as_ref())?;
        serde_json::from_value(value).map_err(|e| Error::ConfigParse {
            path: path.as_ref().to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Get the list of configuration file paths to check
    fn get_config_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("/etc/azurearm/azurearm.toml")];

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".azurearm.toml"));
            paths.push(home.join(".azurearm/config.toml"));
        }

        paths.push(PathBuf::from("azurearm.toml"));
        paths
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        if let Ok(profile) = std::env::var("AZUREARM_PROFILE") {
            self.defaults.profile = Some(profile);
        }

        if let Ok(level) = std::env::var("AZUREARM_LOG_LEVEL") {
            self.defaults.log_level = level;
        }

        if let Ok(cloud) = std::env::var("AZUREARM_CLOUD_ENVIRONMENT") {
            self.defaults.cloud_environment = Some(cloud);
        }

        if let Ok(interval) = std::env::var("AZUREARM_POLL_INTERVAL") {
            if let Some(interval) = parse_duration(&interval) {
                self.client.poll_interval = interval;
            }
        }

        if let Ok(subscription_id) = std::env::var("AZURE_SUBSCRIPTION_ID") {
            let env = |key: &str| std::env::var(key).ok().filter(|v| !v.is_empty());
            let auth = ConnectionAuth {
                subscription_id: Some(subscription_id),
                tenant: env("AZURE_TENANT_ID"),
                client_id: env("AZURE_CLIENT_ID"),
                secret: env("AZURE_CLIENT_SECRET"),
                ..ConnectionAuth::default()
            };
            self.profiles.insert(ENVIRONMENT_PROFILE.to_string(), auth);
        }
    }

    /// Settings for the REST client.
    pub fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig {
            timeout: self.client.timeout,
            poll_interval: self.client.poll_interval,
            lro_timeout: self.client.lro_timeout,
            ..ClientConfig::default()
        };
        if let Some(agent) = &self.client.user_agent {
            config.user_agent = agent.clone();
        }
        config
    }

    /// The credentials of profile `name`, or of the default profile.
    ///
    /// Without any profile configured, the `environment` profile is used when
    /// the `AZURE_*` variables defined one. Profiles that name no cloud get
    /// the default cloud.
    pub fn connection_auth(&self, name: Option<&str>) -> Result<Option<ConnectionAuth>> {
        let name = name
            .or(self.defaults.profile.as_deref())
            .or_else(|| {
                self.profiles
                    .contains_key(ENVIRONMENT_PROFILE)
                    .then_some(ENVIRONMENT_PROFILE)
            });
        let Some(name) = name else {
            return Ok(None);
        };
        let mut auth = self
            .profiles
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UnknownProfile(name.to_string()))?;
        if auth.cloud_environment.is_none() {
            auth.cloud_environment = self.defaults.cloud_environment.clone();
        }
        debug!(profile = name, "using credential profile");
        Ok(Some(auth))
    }
}

/// Durations from the environment: humantime (`5s`, `1m 30s`) or plain
/// seconds.
fn parse_duration(text: &str) -> Option<Duration> {
    let text = text.trim();
    if let Ok(secs) = text.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }
    humantime_serde::re::humantime::parse_duration(text).ok()
}

/// Read a configuration file into a JSON value, by extension.
fn read_file(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path)?;
    let parse_error = |message: String| Error::ConfigParse {
        path: path.to_path_buf(),
        message,
    };

    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    let value = match extension {
        "yml" | "yaml" => serde_yaml::from_str(&content).map_err(|e| parse_error(e.to_string()))?,
        "json" => serde_json::from_str(&content).map_err(|e| parse_error(e.to_string()))?,
        _ => {
            let table: toml::Value =
                toml::from_str(&content).map_err(|e| parse_error(e.to_string()))?;
            serde_json::to_value(table).map_err(|e| parse_error(e.to_string()))?
        }
    };
    debug!(path = %path.display(), "loaded config file");
    Ok(value)
}

/// Merge `other` into `base`, recursing into tables.
fn merge_values(base: &mut Value, other: Value) {
    match (base, other) {
        (Value::Object(base), Value::Object(other)) => {
            for (key, value) in other {
                match base.get_mut(&key) {
                    Some(existing) if existing.is_object() && value.is_object() => {
                        merge_values(existing, value)
                    }
                    _ => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, other) if !other.is_null() => *base = other,
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.defaults.log_level, "error");
        assert_eq!(config.client.poll_interval, ClientConfig::default().poll_interval);
        assert_eq!(config.logging.format, LogFormat::Text);
        assert!(config.profiles.is_empty());
    }

    #[test]
    fn test_merge_values() {
        let mut base = json!({"defaults": {"profile": "a", "log_level": "info"}, "client": {"timeout": "10s"}});
        merge_values(
            &mut base,
            json!({"defaults": {"profile": "b"}, "profiles": {"b": {"subscription_id": "s"}}}),
        );
        assert_eq!(base["defaults"]["profile"], json!("b"));
        assert_eq!(base["defaults"]["log_level"], json!("info"));
        assert_eq!(base["client"]["timeout"], json!("10s"));
        assert_eq!(base["profiles"]["b"]["subscription_id"], json!("s"));
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("7"), Some(Duration::from_secs(7)));
        assert_eq!(parse_duration("1m 30s"), Some(Duration::from_secs(90)));
        assert_eq!(parse_duration("soon"), None);
    }

    #[test]
    fn test_connection_auth_resolution() {
        let mut config = Config::default();
        assert!(config.connection_auth(None).unwrap().is_none());

        config.profiles.insert(
            "prod".to_string(),
            ConnectionAuth {
                subscription_id: Some("sub".to_string()),
                ..ConnectionAuth::default()
            },
        );
        config.defaults.cloud_environment = Some("AZURE_US_GOV_CLOUD".to_string());
        let auth = config.connection_auth(Some("prod")).unwrap().unwrap();
        assert_eq!(auth.cloud_environment.as_deref(), Some("AZURE_US_GOV_CLOUD"));

        assert!(matches!(
            config.connection_auth(Some("dev")),
            Err(Error::UnknownProfile(name)) if name == "dev"
        ));
    }

    #[test]
    fn test_client_config() {
        let mut config = Config::default();
        config.client.user_agent = Some("ops/1.0".to_string());
        config.client.lro_timeout = Duration::from_secs(60);
        let client = config.client_config();
        assert_eq!(client.user_agent, "ops/1.0");
        assert_eq!(client.lro_timeout, Duration::from_secs(60));
        assert_eq!(client.base_url, "https://management.azure.com");
    }
}
