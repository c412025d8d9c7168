//! Configuration for dictcheck.
//!
//! Loads settings from a TOML file or uses defaults. The Fastly API token is
//! never read from the file, only from the environment.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Environment variable holding the Fastly API token
pub const API_KEY_ENV: &str = "FASTLY_API_KEY";

/// Environment variable pointing at a config file
pub const CONFIG_PATH_ENV: &str = "DICTCHECK_CONFIG";

/// Dictionary holding hostname -> site ID mappings on every service
pub const DEFAULT_DICTIONARY_NAME: &str = "hostname_to_site_id";

/// The production Fastly services, in check order
const DEFAULT_SERVICES: &[(&str, &str)] = &[
    ("6cecXOA5eq1mdycR8IETIO", "fe1"),
    ("6wd67qj6gjWStoHWt9QqLM", "fe2"),
    ("7ASqNxevWrE186HznHoMeq", "fe3"),
    ("7LUFSHwH7rvhe3nX3PX61e", "fe4"),
    ("7WBIxgsYSoSNGi0NZEi4ge", "GCDN-Canary"),
];

/// A service identifier to reconcile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceTarget {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl ServiceTarget {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: None,
        }
    }

    pub fn labeled(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: Some(label.into()),
        }
    }

    /// Label if one is configured, otherwise the raw ID
    pub fn display_name(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Services to reconcile, in order
    #[serde(default = "default_services")]
    pub services: Vec<ServiceTarget>,

    /// Name of the edge dictionary to read on each service
    #[serde(default = "default_dictionary_name")]
    pub dictionary_name: String,

    /// Policy docs base URL; hostnames are appended as the path
    #[serde(default = "default_policy_base_url")]
    pub policy_base_url: String,

    /// Fastly API base URL
    #[serde(default = "default_fastly_api_url")]
    pub fastly_api_url: String,

    /// Per-request timeout for both APIs
    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,
}

fn default_services() -> Vec<ServiceTarget> {
    DEFAULT_SERVICES
        .iter()
        .map(|(id, label)| ServiceTarget::labeled(*id, *label))
        .collect()
}

fn default_dictionary_name() -> String {
    DEFAULT_DICTIONARY_NAME.to_string()
}

fn default_policy_base_url() -> String {
    "http://policy-docs.pantheon.io".to_string()
}

fn default_fastly_api_url() -> String {
    "https://api.fastly.com".to_string()
}

fn default_http_timeout() -> u64 {
    30
}

impl Default for Config {
    fn default() -> Self {
        Self {
            services: default_services(),
            dictionary_name: default_dictionary_name(),
            policy_base_url: default_policy_base_url(),
            fastly_api_url: default_fastly_api_url(),
            http_timeout_secs: default_http_timeout(),
        }
    }
}

impl Config {
    /// Load configuration
    ///
    /// Priority:
    /// 1. Explicit path (must exist)
    /// 2. Path in `DICTCHECK_CONFIG`
    /// 3. Defaults
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let from_env = std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from);
        Self::load_with(explicit, from_env.as_deref())
    }

    fn load_with(explicit: Option<&Path>, from_env: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit.or(from_env) {
            Some(path) => Self::load_from_path(path),
            None => {
                debug!("No config file given, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Load config from specific path
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.services.is_empty() {
            return Err(ConfigError::NoServices);
        }
        if self.dictionary_name.trim().is_empty() {
            return Err(ConfigError::EmptyDictionaryName);
        }

        let mut seen = HashSet::new();
        for target in &self.services {
            if !seen.insert(target.id.as_str()) {
                return Err(ConfigError::DuplicateService(target.id.clone()));
            }
        }

        Ok(())
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

/// Read the Fastly API token from the environment
pub fn api_key_from_env() -> Result<String, ConfigError> {
    api_key_from(std::env::var(API_KEY_ENV).ok())
}

fn api_key_from(value: Option<String>) -> Result<String, ConfigError> {
    match value {
        Some(key) if !key.trim().is_empty() => Ok(key.trim().to_string()),
        _ => Err(ConfigError::MissingApiKey),
    }
}
