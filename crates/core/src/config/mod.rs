//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (WAYPOST_*)
//! 2. TOML config file (if WAYPOST_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::generation::Generations;

mod validation;

pub use validation::ConfigError;

/// Which generations network-first searches when the network is down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FallbackScope {
    /// Only the generation the strategy writes to.
    Target,
    /// The target generation, then the other current generation.
    #[default]
    Current,
}

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (WAYPOST_*)
/// 2. TOML config file (if WAYPOST_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Upstream origin. Requests to any other origin are passed through.
    ///
    /// Set via WAYPOST_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Address the proxy listens on.
    ///
    /// Set via WAYPOST_LISTEN_ADDR environment variable.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Path to SQLite cache database.
    ///
    /// Set via WAYPOST_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Leading component of every generation name.
    #[serde(default = "default_cache_prefix")]
    pub cache_prefix: String,

    /// Version tag embedded in generation names. Changing it invalidates
    /// all prior generations at the next activation.
    ///
    /// Set via WAYPOST_CACHE_VERSION_TAG environment variable.
    #[serde(default = "default_cache_version_tag")]
    pub cache_version_tag: String,

    /// Paths fetched into the static generation at install.
    #[serde(default = "default_precache_manifest")]
    pub precache_manifest: Vec<String>,

    /// Path prefixes served network-first as API calls.
    #[serde(default = "default_api_prefixes")]
    pub api_prefixes: Vec<String>,

    /// Path prefixes served cache-first as static assets.
    #[serde(default = "default_static_prefixes")]
    pub static_prefixes: Vec<String>,

    /// Body of the synthesized 503 response.
    #[serde(default = "default_offline_message")]
    pub offline_message: String,

    #[serde(default)]
    pub fallback_scope: FallbackScope,

    /// User-Agent string for upstream requests.
    ///
    /// Set via WAYPOST_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum bytes to fetch per request.
    ///
    /// Set via WAYPOST_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// HTTP request timeout in milliseconds.
    ///
    /// Set via WAYPOST_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_origin() -> String {
    "http://127.0.0.1:8000".into()
}

fn default_listen_addr() -> String {
    "127.0.0.1:8080".into()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./waypost-cache.sqlite")
}

fn default_cache_prefix() -> String {
    "waypost".into()
}

fn default_cache_version_tag() -> String {
    "v1".into()
}

fn default_precache_manifest() -> Vec<String> {
    [
        "/",
        "/static/css/style.css",
        "/static/js/main.js",
        "/static/img/logo.png",
        "/static/img/icon.png",
        "/offline/",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_api_prefixes() -> Vec<String> {
    vec!["/api/".into(), "/webhook/".into()]
}

fn default_static_prefixes() -> Vec<String> {
    vec!["/static/".into()]
}

fn default_offline_message() -> String {
    "You are offline. Please try again later.".into()
}

fn default_user_agent() -> String {
    "waypost/0.1".into()
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_timeout_ms() -> u64 {
    20_000
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            origin: default_origin(),
            listen_addr: default_listen_addr(),
            db_path: default_db_path(),
            cache_prefix: default_cache_prefix(),
            cache_version_tag: default_cache_version_tag(),
            precache_manifest: default_precache_manifest(),
            api_prefixes: default_api_prefixes(),
            static_prefixes: default_static_prefixes(),
            offline_message: default_offline_message(),
            fallback_scope: FallbackScope::default(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// The current static and dynamic generation names.
    pub fn generations(&self) -> Generations {
        Generations::new(&self.cache_prefix, &self.cache_version_tag)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `WAYPOST_`
    /// 2. TOML file from `WAYPOST_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("WAYPOST_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("WAYPOST_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
