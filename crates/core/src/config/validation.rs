//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;
use url::Url;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

fn validate_name_part(field: &str, value: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(invalid(field, "must not be empty"));
    }
    if value.chars().any(char::is_whitespace) {
        return Err(invalid(field, "must not contain whitespace"));
    }
    Ok(())
}

fn validate_paths(field: &str, paths: &[String]) -> Result<(), ConfigError> {
    if let Some(bad) = paths.iter().find(|p| !p.starts_with('/')) {
        return Err(invalid(field, format!("'{bad}' must start with '/'")));
    }
    Ok(())
}

impl AppConfig {
    /// Parse `origin` into the upstream base URL.
    ///
    /// Normalization steps:
    /// 1. Trim leading/trailing whitespace
    /// 2. Default scheme to http:// if missing
    /// 3. Lowercase the host
    /// 4. Drop path, query and fragment
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if the origin is empty, does not parse,
    /// is not http(s), or has no host.
    pub fn origin_url(&self) -> Result<Url, ConfigError> {
        let trimmed = self.origin.trim();
        if trimmed.is_empty() {
            return Err(invalid("origin", "must not be empty"));
        }

        let url_str = if trimmed.contains("://") { trimmed.to_string() } else { format!("http://{trimmed}") };
        let mut parsed = Url::parse(&url_str).map_err(|e| invalid("origin", format!("'{trimmed}': {e}")))?;

        match parsed.scheme() {
            "http" | "https" => {}
            scheme => return Err(invalid("origin", format!("unsupported scheme '{scheme}'"))),
        }
        if parsed.host_str().is_none_or(str::is_empty) {
            return Err(invalid("origin", format!("no host in '{trimmed}'")));
        }

        parsed.set_path("/");
        parsed.set_query(None);
        parsed.set_fragment(None);
        Ok(parsed)
    }

    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `origin` is rejected by [`AppConfig::origin_url`]
    /// - `cache_prefix` or `cache_version_tag` is empty or contains whitespace
    /// - any prefix or manifest entry is not an absolute path
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `user_agent` is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.origin_url()?;

        validate_name_part("cache_prefix", &self.cache_prefix)?;
        validate_name_part("cache_version_tag", &self.cache_version_tag)?;

        validate_paths("api_prefixes", &self.api_prefixes)?;
        validate_paths("static_prefixes", &self.static_prefixes)?;
        validate_paths("precache_manifest", &self.precache_manifest)?;

        if self.max_bytes == 0 {
            return Err(invalid("max_bytes", "must be greater than 0"));
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(invalid("max_bytes", "must not exceed 50MB"));
        }

        if self.timeout_ms < 100 {
            return Err(invalid("timeout_ms", "must be at least 100ms"));
        }
        if self.timeout_ms > 300_000 {
            return Err(invalid("timeout_ms", "must not exceed 5 minutes (300000ms)"));
        }

        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }

        let overlapping = self
            .api_prefixes
            .iter()
            .filter(|api| self.static_prefixes.iter().any(|s| s.starts_with(api.as_str())))
            .count();
        if overlapping > 0 {
            tracing::warn!(
                overlapping,
                "Some static_prefixes are shadowed by api_prefixes; \
                 API classification takes precedence"
            );
        }

        Ok(())
    }
}
