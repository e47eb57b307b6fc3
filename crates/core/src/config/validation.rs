//! Checks applied to a loaded `AppConfig` before the worker is built.

use crate::config::AppConfig;
use thiserror::Error;

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

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `cache_name` is empty
    /// - `origin` is not an absolute http(s) URL
    /// - `functions_prefix` does not start with `/`
    /// - `backend_host` is empty
    /// - a precache entry is neither an absolute path nor an http(s) URL
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `user_agent` is empty
    /// - `max_concurrency` is 0 or exceeds 16
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache_name.trim().is_empty() {
            return Err(invalid("cache_name", "must not be empty"));
        }

        let origin = self.origin_url()?;
        if !matches!(origin.scheme(), "http" | "https") || origin.host_str().is_none() {
            return Err(invalid("origin", "must be an absolute http(s) URL"));
        }

        if !self.functions_prefix.starts_with('/') {
            return Err(invalid("functions_prefix", "must start with '/'"));
        }

        if self.backend_host.trim().is_empty() {
            return Err(invalid("backend_host", "must not be empty"));
        }

        for asset in &self.precache_assets {
            let is_path = asset.starts_with('/');
            let is_url = asset.starts_with("http://") || asset.starts_with("https://");
            if !is_path && !is_url {
                return Err(invalid("precache_assets", format!("'{asset}' is not an absolute path or URL")));
            }
        }

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

        if self.max_concurrency == 0 || self.max_concurrency > 16 {
            return Err(invalid("max_concurrency", "must be between 1 and 16"));
        }

        if self.precache_assets.is_empty() {
            tracing::warn!(cache_name = %self.cache_name, "precache_assets is empty; install stores nothing");
        }

        Ok(())
    }
}
