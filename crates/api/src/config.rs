use std::str::FromStr;

use axum::http::HeaderValue;
use roster_core::import_job::DEFAULT_MAX_ATTEMPTS;

/// A configuration variable that is set but does not parse.
#[derive(Debug, thiserror::Error)]
#[error("{var} has invalid value '{value}': {reason}")]
pub struct ConfigError {
    pub var: &'static str,
    pub value: String,
    pub reason: String,
}

/// Read `var`, falling back to `default` when unset.
fn env_or<T>(var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(var) {
        Ok(value) => value.trim().parse().map_err(|e: T::Err| ConfigError {
            var,
            value,
            reason: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// How long background tasks get to stop after the server does.
    pub shutdown_timeout_secs: u64,
    /// Previews older than this are evicted (default: `3600`).
    pub preview_ttl_secs: u64,
    /// Request body cap for uploads, in bytes (default: 5 MiB).
    pub max_upload_bytes: usize,
    /// Deliveries allowed per import job (default: `5`).
    pub max_attempts: i32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 3000,
            cors_origins: vec!["http://localhost:5173".into()],
            request_timeout_secs: 30,
            shutdown_timeout_secs: 30,
            preview_ttl_secs: 3600,
            max_upload_bytes: 5 * 1024 * 1024,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                 | Default                    |
    /// |-------------------------|----------------------------|
    /// | `HOST`                  | `0.0.0.0`                  |
    /// | `PORT`                  | `3000`                     |
    /// | `CORS_ORIGINS`          | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS`  | `30`                       |
    /// | `SHUTDOWN_TIMEOUT_SECS` | `30`                       |
    /// | `PREVIEW_TTL_SECS`      | `3600`                     |
    /// | `MAX_UPLOAD_BYTES`      | `5242880`                  |
    /// | `MAX_ATTEMPTS`          | `5`                        |
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| defaults.cors_origins.join(","))
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        for origin in &cors_origins {
            HeaderValue::from_str(origin).map_err(|e| ConfigError {
                var: "CORS_ORIGINS",
                value: origin.clone(),
                reason: e.to_string(),
            })?;
        }

        let max_attempts: i32 = env_or("MAX_ATTEMPTS", defaults.max_attempts)?;
        if max_attempts < 1 {
            return Err(ConfigError {
                var: "MAX_ATTEMPTS",
                value: max_attempts.to_string(),
                reason: "must be at least 1".into(),
            });
        }

        Ok(Self {
            host: env_or("HOST", defaults.host)?,
            port: env_or("PORT", defaults.port)?,
            cors_origins,
            request_timeout_secs: env_or("REQUEST_TIMEOUT_SECS", defaults.request_timeout_secs)?,
            shutdown_timeout_secs: env_or("SHUTDOWN_TIMEOUT_SECS", defaults.shutdown_timeout_secs)?,
            preview_ttl_secs: env_or("PREVIEW_TTL_SECS", defaults.preview_ttl_secs)?,
            max_upload_bytes: env_or("MAX_UPLOAD_BYTES", defaults.max_upload_bytes)?,
            max_attempts,
        })
    }
}
