//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::path::PathBuf;

use chrono::Duration;
use identity_core::{SessionPolicy, TokenSettings};
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub log_level: Level,
    pub access_token_secret: String,
    pub refresh_token_secret: String,
    pub access_token_ttl: Duration,
    pub refresh_token_ttl: Duration,
    pub asset_dir: PathBuf,
    pub asset_public_url: String,
    pub cors_origin: String,
    pub cookie_secure: bool,
    pub revoke_sessions_on_password_change: bool,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("bind_address", &self.bind_address)
            .field("log_level", &self.log_level)
            .field("access_token_ttl", &self.access_token_ttl)
            .field("refresh_token_ttl", &self.refresh_token_ttl)
            .field("asset_dir", &self.asset_dir)
            .field("asset_public_url", &self.asset_public_url)
            .field("cors_origin", &self.cors_origin)
            .field("cookie_secure", &self.cookie_secure)
            .field(
                "revoke_sessions_on_password_change",
                &self.revoke_sessions_on_password_change,
            )
            .finish_non_exhaustive()
    }
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var_or = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| ConfigError::MissingVar(key.to_string()))
        };

        // --- Load Server and Database Settings ---
        let bind_address_str = var_or("BIND_ADDRESS", "0.0.0.0:8000");
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let database_url = required("DATABASE_URL")?;

        let log_level_str = var_or("RUST_LOG", "INFO");
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Load Token Settings ---
        let access_token_secret = required("ACCESS_TOKEN_SECRET")?;
        let refresh_token_secret = required("REFRESH_TOKEN_SECRET")?;
        if access_token_secret == refresh_token_secret {
            return Err(ConfigError::InvalidValue(
                "REFRESH_TOKEN_SECRET".to_string(),
                "must differ from ACCESS_TOKEN_SECRET".to_string(),
            ));
        }
        let access_token_ttl = parse_ttl("ACCESS_TOKEN_TTL_SECS", lookup("ACCESS_TOKEN_TTL_SECS"), 900)?;
        let refresh_token_ttl =
            parse_ttl("REFRESH_TOKEN_TTL_SECS", lookup("REFRESH_TOKEN_TTL_SECS"), 864_000)?;

        // --- Load Asset Store and HTTP Settings ---
        let asset_dir = PathBuf::from(var_or("ASSET_DIR", "./public/assets"));
        let asset_public_url = var_or("ASSET_PUBLIC_URL", "http://localhost:8000/assets");
        let cors_origin = var_or("CORS_ORIGIN", "http://localhost:3000");
        let cookie_secure = parse_flag("COOKIE_SECURE", lookup("COOKIE_SECURE"), true)?;
        let revoke_sessions_on_password_change = parse_flag(
            "REVOKE_SESSIONS_ON_PASSWORD_CHANGE",
            lookup("REVOKE_SESSIONS_ON_PASSWORD_CHANGE"),
            false,
        )?;

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            access_token_secret,
            refresh_token_secret,
            access_token_ttl,
            refresh_token_ttl,
            asset_dir,
            asset_public_url,
            cors_origin,
            cookie_secure,
            revoke_sessions_on_password_change,
        })
    }

    pub fn token_settings(&self) -> TokenSettings {
        TokenSettings {
            access_secret: self.access_token_secret.clone(),
            refresh_secret: self.refresh_token_secret.clone(),
            access_ttl: self.access_token_ttl,
            refresh_ttl: self.refresh_token_ttl,
        }
    }

    pub fn session_policy(&self) -> SessionPolicy {
        SessionPolicy {
            revoke_sessions_on_password_change: self.revoke_sessions_on_password_change,
        }
    }
}

fn parse_ttl(key: &str, raw: Option<String>, default_secs: i64) -> Result<Duration, ConfigError> {
    let Some(raw) = raw else {
        return Ok(Duration::seconds(default_secs));
    };
    match raw.trim().parse::<i64>() {
        Ok(secs) if secs > 0 => Ok(Duration::seconds(secs)),
        _ => Err(ConfigError::InvalidValue(
            key.to_string(),
            format!("'{}' is not a positive number of seconds", raw),
        )),
    }
}

fn parse_flag(key: &str, raw: Option<String>, default: bool) -> Result<bool, ConfigError> {
    let Some(raw) = raw else {
        return Ok(default);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue(
            key.to_string(),
            format!("'{}' is not a boolean", raw),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const BASE: [(&str, &str); 3] = [
        ("DATABASE_URL", "postgres://localhost/identity"),
        ("ACCESS_TOKEN_SECRET", "access"),
        ("REFRESH_TOKEN_SECRET", "refresh"),
    ];

    #[test]
    fn defaults_apply() {
        let config = Config::from_lookup(lookup(&BASE)).unwrap();
        assert_eq!(config.bind_address.port(), 8000);
        assert_eq!(config.access_token_ttl, Duration::minutes(15));
        assert_eq!(config.refresh_token_ttl, Duration::days(10));
        assert!(config.cookie_secure);
        assert!(!config.session_policy().revoke_sessions_on_password_change);
    }

    #[test]
    fn missing_secret_is_reported() {
        let err = Config::from_lookup(lookup(&BASE[..2])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar(var) if var == "REFRESH_TOKEN_SECRET"));
    }

    #[test]
    fn identical_secrets_are_rejected() {
        let mut pairs = BASE.to_vec();
        pairs.push(("REFRESH_TOKEN_SECRET", "access"));
        pairs.remove(2);
        let err = Config::from_lookup(lookup(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(..)));
    }

    #[test]
    fn overrides_are_parsed() {
        let mut pairs = BASE.to_vec();
        pairs.extend([
            ("ACCESS_TOKEN_TTL_SECS", "60"),
            ("COOKIE_SECURE", "false"),
            ("REVOKE_SESSIONS_ON_PASSWORD_CHANGE", "yes"),
            ("BIND_ADDRESS", "127.0.0.1:9000"),
        ]);
        let config = Config::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(config.access_token_ttl, Duration::seconds(60));
        assert!(!config.cookie_secure);
        assert!(config.revoke_sessions_on_password_change);
        assert_eq!(config.bind_address.port(), 9000);
    }

    #[test]
    fn bad_values_are_rejected() {
        for (key, value) in [
            ("ACCESS_TOKEN_TTL_SECS", "-5"),
            ("COOKIE_SECURE", "maybe"),
            ("RUST_LOG", "chatty"),
        ] {
            let mut pairs = BASE.to_vec();
            pairs.push((key, value));
            let err = Config::from_lookup(lookup(&pairs)).unwrap_err();
            assert!(matches!(err, ConfigError::InvalidValue(ref k, _) if k == key));
        }
    }
}
