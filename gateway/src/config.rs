//! Gateway configuration from environment variables

use situational_data::{PgSettings, DEFAULT_QUERY_TIMEOUT};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("invalid value for {key}: '{value}' ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub bind_addr: String,
    pub port: u16,
    /// `None` runs in offline mode: every domain serves its fallback set.
    pub database: Option<PgSettings>,
    pub query_timeout: Duration,
    pub fallback_dir: Option<PathBuf>,
    pub web_root: PathBuf,
}

impl GatewayConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = PgSettings::default();

        let database = if parse_bool(&lookup, "DB_ENABLED", true)? {
            Some(PgSettings {
                url: lookup("DATABASE_URL").filter(|url| !url.is_empty()),
                host: lookup("DB_HOST").unwrap_or(defaults.host),
                port: parse_var(&lookup, "DB_PORT", defaults.port)?,
                database: lookup("DB_NAME").unwrap_or(defaults.database),
                user: lookup("DB_USER").unwrap_or(defaults.user),
                password: lookup("DB_PASSWORD").unwrap_or(defaults.password),
                ssl: parse_bool(&lookup, "DB_SSL", defaults.ssl)?,
                max_connections: parse_var(&lookup, "DB_POOL_MAX", defaults.max_connections)?,
                connect_timeout: parse_millis(&lookup, "DB_CONNECTION_TIMEOUT", defaults.connect_timeout)?,
                idle_timeout: parse_millis(&lookup, "DB_IDLE_TIMEOUT", defaults.idle_timeout)?,
                acquire_timeout: parse_millis(&lookup, "DB_ACQUIRE_TIMEOUT", defaults.acquire_timeout)?,
            })
        } else {
            None
        };

        Ok(Self {
            bind_addr: lookup("BIND_ADDR").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_var(&lookup, "PORT", 3000)?,
            database,
            query_timeout: parse_millis(&lookup, "DB_QUERY_TIMEOUT", DEFAULT_QUERY_TIMEOUT)?,
            fallback_dir: lookup("SA_FALLBACK_DIR").map(PathBuf::from),
            web_root: lookup("SA_WEB_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("src/web")),
        })
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}

fn parse_var<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse::<T>().map_err(|e| ConfigError::Invalid {
            key,
            value: raw.clone(),
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}

fn parse_millis<F>(lookup: &F, key: &'static str, default: Duration) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let millis = parse_var(lookup, key, default.as_millis() as u64)?;
    Ok(Duration::from_millis(millis))
}

fn parse_bool<F>(lookup: &F, key: &'static str, default: bool) -> Result<bool, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return Ok(default);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::Invalid {
            key,
            value: raw,
            reason: "expected true or false".to_string(),
        }),
    }
}
