//! Process settings from the environment (`.env` is loaded first by the binary).

use crate::error::ConfigError;
use std::path::PathBuf;
use std::str::FromStr;

/// Which store backs the API.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreKind {
    Postgres,
    Memory,
}

impl FromStr for StoreKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StoreKind::Postgres),
            "memory" => Ok(StoreKind::Memory),
            _ => Err(ConfigError::Validation(format!(
                "invalid COURSEHUB_STORE: {} (expected postgres or memory)",
                s
            ))),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Settings {
    pub database_url: String,
    pub bind_addr: String,
    pub store: StoreKind,
    /// None means a random per-process secret.
    pub jwt_secret: Option<String>,
    pub token_ttl_hours: i64,
    pub model_path: Option<PathBuf>,
    pub max_body_bytes: usize,
    pub db_max_connections: u32,
    /// Fill an empty store with sample data at startup.
    pub seed: bool,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env` but reads through `lookup`, so tests need not touch the process env.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Ok(Settings {
            database_url: non_empty("DATABASE_URL")
                .unwrap_or_else(|| "postgres://localhost/coursehub".into()),
            bind_addr: non_empty("COURSEHUB_BIND").unwrap_or_else(|| "0.0.0.0:5001".into()),
            store: non_empty("COURSEHUB_STORE")
                .map(|s| s.parse())
                .transpose()?
                .unwrap_or(StoreKind::Postgres),
            jwt_secret: non_empty("JWT_SECRET"),
            token_ttl_hours: parse_or("TOKEN_TTL_HOURS", non_empty("TOKEN_TTL_HOURS"), 24)?,
            model_path: non_empty("COURSEHUB_MODEL_PATH").map(PathBuf::from),
            max_body_bytes: parse_or("MAX_BODY_BYTES", non_empty("MAX_BODY_BYTES"), 1024 * 1024)?,
            db_max_connections: parse_or("DB_MAX_CONNECTIONS", non_empty("DB_MAX_CONNECTIONS"), 5)?,
            seed: non_empty("COURSEHUB_SEED")
                .map(|v| parse_flag("COURSEHUB_SEED", &v))
                .transpose()?
                .unwrap_or(false),
        })
    }
}

fn parse_or<T: FromStr>(key: &str, raw: Option<String>, default: T) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(v) => v
            .trim()
            .parse()
            .map_err(|_| ConfigError::Validation(format!("invalid {}: {}", key, v))),
    }
}

fn parse_flag(key: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Validation(format!("invalid {}: {}", key, raw))),
    }
}
