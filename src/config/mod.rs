use anyhow::{anyhow, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::net::SocketAddr;
use std::str::FromStr;
use url::Url;

/// About a century; longer windows are indistinguishable from keeping rows forever.
pub const MAX_READ_RETENTION_DAYS: u64 = 36_500;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub http_addr: SocketAddr,
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_connect_timeout_seconds: u64,
    pub db_idle_timeout_seconds: u64,
    pub db_max_lifetime_seconds: u64,
    pub admin_token: Option<String>,
    pub paseto_access_key: [u8; 32],
    pub access_ttl_minutes: u64,
    pub nonce_key: [u8; 32],
    pub nonce_lifetime_seconds: u64,
    pub read_retention_days: Option<u64>,
    pub retention_interval_seconds: u64,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let http_addr: SocketAddr = env_or_parse("HTTP_ADDR", "0.0.0.0:8080")?;

        let nonce_lifetime_seconds: u64 = env_or_parse("NONCE_LIFETIME_SECONDS", "86400")?;
        if nonce_lifetime_seconds < 2 {
            return Err(anyhow!("invalid NONCE_LIFETIME_SECONDS: must be at least 2"));
        }

        let read_retention_days: Option<u64> = env_opt_parse("READ_RETENTION_DAYS")?;
        if read_retention_days.map_or(false, |days| days > MAX_READ_RETENTION_DAYS) {
            return Err(anyhow!(
                "invalid READ_RETENTION_DAYS: must be at most {}",
                MAX_READ_RETENTION_DAYS
            ));
        }

        Ok(Self {
            http_addr,
            database_url: env_or_err("DATABASE_URL")?,
            db_max_connections: env_or_parse("DB_MAX_CONNECTIONS", "25")?,
            db_connect_timeout_seconds: env_or_parse("DB_CONNECT_TIMEOUT_SECONDS", "5")?,
            db_idle_timeout_seconds: env_or_parse("DB_IDLE_TIMEOUT_SECONDS", "300")?,
            db_max_lifetime_seconds: env_or_parse("DB_MAX_LIFETIME_SECONDS", "1800")?,
            admin_token: std::env::var("ADMIN_TOKEN").ok(),
            paseto_access_key: env_key_32("PASETO_ACCESS_KEY")?,
            access_ttl_minutes: env_or_parse("ACCESS_TTL_MINUTES", "15")?,
            nonce_key: env_key_32("NONCE_KEY")?,
            nonce_lifetime_seconds,
            read_retention_days,
            retention_interval_seconds: env_or_parse("RETENTION_INTERVAL_SECONDS", "3600")?,
        })
    }
}

/// Settings for `APP_MODE=client`, which needs no database or keys.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub base_url: Url,
    pub bearer_token: Option<String>,
}

impl ClientConfig {
    pub fn from_env() -> Result<Self> {
        let base_url = env_or_err("CLIENT_BASE_URL")?;
        let base_url =
            Url::parse(&base_url).map_err(|err| anyhow!("invalid CLIENT_BASE_URL: {}", err))?;

        Ok(Self {
            base_url,
            bearer_token: std::env::var("CLIENT_BEARER_TOKEN").ok(),
        })
    }
}

pub fn app_mode() -> String {
    env_or("APP_MODE", "api")
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_or_err(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| anyhow!("missing required env var: {}", key))
}

fn env_or_parse<T>(key: &str, default: &str) -> Result<T>
where
    T: FromStr,
    <T as FromStr>::Err: std::fmt::Display,
{
    let value = std::env::var(key).unwrap_or_else(|_| default.to_string());
    value
        .parse::<T>()
        .map_err(|err| anyhow!("invalid {}: {}", key, err))
}

fn env_opt_parse<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    <T as FromStr>::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|err| anyhow!("invalid {}: {}", key, err)),
        _ => Ok(None),
    }
}

fn env_key_32(key: &str) -> Result<[u8; 32]> {
    let value = env_or_err(key)?;
    decode_key_32(key, &value)
}

pub fn decode_key_32(key: &str, value: &str) -> Result<[u8; 32]> {
    let decoded = STANDARD
        .decode(value.as_bytes())
        .map_err(|err| anyhow!("invalid {}: {}", key, err))?;
    if decoded.len() != 32 {
        return Err(anyhow!("invalid {}: expected 32 bytes", key));
    }
    let mut key_bytes = [0u8; 32];
    key_bytes.copy_from_slice(&decoded);
    Ok(key_bytes)
}
