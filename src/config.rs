use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

fn default_max_file_size() -> usize {
    // 10 MB in bytes
    10 * 1024 * 1024
}

const DEFAULT_ADDR: &str = "127.0.0.1:3000";
const DEFAULT_DATABASE_PATH: &str = "users.db";
const DEFAULT_SESSION_IDLE_SECS: u64 = 30 * 60;

#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub database_path: String,
    pub max_file_size: usize,
    pub session_idle: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            database_path: DEFAULT_DATABASE_PATH.to_string(),
            max_file_size: default_max_file_size(),
            session_idle: Duration::from_secs(DEFAULT_SESSION_IDLE_SECS),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        // Load .env file first
        dotenv().ok();

        let addr = env_or("SHEET_DASHBOARD_ADDR", DEFAULT_ADDR.to_string())?;
        let database_path = env_or("DATABASE_PATH", DEFAULT_DATABASE_PATH.to_string())?;
        let max_file_size = env_or("MAX_FILE_SIZE", default_max_file_size())?;
        let idle_secs = env_or("SESSION_IDLE_SECS", DEFAULT_SESSION_IDLE_SECS)?;

        Ok(Config {
            addr: addr
                .parse()
                .with_context(|| format!("Invalid SHEET_DASHBOARD_ADDR: {}", addr))?,
            database_path,
            max_file_size,
            session_idle: Duration::from_secs(idle_secs),
        })
    }
}

fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Failed to parse {}", key)),
        Err(_) => Ok(default),
    }
}

pub fn load_config() -> Result<Config> {
    let config = Config::from_env()?;
    tracing::info!(
        "Loaded config: addr={}, database={}, max upload={}KB",
        config.addr,
        config.database_path,
        config.max_file_size / 1024
    );
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.max_file_size, 10 * 1024 * 1024);
        assert_eq!(config.addr.port(), 3000);
        assert_eq!(config.session_idle, Duration::from_secs(1800));
    }

    #[test]
    fn test_env_or_falls_back_when_unset() {
        let value: u64 = env_or("SHEET_DASHBOARD_TEST_UNSET_KEY", 7).unwrap();
        assert_eq!(value, 7);
    }
}
