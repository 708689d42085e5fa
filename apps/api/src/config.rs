use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub rust_log: String,
    pub db_max_connections: u32,
    pub matching: MatchingConfig,
}

/// Limits applied to relevance queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchingConfig {
    pub default_page_limit: i64,
    pub max_page_limit: i64,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            default_page_limit: 10,
            max_page_limit: 100,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let defaults = MatchingConfig::default();
        let matching = MatchingConfig {
            default_page_limit: parse_env("DEFAULT_PAGE_LIMIT", defaults.default_page_limit)?,
            max_page_limit: parse_env("MAX_PAGE_LIMIT", defaults.max_page_limit)?,
        };
        if matching.default_page_limit < 1 || matching.default_page_limit > matching.max_page_limit
        {
            anyhow::bail!(
                "DEFAULT_PAGE_LIMIT ({}) must be between 1 and MAX_PAGE_LIMIT ({})",
                matching.default_page_limit,
                matching.max_page_limit
            );
        }

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            port: parse_env("PORT", 8080u16)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            db_max_connections: parse_env("DB_MAX_CONNECTIONS", 10u32)?,
            matching,
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number, got '{raw}'")),
        Err(_) => Ok(default),
    }
}
