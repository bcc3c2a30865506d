use std::env;
use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::error::AppError;

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/133.0.0.0 Safari/537.36";

/// Runtime settings, read from the environment (and `.env` when present).
#[derive(Clone, Debug)]
pub struct Config {
    /// Careers board listing page.
    pub board_url: Url,
    /// CSV file holding the listing history.
    pub store_path: PathBuf,
    pub request_timeout: Duration,
    /// Total time a single page fetch may spend retrying.
    pub retry_window: Duration,
    /// Upper bound on board pages followed in one snapshot.
    pub max_pages: usize,
    pub enrich: bool,
    /// Worker cadence between cycles.
    pub run_interval: Duration,
    pub user_agent: String,
}

impl Config {
    pub fn new(board_url: Url, store_path: impl Into<PathBuf>) -> Self {
        Self {
            board_url,
            store_path: store_path.into(),
            request_timeout: Duration::from_secs(30),
            retry_window: Duration::from_secs(120),
            max_pages: 20,
            enrich: true,
            run_interval: Duration::from_secs(60 * 60),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }

    /// Required: `BOARD_URL`. Optional: `STORE_PATH`, `REQUEST_TIMEOUT_SECS`,
    /// `RETRY_WINDOW_SECS`, `MAX_PAGES`, `ENRICH`, `RUN_INTERVAL_MINS`, `USER_AGENT`.
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw_url = lookup("BOARD_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| AppError::ConfigError("BOARD_URL must be set in .env or environment".to_string()))?;
        let board_url = Url::parse(raw_url.trim())
            .map_err(|e| AppError::ConfigError(format!("BOARD_URL '{}' is not a valid URL: {}", raw_url, e)))?;

        let mut config = Config::new(
            board_url,
            lookup("STORE_PATH").unwrap_or_else(|| "board_jobs.csv".to_string()),
        );

        if let Some(secs) = parse_var::<u64, _>(&lookup, "REQUEST_TIMEOUT_SECS")? {
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_var::<u64, _>(&lookup, "RETRY_WINDOW_SECS")? {
            config.retry_window = Duration::from_secs(secs);
        }
        if let Some(pages) = parse_var::<usize, _>(&lookup, "MAX_PAGES")? {
            if pages == 0 {
                return Err(AppError::ConfigError("MAX_PAGES must be at least 1".to_string()));
            }
            config.max_pages = pages;
        }
        if let Some(enrich) = parse_var::<bool, _>(&lookup, "ENRICH")? {
            config.enrich = enrich;
        }
        if let Some(mins) = parse_var::<u64, _>(&lookup, "RUN_INTERVAL_MINS")? {
            if mins == 0 {
                return Err(AppError::ConfigError("RUN_INTERVAL_MINS must be at least 1".to_string()));
            }
            config.run_interval = Duration::from_secs(mins * 60);
        }
        if let Some(agent) = lookup("USER_AGENT").filter(|v| !v.trim().is_empty()) {
            config.user_agent = agent;
        }

        Ok(config)
    }
}

fn parse_var<T, L>(lookup: &L, key: &str) -> Result<Option<T>, AppError>
where
    L: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| AppError::ConfigError(format!("{} has invalid value '{}': {}", key, raw, e))),
    }
}
