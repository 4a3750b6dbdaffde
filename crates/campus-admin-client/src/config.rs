use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const DEFAULT_MESSAGE_LIMIT: u32 = 50;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be a positive integer, got '{value}'")]
    InvalidNumber { var: &'static str, value: String },
    #[error("{var} must not be empty")]
    Empty { var: &'static str },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Origin of the admin API, without the `/api/admin` suffix.
    pub base_url: String,
    pub request_timeout: Duration,
    pub page_size: u32,
    pub message_limit: u32,
    pub session_file: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            page_size: DEFAULT_PAGE_SIZE,
            message_limit: DEFAULT_MESSAGE_LIMIT,
            session_file: None,
        }
    }
}

impl ClientConfig {
    /// Read `CAMPUS_*` variables from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// `.env` (if present) followed by [`ClientConfig::from_env`].
    pub fn load() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_env()
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let base_url = match lookup("CAMPUS_API_BASE_URL") {
            Some(v) if v.trim().is_empty() => {
                return Err(ConfigError::Empty { var: "CAMPUS_API_BASE_URL" });
            }
            Some(v) => v.trim().trim_end_matches('/').to_string(),
            None => defaults.base_url,
        };

        let timeout_secs = positive(&lookup, "CAMPUS_API_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?;
        let page_size = positive(&lookup, "CAMPUS_DIRECTORY_PAGE_SIZE", u64::from(DEFAULT_PAGE_SIZE))?;
        let message_limit = positive(&lookup, "CAMPUS_MESSAGE_LIMIT", u64::from(DEFAULT_MESSAGE_LIMIT))?;

        let session_file = lookup("CAMPUS_SESSION_FILE")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);

        Ok(Self {
            base_url,
            request_timeout: Duration::from_secs(timeout_secs),
            page_size: narrow(page_size, "CAMPUS_DIRECTORY_PAGE_SIZE")?,
            message_limit: narrow(message_limit, "CAMPUS_MESSAGE_LIMIT")?,
            session_file,
        })
    }
}

fn positive<F>(lookup: &F, var: &'static str, default: u64) -> Result<u64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(var) else {
        return Ok(default);
    };
    match raw.trim().parse::<u64>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ConfigError::InvalidNumber { var, value: raw }),
    }
}

fn narrow(value: u64, var: &'static str) -> Result<u32, ConfigError> {
    u32::try_from(value).map_err(|_| ConfigError::InvalidNumber {
        var,
        value: value.to_string(),
    })
}
