//! Console configuration, read from the environment (and `.env`).

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Duration;

use crate::selection::Role;

pub const DEFAULT_API_URL: &str = "http://localhost:5000";
pub const DEFAULT_STATE_FILE: &str = "selection.json";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// Base URL of the dashboard API
    pub api_url: String,
    /// Where the selected agent/landlord/property are persisted
    pub state_file: PathBuf,
    pub role: Role,
    /// Bearer token sent with every request
    pub token: Option<String>,
    pub timeout: Duration,
    /// Daily rolling log files go here when set
    pub log_dir: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            state_file: PathBuf::from(DEFAULT_STATE_FILE),
            role: Role::Admin,
            token: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            log_dir: None,
        }
    }
}

impl AppConfig {
    /// Load `.env` if present, then read `LEASEHOLD_*` variables
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let role = match var("LEASEHOLD_ROLE") {
            Some(raw) => raw.parse().context("Invalid LEASEHOLD_ROLE")?,
            None => defaults.role,
        };
        let timeout = match var("LEASEHOLD_TIMEOUT_SECS") {
            Some(raw) => Duration::from_secs(
                raw.parse::<u64>()
                    .with_context(|| format!("Invalid LEASEHOLD_TIMEOUT_SECS: {}", raw))?,
            ),
            None => defaults.timeout,
        };

        Ok(Self {
            api_url: var("LEASEHOLD_API_URL").unwrap_or(defaults.api_url),
            state_file: var("LEASEHOLD_STATE_FILE").map(PathBuf::from).unwrap_or(defaults.state_file),
            role,
            token: var("LEASEHOLD_TOKEN"),
            timeout,
            log_dir: var("LEASEHOLD_LOG_DIR").map(PathBuf::from),
        })
    }
}
