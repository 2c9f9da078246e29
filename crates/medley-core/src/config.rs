//! Configuration module
//!
//! Process-level settings read from the environment (and `.env`). Backend
//! instances are not configured here; they live in the backend configuration
//! file named by `MEDLEY_BACKENDS_FILE`.

use std::env;
use std::path::{Path, PathBuf};

const DEFAULT_BACKENDS_FILE: &str = "backends.json";
const HTTP_TIMEOUT_SECS: u64 = 30;
const DEFAULT_USER_AGENT: &str = concat!("medley/", env!("CARGO_PKG_VERSION"));

#[derive(Clone, Debug)]
pub struct MedleyConfig {
    pub backends_file: PathBuf,
    pub http_timeout_secs: u64,
    pub http_user_agent: String,
    pub environment: String,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config(pub Box<MedleyConfig>);

impl Config {
    fn inner(&self) -> &MedleyConfig {
        &self.0
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        let config = MedleyConfig::from_lookup(|key| env::var(key).ok())?;
        Ok(Config(Box::new(config)))
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.inner().validate()
    }

    pub fn is_production(&self) -> bool {
        let env = self.inner().environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn backends_file(&self) -> &Path {
        &self.inner().backends_file
    }

    pub fn http_timeout_secs(&self) -> u64 {
        self.inner().http_timeout_secs
    }

    pub fn http_user_agent(&self) -> &str {
        &self.inner().http_user_agent
    }

    pub fn environment(&self) -> &str {
        &self.inner().environment
    }
}

impl MedleyConfig {
    /// Build from an arbitrary key lookup. `from_env` passes `std::env::var`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let backends_file = lookup("MEDLEY_BACKENDS_FILE")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_BACKENDS_FILE));

        let http_timeout_secs = match lookup("MEDLEY_HTTP_TIMEOUT_SECS") {
            Some(raw) => raw.trim().parse::<u64>().map_err(|e| {
                anyhow::anyhow!("MEDLEY_HTTP_TIMEOUT_SECS must be a number of seconds: {}", e)
            })?,
            None => HTTP_TIMEOUT_SECS,
        };

        let http_user_agent =
            lookup("MEDLEY_HTTP_USER_AGENT").unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());

        let environment = lookup("ENVIRONMENT")
            .or_else(|| lookup("APP_ENV"))
            .unwrap_or_else(|| "development".to_string());

        Ok(Self {
            backends_file,
            http_timeout_secs,
            http_user_agent,
            environment,
        })
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.http_timeout_secs == 0 {
            return Err(anyhow::anyhow!(
                "MEDLEY_HTTP_TIMEOUT_SECS must be greater than zero"
            ));
        }

        if self.http_user_agent.trim().is_empty() {
            return Err(anyhow::anyhow!("MEDLEY_HTTP_USER_AGENT must not be empty"));
        }

        Ok(())
    }
}
