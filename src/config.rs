//! Loader configuration from environment variables
//!
//! Everything comes from the environment (optionally seeded from a `.env`
//! file by the binary). [`LoaderConfig::from_lookup`] takes any key lookup
//! so callers and tests can supply values without touching process state.

use crate::error::{LoadError, Result};
use crate::remote::{Credentials, PollPolicy};
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const ENV_ENGINE_HOST: &str = "ENGINE_HOST";
pub const ENV_ENGINE_PORT: &str = "ENGINE_PORT";
pub const ENV_ENGINE_USE_TLS: &str = "ENGINE_USE_TLS";
pub const ENV_ENGINE_USER: &str = "ENGINE_USER";
pub const ENV_ENGINE_PASSWORD: &str = "ENGINE_PASSWORD";
pub const ENV_ENGINE_AUTH_SCHEME: &str = "ENGINE_AUTH_SCHEME";
pub const ENV_ENGINE_LOGIN_PATH: &str = "ENGINE_LOGIN_PATH";
pub const ENV_ENGINE_API_PATH: &str = "ENGINE_API_PATH";
pub const ENV_BATCH_SIZE: &str = "LOAD_BATCH_SIZE";
pub const ENV_POLL_INTERVAL_SECS: &str = "JOB_POLL_INTERVAL_SECS";
pub const ENV_MAX_POLLS: &str = "JOB_MAX_POLLS";
pub const ENV_TARGET_NAMESPACE: &str = "TARGET_NAMESPACE";
pub const ENV_DATA_FOLDER: &str = "DATA_FOLDER";

pub const DEFAULT_BATCH_SIZE: usize = 500;
pub const DEFAULT_NAMESPACE: &str = "catalog.bronze";

/// Where and how to reach the engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub host: String,
    pub port: u16,
    pub use_tls: bool,
    /// Prefix placed before the token in the Authorization header
    pub auth_scheme: String,
    pub login_path: String,
    pub api_path: String,
    pub request_timeout_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 9047,
            use_tls: false,
            auth_scheme: "_dremio".to_string(),
            login_path: "/apiv2/login".to_string(),
            api_path: "/api/v3".to_string(),
            request_timeout_secs: 300,
        }
    }
}

impl EngineConfig {
    pub fn base_url(&self) -> String {
        let scheme = if self.use_tls { "https" } else { "http" };
        format!("{}://{}:{}", scheme, self.host, self.port)
    }
}

/// Settings for one materialization run
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    pub engine: EngineConfig,
    pub credentials: Credentials,
    pub batch_size: NonZeroUsize,
    pub poll: PollPolicy,
    pub namespace: String,
    pub data_dir: PathBuf,
}

impl LoaderConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = EngineConfig::default();

        let engine = EngineConfig {
            host: get(ENV_ENGINE_HOST).unwrap_or(defaults.host),
            port: parse_or(&get, ENV_ENGINE_PORT, defaults.port)?,
            use_tls: parse_or(&get, ENV_ENGINE_USE_TLS, defaults.use_tls)?,
            auth_scheme: lookup(ENV_ENGINE_AUTH_SCHEME).unwrap_or(defaults.auth_scheme),
            login_path: get(ENV_ENGINE_LOGIN_PATH).unwrap_or(defaults.login_path),
            api_path: get(ENV_ENGINE_API_PATH).unwrap_or(defaults.api_path),
            request_timeout_secs: defaults.request_timeout_secs,
        };

        let user = get(ENV_ENGINE_USER).ok_or_else(|| missing(ENV_ENGINE_USER))?;
        let password = get(ENV_ENGINE_PASSWORD).ok_or_else(|| missing(ENV_ENGINE_PASSWORD))?;

        let batch_size: usize = parse_or(&get, ENV_BATCH_SIZE, DEFAULT_BATCH_SIZE)?;
        let batch_size = NonZeroUsize::new(batch_size)
            .ok_or_else(|| LoadError::Config(format!("{} must be greater than zero", ENV_BATCH_SIZE)))?;

        let default_poll = PollPolicy::default();
        let interval_secs: f64 = parse_or(
            &get,
            ENV_POLL_INTERVAL_SECS,
            default_poll.interval.as_secs_f64(),
        )?;
        let interval = Duration::try_from_secs_f64(interval_secs).map_err(|_| {
            LoadError::Config(format!("{} must be a non-negative number", ENV_POLL_INTERVAL_SECS))
        })?;
        let max_attempts: u32 = parse_or(&get, ENV_MAX_POLLS, default_poll.max_attempts)?;
        if max_attempts == 0 {
            return Err(LoadError::Config(format!(
                "{} must be greater than zero",
                ENV_MAX_POLLS
            )));
        }

        Ok(Self {
            engine,
            credentials: Credentials::new(user, password),
            batch_size,
            poll: PollPolicy::new(interval, max_attempts),
            namespace: get(ENV_TARGET_NAMESPACE).unwrap_or_else(|| DEFAULT_NAMESPACE.to_string()),
            data_dir: get(ENV_DATA_FOLDER)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("/data")),
        })
    }
}

fn missing(key: &str) -> LoadError {
    LoadError::Config(format!("{} is not set", key))
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| LoadError::Config(format!("{}: cannot parse '{}'", key, raw))),
        None => Ok(default),
    }
}
