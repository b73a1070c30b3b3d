use std::env;
use std::fmt::Display;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::api::ApiConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub addr: String,
    pub max_queue_depth: usize,
    pub max_body_bytes: usize,
    pub request_timeout_ms: u64,
    pub shutdown_timeout_ms: u64,
    pub enable_tracing: bool,
}

/// Values read from a TOML config file. Every key is optional.
#[derive(Debug, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct FileConfig {
    pub addr: Option<String>,
    pub max_queue_depth: Option<usize>,
    pub max_body_bytes: Option<usize>,
    pub request_timeout_ms: Option<u64>,
    pub shutdown_timeout_ms: Option<u64>,
    pub enable_tracing: Option<bool>,
}

/// Command-line values; these win over every other source.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub addr: Option<String>,
    pub max_queue_depth: Option<usize>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("config parse error: {0}")]
    Parse(String),
    #[error("listen address is required (--addr, SIMPLEMQ_ADDR or `addr` in the config file)")]
    MissingAddr,
}

impl FileConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }
}

impl Config {
    /// Load configuration from an optional file, the process environment and
    /// command-line overrides.
    ///
    /// Precedence: defaults < file < environment < command line.
    pub fn load(path: Option<&str>, overrides: Overrides) -> Result<Self, ConfigError> {
        Self::resolve(path, overrides, |key| env::var(key).ok())
    }

    /// Same as [`Config::load`] with an explicit environment lookup.
    pub fn resolve<F>(path: Option<&str>, overrides: Overrides, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let effective_path = path.map(str::to_string).or_else(|| env("SIMPLEMQ_CONFIG"));
        let file_cfg = match effective_path {
            Some(p) => FileConfig::load(p)?,
            None => FileConfig::default(),
        };

        let defaults = ApiConfig::default();

        let mut addr = file_cfg.addr;
        let mut max_queue_depth = file_cfg.max_queue_depth.unwrap_or(0);
        let mut max_body_bytes = file_cfg.max_body_bytes.unwrap_or(defaults.max_body_bytes);
        let mut request_timeout_ms = file_cfg
            .request_timeout_ms
            .unwrap_or(defaults.request_timeout.as_millis() as u64);
        let mut shutdown_timeout_ms = file_cfg
            .shutdown_timeout_ms
            .unwrap_or(defaults.shutdown_timeout.as_millis() as u64);
        let mut enable_tracing = file_cfg.enable_tracing.unwrap_or(defaults.enable_tracing);

        // Env overrides.
        if let Some(v) = env("SIMPLEMQ_ADDR") {
            addr = Some(v);
        }
        if let Some(v) = parse_env(&env, "SIMPLEMQ_MAX_QUEUE_DEPTH")? {
            max_queue_depth = v;
        }
        if let Some(v) = parse_env(&env, "SIMPLEMQ_MAX_BODY_BYTES")? {
            max_body_bytes = v;
        }
        if let Some(v) = parse_env(&env, "SIMPLEMQ_REQUEST_TIMEOUT_MS")? {
            request_timeout_ms = v;
        }
        if let Some(v) = parse_env(&env, "SIMPLEMQ_SHUTDOWN_TIMEOUT_MS")? {
            shutdown_timeout_ms = v;
        }
        if let Some(v) = env("SIMPLEMQ_ENABLE_TRACING") {
            enable_tracing = matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on");
        }

        // Command-line overrides.
        if let Some(v) = overrides.addr {
            addr = Some(v);
        }
        if let Some(v) = overrides.max_queue_depth {
            max_queue_depth = v;
        }

        let addr = addr
            .filter(|a| !a.trim().is_empty())
            .ok_or(ConfigError::MissingAddr)?;

        Ok(Config {
            addr,
            max_queue_depth,
            max_body_bytes,
            request_timeout_ms,
            shutdown_timeout_ms,
            enable_tracing,
        })
    }

    pub fn api_config(&self) -> ApiConfig {
        ApiConfig {
            enable_tracing: self.enable_tracing,
            max_body_bytes: self.max_body_bytes,
            request_timeout: Duration::from_millis(self.request_timeout_ms),
            shutdown_timeout: Duration::from_millis(self.shutdown_timeout_ms),
        }
    }
}

fn parse_env<F, T>(env: &F, key: &str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    env(key)
        .map(|v| {
            v.trim()
                .parse()
                .map_err(|e| ConfigError::Parse(format!("{key}: {e}")))
        })
        .transpose()
}
