use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::errors::ConfigError;
use crate::judge::DEFAULT_BATCH_SIZE;
use crate::llm_client::ClientPolicy;

/// Binary configuration loaded from environment variables (and `.env` if present).
#[derive(Debug, Clone)]
pub struct Config {
    pub anthropic_api_key: String,
    pub rust_log: String,
    pub pipeline: PipelineConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let pipeline = PipelineConfig::from_lookup(|key| std::env::var(key).ok())
            .context("Invalid screener configuration")?;

        Ok(Config {
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            pipeline,
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

/// Knobs of one pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Worker count W of every stage.
    pub concurrency: usize,
    /// Candidates per judge call (B).
    pub judge_batch_size: usize,
    pub per_call_timeout: Duration,
    pub max_retries: u32,
    /// Wall-clock budget of the whole run. `None` means unbounded.
    pub run_deadline: Option<Duration>,
    /// Ceiling on simultaneous requests to the inference backend.
    pub max_concurrent_requests: usize,
    pub enable_cleaning: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let policy = ClientPolicy::default();
        Self {
            concurrency: default_concurrency(policy.max_concurrent_requests),
            judge_batch_size: DEFAULT_BATCH_SIZE,
            per_call_timeout: policy.per_call_timeout,
            max_retries: policy.max_retries,
            run_deadline: None,
            max_concurrent_requests: policy.max_concurrent_requests,
            enable_cleaning: true,
        }
    }
}

/// Twice the available parallelism, never above the request ceiling.
pub fn default_concurrency(max_concurrent_requests: usize) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    (2 * cores).min(max_concurrent_requests).max(1)
}

impl PipelineConfig {
    /// Builds a config from `SCREENER_*` keys looked up through `lookup`.
    /// Absent keys keep their defaults; an unset concurrency follows the request ceiling.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let max_concurrent_requests = parse_key(&lookup, "SCREENER_MAX_CONCURRENT_REQUESTS")?
            .unwrap_or(defaults.max_concurrent_requests);
        let concurrency = parse_key(&lookup, "SCREENER_CONCURRENCY")?
            .unwrap_or_else(|| default_concurrency(max_concurrent_requests.max(1)));

        let config = Self {
            concurrency,
            judge_batch_size: parse_key(&lookup, "SCREENER_JUDGE_BATCH_SIZE")?
                .unwrap_or(defaults.judge_batch_size),
            per_call_timeout: parse_key(&lookup, "SCREENER_CALL_TIMEOUT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.per_call_timeout),
            max_retries: parse_key(&lookup, "SCREENER_MAX_RETRIES")?
                .unwrap_or(defaults.max_retries),
            run_deadline: parse_key(&lookup, "SCREENER_RUN_DEADLINE_SECS")?
                .map(Duration::from_secs),
            max_concurrent_requests,
            enable_cleaning: parse_bool(&lookup, "SCREENER_ENABLE_CLEANING")?
                .unwrap_or(defaults.enable_cleaning),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let checks = [
            ("concurrency", self.concurrency == 0),
            ("judge_batch_size", self.judge_batch_size == 0),
            ("per_call_timeout", self.per_call_timeout.is_zero()),
            ("max_concurrent_requests", self.max_concurrent_requests == 0),
        ];
        match checks.iter().find(|(_, is_zero)| *is_zero) {
            Some((field, _)) => Err(ConfigError::Zero { field: *field }),
            None => Ok(()),
        }
    }

    /// Retry/timeout/rate-limit policy for the inference client.
    pub fn client_policy(&self) -> ClientPolicy {
        ClientPolicy {
            per_call_timeout: self.per_call_timeout,
            max_retries: self.max_retries,
            max_concurrent_requests: self.max_concurrent_requests,
            ..ClientPolicy::default()
        }
    }
}

fn parse_key<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>, ConfigError> {
    match lookup(key) {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => raw.trim().parse().map(Some).map_err(|_| ConfigError::Invalid {
            key: key.to_string(),
            value: raw,
        }),
    }
}

fn parse_bool(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<bool>, ConfigError> {
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "" => Ok(None),
        "1" | "true" | "yes" | "on" => Ok(Some(true)),
        "0" | "false" | "no" | "off" => Ok(Some(false)),
        _ => Err(ConfigError::Invalid {
            key: key.to_string(),
            value: raw,
        }),
    }
}
