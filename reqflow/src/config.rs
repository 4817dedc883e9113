//! Configuration for clients, pipelines, retries and logging.
//!
//! Every struct deserializes with defaults for missing fields, so a partial
//! JSON document (or none at all) yields a usable configuration.

use crate::errors::ReqflowError;
use crate::steps::{RetryBackoff, RetryRequestSteps, DEFAULT_MAX_ATTEMPTS, DEFAULT_USER_AGENT};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Environment variable overriding the user agent.
pub const ENV_USER_AGENT: &str = "REQFLOW_USER_AGENT";
/// Environment variable overriding the retry cap.
pub const ENV_MAX_RETRIES: &str = "REQFLOW_MAX_RETRIES";
/// Environment variable overriding the log filter.
pub const ENV_LOG: &str = "REQFLOW_LOG";

/// Executor limits for a single pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Maximum number of entries into the response or error phase per run.
    #[serde(default = "default_max_phase_transitions")]
    pub max_phase_transitions: usize,
}

fn default_max_phase_transitions() -> usize {
    16
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_phase_transitions: default_max_phase_transitions(),
        }
    }
}

impl PipelineConfig {
    /// Sets the phase transition limit.
    #[must_use]
    pub fn with_max_phase_transitions(mut self, limit: usize) -> Self {
        self.max_phase_transitions = limit;
        self
    }
}

/// Retry step configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retries after the initial attempt.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u64,
    /// Whether retries replay the request steps.
    #[serde(default)]
    pub request_steps: RetryRequestSteps,
    /// Delay policy between attempts.
    #[serde(default)]
    pub backoff: RetryBackoff,
}

fn default_max_attempts() -> u64 {
    DEFAULT_MAX_ATTEMPTS
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            request_steps: RetryRequestSteps::default(),
            backoff: RetryBackoff::default(),
        }
    }
}

impl RetryConfig {
    /// Sets the maximum attempts.
    #[must_use]
    pub fn with_max_attempts(mut self, attempts: u64) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Sets the request step handling on retry.
    #[must_use]
    pub fn with_request_steps(mut self, mode: RetryRequestSteps) -> Self {
        self.request_steps = mode;
        self
    }

    /// Sets the backoff policy.
    #[must_use]
    pub fn with_backoff(mut self, backoff: RetryBackoff) -> Self {
        self.backoff = backoff;
        self
    }
}

/// Settings for the bundled transport.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: f64,
}

fn default_timeout() -> f64 {
    30.0
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout(),
        }
    }
}

impl TransportConfig {
    /// Gets timeout as Duration.
    ///
    /// Fails for NaN, non-positive values and values too large for a
    /// `Duration`.
    pub fn timeout(&self) -> Result<Duration, ReqflowError> {
        match Duration::try_from_secs_f64(self.timeout_seconds) {
            Ok(timeout) if !timeout.is_zero() => Ok(timeout),
            _ => Err(ReqflowError::InvalidConfig(format!(
                "transport.timeout_seconds must be a positive number of seconds, got {}",
                self.timeout_seconds
            ))),
        }
    }
}

/// Logging configuration consumed by `observability::init_tracing`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    /// `EnvFilter` directive string, e.g. `"reqflow=debug"`.
    #[serde(default = "default_log_filter")]
    pub filter: String,
    /// Emit JSON lines instead of human readable output.
    #[serde(default)]
    pub json: bool,
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            json: false,
        }
    }
}

/// Top-level client configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// User agent added by the default request steps.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Retry step settings.
    #[serde(default)]
    pub retry: RetryConfig,
    /// Executor limits.
    #[serde(default)]
    pub pipeline: PipelineConfig,
    /// Bundled transport settings.
    #[serde(default)]
    pub transport: TransportConfig,
    /// Logging settings.
    #[serde(default)]
    pub log: LogConfig,
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            retry: RetryConfig::default(),
            pipeline: PipelineConfig::default(),
            transport: TransportConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a JSON document, filling missing fields with defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ReqflowError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a JSON configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ReqflowError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Builds a configuration from defaults overridden by `REQFLOW_*` variables.
    pub fn from_env() -> Result<Self, ReqflowError> {
        Self::default().with_env_overrides(|key| std::env::var(key).ok())
    }

    /// Applies overrides from a variable lookup.
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Result<Self, ReqflowError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(agent) = lookup(ENV_USER_AGENT) {
            self.user_agent = agent;
        }
        if let Some(raw) = lookup(ENV_MAX_RETRIES) {
            self.retry.max_attempts = raw.trim().parse().map_err(|_| {
                ReqflowError::InvalidConfig(format!("{ENV_MAX_RETRIES} must be an integer, got '{raw}'"))
            })?;
        }
        if let Some(filter) = lookup(ENV_LOG) {
            self.log.filter = filter;
        }
        self.validate()?;
        Ok(self)
    }

    /// Sets the user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Sets the retry configuration.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Sets the pipeline configuration.
    #[must_use]
    pub fn with_pipeline(mut self, pipeline: PipelineConfig) -> Self {
        self.pipeline = pipeline;
        self
    }

    /// Checks value ranges.
    pub fn validate(&self) -> Result<(), ReqflowError> {
        if self.user_agent.trim().is_empty() {
            return Err(ReqflowError::InvalidConfig("user_agent must not be empty".to_string()));
        }
        if self.pipeline.max_phase_transitions == 0 {
            return Err(ReqflowError::InvalidConfig(
                "pipeline.max_phase_transitions must be at least 1".to_string(),
            ));
        }
        self.transport.timeout()?;
        Ok(())
    }
}
