//! Bounded retry built out of nested runs and halts.
//!
//! `Retry` counts attempts in the private map under [`RETRY_ATTEMPT_KEY`].
//! Below the cap it re-runs a derived pipeline and halts the current run with
//! that nested outcome; at the cap it passes the value through so the current
//! phase finishes with the original failure. The step does not look at what
//! it retries: callers decide which responses or errors reach it.

use super::{SharedStep, Step, StepResult};
use crate::config::RetryConfig;
use crate::core::{Halt, Response};
use crate::errors::PipelineError;
use crate::pipeline::PipelineState;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Private map key holding the number of retries performed so far.
pub const RETRY_ATTEMPT_KEY: &str = "retry_attempt";

/// Retries performed after the initial attempt unless configured otherwise.
pub const DEFAULT_MAX_ATTEMPTS: u64 = 2;

/// How a retry treats the request steps of the pipeline it re-runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryRequestSteps {
    /// Clear the request steps and resend the originally built request.
    #[default]
    Skip,
    /// Run the request steps again on the originally built request.
    Replay,
}

/// Backoff strategy for retry delays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffStrategy {
    /// Retry immediately.
    #[default]
    None,
    /// delay = base
    Constant,
    /// delay = base * attempt
    Linear,
    /// delay = base * 2^(attempt - 1)
    Exponential,
}

/// Jitter strategy to prevent thundering herd.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JitterStrategy {
    /// No jitter
    #[default]
    None,
    /// Random from 0 to delay
    Full,
    /// Half fixed, half random
    Equal,
}

/// Delay policy applied before each nested run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryBackoff {
    /// Backoff strategy.
    #[serde(default)]
    pub strategy: BackoffStrategy,
    /// Jitter strategy.
    #[serde(default)]
    pub jitter: JitterStrategy,
    /// Base delay in milliseconds.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Maximum delay cap in milliseconds.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

fn default_base_delay_ms() -> u64 {
    100
}

fn default_max_delay_ms() -> u64 {
    30_000
}

impl Default for RetryBackoff {
    fn default() -> Self {
        Self {
            strategy: BackoffStrategy::None,
            jitter: JitterStrategy::None,
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl RetryBackoff {
    /// Exponential backoff with full jitter.
    #[must_use]
    pub fn exponential(base_delay_ms: u64) -> Self {
        Self {
            strategy: BackoffStrategy::Exponential,
            jitter: JitterStrategy::Full,
            base_delay_ms,
            ..Self::default()
        }
    }

    /// Constant delay without jitter.
    #[must_use]
    pub fn constant(delay_ms: u64) -> Self {
        Self {
            strategy: BackoffStrategy::Constant,
            base_delay_ms: delay_ms,
            ..Self::default()
        }
    }

    /// Sets the jitter strategy.
    #[must_use]
    pub fn with_jitter(mut self, jitter: JitterStrategy) -> Self {
        self.jitter = jitter;
        self
    }

    /// Sets the maximum delay.
    #[must_use]
    pub fn with_max_delay_ms(mut self, max_delay_ms: u64) -> Self {
        self.max_delay_ms = max_delay_ms;
        self
    }

    /// Calculates the delay before retry number `attempt` (1-indexed).
    #[must_use]
    pub fn delay(&self, attempt: u64) -> Duration {
        let base = self.base_delay_ms;
        let delay = match self.strategy {
            BackoffStrategy::None => 0,
            BackoffStrategy::Constant => base,
            BackoffStrategy::Linear => base.saturating_mul(attempt.max(1)),
            BackoffStrategy::Exponential => {
                let exponent = u32::try_from(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
                base.saturating_mul(2u64.saturating_pow(exponent))
            }
        }
        .min(self.max_delay_ms);

        let jittered = match self.jitter {
            JitterStrategy::None => delay,
            JitterStrategy::Full => {
                if delay == 0 {
                    0
                } else {
                    rand::thread_rng().gen_range(0..=delay)
                }
            }
            JitterStrategy::Equal => {
                let half = delay / 2;
                if half == 0 {
                    delay
                } else {
                    half + rand::thread_rng().gen_range(0..=half)
                }
            }
        };

        Duration::from_millis(jittered)
    }
}

/// The retry step. Usable in the response phase and in the error phase.
#[derive(Debug, Clone)]
pub struct Retry {
    max_attempts: u64,
    request_steps: RetryRequestSteps,
    backoff: RetryBackoff,
}

impl Default for Retry {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl Retry {
    /// Creates a retry step with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a retry step from configuration.
    #[must_use]
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            request_steps: config.request_steps,
            backoff: config.backoff,
        }
    }

    /// Returns a default retry step as a shared response step.
    #[must_use]
    pub fn shared() -> SharedStep<Response> {
        Arc::new(Self::default())
    }

    /// Returns a default retry step as a shared error step.
    #[must_use]
    pub fn shared_for_errors() -> SharedStep<PipelineError> {
        Arc::new(Self::default())
    }

    /// Sets the maximum number of retries.
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u64) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Sets whether retries replay the request steps.
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

    /// Returns the maximum number of retries.
    #[must_use]
    pub fn max_attempts(&self) -> u64 {
        self.max_attempts
    }

    fn attempt<T>(&self, value: T, state: &mut PipelineState) -> StepResult<T> {
        let performed = state.get_private_u64(RETRY_ATTEMPT_KEY, 0);
        if performed >= self.max_attempts {
            tracing::debug!(
                run_id = %state.run_id(),
                attempts = performed,
                "Retries exhausted, passing value through"
            );
            return StepResult::Continue(value);
        }

        let attempt = performed + 1;
        state.put_private(RETRY_ATTEMPT_KEY, serde_json::json!(attempt));

        let delay = self.backoff.delay(attempt);
        tracing::info!(
            run_id = %state.run_id(),
            attempt,
            max_attempts = self.max_attempts,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            "Retrying request"
        );
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }

        let nested = state.derive_for_retry(self.request_steps).run();
        StepResult::Halt(Halt::from(nested))
    }
}

impl Step<Response> for Retry {
    fn name(&self) -> &str {
        "retry"
    }

    fn call(&self, response: Response, state: &mut PipelineState) -> StepResult<Response> {
        self.attempt(response, state)
    }
}

impl Step<PipelineError> for Retry {
    fn name(&self) -> &str {
        "retry"
    }

    fn call(&self, error: PipelineError, state: &mut PipelineState) -> StepResult<PipelineError> {
        self.attempt(error, state)
    }
}
