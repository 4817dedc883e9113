//! Tracing integration for pipeline runs.
//!
//! Runs are wrapped in a `reqflow.run` span; this module holds the span
//! attributes, a timing helper and the subscriber setup.

use crate::config::LogConfig;
use crate::errors::ReqflowError;
use crate::pipeline::PipelineState;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Instant;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Span attributes for a pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSpanAttributes {
    /// Run ID, shared with nested retry runs.
    pub run_id: Option<String>,
    /// Request method.
    pub method: Option<String>,
    /// Request URL.
    pub url: Option<String>,
    /// Number of registered request steps.
    pub request_steps: usize,
    /// Number of registered response steps.
    pub response_steps: usize,
    /// Number of registered error steps.
    pub error_steps: usize,
}

impl RunSpanAttributes {
    /// Creates empty span attributes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Collects the attributes of a state about to run.
    #[must_use]
    pub fn from_state(state: &PipelineState) -> Self {
        Self {
            run_id: Some(state.run_id().to_string()),
            method: Some(state.request().method.clone()),
            url: Some(state.request().url.clone()),
            request_steps: state.request_steps().len(),
            response_steps: state.response_steps().len(),
            error_steps: state.error_steps().len(),
        }
    }

    /// Converts to OpenTelemetry attributes.
    #[must_use]
    pub fn to_otel_attributes(&self) -> HashMap<String, String> {
        let mut attrs = HashMap::new();

        if let Some(ref v) = self.run_id {
            attrs.insert("reqflow.run_id".to_string(), v.clone());
        }
        if let Some(ref v) = self.method {
            attrs.insert("http.request.method".to_string(), v.clone());
        }
        if let Some(ref v) = self.url {
            attrs.insert("url.full".to_string(), v.clone());
        }
        attrs.insert("reqflow.request_steps".to_string(), self.request_steps.to_string());
        attrs.insert("reqflow.response_steps".to_string(), self.response_steps.to_string());
        attrs.insert("reqflow.error_steps".to_string(), self.error_steps.to_string());

        attrs
    }
}

/// Simple span timing helper.
#[derive(Debug)]
pub struct SpanTimer {
    start: Instant,
    name: String,
}

impl SpanTimer {
    /// Starts a new span timer.
    #[must_use]
    pub fn start(name: impl Into<String>) -> Self {
        Self {
            start: Instant::now(),
            name: name.into(),
        }
    }

    /// Returns the elapsed time in milliseconds.
    #[must_use]
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }

    /// Returns the span name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Finishes the span and returns the duration.
    #[must_use]
    pub fn finish(self) -> f64 {
        self.elapsed_ms()
    }
}

/// Installs a global `tracing` subscriber.
///
/// Fails if the filter does not parse or a global subscriber is already set.
pub fn init_tracing(config: &LogConfig) -> Result<(), ReqflowError> {
    let filter = EnvFilter::try_new(&config.filter)
        .map_err(|e| ReqflowError::Tracing(format!("invalid filter {:?}: {e}", config.filter)))?;

    let json = config.json.then(|| fmt::layer().json());
    let plain = (!config.json).then(fmt::layer);

    tracing_subscriber::registry()
        .with(filter)
        .with(json)
        .with(plain)
        .try_init()
        .map_err(|e| ReqflowError::Tracing(e.to_string()))
}
