//! Error types for the reqflow pipeline.
//!
//! Two families live here. [`PipelineError`] is a *value* that flows through
//! the error phase: transports produce it, steps raise it, error steps may
//! re-classify or recover from it. [`ReqflowError`] covers failures outside a
//! run, such as invalid configuration or a transport that cannot be set up.

use crate::core::Response;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Classification of a [`PipelineError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The transport could not complete the exchange (network, timeout, connection).
    Transport,
    /// A body could not be parsed according to its declared content type.
    Decode,
    /// A step reported a failure.
    Step,
    /// The response carried an error status code.
    Status,
    /// The run bounced between the response and error phases too often.
    PhaseLimit,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport => write!(f, "transport"),
            Self::Decode => write!(f, "decode"),
            Self::Step => write!(f, "step"),
            Self::Status => write!(f, "status"),
            Self::PhaseLimit => write!(f, "phase_limit"),
        }
    }
}

/// The error value threaded through the error phase.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind} error: {message}")]
pub struct PipelineError {
    /// The error classification.
    pub kind: ErrorKind,
    /// Human readable description.
    pub message: String,
    /// Status code of the response that caused the error, if any.
    pub status: Option<u16>,
    /// The response that caused the error, if any.
    pub response: Option<Box<Response>>,
    /// Arbitrary data attached by the producer.
    pub payload: Option<serde_json::Value>,
}

impl PipelineError {
    /// Creates a new error of the given kind.
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
            response: None,
            payload: None,
        }
    }

    /// Creates a transport error.
    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Transport, message)
    }

    /// Creates a decode error.
    #[must_use]
    pub fn decode(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Decode, message)
    }

    /// Creates a step error.
    #[must_use]
    pub fn step(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Step, message)
    }

    /// Creates a status error for the given response.
    #[must_use]
    pub fn status(response: Response) -> Self {
        let status = response.status;
        Self {
            kind: ErrorKind::Status,
            message: format!("HTTP {status}"),
            status: Some(status),
            response: Some(Box::new(response)),
            payload: None,
        }
    }

    /// Creates a phase-limit error.
    #[must_use]
    pub fn phase_limit(limit: usize) -> Self {
        Self::new(
            ErrorKind::PhaseLimit,
            format!("exceeded {limit} response/error phase transitions"),
        )
    }

    /// Sets the status code.
    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Attaches an arbitrary payload.
    #[must_use]
    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Returns true if the error has the given kind.
    #[must_use]
    pub fn is(&self, kind: ErrorKind) -> bool {
        self.kind == kind
    }

    /// Takes the response that caused the error, if one was attached.
    #[must_use]
    pub fn into_response(self) -> Option<Response> {
        self.response.map(|r| *r)
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("kind".to_string(), serde_json::json!(self.kind));
        map.insert("message".to_string(), serde_json::json!(self.message));
        if let Some(status) = self.status {
            map.insert("status".to_string(), serde_json::json!(status));
        }
        if let Some(ref payload) = self.payload {
            map.insert("payload".to_string(), payload.clone());
        }
        map
    }
}

/// Failures outside of a pipeline run.
#[derive(Debug, Error)]
pub enum ReqflowError {
    /// Configuration values are out of range or inconsistent.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The transport could not be constructed.
    #[error("Transport setup failed: {0}")]
    TransportSetup(String),

    /// The tracing subscriber could not be installed.
    #[error("Tracing initialization failed: {0}")]
    Tracing(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
