//! Halt payloads and the final outcome of a run.

use super::Response;
use crate::errors::PipelineError;

/// The payload of a step that halts the pipeline.
///
/// A halted `Response` or `Error` resolves to the usual `Result`; any other
/// payload reaches the caller of `run` untouched.
///
/// Arbitrary payloads are `serde_json::Value` so nested retry runs and
/// `PipelineError::payload` can carry them without making the pipeline generic.
#[derive(Debug, Clone, PartialEq)]
pub enum Halt {
    /// Finish successfully with this response.
    Response(Response),
    /// Finish with this error.
    Error(PipelineError),
    /// Finish with an arbitrary value.
    Value(serde_json::Value),
}

impl Halt {
    /// Converts the payload into the outcome returned by `run`.
    #[must_use]
    pub fn resolve(self) -> RunOutcome {
        match self {
            Self::Response(response) => RunOutcome::Done(Ok(response)),
            Self::Error(error) => RunOutcome::Done(Err(error)),
            Self::Value(value) => RunOutcome::Halted(value),
        }
    }
}

impl From<RunOutcome> for Halt {
    fn from(outcome: RunOutcome) -> Self {
        match outcome {
            RunOutcome::Done(Ok(response)) => Self::Response(response),
            RunOutcome::Done(Err(error)) => Self::Error(error),
            RunOutcome::Halted(value) => Self::Value(value),
        }
    }
}

/// What a pipeline run produced.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// The run completed with a response or an error.
    Done(Result<Response, PipelineError>),
    /// A step halted with a non-response, non-error payload.
    Halted(serde_json::Value),
}

impl RunOutcome {
    /// Returns true if the run produced a response.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Done(Ok(_)))
    }

    /// Returns true if a step halted with an arbitrary payload.
    #[must_use]
    pub fn is_halted(&self) -> bool {
        matches!(self, Self::Halted(_))
    }

    /// Returns the response, if any.
    #[must_use]
    pub fn response(&self) -> Option<&Response> {
        match self {
            Self::Done(Ok(response)) => Some(response),
            _ => None,
        }
    }

    /// Returns the error, if any.
    #[must_use]
    pub fn error(&self) -> Option<&PipelineError> {
        match self {
            Self::Done(Err(error)) => Some(error),
            _ => None,
        }
    }

    /// Returns the halt payload, if any.
    #[must_use]
    pub fn halted_value(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Halted(value) => Some(value),
            Self::Done(_) => None,
        }
    }

    /// Collapses the outcome into a `Result`.
    ///
    /// A halt payload becomes a step error carrying the payload.
    pub fn into_result(self) -> Result<Response, PipelineError> {
        match self {
            Self::Done(result) => result,
            Self::Halted(value) => Err(PipelineError::step(
                "pipeline halted with a non-response payload",
            )
            .with_payload(value)),
        }
    }

    /// Short label for logging.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Done(Ok(_)) => "ok",
            Self::Done(Err(_)) => "error",
            Self::Halted(_) => "halted",
        }
    }
}

impl From<Result<Response, PipelineError>> for RunOutcome {
    fn from(result: Result<Response, PipelineError>) -> Self {
        Self::Done(result)
    }
}
