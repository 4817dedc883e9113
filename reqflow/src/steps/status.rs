//! Response step turning error statuses into pipeline errors.

use super::{SharedStep, Step, StepResult};
use crate::core::Response;
use crate::errors::PipelineError;
use crate::pipeline::PipelineState;
use std::sync::Arc;

/// Sends 4xx and 5xx responses to the error phase as `Status` errors.
///
/// The original response rides along in the error, so an error step can
/// recover it with [`PipelineError::into_response`].
#[derive(Debug, Clone, Copy)]
pub struct ErrorOnStatus {
    min_status: u16,
}

impl Default for ErrorOnStatus {
    fn default() -> Self {
        Self { min_status: 400 }
    }
}

impl ErrorOnStatus {
    /// Only statuses at or above `min_status` become errors.
    #[must_use]
    pub fn at_least(min_status: u16) -> Self {
        Self { min_status }
    }

    /// Only server errors (5xx) become errors.
    #[must_use]
    pub fn server_errors() -> Self {
        Self::at_least(500)
    }

    /// Returns the step ready for registration.
    #[must_use]
    pub fn shared(self) -> SharedStep<Response> {
        Arc::new(self)
    }
}

impl Step<Response> for ErrorOnStatus {
    fn name(&self) -> &str {
        "error_on_status"
    }

    fn call(&self, response: Response, _state: &mut PipelineState) -> StepResult<Response> {
        if response.status >= self.min_status {
            StepResult::Error(PipelineError::status(response))
        } else {
            StepResult::Continue(response)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use crate::pipeline::BuildOptions;
    use crate::testing::StubTransport;

    fn state() -> PipelineState {
        PipelineState::build(
            Arc::new(StubTransport::always(Response::new(200))),
            "GET",
            "http://x",
            BuildOptions::new(),
        )
    }

    #[test]
    fn test_success_passes() {
        let result = ErrorOnStatus::default().call(Response::new(204), &mut state());
        assert!(result.is_continue());
    }

    #[test]
    fn test_client_error_becomes_status_error() {
        match ErrorOnStatus::default().call(Response::new(404), &mut state()) {
            StepResult::Error(err) => {
                assert!(err.is(ErrorKind::Status));
                assert_eq!(err.status, Some(404));
            }
            other => panic!("expected error, got {other:?}"),
        }
    }

    #[test]
    fn test_server_errors_only() {
        let step = ErrorOnStatus::server_errors();
        assert!(step.call(Response::new(404), &mut state()).is_continue());
        assert!(!step.call(Response::new(502), &mut state()).is_continue());
    }
}
