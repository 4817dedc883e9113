//! Response step decoding JSON bodies.

use super::{SharedStep, Step, StepResult};
use crate::core::{Body, Response};
use crate::errors::PipelineError;
use crate::pipeline::PipelineState;
use std::sync::Arc;

/// Replaces a byte body with parsed JSON when `content-type` says
/// `application/json`.
///
/// Other content types, missing headers and already-decoded bodies pass
/// through unchanged. A body that fails to parse sends the run to the error
/// phase with a `Decode` error.
#[derive(Debug, Clone, Copy, Default)]
pub struct Decode;

impl Decode {
    /// Returns the step ready for registration.
    #[must_use]
    pub fn shared() -> SharedStep<Response> {
        Arc::new(Self)
    }
}

fn is_json(content_type: &str) -> bool {
    content_type
        .trim_start()
        .to_ascii_lowercase()
        .starts_with("application/json")
}

impl Step<Response> for Decode {
    fn name(&self) -> &str {
        "decode"
    }

    fn call(&self, mut response: Response, _state: &mut PipelineState) -> StepResult<Response> {
        if !response.content_type().is_some_and(is_json) {
            return StepResult::Continue(response);
        }
        let Body::Bytes(bytes) = &response.body else {
            return StepResult::Continue(response);
        };

        match serde_json::from_slice(bytes) {
            Ok(value) => {
                response.body = Body::Json(value);
                StepResult::Continue(response)
            }
            Err(e) => {
                tracing::debug!(status = response.status, error = %e, "JSON body failed to decode");
                let status = response.status;
                StepResult::Error(PipelineError::decode(e.to_string()).with_status(status))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use crate::pipeline::BuildOptions;
    use crate::testing::StubTransport;
    use serde_json::json;

    fn decode(response: Response) -> StepResult<Response> {
        let mut state = PipelineState::build(
            Arc::new(StubTransport::always(Response::new(200))),
            "GET",
            "http://x",
            BuildOptions::new(),
        );
        Decode.call(response, &mut state)
    }

    #[test]
    fn test_decodes_json() {
        let response = Response::new(200)
            .with_header("content-type", "application/json; charset=utf-8")
            .with_body(r#"{"a":1}"#);

        match decode(response) {
            StepResult::Continue(r) => assert_eq!(r.body, Body::Json(json!({"a": 1}))),
            other => panic!("expected continue, got {other:?}"),
        }
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let response = Response::new(200)
            .with_header("Content-Type", "application/json")
            .with_body("[1,2]");

        match decode(response) {
            StepResult::Continue(r) => assert_eq!(r.body.as_json(), Some(&json!([1, 2]))),
            other => panic!("expected continue, got {other:?}"),
        }
    }

    #[test]
    fn test_without_content_type_is_identity() {
        let response = Response::new(200).with_body(r#"{"a":1}"#);
        assert_eq!(decode(response.clone()), StepResult::Continue(response));
    }

    #[test]
    fn test_non_json_content_type_is_identity() {
        let response = Response::new(200)
            .with_header("content-type", "text/html")
            .with_body("<p>{}</p>");
        assert_eq!(decode(response.clone()), StepResult::Continue(response));
    }

    #[test]
    fn test_already_decoded_body_is_identity() {
        let response = Response::new(200)
            .with_header("content-type", "application/json")
            .with_body(json!({"done": true}));
        assert_eq!(decode(response.clone()), StepResult::Continue(response));
    }

    #[test]
    fn test_invalid_json_jumps_to_error() {
        let response = Response::new(200)
            .with_header("content-type", "application/json")
            .with_body("{not json");

        match decode(response) {
            StepResult::Error(err) => {
                assert!(err.is(ErrorKind::Decode));
                assert_eq!(err.status, Some(200));
            }
            other => panic!("expected decode error, got {other:?}"),
        }
    }
}
