//! Test assertions for run outcomes.

use crate::core::RunOutcome;
use crate::errors::ErrorKind;

/// Asserts that the run produced a response with the given status.
pub fn assert_ok_status(outcome: &RunOutcome, expected: u16) {
    match outcome.response() {
        Some(response) => assert_eq!(
            response.status, expected,
            "Expected status {}, got {}",
            expected, response.status
        ),
        None => panic!("Expected a response with status {expected}, got {outcome:?}"),
    }
}

/// Asserts that the run failed with the given error kind.
pub fn assert_err_kind(outcome: &RunOutcome, expected: ErrorKind) {
    match outcome.error() {
        Some(error) => assert!(
            error.is(expected),
            "Expected {} error, got {} error: {}",
            expected,
            error.kind,
            error.message
        ),
        None => panic!("Expected a {expected} error, got {outcome:?}"),
    }
}

/// Asserts that a step halted the run with the given value.
pub fn assert_halted_with(outcome: &RunOutcome, expected: &serde_json::Value) {
    assert_eq!(
        outcome.halted_value(),
        Some(expected),
        "Expected the run to halt with {expected}, got {outcome:?}"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Response;
    use crate::errors::PipelineError;
    use serde_json::json;

    #[test]
    fn test_assert_ok_status() {
        assert_ok_status(&RunOutcome::Done(Ok(Response::new(204))), 204);
    }

    #[test]
    #[should_panic(expected = "Expected a response")]
    fn test_assert_ok_status_on_error() {
        assert_ok_status(&RunOutcome::Done(Err(PipelineError::step("boom"))), 200);
    }

    #[test]
    fn test_assert_err_kind() {
        assert_err_kind(
            &RunOutcome::Done(Err(PipelineError::decode("bad json"))),
            ErrorKind::Decode,
        );
    }

    #[test]
    #[should_panic(expected = "Expected transport error")]
    fn test_assert_err_kind_mismatch() {
        assert_err_kind(
            &RunOutcome::Done(Err(PipelineError::decode("bad json"))),
            ErrorKind::Transport,
        );
    }

    #[test]
    fn test_assert_halted_with() {
        assert_halted_with(&RunOutcome::Halted(json!([1, 2])), &json!([1, 2]));
    }
}
