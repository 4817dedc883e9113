//! The transport boundary.
//!
//! The pipeline never performs I/O itself. It hands the final request to a
//! [`Transport`] and gets back either a response or a transport error. Any
//! status code is a response; only failures to obtain one are errors.

#[cfg(feature = "http-client")]
mod http;

#[cfg(feature = "http-client")]
pub use http::ReqwestTransport;

use crate::core::{Request, Response};
use crate::errors::PipelineError;

/// Sends one request and returns one response.
///
/// Called exactly once per run, plus once per nested retry run. Failures
/// must be reported as `ErrorKind::Transport` errors.
#[cfg_attr(test, mockall::automock)]
pub trait Transport: Send + Sync {
    /// Performs the request.
    fn send(&self, request: &Request) -> Result<Response, PipelineError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use crate::pipeline::{BuildOptions, PipelineState};
    use crate::steps::{Decode, Retry};
    use mockall::Sequence;
    use std::sync::Arc;

    #[test]
    fn test_transport_called_once_per_run() {
        let mut mock = MockTransport::new();
        mock.expect_send()
            .times(1)
            .returning(|req| Ok(Response::new(200).with_body(req.url.clone())));

        let outcome = PipelineState::build(Arc::new(mock), "GET", "http://x/a", BuildOptions::new())
            .response_step(Decode::shared())
            .run();

        assert_eq!(outcome.response().and_then(|r| r.body.as_bytes()), Some(&b"http://x/a"[..]));
    }

    #[test]
    fn test_each_retry_sends_again() {
        let mut seq = Sequence::new();
        let mut mock = MockTransport::new();
        mock.expect_send()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(PipelineError::transport("connection reset")));
        mock.expect_send()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(Response::new(200)));

        let outcome = PipelineState::build(Arc::new(mock), "GET", "http://x", BuildOptions::new())
            .error_step(Retry::shared_for_errors())
            .run();

        assert_eq!(outcome.response().map(|r| r.status), Some(200));
    }

    #[test]
    fn test_transport_error_kind_is_preserved() {
        let mut mock = MockTransport::new();
        mock.expect_send()
            .returning(|_| Err(PipelineError::transport("dns failure")));

        let outcome = PipelineState::build(Arc::new(mock), "GET", "http://x", BuildOptions::new()).run();

        let err = outcome.error().unwrap();
        assert!(err.is(ErrorKind::Transport));
        assert_eq!(err.message, "dns failure");
    }
}
