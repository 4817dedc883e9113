//! Mock transports and steps for testing.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

use crate::core::{Request, Response};
use crate::errors::PipelineError;
use crate::pipeline::PipelineState;
use crate::steps::{SharedStep, Step, StepResult};
use crate::transport::Transport;

/// Shared, ordered log of step invocations.
pub type CallLog = Arc<Mutex<Vec<String>>>;

/// Creates an empty call log.
#[must_use]
pub fn call_log() -> CallLog {
    Arc::new(Mutex::new(Vec::new()))
}

#[derive(Debug)]
enum Script {
    Always(Result<Response, PipelineError>),
    Sequence(Mutex<VecDeque<Result<Response, PipelineError>>>),
}

/// A transport that replays scripted results and records what it was sent.
#[derive(Debug)]
pub struct StubTransport {
    script: Script,
    requests: Mutex<Vec<Request>>,
}

impl StubTransport {
    fn with_script(script: Script) -> Self {
        Self {
            script,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Answers every call with `response`.
    #[must_use]
    pub fn always(response: Response) -> Self {
        Self::with_script(Script::Always(Ok(response)))
    }

    /// Fails every call with `error`.
    #[must_use]
    pub fn always_error(error: PipelineError) -> Self {
        Self::with_script(Script::Always(Err(error)))
    }

    /// Answers calls in order; once the script runs out every call fails
    /// with a transport error.
    #[must_use]
    pub fn sequence(results: impl IntoIterator<Item = Result<Response, PipelineError>>) -> Self {
        Self::with_script(Script::Sequence(Mutex::new(results.into_iter().collect())))
    }

    /// Returns the number of calls made.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.requests.lock().len()
    }

    /// Returns the requests received, in call order.
    #[must_use]
    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().clone()
    }

    /// Returns the most recent request.
    #[must_use]
    pub fn last_request(&self) -> Option<Request> {
        self.requests.lock().last().cloned()
    }
}

impl Transport for StubTransport {
    fn send(&self, request: &Request) -> Result<Response, PipelineError> {
        self.requests.lock().push(request.clone());
        match &self.script {
            Script::Always(result) => result.clone(),
            Script::Sequence(queue) => queue
                .lock()
                .pop_front()
                .unwrap_or_else(|| Err(PipelineError::transport("stub transport exhausted"))),
        }
    }
}

/// A transport that always fails with a transport error.
#[derive(Debug, Clone)]
pub struct FailingTransport {
    message: String,
}

impl FailingTransport {
    /// Creates a failing transport.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl Transport for FailingTransport {
    fn send(&self, _request: &Request) -> Result<Response, PipelineError> {
        Err(PipelineError::transport(self.message.clone()))
    }
}

/// A step that appends its name to a call log and passes the value through.
///
/// Works in every phase.
#[derive(Debug, Clone)]
pub struct RecordingStep {
    name: String,
    log: CallLog,
}

impl RecordingStep {
    /// Creates a recording step.
    #[must_use]
    pub fn new(name: impl Into<String>, log: &CallLog) -> Self {
        Self {
            name: name.into(),
            log: Arc::clone(log),
        }
    }

    /// Creates a recording step ready for registration in any phase.
    #[must_use]
    pub fn shared<T: 'static>(name: impl Into<String>, log: &CallLog) -> SharedStep<T>
    where
        Self: Step<T>,
    {
        Arc::new(Self::new(name, log))
    }

    fn record(&self) {
        self.log.lock().push(self.name.clone());
    }
}

impl Step<Request> for RecordingStep {
    fn name(&self) -> &str {
        &self.name
    }

    fn call(&self, request: Request, _state: &mut PipelineState) -> StepResult<Request> {
        self.record();
        StepResult::Continue(request)
    }
}

impl Step<Response> for RecordingStep {
    fn name(&self) -> &str {
        &self.name
    }

    fn call(&self, response: Response, _state: &mut PipelineState) -> StepResult<Response> {
        self.record();
        StepResult::Continue(response)
    }
}

impl Step<PipelineError> for RecordingStep {
    fn name(&self) -> &str {
        &self.name
    }

    fn call(&self, error: PipelineError, _state: &mut PipelineState) -> StepResult<PipelineError> {
        self.record();
        StepResult::Continue(error)
    }
}

/// A step that halts the pipeline with a fixed value. Works in every phase.
#[derive(Debug, Clone)]
pub struct HaltingStep {
    value: serde_json::Value,
}

impl HaltingStep {
    /// Creates a halting step.
    #[must_use]
    pub fn new(value: serde_json::Value) -> Self {
        Self { value }
    }

    /// Creates a halting step ready for registration in any phase.
    #[must_use]
    pub fn shared<T: 'static>(value: serde_json::Value) -> SharedStep<T>
    where
        Self: Step<T>,
    {
        Arc::new(Self::new(value))
    }
}

impl<T> Step<T> for HaltingStep {
    fn name(&self) -> &str {
        "halt"
    }

    fn call(&self, _value: T, _state: &mut PipelineState) -> StepResult<T> {
        StepResult::halt_with(self.value.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use crate::pipeline::BuildOptions;
    use serde_json::json;

    fn state(transport: Arc<dyn Transport>) -> PipelineState {
        PipelineState::build(transport, "GET", "http://x", BuildOptions::new())
    }

    #[test]
    fn test_stub_transport_records_requests() {
        let transport = StubTransport::always(Response::new(200));
        transport.send(&Request::new("GET", "http://x/1")).unwrap();
        transport.send(&Request::new("POST", "http://x/2")).unwrap();

        assert_eq!(transport.call_count(), 2);
        assert_eq!(transport.requests()[0].url, "http://x/1");
        assert_eq!(transport.last_request().map(|r| r.method), Some("POST".to_string()));
    }

    #[test]
    fn test_stub_transport_sequence_then_exhausted() {
        let transport = StubTransport::sequence([
            Ok(Response::new(500)),
            Err(PipelineError::transport("reset")),
        ]);
        let request = Request::new("GET", "http://x");

        assert_eq!(transport.send(&request).unwrap().status, 500);
        assert_eq!(transport.send(&request).unwrap_err().message, "reset");
        let exhausted = transport.send(&request).unwrap_err();
        assert!(exhausted.is(ErrorKind::Transport));
        assert!(exhausted.message.contains("exhausted"));
    }

    #[test]
    fn test_failing_transport() {
        let err = FailingTransport::new("offline")
            .send(&Request::new("GET", "http://x"))
            .unwrap_err();
        assert!(err.is(ErrorKind::Transport));
        assert_eq!(err.message, "offline");
    }

    #[test]
    fn test_recording_step_logs_in_every_phase() {
        let log = call_log();
        let mut state = state(Arc::new(FailingTransport::new("x")));

        let step = RecordingStep::new("rec", &log);
        assert!(Step::<Request>::call(&step, Request::new("GET", "http://x"), &mut state).is_continue());
        assert!(Step::<Response>::call(&step, Response::new(200), &mut state).is_continue());
        assert!(Step::<PipelineError>::call(&step, PipelineError::step("e"), &mut state).is_continue());

        assert_eq!(*log.lock(), vec!["rec", "rec", "rec"]);
    }

    #[test]
    fn test_halting_step() {
        let mut state = state(Arc::new(FailingTransport::new("x")));
        let step: SharedStep<Response> = HaltingStep::shared(json!({"stop": true}));

        assert_eq!(
            step.call(Response::new(200), &mut state),
            StepResult::halt_with(json!({"stop": true}))
        );
    }
}
