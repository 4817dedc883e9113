//! Phase executor.
//!
//! Each phase folds its step list over an accumulator. After every step the
//! result is classified as "keep folding", "leave the phase" or "halt".
//! `run` drives the phases as a small state machine:
//!
//! ```text
//! RequestPhase --complete--> Transport --Ok--> ResponsePhase --complete--> Done(Ok)
//!      |  \                      |                 |      ^
//!      |   `--response-----------+---------------->|      | recover
//!      `--error--------------> ErrorPhase <--Err---'------'
//!                                  |
//!                                  `--complete--> Done(Err)
//! ```
//!
//! Any step may halt, which ends the run immediately.

use super::PipelineState;
use crate::core::{Halt, Request, Response, RunOutcome};
use crate::errors::PipelineError;
use crate::observability::{RunSpanAttributes, SpanTimer};
use crate::steps::{SharedStep, StepResult};
use std::fmt;
use tracing::{debug, debug_span, warn};

/// The phases of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Request steps.
    Request,
    /// The transport call.
    Transport,
    /// Response steps.
    Response,
    /// Error steps.
    Error,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Request => write!(f, "request"),
            Self::Transport => write!(f, "transport"),
            Self::Response => write!(f, "response"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Where control goes once a phase is left.
#[derive(Debug)]
enum Transition {
    Transport(Request),
    Response(Response),
    Error(PipelineError),
    Halt(Halt),
    Done(Result<Response, PipelineError>),
}

/// Outcome of classifying one step result.
enum Flow<T> {
    Next(T),
    Exit(Transition),
}

/// A value that can be folded through a phase.
trait PhaseValue: Sized {
    const PHASE: Phase;

    /// Interprets a step result in this phase.
    fn classify(result: StepResult<Self>) -> Flow<Self>;

    /// The transition taken when the step list is exhausted.
    fn complete(self) -> Transition;
}

impl PhaseValue for Request {
    const PHASE: Phase = Phase::Request;

    fn classify(result: StepResult<Self>) -> Flow<Self> {
        match result {
            StepResult::Continue(request) => Flow::Next(request),
            StepResult::Response(response) => Flow::Exit(Transition::Response(response)),
            StepResult::Error(error) => Flow::Exit(Transition::Error(error)),
            StepResult::Halt(halt) => Flow::Exit(Transition::Halt(halt)),
        }
    }

    fn complete(self) -> Transition {
        Transition::Transport(self)
    }
}

impl PhaseValue for Response {
    const PHASE: Phase = Phase::Response;

    fn classify(result: StepResult<Self>) -> Flow<Self> {
        match result {
            StepResult::Continue(response) | StepResult::Response(response) => Flow::Next(response),
            StepResult::Error(error) => Flow::Exit(Transition::Error(error)),
            StepResult::Halt(halt) => Flow::Exit(Transition::Halt(halt)),
        }
    }

    fn complete(self) -> Transition {
        Transition::Done(Ok(self))
    }
}

impl PhaseValue for PipelineError {
    const PHASE: Phase = Phase::Error;

    fn classify(result: StepResult<Self>) -> Flow<Self> {
        match result {
            StepResult::Continue(error) | StepResult::Error(error) => Flow::Next(error),
            StepResult::Response(response) => Flow::Exit(Transition::Response(response)),
            StepResult::Halt(halt) => Flow::Exit(Transition::Halt(halt)),
        }
    }

    fn complete(self) -> Transition {
        Transition::Done(Err(self))
    }
}

/// Folds `steps` over `initial`.
fn run_phase<T: PhaseValue>(
    steps: &[SharedStep<T>],
    initial: T,
    state: &mut PipelineState,
) -> Transition {
    let mut acc = initial;
    for (index, step) in steps.iter().enumerate() {
        debug!(phase = %T::PHASE, step = step.name(), index, "Running step");
        match T::classify(step.call(acc, state)) {
            Flow::Next(value) => acc = value,
            Flow::Exit(transition) => {
                debug!(
                    phase = %T::PHASE,
                    step = step.name(),
                    skipped = steps.len() - index - 1,
                    "Step left the phase"
                );
                return transition;
            }
        }
    }
    acc.complete()
}

fn send(state: &PipelineState, request: &Request) -> Transition {
    match state.transport().send(request) {
        Ok(response) => {
            debug!(status = response.status, "Transport returned a response");
            Transition::Response(response)
        }
        Err(error) => {
            warn!(kind = %error.kind, error = %error.message, url = %request.url, "Transport failed");
            Transition::Error(error)
        }
    }
}

/// Runs a pipeline to completion.
pub(crate) fn run(mut state: PipelineState) -> RunOutcome {
    let attributes = RunSpanAttributes::from_state(&state);
    let span = debug_span!(
        "reqflow.run",
        run_id = %state.run_id(),
        method = %state.request().method,
        url = %state.request().url,
    );
    let _entered = span.enter();
    let timer = SpanTimer::start("reqflow.run");
    debug!(
        span_name = timer.name(),
        attributes = ?attributes.to_otel_attributes(),
        "Run started"
    );

    let limit = state.config().max_phase_transitions;
    let mut transitions = 0usize;

    // Step lists are snapshotted per phase; steps only see `&mut PipelineState`.
    let request_steps = state.request_steps().to_vec();
    let initial = state.request().clone();
    let mut next = run_phase(&request_steps, initial, &mut state);

    let outcome = loop {
        next = match next {
            Transition::Transport(request) => send(&state, &request),
            Transition::Response(response) => {
                transitions += 1;
                if transitions > limit {
                    break phase_limit_reached(limit);
                }
                let steps = state.response_steps().to_vec();
                run_phase(&steps, response, &mut state)
            }
            Transition::Error(error) => {
                transitions += 1;
                if transitions > limit {
                    break phase_limit_reached(limit);
                }
                let steps = state.error_steps().to_vec();
                run_phase(&steps, error, &mut state)
            }
            Transition::Halt(halt) => {
                debug!("Pipeline halted");
                break halt.resolve();
            }
            Transition::Done(result) => break RunOutcome::Done(result),
        };
    };

    debug!(
        outcome = outcome.label(),
        transitions,
        duration_ms = timer.finish(),
        "Run finished"
    );
    outcome
}

fn phase_limit_reached(limit: usize) -> RunOutcome {
    warn!(limit, "Run exceeded its phase transition limit");
    RunOutcome::Done(Err(PipelineError::phase_limit(limit)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::errors::ErrorKind;
    use crate::pipeline::BuildOptions;
    use crate::steps::{self, FnStep};
    use crate::testing::{call_log, RecordingStep, StubTransport};
    use crate::transport::MockTransport;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::Arc;

    fn build(transport: Arc<StubTransport>) -> PipelineState {
        PipelineState::build(transport, "GET", "http://x", BuildOptions::new())
    }

    #[test]
    fn test_happy_path_runs_every_phase_in_order() {
        let log = call_log();
        let transport = Arc::new(StubTransport::always(Response::new(200)));

        let outcome = build(transport.clone())
            .request_step(RecordingStep::shared("req", &log))
            .response_step(RecordingStep::shared("resp", &log))
            .error_step(RecordingStep::shared("err", &log))
            .run();

        assert_eq!(outcome, RunOutcome::Done(Ok(Response::new(200))));
        assert_eq!(*log.lock(), vec!["req", "resp"]);
        assert_eq!(transport.call_count(), 1);
    }

    #[test]
    fn test_request_step_short_circuits_to_response() {
        let log = call_log();
        let transport = Arc::new(StubTransport::always(Response::new(500)));

        let outcome = build(transport.clone())
            .request_step(steps::from_fn("cache", |_req: Request, _state: &mut PipelineState| {
                StepResult::Response(Response::new(304))
            }))
            .request_step(RecordingStep::shared("after-cache", &log))
            .response_step(RecordingStep::shared("resp", &log))
            .run();

        assert_eq!(outcome.response().map(|r| r.status), Some(304));
        assert_eq!(*log.lock(), vec!["resp"]);
        assert_eq!(transport.call_count(), 0);
    }

    #[test]
    fn test_request_step_jumps_to_error() {
        let log = call_log();
        let transport = Arc::new(StubTransport::always(Response::new(200)));

        let outcome = build(transport.clone())
            .request_step(steps::from_fn("reject", |_req: Request, _state: &mut PipelineState| {
                StepResult::Error(PipelineError::step("not allowed"))
            }))
            .response_step(RecordingStep::shared("resp", &log))
            .error_step(RecordingStep::shared("err", &log))
            .run();

        assert!(outcome.error().is_some_and(|e| e.message == "not allowed"));
        assert_eq!(*log.lock(), vec!["err"]);
        assert_eq!(transport.call_count(), 0);
    }

    #[test]
    fn test_transport_error_enters_error_phase() {
        let log = call_log();
        let transport = Arc::new(StubTransport::always_error(PipelineError::transport("refused")));

        let outcome = build(transport)
            .response_step(RecordingStep::shared("resp", &log))
            .error_step(RecordingStep::shared("err", &log))
            .run();

        assert!(outcome.error().is_some_and(|e| e.is(ErrorKind::Transport)));
        assert_eq!(*log.lock(), vec!["err"]);
    }

    #[test]
    fn test_response_step_jumps_to_error() {
        let log = call_log();
        let transport = Arc::new(StubTransport::always(Response::new(200)));

        let outcome = build(transport)
            .response_step(steps::from_fn("fail", |resp: Response, _state: &mut PipelineState| {
                StepResult::Error(PipelineError::step(format!("bad {}", resp.status)))
            }))
            .response_step(RecordingStep::shared("resp-2", &log))
            .error_step(RecordingStep::shared("err", &log))
            .run();

        assert_eq!(outcome.error().map(|e| e.message.as_str()), Some("bad 200"));
        assert_eq!(*log.lock(), vec!["err"]);
    }

    #[test]
    fn test_own_type_jump_is_continue() {
        let log = call_log();
        let transport = Arc::new(StubTransport::always(Response::new(200)));

        let outcome = build(transport)
            .response_step(steps::from_fn("swap", |_resp: Response, _state: &mut PipelineState| {
                StepResult::Response(Response::new(202))
            }))
            .response_step(RecordingStep::shared("resp-2", &log))
            .run();

        assert_eq!(outcome.response().map(|r| r.status), Some(202));
        assert_eq!(*log.lock(), vec!["resp-2"]);
    }

    #[test]
    fn test_error_step_can_reclassify() {
        let transport = Arc::new(StubTransport::always_error(PipelineError::transport("timeout")));

        let outcome = build(transport)
            .error_step(steps::map("reclassify", |err: PipelineError| {
                PipelineError::step(format!("wrapped: {}", err.message))
            }))
            .run();

        let err = outcome.error().unwrap();
        assert!(err.is(ErrorKind::Step));
        assert_eq!(err.message, "wrapped: timeout");
    }

    #[test]
    fn test_recovery_reenters_response_phase() {
        let log = call_log();
        let transport = Arc::new(StubTransport::always_error(PipelineError::transport("down")));

        let outcome = build(transport)
            .response_step(RecordingStep::shared("resp", &log))
            .error_step(steps::from_fn("fallback", |_err: PipelineError, _state: &mut PipelineState| {
                StepResult::Response(Response::new(200).with_body("stale"))
            }))
            .error_step(RecordingStep::shared("err-2", &log))
            .run();

        assert_eq!(outcome, RunOutcome::Done(Ok(Response::new(200).with_body("stale"))));
        assert_eq!(*log.lock(), vec!["resp"]);
    }

    #[test]
    fn test_phase_limit_stops_cycles() {
        let transport = Arc::new(StubTransport::always(Response::new(200)));
        let counter = call_log();
        let seen = counter.clone();

        let outcome = build(transport)
            .with_config(PipelineConfig::default().with_max_phase_transitions(5))
            .response_step(steps::from_fn("always-fail", move |_r: Response, _s: &mut PipelineState| {
                seen.lock().push("resp".to_string());
                StepResult::Error(PipelineError::step("again"))
            }))
            .error_step(steps::from_fn("always-recover", |_e: PipelineError, _s: &mut PipelineState| {
                StepResult::Response(Response::new(200))
            }))
            .run();

        assert!(outcome.error().is_some_and(|e| e.is(ErrorKind::PhaseLimit)));
        // response, error, response, error, response: three response entries.
        assert_eq!(counter.lock().len(), 3);
    }

    #[test]
    fn test_halt_value_stops_everything() {
        let log = call_log();
        let transport = Arc::new(StubTransport::always(Response::new(200)));

        let outcome = build(transport.clone())
            .request_step(RecordingStep::shared("req-1", &log))
            .request_step(steps::from_fn("halt", |_r: Request, _s: &mut PipelineState| {
                StepResult::halt_with(json!({"reason": "quota"}))
            }))
            .request_step(RecordingStep::shared("req-2", &log))
            .response_step(RecordingStep::shared("resp", &log))
            .error_step(RecordingStep::shared("err", &log))
            .run();

        assert_eq!(outcome, RunOutcome::Halted(json!({"reason": "quota"})));
        assert_eq!(*log.lock(), vec!["req-1"]);
        assert_eq!(transport.call_count(), 0);
    }

    #[test]
    fn test_halt_with_error_resolves_to_err() {
        let transport = Arc::new(StubTransport::always(Response::new(200)));

        let outcome = build(transport)
            .response_step(steps::from_fn("halt", |_r: Response, _s: &mut PipelineState| {
                StepResult::Halt(Halt::Error(PipelineError::step("stop")))
            }))
            .run();

        assert_eq!(outcome, RunOutcome::Done(Err(PipelineError::step("stop"))));
    }

    #[test]
    fn test_steps_share_private_state() {
        let transport = Arc::new(StubTransport::always(Response::new(200)));

        let outcome = build(transport)
            .request_step(Arc::new(FnStep::new("stamp", |req: Request, state: &mut PipelineState| {
                state.put_private("stamp", json!("from-request"));
                StepResult::Continue(req)
            })))
            .response_step(Arc::new(FnStep::new("read", |resp: Response, state: &mut PipelineState| {
                let stamp = state.get_private("stamp", json!(null));
                StepResult::Continue(resp.with_body(stamp))
            })))
            .run();

        assert_eq!(outcome.response().unwrap().body.as_json(), Some(&json!("from-request")));
    }

    #[test]
    fn test_transport_receives_transformed_request() {
        let mut mock = MockTransport::new();
        mock.expect_send()
            .withf(|req: &Request| req.url == "http://x" && req.headers.get("x-step") == Some("1"))
            .times(1)
            .returning(|_| Ok(Response::new(204)));

        let outcome = PipelineState::build(Arc::new(mock), "GET", "http://x", BuildOptions::new())
            .request_step(steps::map("tag", |req: Request| req.with_header("x-step", "1")))
            .run();

        assert_eq!(outcome.response().map(|r| r.status), Some(204));
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(Phase::Request.to_string(), "request");
        assert_eq!(Phase::Transport.to_string(), "transport");
        assert_eq!(Phase::Error.to_string(), "error");
    }
}
