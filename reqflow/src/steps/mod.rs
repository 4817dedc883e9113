//! The step contract and the built-in steps.
//!
//! A step is one transformation registered into a phase. Every step has the
//! same shape, `(value, &mut PipelineState) -> StepResult<value>`, whether it
//! looks at the pipeline state or not, so built-in and user steps compose
//! without special cases.

mod auth;
mod base_url;
mod decode;
mod default_headers;
mod retry;
mod status;

pub use auth::Auth;
pub use base_url::BaseUrl;
pub use decode::Decode;
pub use default_headers::{DefaultHeaders, DEFAULT_USER_AGENT};
pub use retry::{
    BackoffStrategy, JitterStrategy, Retry, RetryBackoff, RetryRequestSteps,
    DEFAULT_MAX_ATTEMPTS, RETRY_ATTEMPT_KEY,
};
pub use status::ErrorOnStatus;

use crate::core::{Halt, Response};
use crate::errors::PipelineError;
use crate::pipeline::PipelineState;
use std::fmt::Debug;
use std::marker::PhantomData;
use std::sync::Arc;

/// A shared, type-erased step for phase `T`.
pub type SharedStep<T> = Arc<dyn Step<T>>;

/// What a step hands back to the phase executor.
///
/// Returning the phase's own value type through `Response` (in the response
/// phase) or `Error` (in the error phase) is the same as `Continue`.
#[derive(Debug, Clone, PartialEq)]
pub enum StepResult<T> {
    /// Pass the value to the next step of this phase.
    Continue(T),
    /// Jump to the response phase with this response.
    Response(Response),
    /// Jump to the error phase with this error.
    Error(PipelineError),
    /// Stop the whole pipeline.
    Halt(Halt),
}

impl<T> StepResult<T> {
    /// Halts with an arbitrary value.
    #[must_use]
    pub fn halt_with(value: serde_json::Value) -> Self {
        Self::Halt(Halt::Value(value))
    }

    /// Returns true for `Continue`.
    #[must_use]
    pub fn is_continue(&self) -> bool {
        matches!(self, Self::Continue(_))
    }
}

/// Trait for pipeline steps.
///
/// `T` is the value type of the phase the step runs in: `Request`,
/// `Response` or `PipelineError`. A step that makes sense in several phases
/// implements the trait once per phase.
pub trait Step<T>: Send + Sync + Debug {
    /// Returns the name of the step, used in logs.
    fn name(&self) -> &str;

    /// Runs the step.
    ///
    /// # Arguments
    ///
    /// * `value` - The phase accumulator
    /// * `state` - The pipeline state, for private data and derived runs
    fn call(&self, value: T, state: &mut PipelineState) -> StepResult<T>;
}

/// A simple function-based step.
pub struct FnStep<T, F>
where
    F: Fn(T, &mut PipelineState) -> StepResult<T> + Send + Sync,
{
    name: String,
    func: F,
    _phase: PhantomData<fn(T) -> T>,
}

impl<T, F> FnStep<T, F>
where
    F: Fn(T, &mut PipelineState) -> StepResult<T> + Send + Sync,
{
    /// Creates a new function-based step.
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
            _phase: PhantomData,
        }
    }
}

impl<T, F> Debug for FnStep<T, F>
where
    F: Fn(T, &mut PipelineState) -> StepResult<T> + Send + Sync,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnStep").field("name", &self.name).finish()
    }
}

impl<T, F> Step<T> for FnStep<T, F>
where
    F: Fn(T, &mut PipelineState) -> StepResult<T> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn call(&self, value: T, state: &mut PipelineState) -> StepResult<T> {
        (self.func)(value, state)
    }
}

/// Wraps a closure that sees the value and the pipeline state.
pub fn from_fn<T, F>(name: impl Into<String>, func: F) -> SharedStep<T>
where
    T: 'static,
    F: Fn(T, &mut PipelineState) -> StepResult<T> + Send + Sync + 'static,
{
    Arc::new(FnStep::new(name, func))
}

/// Wraps a plain transformation that always continues.
pub fn map<T, G>(name: impl Into<String>, transform: G) -> SharedStep<T>
where
    T: 'static,
    G: Fn(T) -> T + Send + Sync + 'static,
{
    from_fn(name, move |value: T, _state: &mut PipelineState| {
        StepResult::Continue(transform(value))
    })
}
