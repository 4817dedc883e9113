//! Pipeline state: the built request, the three step lists and private data.

use crate::config::PipelineConfig;
use crate::core::{Headers, Request, Response, RunOutcome};
use crate::errors::PipelineError;
use crate::steps::{RetryRequestSteps, SharedStep};
use crate::transport::Transport;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Options recognised by [`PipelineState::build`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildOptions {
    /// Request body.
    pub body: Vec<u8>,
    /// Request headers, in order.
    pub headers: Vec<(String, String)>,
}

impl BuildOptions {
    /// Creates empty options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Appends a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Appends several headers.
    #[must_use]
    pub fn with_headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.headers
            .extend(headers.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }
}

/// Everything one run needs.
///
/// Created by [`PipelineState::build`], extended with the `add_*_steps`
/// methods and [`PipelineState::put_private`], then consumed by
/// [`PipelineState::run`]. The append methods take `self` by value, so steps,
/// which only ever see `&mut PipelineState`, cannot change the step lists.
#[derive(Clone)]
pub struct PipelineState {
    request: Request,
    request_steps: Vec<SharedStep<Request>>,
    response_steps: Vec<SharedStep<Response>>,
    error_steps: Vec<SharedStep<PipelineError>>,
    private: HashMap<String, serde_json::Value>,
    transport: Arc<dyn Transport>,
    config: PipelineConfig,
    run_id: Uuid,
}

impl PipelineState {
    /// Builds a state with the initial request and no steps.
    #[must_use]
    pub fn build(
        transport: Arc<dyn Transport>,
        method: impl AsRef<str>,
        url: impl Into<String>,
        options: BuildOptions,
    ) -> Self {
        let mut request = Request::new(method, url);
        request.headers = Headers::from(options.headers);
        request.body = options.body;

        Self {
            request,
            request_steps: Vec::new(),
            response_steps: Vec::new(),
            error_steps: Vec::new(),
            private: HashMap::new(),
            transport,
            config: PipelineConfig::default(),
            run_id: Uuid::new_v4(),
        }
    }

    /// Appends request steps after any already registered.
    #[must_use]
    pub fn add_request_steps<I>(mut self, steps: I) -> Self
    where
        I: IntoIterator<Item = SharedStep<Request>>,
    {
        self.request_steps.extend(steps);
        self
    }

    /// Appends response steps after any already registered.
    #[must_use]
    pub fn add_response_steps<I>(mut self, steps: I) -> Self
    where
        I: IntoIterator<Item = SharedStep<Response>>,
    {
        self.response_steps.extend(steps);
        self
    }

    /// Appends error steps after any already registered.
    #[must_use]
    pub fn add_error_steps<I>(mut self, steps: I) -> Self
    where
        I: IntoIterator<Item = SharedStep<PipelineError>>,
    {
        self.error_steps.extend(steps);
        self
    }

    /// Appends a single request step.
    #[must_use]
    pub fn request_step(self, step: SharedStep<Request>) -> Self {
        self.add_request_steps([step])
    }

    /// Appends a single response step.
    #[must_use]
    pub fn response_step(self, step: SharedStep<Response>) -> Self {
        self.add_response_steps([step])
    }

    /// Appends a single error step.
    #[must_use]
    pub fn error_step(self, step: SharedStep<PipelineError>) -> Self {
        self.add_error_steps([step])
    }

    /// Sets the executor limits.
    #[must_use]
    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Stores a private value, replacing any previous one.
    pub fn put_private(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.private.insert(key.into(), value);
    }

    /// Reads a private value, falling back to `default`.
    #[must_use]
    pub fn get_private(&self, key: &str, default: serde_json::Value) -> serde_json::Value {
        self.private.get(key).cloned().unwrap_or(default)
    }

    /// Reads a private counter, falling back to `default` for missing or
    /// non-integer values.
    #[must_use]
    pub fn get_private_u64(&self, key: &str, default: u64) -> u64 {
        self.private
            .get(key)
            .and_then(serde_json::Value::as_u64)
            .unwrap_or(default)
    }

    /// Returns the private map.
    #[must_use]
    pub fn private(&self) -> &HashMap<String, serde_json::Value> {
        &self.private
    }

    /// Returns the request as built, before any request step ran.
    #[must_use]
    pub fn request(&self) -> &Request {
        &self.request
    }

    /// Returns the request steps.
    #[must_use]
    pub fn request_steps(&self) -> &[SharedStep<Request>] {
        &self.request_steps
    }

    /// Returns the response steps.
    #[must_use]
    pub fn response_steps(&self) -> &[SharedStep<Response>] {
        &self.response_steps
    }

    /// Returns the error steps.
    #[must_use]
    pub fn error_steps(&self) -> &[SharedStep<PipelineError>] {
        &self.error_steps
    }

    /// Returns the transport handle.
    #[must_use]
    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Returns the executor limits.
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Returns the identifier shared by a run and its retries.
    #[must_use]
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Copies the state for a nested retry run.
    ///
    /// The copy keeps the built request, the response and error steps and the
    /// private map. Request steps are dropped unless `mode` is `Replay`.
    #[must_use]
    pub fn derive_for_retry(&self, mode: RetryRequestSteps) -> Self {
        let mut derived = self.clone();
        if mode == RetryRequestSteps::Skip {
            derived.request_steps.clear();
        }
        derived
    }

    /// Runs the pipeline, consuming the state.
    pub fn run(self) -> RunOutcome {
        super::executor::run(self)
    }
}

impl fmt::Debug for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineState")
            .field("run_id", &self.run_id)
            .field("request", &self.request)
            .field("request_steps", &step_names(&self.request_steps))
            .field("response_steps", &step_names(&self.response_steps))
            .field("error_steps", &step_names(&self.error_steps))
            .field("private", &self.private)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn step_names<T>(steps: &[SharedStep<T>]) -> Vec<&str> {
    steps.iter().map(|s| s.name()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::steps::{self, Decode, DefaultHeaders, Retry};
    use crate::testing::StubTransport;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn transport() -> Arc<dyn Transport> {
        Arc::new(StubTransport::always(Response::new(200)))
    }

    #[test]
    fn test_build_sets_request_from_options() {
        let state = PipelineState::build(
            transport(),
            "post",
            "http://x/items",
            BuildOptions::new()
                .with_header("Accept", "application/json")
                .with_body("payload"),
        );

        let request = state.request();
        assert_eq!(request.method, "POST");
        assert_eq!(request.url, "http://x/items");
        assert_eq!(request.headers.get("accept"), Some("application/json"));
        assert_eq!(request.body, b"payload".to_vec());
        assert!(state.request_steps().is_empty());
        assert!(state.private().is_empty());
    }

    #[test]
    fn test_add_steps_preserves_call_order() {
        let state = PipelineState::build(transport(), "GET", "http://x", BuildOptions::new())
            .add_request_steps([steps::map("a", |r: Request| r), steps::map("b", |r: Request| r)])
            .add_request_steps([steps::map("c", |r: Request| r)])
            .request_step(DefaultHeaders::shared());

        let names: Vec<&str> = state.request_steps().iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["a", "b", "c", "default_headers"]);
    }

    #[test]
    fn test_private_defaults() {
        let mut state = PipelineState::build(transport(), "GET", "http://x", BuildOptions::new());

        assert_eq!(state.get_private("missing", json!("fallback")), json!("fallback"));
        assert_eq!(state.get_private_u64("missing", 9), 9);

        state.put_private("count", json!(3));
        state.put_private("label", json!("x"));
        assert_eq!(state.get_private_u64("count", 0), 3);
        assert_eq!(state.get_private_u64("label", 0), 0);
    }

    #[test]
    fn test_derive_for_retry() {
        let mut state = PipelineState::build(transport(), "GET", "http://x", BuildOptions::new())
            .request_step(DefaultHeaders::shared())
            .response_step(Decode::shared())
            .error_step(Retry::shared_for_errors());
        state.put_private("k", json!(1));

        let skipped = state.derive_for_retry(RetryRequestSteps::Skip);
        assert!(skipped.request_steps().is_empty());
        assert_eq!(skipped.response_steps().len(), 1);
        assert_eq!(skipped.error_steps().len(), 1);
        assert_eq!(skipped.get_private("k", json!(0)), json!(1));
        assert_eq!(skipped.run_id(), state.run_id());

        let replayed = state.derive_for_retry(RetryRequestSteps::Replay);
        assert_eq!(replayed.request_steps().len(), 1);
    }

    #[test]
    fn test_debug_lists_step_names() {
        let state = PipelineState::build(transport(), "GET", "http://x", BuildOptions::new())
            .response_step(Decode::shared());
        let rendered = format!("{state:?}");
        assert!(rendered.contains("decode"));
    }
}
