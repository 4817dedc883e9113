//! Request step adding a `user-agent` header.

use super::{SharedStep, Step, StepResult};
use crate::core::Request;
use crate::pipeline::PipelineState;
use std::sync::Arc;

/// User agent sent when none is configured.
pub const DEFAULT_USER_AGENT: &str = concat!("reqflow/", env!("CARGO_PKG_VERSION"));

/// Prepends `user-agent` unless the request already carries one in any casing.
#[derive(Debug, Clone)]
pub struct DefaultHeaders {
    user_agent: String,
}

impl Default for DefaultHeaders {
    fn default() -> Self {
        Self::new(DEFAULT_USER_AGENT)
    }
}

impl DefaultHeaders {
    /// Creates the step with a specific user agent.
    #[must_use]
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
        }
    }

    /// Returns the default step ready for registration.
    #[must_use]
    pub fn shared() -> SharedStep<Request> {
        Arc::new(Self::default())
    }

    /// Returns the configured user agent.
    #[must_use]
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }
}

impl Step<Request> for DefaultHeaders {
    fn name(&self) -> &str {
        "default_headers"
    }

    fn call(&self, mut request: Request, _state: &mut PipelineState) -> StepResult<Request> {
        if !request.headers.contains("user-agent") {
            request.headers.prepend("user-agent", self.user_agent.as_str());
        }
        StepResult::Continue(request)
    }
}
