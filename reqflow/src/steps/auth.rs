//! Request step adding an `authorization` header.

use super::{SharedStep, Step, StepResult};
use crate::core::Request;
use crate::pipeline::PipelineState;
use base64::Engine;
use std::fmt;
use std::sync::Arc;

/// Sets `authorization` unless the request already has one.
#[derive(Clone)]
pub enum Auth {
    /// `Bearer <token>`
    Bearer(String),
    /// `Basic base64(username:password)`
    Basic {
        /// The username.
        username: String,
        /// The password.
        password: String,
    },
}

impl Auth {
    /// Creates bearer token authentication.
    #[must_use]
    pub fn bearer(token: impl Into<String>) -> Self {
        Self::Bearer(token.into())
    }

    /// Creates basic authentication.
    #[must_use]
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Basic {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Returns the step ready for registration.
    #[must_use]
    pub fn shared(self) -> SharedStep<Request> {
        Arc::new(self)
    }

    /// Returns the header value.
    #[must_use]
    pub fn header_value(&self) -> String {
        match self {
            Self::Bearer(token) => format!("Bearer {token}"),
            Self::Basic { username, password } => {
                let encoded = base64::engine::general_purpose::STANDARD
                    .encode(format!("{username}:{password}"));
                format!("Basic {encoded}")
            }
        }
    }
}

// Credentials stay out of logs.
impl fmt::Debug for Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bearer(_) => f.debug_tuple("Bearer").field(&"<redacted>").finish(),
            Self::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
        }
    }
}

impl Step<Request> for Auth {
    fn name(&self) -> &str {
        "auth"
    }

    fn call(&self, mut request: Request, _state: &mut PipelineState) -> StepResult<Request> {
        if !request.headers.contains("authorization") {
            request.headers.append("authorization", self.header_value());
        }
        StepResult::Continue(request)
    }
}
