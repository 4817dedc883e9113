//! High-level request functions.
//!
//! These assemble a pipeline with the default step set (`DefaultHeaders` in
//! the request phase, `Decode` in the response phase), run it and flatten the
//! outcome into a `Result`.

use crate::config::ClientConfig;
use crate::core::Response;
use crate::errors::{PipelineError, ReqflowError};
use crate::pipeline::{BuildOptions, PipelineState};
use crate::steps::{Decode, DefaultHeaders, Retry};
use crate::transport::Transport;
use std::fmt;
use std::sync::Arc;

/// A transport handle plus the configuration for the default pipeline.
#[derive(Clone)]
pub struct Client {
    transport: Arc<dyn Transport>,
    config: ClientConfig,
}

impl Client {
    /// Creates a client with the default configuration.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            config: ClientConfig::default(),
        }
    }

    /// Creates a client with a validated configuration.
    pub fn with_config(transport: Arc<dyn Transport>, config: ClientConfig) -> Result<Self, ReqflowError> {
        config.validate()?;
        Ok(Self { transport, config })
    }

    /// Creates a client backed by a blocking HTTP transport.
    #[cfg(feature = "http-client")]
    pub fn from_config(config: ClientConfig) -> Result<Self, ReqflowError> {
        let transport = crate::transport::ReqwestTransport::from_config(&config.transport)?;
        Self::with_config(Arc::new(transport), config)
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Returns the transport handle.
    #[must_use]
    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Builds a pipeline with the default steps registered.
    ///
    /// Further steps appended by the caller run after the defaults.
    #[must_use]
    pub fn build(&self, method: impl AsRef<str>, url: impl Into<String>, options: BuildOptions) -> PipelineState {
        PipelineState::build(Arc::clone(&self.transport), method, url, options)
            .with_config(self.config.pipeline)
            .request_step(Arc::new(DefaultHeaders::new(self.config.user_agent.as_str())))
            .response_step(Decode::shared())
    }

    /// Returns a retry step using the configured retry settings.
    #[must_use]
    pub fn retry(&self) -> Retry {
        Retry::from_config(&self.config.retry)
    }

    /// Runs a request through the default pipeline.
    pub fn request(
        &self,
        method: impl AsRef<str>,
        url: impl Into<String>,
        options: BuildOptions,
    ) -> Result<Response, PipelineError> {
        self.build(method, url, options).run().into_result()
    }

    /// Runs a GET request.
    pub fn get(&self, url: impl Into<String>, options: BuildOptions) -> Result<Response, PipelineError> {
        self.request("GET", url, options)
    }

    /// Runs a POST request with `body`.
    pub fn post(
        &self,
        url: impl Into<String>,
        body: impl Into<Vec<u8>>,
        options: BuildOptions,
    ) -> Result<Response, PipelineError> {
        self.request("POST", url, options.with_body(body))
    }

    /// Runs a GET request that must succeed.
    ///
    /// # Panics
    ///
    /// Panics if the pipeline ends with an error or halts.
    pub fn must_get(&self, url: impl Into<String>, options: BuildOptions) -> Response {
        let url = url.into();
        match self.get(url.as_str(), options) {
            Ok(response) => response,
            Err(err) => panic!("GET {url} failed: {err}"),
        }
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Runs `method url` through the default pipeline.
pub fn request(
    transport: Arc<dyn Transport>,
    method: impl AsRef<str>,
    url: impl Into<String>,
    options: BuildOptions,
) -> Result<Response, PipelineError> {
    Client::new(transport).request(method, url, options)
}

/// Runs `GET url` through the default pipeline.
pub fn get(transport: Arc<dyn Transport>, url: impl Into<String>, options: BuildOptions) -> Result<Response, PipelineError> {
    Client::new(transport).get(url, options)
}

/// Runs `GET url` and returns the response.
///
/// # Panics
///
/// Panics if the pipeline ends with an error or halts.
pub fn must_get(transport: Arc<dyn Transport>, url: impl Into<String>, options: BuildOptions) -> Response {
    Client::new(transport).must_get(url, options)
}
