//! Blocking HTTP transport backed by `reqwest`.

use super::Transport;
use crate::config::TransportConfig;
use crate::core::{Headers, Request, Response};
use crate::errors::{PipelineError, ReqflowError};
use reqwest::blocking::Client;
use reqwest::Method;
use std::time::Duration;

/// A [`Transport`] that performs real HTTP requests.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Creates a transport with the default timeout.
    pub fn new() -> Result<Self, ReqflowError> {
        Self::from_config(&TransportConfig::default())
    }

    /// Creates a transport with a specific timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self, ReqflowError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ReqflowError::TransportSetup(e.to_string()))?;
        Ok(Self { client })
    }

    /// Creates a transport from configuration.
    pub fn from_config(config: &TransportConfig) -> Result<Self, ReqflowError> {
        Self::with_timeout(config.timeout()?)
    }

    /// Wraps an already configured client.
    #[must_use]
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

impl Transport for ReqwestTransport {
    fn send(&self, request: &Request) -> Result<Response, PipelineError> {
        let method = Method::from_bytes(request.method.as_bytes()).map_err(|e| {
            PipelineError::transport(format!("invalid method {:?}: {e}", request.method))
        })?;

        let mut builder = self.client.request(method, request.url.as_str());
        for (name, value) in request.headers.iter() {
            builder = builder.header(name, value);
        }
        if !request.body.is_empty() {
            builder = builder.body(request.body.clone());
        }

        let response = builder.send().map_err(|e| {
            tracing::debug!(url = %request.url, error = %e, "HTTP request failed");
            PipelineError::transport(e.to_string())
        })?;

        let status = response.status().as_u16();
        let headers: Headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = response
            .bytes()
            .map_err(|e| PipelineError::transport(format!("failed to read body: {e}")).with_status(status))?;

        tracing::debug!(url = %request.url, status, bytes = body.len(), "HTTP response received");

        let mut out = Response::new(status).with_body(body.to_vec());
        out.headers = headers;
        Ok(out)
    }
}
