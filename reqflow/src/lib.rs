//! # Reqflow
//!
//! An extensible HTTP request pipeline.
//!
//! A caller builds a request, attaches ordered chains of steps for three
//! phases (request, response, error) and runs them against a pluggable
//! transport. Steps steer control flow through their return value:
//!
//! - **Continue**: hand the transformed value to the next step of the phase
//! - **Jump**: a request step may answer with a response (skipping the
//!   transport) or an error; a response step may fail into the error phase;
//!   an error step may recover with a response
//! - **Halt**: stop the whole pipeline with an arbitrary payload
//!
//! Built-in steps (`DefaultHeaders`, `Decode`, `Retry`, ...) are written
//! against the same contract as user steps.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use reqflow::prelude::*;
//!
//! let transport = Arc::new(ReqwestTransport::new()?);
//! let response = reqflow::get(transport, "https://example.com/data.json", BuildOptions::new())?;
//!
//! // Low-level: assemble the pipeline by hand.
//! let outcome = PipelineState::build(transport, "GET", "https://example.com", BuildOptions::new())
//!     .add_request_steps([DefaultHeaders::shared()])
//!     .add_response_steps([Decode::shared(), Retry::shared()])
//!     .run();
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod client;
pub mod config;
pub mod core;
pub mod errors;
pub mod observability;
pub mod pipeline;
pub mod steps;
pub mod testing;
pub mod transport;

pub use client::{get, must_get, request, Client};

/// Prelude module for convenient imports
pub mod prelude {
    pub use std::sync::Arc;

    pub use crate::client::{get, must_get, request, Client};
    pub use crate::config::{ClientConfig, LogConfig, PipelineConfig, RetryConfig};
    pub use crate::core::{Body, Halt, Headers, Request, Response, RunOutcome};
    pub use crate::errors::{ErrorKind, PipelineError, ReqflowError};
    pub use crate::pipeline::{BuildOptions, Phase, PipelineState};
    pub use crate::steps::{
        Auth, BaseUrl, Decode, DefaultHeaders, ErrorOnStatus, FnStep, Retry,
        RetryRequestSteps, Step, StepResult,
    };
    pub use crate::transport::Transport;

    #[cfg(feature = "http-client")]
    pub use crate::transport::ReqwestTransport;
}
