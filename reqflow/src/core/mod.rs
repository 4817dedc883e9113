//! Core message types: requests, responses, headers and run outcomes.

mod headers;
mod message;
mod outcome;

pub use headers::Headers;
pub use message::{Body, Request, Response};
pub use outcome::{Halt, RunOutcome};
