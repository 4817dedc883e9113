//! Pipeline state and execution.
//!
//! This module provides:
//! - The per-run pipeline state with its three step lists
//! - The phase executor with continue, jump and halt control flow

mod executor;
mod state;

pub use executor::Phase;
pub use state::{BuildOptions, PipelineState};
