//! Testing utilities for reqflow pipelines.
//!
//! This module provides:
//! - Scripted transports that never touch the network
//! - Steps that record or halt
//! - Assertions over run outcomes

mod assertions;
mod mocks;

pub use assertions::{assert_err_kind, assert_halted_with, assert_ok_status};
pub use mocks::{call_log, CallLog, FailingTransport, HaltingStep, RecordingStep, StubTransport};
