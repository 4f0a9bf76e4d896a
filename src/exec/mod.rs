// src/exec/mod.rs

//! Process execution layer.
//!
//! This module is responsible for running external commands with
//! `tokio::process::Command` and reporting how they ended.
//!
//! - [`runner`] provides the `ProcessRunner` trait and the concrete
//!   `RealProcessRunner`, which tests replace with a fake implementation.
//! - [`cancel`] holds the cancellation signal shared by every process of a
//!   run (fired on Ctrl-C).
//! - [`diagnostics`] runs the GPU precondition checks.

pub mod cancel;
pub mod diagnostics;
pub mod runner;

pub use cancel::{CancelHandle, CancelToken, cancel_pair};
pub use diagnostics::verify_gpu;
pub use runner::{ExitOutcome, ProcessRunner, RealProcessRunner};
