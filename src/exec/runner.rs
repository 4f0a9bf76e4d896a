// src/exec/runner.rs

//! Pluggable process runner abstraction.
//!
//! The orchestrator talks to a `ProcessRunner` instead of spawning processes
//! itself. This makes it easy to swap in a fake runner in tests while keeping
//! the production implementation here.

use std::future::Future;
use std::pin::Pin;
use std::process::Stdio;
use std::time::Duration;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::command::CommandInvocation;
use crate::errors::{OmegafoldError, Result};
use crate::exec::cancel::CancelToken;

/// How a process that ran to completion ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitOutcome {
    Success,
    /// Non-zero exit; `None` when the process was terminated by a signal.
    Failed(Option<i32>),
}

impl ExitOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ExitOutcome::Success)
    }

    /// Human-readable description of a failure.
    pub fn describe(&self) -> String {
        match self {
            ExitOutcome::Success => "exited successfully".to_string(),
            ExitOutcome::Failed(Some(code)) => format!("exited with status {code}"),
            ExitOutcome::Failed(None) => "terminated by signal".to_string(),
        }
    }
}

/// Trait abstracting how commands are executed.
///
/// Contract:
/// - `Ok(outcome)` when the process ran and exited on its own.
/// - `Err(Timeout)` when `deadline` elapsed first; the process is killed.
/// - `Err(Cancelled)` when `cancel` fired first; the process is killed.
/// - any other `Err` when the process could not be launched or awaited.
pub trait ProcessRunner: Send + Sync {
    fn run<'a>(
        &'a self,
        invocation: &'a CommandInvocation,
        deadline: Option<Duration>,
        cancel: CancelToken,
    ) -> Pin<Box<dyn Future<Output = Result<ExitOutcome>> + Send + 'a>>;
}

/// Real runner used in production.
///
/// Child stdout and stderr are forwarded line by line to the log, so the
/// tool's progress output shows up as soon as it is written.
#[derive(Debug, Clone, Default)]
pub struct RealProcessRunner;

impl ProcessRunner for RealProcessRunner {
    fn run<'a>(
        &'a self,
        invocation: &'a CommandInvocation,
        deadline: Option<Duration>,
        cancel: CancelToken,
    ) -> Pin<Box<dyn Future<Output = Result<ExitOutcome>> + Send + 'a>> {
        Box::pin(run_process(invocation, deadline, cancel))
    }
}

async fn run_process(
    invocation: &CommandInvocation,
    deadline: Option<Duration>,
    mut cancel: CancelToken,
) -> Result<ExitOutcome> {
    if cancel.is_cancelled() {
        return Err(OmegafoldError::Cancelled);
    }

    info!(cmd = %invocation.display(), "starting process");

    let mut cmd = Command::new(&invocation.program);
    cmd.args(&invocation.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd
        .spawn()
        .with_context(|| format!("spawning process `{}`", invocation.program))?;

    let forwarders = [
        forward_lines(child.stdout.take(), &invocation.program, "stdout"),
        forward_lines(child.stderr.take(), &invocation.program, "stderr"),
    ];

    let expiry = async move {
        match deadline {
            Some(limit) => {
                tokio::time::sleep(limit).await;
                limit
            }
            None => std::future::pending().await,
        }
    };

    tokio::select! {
        status_res = child.wait() => {
            let status = status_res.with_context(|| {
                format!("waiting for process `{}`", invocation.program)
            })?;

            // Drain the remaining output before reporting.
            for handle in forwarders.into_iter().flatten() {
                let _ = handle.await;
            }

            let outcome = if status.success() {
                ExitOutcome::Success
            } else {
                ExitOutcome::Failed(status.code())
            };

            info!(
                program = %invocation.program,
                exit_code = status.code().unwrap_or(-1),
                success = status.success(),
                "process exited"
            );
            Ok(outcome)
        }

        limit = expiry => {
            warn!(
                program = %invocation.program,
                ?limit,
                "process exceeded its deadline; killing"
            );
            if let Err(e) = child.kill().await {
                warn!(program = %invocation.program, error = %e, "failed to kill process");
            }
            Err(OmegafoldError::Timeout(limit))
        }

        _ = cancel.cancelled() => {
            info!(program = %invocation.program, "cancellation requested; killing process");
            if let Err(e) = child.kill().await {
                warn!(program = %invocation.program, error = %e, "failed to kill process");
            }
            Err(OmegafoldError::Cancelled)
        }
    }
}

fn forward_lines<S>(stream: Option<S>, program: &str, name: &'static str) -> Option<JoinHandle<()>>
where
    S: AsyncRead + Unpin + Send + 'static,
{
    let stream = stream?;
    let program = program.to_string();
    Some(tokio::spawn(async move {
        let mut lines = BufReader::new(stream).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => info!(%program, stream = name, "{}", line),
                Ok(None) => break,
                Err(e) => {
                    debug!(%program, stream = name, error = %e, "stopped reading output");
                    break;
                }
            }
        }
    }))
}
