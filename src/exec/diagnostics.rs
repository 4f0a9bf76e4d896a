// src/exec/diagnostics.rs

//! GPU precondition checks.
//!
//! Every configured command (by default `nvidia-smi` and `nvcc --version`)
//! must exit successfully before any GPU work starts.

use tracing::info;

use crate::command::CommandInvocation;
use crate::errors::{OmegafoldError, Result};
use crate::exec::cancel::CancelToken;
use crate::exec::runner::{ExitOutcome, ProcessRunner};

/// Run each diagnostic argv in order, stopping at the first failure.
pub async fn verify_gpu<R>(runner: &R, commands: &[Vec<String>], cancel: &CancelToken) -> Result<()>
where
    R: ProcessRunner + ?Sized,
{
    for argv in commands {
        let Some((program, args)) = argv.split_first() else {
            continue;
        };
        let invocation = CommandInvocation::new(program.clone(), args.to_vec());
        let command = invocation.display();

        match runner.run(&invocation, None, cancel.clone()).await {
            Ok(ExitOutcome::Success) => info!(%command, "diagnostic passed"),
            Ok(failed) => {
                return Err(OmegafoldError::Diagnostic {
                    command,
                    detail: failed.describe(),
                });
            }
            Err(OmegafoldError::Cancelled) => return Err(OmegafoldError::Cancelled),
            Err(e) => {
                return Err(OmegafoldError::Diagnostic {
                    command,
                    detail: e.to_string(),
                });
            }
        }
    }
    Ok(())
}
