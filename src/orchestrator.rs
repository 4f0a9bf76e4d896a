// src/orchestrator.rs

//! The task orchestrator: one run, start to finish.
//!
//! ```text
//! label run -> prepare workspace -> GPU diagnostics -> resolve input
//!   -> resolve weights -> build command -> run tool -> collect outputs
//!   -> return result
//! ```
//!
//! Every step before the tool runs is a hard precondition. A failing tool,
//! on the other hand, is reported (log + operator notification) and the run
//! still returns a result, so whatever the tool managed to write gets
//! published. The result's [`RunStatus`] tells the two cases apart.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;
use tracing::{error, info, warn};

use crate::command::{CommandInvocation, WeightsArg, build_invocation};
use crate::config::ConfigFile;
use crate::errors::{OmegafoldError, Result};
use crate::exec::{CancelToken, ProcessRunner, verify_gpu};
use crate::platform::{Platform, Severity};
use crate::remote::{FileResolver, RemoteRef};
use crate::request::RunRequest;
use crate::types::{RunName, WeightsSource};
use crate::weights::{default_weights_path, resolve_weights};
use crate::workspace::{build_globset, collect_outputs, prepare_workspace, run_dir};

const FAILURE_TITLE: &str = "OmegaFold failed";
const MISSING_OUTPUTS_TITLE: &str = "OmegaFold outputs not listed";

/// How the prediction itself went.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RunStatus {
    Succeeded,
    /// The tool failed; the output directory may be empty or partial.
    PredictionFailed { detail: String },
}

impl RunStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, RunStatus::Succeeded)
    }
}

/// What gets handed back for publication.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunResult {
    pub run_name: RunName,
    /// Output root (the parent of `run_dir`); this whole tree is published.
    pub local_root: PathBuf,
    pub run_dir: PathBuf,
    /// Caller-declared destination; `None` leaves it to the platform default.
    pub remote_location: Option<String>,
    pub status: RunStatus,
    /// Files under `run_dir` matching `[publish].output_globs`.
    pub outputs: Vec<PathBuf>,
    /// The prediction command line that was run.
    pub command: Vec<String>,
}

/// Runs prediction requests against pluggable collaborators.
pub struct Orchestrator<R, F, P> {
    cfg: ConfigFile,
    runner: R,
    resolver: F,
    platform: P,
    deadline: Option<Duration>,
}

impl<R, F, P> Orchestrator<R, F, P>
where
    R: ProcessRunner,
    F: FileResolver,
    P: Platform,
{
    pub fn new(cfg: ConfigFile, runner: R, resolver: F, platform: P) -> Self {
        let deadline = cfg.tool_timeout();
        Self {
            cfg,
            runner,
            resolver,
            platform,
            deadline,
        }
    }

    /// Override the prediction deadline from the config.
    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        if deadline.is_some() {
            self.deadline = deadline;
        }
        self
    }

    pub fn config(&self) -> &ConfigFile {
        &self.cfg
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline
    }

    /// Execute one run.
    pub async fn run(&self, req: &RunRequest, cancel: CancelToken) -> Result<RunResult> {
        self.label_run(&req.run_name).await;

        info!(run = %req.run_name, "creating local directories");
        let output_root = self.cfg.paths.output_root.clone();
        let run_dir = prepare_workspace(&output_root, &req.run_name)?;

        info!("checking GPU availability");
        verify_gpu(&self.runner, &self.cfg.diagnostics.commands, &cancel).await?;

        let input_path = until_cancelled(
            self.resolver.fetch(&req.input_file, &self.cfg.paths.staging_dir),
            cancel.clone(),
        )
        .await?;

        let weights = until_cancelled(
            resolve_weights(
                &req.weights,
                &self.cfg.weights,
                &self.cfg.paths.staging_dir,
                &self.resolver,
            ),
            cancel.clone(),
        )
        .await?;

        let invocation = build_invocation(&self.cfg.tool, &input_path, &run_dir, &weights, req);
        info!(command = %invocation.display(), "running OmegaFold");

        let status = match self.runner.run(&invocation, self.deadline, cancel).await {
            Ok(outcome) if outcome.is_success() => RunStatus::Succeeded,
            Ok(failed) => self.report_failure(&req.run_name, failed.describe()).await,
            Err(e @ (OmegafoldError::Timeout(_) | OmegafoldError::Cancelled)) => return Err(e),
            Err(e) => self.report_failure(&req.run_name, format!("{e:#}")).await,
        };

        info!("returning results");
        let listed = build_globset(&self.cfg.publish.output_globs)
            .and_then(|globs| collect_outputs(&run_dir, &globs));
        let outputs = match salvage_outputs(listed, &status) {
            Ok(outputs) => outputs,
            Err(Salvage::Fatal(e)) => return Err(e),
            Err(Salvage::Unlisted(detail)) => {
                warn!(run = %req.run_name, %detail, "could not list partial outputs");
                let body = format!("run {}: {detail}", req.run_name);
                if let Err(e) = self
                    .platform
                    .notify(Severity::Warning, MISSING_OUTPUTS_TITLE, &body)
                    .await
                {
                    warn!(run = %req.run_name, error = %e, "could not deliver notification");
                }
                Vec::new()
            }
        };

        Ok(RunResult {
            run_name: req.run_name.clone(),
            local_root: output_root,
            run_dir,
            remote_location: req.output_location.clone(),
            status,
            outputs,
            command: invocation.argv(),
        })
    }

    /// The command a run would execute, without touching the filesystem,
    /// the network or any process.
    pub fn plan(&self, req: &RunRequest) -> Result<CommandInvocation> {
        let input_path = planned_input_path(&req.input_file, &self.cfg.paths.staging_dir)?;
        let weights = match &req.weights {
            WeightsSource::LocalFile(path) => WeightsArg::File(path.clone()),
            WeightsSource::Preset(name) => WeightsArg::Preset(name.clone()),
            WeightsSource::Download(model) => {
                WeightsArg::File(default_weights_path(*model, &self.cfg.weights))
            }
        };
        let dir = run_dir(&self.cfg.paths.output_root, &req.run_name);
        Ok(build_invocation(&self.cfg.tool, &input_path, &dir, &weights, req))
    }

    async fn label_run(&self, name: &RunName) {
        if let Err(e) = self.platform.label_execution(name).await {
            warn!(run = %name, error = %e, "could not label execution; continuing");
        }
    }

    async fn report_failure(&self, name: &RunName, detail: String) -> RunStatus {
        error!(run = %name, %detail, "FAILED");
        let body = format!("run {name}: {detail}");
        if let Err(e) = self.platform.notify(Severity::Error, FAILURE_TITLE, &body).await {
            warn!(run = %name, error = %e, "could not deliver failure notification");
        }
        RunStatus::PredictionFailed { detail }
    }
}

/// Run a staging step, giving up as soon as cancellation is requested.
async fn until_cancelled<T, Fut>(work: Fut, mut cancel: CancelToken) -> Result<T>
where
    Fut: Future<Output = Result<T>>,
{
    if cancel.is_cancelled() {
        return Err(OmegafoldError::Cancelled);
    }
    tokio::select! {
        res = work => res,
        _ = cancel.cancelled() => {
            info!("cancellation requested; abandoning staging");
            Err(OmegafoldError::Cancelled)
        }
    }
}

enum Salvage {
    Fatal(OmegafoldError),
    Unlisted(String),
}

/// Output listing errors are fatal for a successful prediction only. After a
/// failed prediction whatever is on disk gets published regardless.
fn salvage_outputs(
    listed: anyhow::Result<Vec<PathBuf>>,
    status: &RunStatus,
) -> std::result::Result<Vec<PathBuf>, Salvage> {
    match listed {
        Ok(outputs) => Ok(outputs),
        Err(e) if status.is_success() => Err(Salvage::Fatal(e.into())),
        Err(e) => Err(Salvage::Unlisted(format!("{e:#}"))),
    }
}

fn planned_input_path(reference: &str, staging_dir: &Path) -> Result<PathBuf> {
    match RemoteRef::parse(reference)? {
        RemoteRef::Local(path) => Ok(path),
        remote => {
            let name = remote.file_name().ok_or_else(|| {
                OmegafoldError::InvalidRequest(format!("cannot derive a file name from '{reference}'"))
            })?;
            Ok(staging_dir.join(name))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serialises_with_state_tag() {
        let ok = serde_json::to_value(RunStatus::Succeeded).unwrap();
        assert_eq!(ok, serde_json::json!({"state": "succeeded"}));

        let failed = serde_json::to_value(RunStatus::PredictionFailed {
            detail: "exited with status 1".to_string(),
        })
        .unwrap();
        assert_eq!(
            failed,
            serde_json::json!({"state": "prediction_failed", "detail": "exited with status 1"})
        );
    }

    #[test]
    fn listing_errors_are_fatal_only_after_success() {
        let failed = RunStatus::PredictionFailed {
            detail: "exited with status 1".to_string(),
        };
        let broken = || -> anyhow::Result<Vec<PathBuf>> {
            Err(anyhow::anyhow!("reading dir \"/out/run\": Permission denied"))
        };

        match salvage_outputs(broken(), &failed) {
            Err(Salvage::Unlisted(detail)) => assert!(detail.contains("Permission denied")),
            _ => panic!("expected listing error to be salvaged"),
        }
        assert!(matches!(
            salvage_outputs(broken(), &RunStatus::Succeeded),
            Err(Salvage::Fatal(OmegafoldError::Other(_)))
        ));

        let outputs = vec![PathBuf::from("/out/run/a.pdb")];
        assert!(matches!(
            salvage_outputs(Ok(outputs.clone()), &failed),
            Ok(found) if found == outputs
        ));
    }

    #[test]
    fn planned_input_for_remote_reference_is_staged() {
        let staged = planned_input_path("s3://bucket/dir/seq.fasta", Path::new("/root/inputs")).unwrap();
        assert_eq!(staged, PathBuf::from("/root/inputs/seq.fasta"));

        let local = planned_input_path("/data/seq.fasta", Path::new("/root/inputs")).unwrap();
        assert_eq!(local, PathBuf::from("/data/seq.fasta"));
    }
}
