// src/lib.rs

pub mod cli;
pub mod command;
pub mod config;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod orchestrator;
pub mod platform;
pub mod remote;
pub mod request;
pub mod types;
pub mod weights;
pub mod workspace;

use anyhow::Result;
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::{default_config_path, load_or_default};
use crate::exec::{ProcessRunner, RealProcessRunner, cancel_pair};
use crate::orchestrator::{Orchestrator, RunResult};
use crate::platform::{Platform, WebhookPlatform};
use crate::remote::{FileResolver, HttpResolver};
use crate::request::RunRequest;

/// What a CLI invocation ended with.
#[derive(Debug)]
pub enum Completion {
    DryRun,
    Finished(RunResult),
}

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - run request construction
/// - the orchestrator and its real collaborators
/// - Ctrl-C handling
///
/// The run result is printed to stdout as JSON.
pub async fn run(args: CliArgs) -> Result<Completion> {
    let explicit = args.config.is_some();
    let config_path = args.config.clone().unwrap_or_else(default_config_path);
    let cfg = load_or_default(&config_path, explicit)?;

    let request = RunRequest::from_args(&args, &cfg);
    debug!(?request, "run request");

    let platform = WebhookPlatform::from_config(&cfg.platform)?;
    let orchestrator = Orchestrator::new(cfg, RealProcessRunner, HttpResolver::new()?, platform)
        .with_deadline(args.timeout);

    if args.dry_run {
        print_dry_run(&orchestrator, &request)?;
        return Ok(Completion::DryRun);
    }

    // Ctrl-C → kill the prediction process and abort.
    let (cancel_handle, cancel) = cancel_pair();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            eprintln!("failed to listen for Ctrl+C: {e}");
            return;
        }
        info!("Ctrl+C received; cancelling run");
        cancel_handle.cancel();
    });

    let result = orchestrator.run(&request, cancel).await?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(Completion::Finished(result))
}

/// Dry-run output: the resolved command and where results would go.
fn print_dry_run<R, F, P>(orchestrator: &Orchestrator<R, F, P>, request: &RunRequest) -> Result<()>
where
    R: ProcessRunner,
    F: FileResolver,
    P: Platform,
{
    let cfg = orchestrator.config();
    let command = orchestrator.plan(request)?;

    println!("omegafold-task dry-run");
    println!("  run_name = {}", request.run_name);
    println!("  output_root = {}", cfg.paths.output_root.display());
    println!(
        "  remote_location = {}",
        request.output_location.as_deref().unwrap_or("<platform default>")
    );
    if let Some(deadline) = orchestrator.deadline() {
        println!("  deadline = {deadline:?}");
    }
    println!();
    println!("diagnostics:");
    for argv in cfg.diagnostics.commands.iter() {
        println!("  - {}", argv.join(" "));
    }
    println!();
    println!("command:");
    println!("  {}", command.display());

    debug!("dry-run complete (no execution)");
    Ok(())
}
