use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use omegafold_task::command::CommandInvocation;
use omegafold_task::errors::{OmegafoldError, Result};
use omegafold_task::exec::{CancelToken, ExitOutcome, ProcessRunner};
use omegafold_task::platform::{Platform, Severity};
use omegafold_task::remote::{FileResolver, RemoteRef};
use omegafold_task::types::RunName;

/// Scripted result for a fake process.
#[derive(Debug, Clone)]
pub enum FakeOutcome {
    Exit(i32),
    LaunchError,
    Timeout,
    Cancelled,
}

/// A fake runner that:
/// - records every invocation (as argv)
/// - answers with a scripted outcome per program (default: exit 0)
/// - optionally writes files when a given program "runs"
#[derive(Debug, Clone, Default)]
pub struct FakeRunner {
    calls: Arc<Mutex<Vec<Vec<String>>>>,
    outcomes: HashMap<String, FakeOutcome>,
    writes: HashMap<String, Vec<PathBuf>>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_outcome(mut self, program: &str, outcome: FakeOutcome) -> Self {
        self.outcomes.insert(program.to_string(), outcome);
        self
    }

    /// Create `path` whenever `program` is run, before reporting its outcome.
    pub fn writes_file(mut self, program: &str, path: impl Into<PathBuf>) -> Self {
        self.writes
            .entry(program.to_string())
            .or_default()
            .push(path.into());
        self
    }

    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, program: &str) -> Vec<Vec<String>> {
        self.calls()
            .into_iter()
            .filter(|argv| argv.first().map(String::as_str) == Some(program))
            .collect()
    }
}

impl ProcessRunner for FakeRunner {
    fn run<'a>(
        &'a self,
        invocation: &'a CommandInvocation,
        deadline: Option<Duration>,
        _cancel: CancelToken,
    ) -> Pin<Box<dyn Future<Output = Result<ExitOutcome>> + Send + 'a>> {
        Box::pin(async move {
            self.calls.lock().unwrap().push(invocation.argv());

            for path in self.writes.get(&invocation.program).into_iter().flatten() {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::write(path, b"MODEL 1\nEND\n")?;
            }

            match self
                .outcomes
                .get(&invocation.program)
                .cloned()
                .unwrap_or(FakeOutcome::Exit(0))
            {
                FakeOutcome::Exit(0) => Ok(ExitOutcome::Success),
                FakeOutcome::Exit(code) => Ok(ExitOutcome::Failed(Some(code))),
                FakeOutcome::LaunchError => Err(OmegafoldError::Other(anyhow::anyhow!(
                    "spawning process `{}`: No such file or directory",
                    invocation.program
                ))),
                FakeOutcome::Timeout => Err(OmegafoldError::Timeout(
                    deadline.unwrap_or(Duration::from_secs(1)),
                )),
                FakeOutcome::Cancelled => Err(OmegafoldError::Cancelled),
            }
        })
    }
}

/// A fake resolver: local references must exist, remote ones are "downloaded"
/// by writing placeholder bytes into the destination directory.
#[derive(Debug, Clone, Default)]
pub struct FakeResolver {
    fetched: Arc<Mutex<Vec<String>>>,
    failing: Vec<String>,
    stalled: Vec<String>,
}

impl FakeResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make fetching `reference` fail.
    pub fn failing(mut self, reference: &str) -> Self {
        self.failing.push(reference.to_string());
        self
    }

    /// Make fetching `reference` hang until the future is dropped, like a
    /// download that never completes.
    pub fn stalls(mut self, reference: &str) -> Self {
        self.stalled.push(reference.to_string());
        self
    }

    /// Remote references fetched so far, in order.
    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }
}

impl FileResolver for FakeResolver {
    fn fetch<'a>(
        &'a self,
        reference: &'a str,
        dest_dir: &'a Path,
    ) -> Pin<Box<dyn Future<Output = Result<PathBuf>> + Send + 'a>> {
        Box::pin(async move {
            if self.failing.iter().any(|r| r == reference) {
                return Err(OmegafoldError::Other(anyhow::anyhow!(
                    "HTTP status client error (404 Not Found) for {reference}"
                )));
            }
            if self.stalled.iter().any(|r| r == reference) {
                std::future::pending::<()>().await;
            }

            let parsed = RemoteRef::parse(reference)?;
            if let RemoteRef::Local(path) = &parsed {
                if !path.is_file() {
                    return Err(OmegafoldError::InvalidRequest(format!(
                        "local file '{}' does not exist",
                        path.display()
                    )));
                }
                return Ok(path.clone());
            }

            self.fetched.lock().unwrap().push(reference.to_string());
            let name = parsed.file_name().unwrap_or_else(|| "download".to_string());
            std::fs::create_dir_all(dest_dir)?;
            let dest = dest_dir.join(name);
            std::fs::write(&dest, reference.as_bytes())?;
            Ok(dest)
        })
    }
}

/// A recorded operator notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub severity: Severity,
    pub title: String,
    pub body: String,
}

/// A fake platform that records labels and notifications.
#[derive(Debug, Clone, Default)]
pub struct FakePlatform {
    labels: Arc<Mutex<Vec<String>>>,
    notifications: Arc<Mutex<Vec<Notification>>>,
    fail_label: bool,
    fail_notify: bool,
}

impl FakePlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every hook call returns an error (the calls are still recorded).
    pub fn offline() -> Self {
        Self {
            fail_label: true,
            fail_notify: true,
            ..Self::default()
        }
    }

    pub fn labels(&self) -> Vec<String> {
        self.labels.lock().unwrap().clone()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.notifications.lock().unwrap().clone()
    }
}

impl Platform for FakePlatform {
    fn label_execution<'a>(
        &'a self,
        name: &'a RunName,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            self.labels.lock().unwrap().push(name.to_string());
            if self.fail_label {
                return Err(OmegafoldError::Other(anyhow::anyhow!("label endpoint unreachable")));
            }
            Ok(())
        })
    }

    fn notify<'a>(
        &'a self,
        severity: Severity,
        title: &'a str,
        body: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            self.notifications.lock().unwrap().push(Notification {
                severity,
                title: title.to_string(),
                body: body.to_string(),
            });
            if self.fail_notify {
                return Err(OmegafoldError::Other(anyhow::anyhow!("message endpoint unreachable")));
            }
            Ok(())
        })
    }
}
