// src/platform.rs

//! Side channels into the hosting platform: labelling the execution with
//! the run name, and notifying operators.
//!
//! Both are best-effort. The orchestrator logs failures from these hooks and
//! carries on.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::config::PlatformSection;
use crate::errors::{OmegafoldError, Result};
use crate::types::RunName;

/// Timeout for a single webhook request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

/// Trait abstracting the platform hooks.
///
/// Production code uses [`WebhookPlatform`]; tests record the calls instead.
pub trait Platform: Send + Sync {
    /// Show `name` instead of the opaque execution id in listings.
    fn label_execution<'a>(
        &'a self,
        name: &'a RunName,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

    /// Deliver a message to whoever operates the run.
    fn notify<'a>(
        &'a self,
        severity: Severity,
        title: &'a str,
        body: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;
}

/// Posts JSON to the configured URLs; without a URL the hook only logs.
#[derive(Debug, Clone)]
pub struct WebhookPlatform {
    client: reqwest::Client,
    label_url: Option<String>,
    message_url: Option<String>,
}

#[derive(Debug, Serialize)]
struct LabelPayload<'a> {
    name: &'a str,
}

#[derive(Debug, Serialize)]
struct MessagePayload<'a> {
    severity: Severity,
    title: &'a str,
    body: &'a str,
}

impl WebhookPlatform {
    pub fn from_config(cfg: &PlatformSection) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            label_url: cfg.label_url.clone(),
            message_url: cfg.message_url.clone(),
        })
    }

    async fn post<T: Serialize + ?Sized>(&self, url: &str, payload: &T) -> Result<()> {
        let response = self.client.post(url).json(payload).send().await?;
        if !response.status().is_success() {
            return Err(OmegafoldError::Other(anyhow::anyhow!(
                "webhook {url} returned HTTP {}",
                response.status().as_u16()
            )));
        }
        Ok(())
    }
}

impl Platform for WebhookPlatform {
    fn label_execution<'a>(
        &'a self,
        name: &'a RunName,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            info!(run = %name, "labelling execution");
            match self.label_url.as_deref() {
                Some(url) => self.post(url, &LabelPayload { name: name.as_str() }).await,
                None => {
                    debug!("no [platform].label_url configured; label is log-only");
                    Ok(())
                }
            }
        })
    }

    fn notify<'a>(
        &'a self,
        severity: Severity,
        title: &'a str,
        body: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            match severity {
                Severity::Error => error!(%title, %body, "operator notification"),
                Severity::Warning => warn!(%title, %body, "operator notification"),
            }
            match self.message_url.as_deref() {
                Some(url) => {
                    self.post(url, &MessagePayload { severity, title, body })
                        .await
                }
                None => Ok(()),
            }
        })
    }
}
