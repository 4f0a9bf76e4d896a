// src/remote.rs

//! Resolution of file references to local paths.
//!
//! The orchestrator never talks to storage directly; it hands a reference to
//! a [`FileResolver`] and gets back a path on the execution host.
//!
//! Supported references:
//! - plain local paths and `file://` URLs (used in place, no copy)
//! - `http://` / `https://` URLs
//! - `s3://bucket/key` for publicly readable buckets, fetched over HTTPS

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::time::Duration;

use anyhow::Context;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::errors::{OmegafoldError, Result};

/// Parsed file reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteRef {
    Local(PathBuf),
    Http(String),
    S3 { bucket: String, key: String },
}

impl RemoteRef {
    pub fn parse(reference: &str) -> Result<Self> {
        let reference = reference.trim();
        if reference.is_empty() {
            return Err(OmegafoldError::InvalidRequest(
                "empty file reference".to_string(),
            ));
        }

        if let Some(path) = reference.strip_prefix("file://") {
            return Ok(RemoteRef::Local(PathBuf::from(path)));
        }
        if reference.starts_with("http://") || reference.starts_with("https://") {
            return Ok(RemoteRef::Http(reference.to_string()));
        }
        if let Some(rest) = reference.strip_prefix("s3://") {
            return match rest.split_once('/') {
                Some((bucket, key)) if !bucket.is_empty() && !key.is_empty() => Ok(RemoteRef::S3 {
                    bucket: bucket.to_string(),
                    key: key.to_string(),
                }),
                _ => Err(OmegafoldError::InvalidRequest(format!(
                    "s3 reference must look like s3://bucket/key, got '{reference}'"
                ))),
            };
        }
        if reference.contains("://") {
            return Err(OmegafoldError::InvalidRequest(format!(
                "unsupported reference scheme in '{reference}'"
            )));
        }
        Ok(RemoteRef::Local(PathBuf::from(reference)))
    }

    /// URL to fetch for remote references; `None` for local paths.
    pub fn http_url(&self) -> Option<String> {
        match self {
            RemoteRef::Local(_) => None,
            RemoteRef::Http(url) => Some(url.clone()),
            RemoteRef::S3 { bucket, key } => Some(s3_url(bucket, key)),
        }
    }

    /// Last path segment, used as the local file name.
    pub fn file_name(&self) -> Option<String> {
        let tail = match self {
            RemoteRef::Local(path) => return path.file_name().map(|n| n.to_string_lossy().into_owned()),
            RemoteRef::Http(url) => url.split(['?', '#']).next().unwrap_or(url.as_str()),
            RemoteRef::S3 { key, .. } => key.as_str(),
        };
        tail.rsplit('/')
            .next()
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }
}

fn s3_url(bucket: &str, key: &str) -> String {
    format!("https://{bucket}.s3.amazonaws.com/{key}")
}

/// Join a remote prefix and an artifact name with exactly one `/`.
pub fn join_reference(base: &str, name: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), name.trim_start_matches('/'))
}

/// Trait abstracting how file references become local files.
///
/// Production code uses [`HttpResolver`]; tests can provide their own
/// implementation that writes fixture files instead of downloading.
pub trait FileResolver: Send + Sync {
    /// Resolve `reference` to a local file. Remote files are written into
    /// `dest_dir`; local references are returned as-is.
    fn fetch<'a>(
        &'a self,
        reference: &'a str,
        dest_dir: &'a Path,
    ) -> Pin<Box<dyn Future<Output = Result<PathBuf>> + Send + 'a>>;
}

/// Real resolver: local paths pass through, remote ones are downloaded.
#[derive(Debug, Clone)]
pub struct HttpResolver {
    client: reqwest::Client,
}

impl HttpResolver {
    pub fn new() -> Result<Self> {
        // No overall request timeout: weight artifacts are large.
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self { client })
    }

    async fn download(&self, url: &str, dest: &Path) -> Result<()> {
        info!(%url, dest = %dest.display(), "downloading");

        let mut response = self.client.get(url).send().await?.error_for_status()?;

        let partial = dest.with_extension("part");
        let mut file = tokio::fs::File::create(&partial)
            .await
            .with_context(|| format!("creating {:?}", partial))?;

        let mut written: u64 = 0;
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk)
                .await
                .with_context(|| format!("writing {:?}", partial))?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&partial, dest)
            .await
            .with_context(|| format!("renaming {:?} to {:?}", partial, dest))?;

        debug!(%url, bytes = written, "download complete");
        Ok(())
    }
}

impl FileResolver for HttpResolver {
    fn fetch<'a>(
        &'a self,
        reference: &'a str,
        dest_dir: &'a Path,
    ) -> Pin<Box<dyn Future<Output = Result<PathBuf>> + Send + 'a>> {
        Box::pin(async move {
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
            let url = parsed.http_url().ok_or_else(|| {
                OmegafoldError::InvalidRequest(format!("'{reference}' is not downloadable"))
            })?;

            let name = parsed.file_name().ok_or_else(|| {
                OmegafoldError::InvalidRequest(format!("cannot derive a file name from '{reference}'"))
            })?;

            tokio::fs::create_dir_all(dest_dir)
                .await
                .with_context(|| format!("creating staging dir {:?}", dest_dir))?;
            let dest = dest_dir.join(name);
            self.download(&url, &dest).await?;
            Ok(dest)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_reference_kinds() {
        assert_eq!(
            RemoteRef::parse("/data/seq.fasta").unwrap(),
            RemoteRef::Local(PathBuf::from("/data/seq.fasta"))
        );
        assert_eq!(
            RemoteRef::parse("file:///data/seq.fasta").unwrap(),
            RemoteRef::Local(PathBuf::from("/data/seq.fasta"))
        );
        assert_eq!(
            RemoteRef::parse("s3://latch-public/proteinengineering/omegafold/model.pt").unwrap(),
            RemoteRef::S3 {
                bucket: "latch-public".to_string(),
                key: "proteinengineering/omegafold/model.pt".to_string(),
            }
        );
        assert!(RemoteRef::parse("s3://bucket-only").is_err());
        assert!(RemoteRef::parse("ftp://host/file").is_err());
        assert!(RemoteRef::parse("  ").is_err());
    }

    #[test]
    fn s3_maps_to_virtual_hosted_url() {
        let r = RemoteRef::parse("s3://latch-public/proteinengineering/omegafold/model2.pt").unwrap();
        assert_eq!(
            r.http_url().as_deref(),
            Some("https://latch-public.s3.amazonaws.com/proteinengineering/omegafold/model2.pt")
        );
        assert_eq!(r.file_name().as_deref(), Some("model2.pt"));
    }

    #[test]
    fn http_file_name_ignores_query() {
        let r = RemoteRef::parse("https://example.org/files/seq.fasta?sig=abc").unwrap();
        assert_eq!(r.file_name().as_deref(), Some("seq.fasta"));
    }

    #[test]
    fn join_reference_normalises_slashes() {
        assert_eq!(join_reference("s3://b/p/", "model.pt"), "s3://b/p/model.pt");
        assert_eq!(join_reference("s3://b/p", "/model.pt"), "s3://b/p/model.pt");
    }

    #[tokio::test]
    async fn local_reference_must_exist() {
        let resolver = HttpResolver::new().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.fasta");
        let err = resolver
            .fetch(missing.to_str().unwrap(), dir.path())
            .await
            .unwrap_err();
        assert!(matches!(err, OmegafoldError::InvalidRequest(_)));

        let present = dir.path().join("seq.fasta");
        std::fs::write(&present, b">a\nMK\n").unwrap();
        let resolved = resolver
            .fetch(present.to_str().unwrap(), dir.path())
            .await
            .unwrap();
        assert_eq!(resolved, present);
    }
}
