// src/weights.rs

//! Model weights resolution.
//!
//! Precedence, exactly one strategy per run:
//! 1. an explicit local weights file,
//! 2. a named preset passed through to the tool,
//! 3. the default artifact for the requested model, fetched from
//!    `[weights].base_url` and moved into `[weights].dir`.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::Context;
use blake3::Hasher;
use tracing::{debug, info, warn};

use crate::command::WeightsArg;
use crate::config::WeightsSection;
use crate::errors::{OmegafoldError, Result};
use crate::remote::{FileResolver, RemoteRef, join_reference};
use crate::types::{ModelNumber, WeightsSource};
use crate::workspace::move_file;

/// Turn a [`WeightsSource`] into the argument handed to the tool, fetching
/// the default artifact when needed.
pub async fn resolve_weights<F>(
    source: &WeightsSource,
    cfg: &WeightsSection,
    staging_dir: &Path,
    resolver: &F,
) -> Result<WeightsArg>
where
    F: FileResolver + ?Sized,
{
    match source {
        WeightsSource::LocalFile(path) => {
            if !path.exists() {
                warn!(path = %path.display(), "weights file does not exist on this host");
            }
            Ok(WeightsArg::File(path.clone()))
        }
        WeightsSource::Preset(name) => Ok(WeightsArg::Preset(name.clone())),
        WeightsSource::Download(model) => {
            let path = fetch_default_weights(*model, cfg, staging_dir, resolver).await?;
            Ok(WeightsArg::File(path))
        }
    }
}

/// Where the default artifact for `model` ends up locally.
pub fn default_weights_path(model: ModelNumber, cfg: &WeightsSection) -> PathBuf {
    cfg.dir.join(model.artifact_name())
}

async fn fetch_default_weights<F>(
    model: ModelNumber,
    cfg: &WeightsSection,
    staging_dir: &Path,
    resolver: &F,
) -> Result<PathBuf>
where
    F: FileResolver + ?Sized,
{
    let artifact = model.artifact_name();
    let dest = default_weights_path(model, cfg);

    if cfg.reuse_existing && dest.is_file() {
        info!(path = %dest.display(), "reusing weights already on this host");
    } else {
        let reference = join_reference(&cfg.base_url, artifact);
        info!(%reference, model = model.0, "downloading model weights");

        let fetched = resolver
            .fetch(&reference, staging_dir)
            .await
            .map_err(|e| OmegafoldError::Weights(format!("fetching {reference}: {e}")))?;

        let is_local = matches!(RemoteRef::parse(&reference), Ok(RemoteRef::Local(_)));
        if fetched != dest && is_local {
            // Local artifact stores are shared; leave the source in place.
            if let Some(parent) = dest.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::copy(&fetched, &dest).map_err(|e| {
                OmegafoldError::Weights(format!(
                    "copying {} to {}: {e}",
                    fetched.display(),
                    dest.display()
                ))
            })?;
        } else if fetched != dest {
            move_file(&fetched, &dest).map_err(|e| {
                OmegafoldError::Weights(format!(
                    "moving {} to {}: {e:#}",
                    fetched.display(),
                    dest.display()
                ))
            })?;
        }
    }

    if let Some(expected) = cfg.checksums.get(artifact) {
        verify_checksum(&dest, expected).await?;
    }

    Ok(dest)
}

async fn verify_checksum(path: &Path, expected: &str) -> Result<()> {
    let owned = path.to_path_buf();
    let actual = tokio::task::spawn_blocking(move || compute_file_hash(&owned))
        .await
        .context("joining hash task")??;

    if !actual.eq_ignore_ascii_case(expected) {
        return Err(OmegafoldError::Weights(format!(
            "checksum mismatch for {}: expected {expected}, got {actual}",
            path.display()
        )));
    }
    debug!(path = %path.display(), "weights checksum verified");
    Ok(())
}

/// blake3 hex digest of a file.
pub fn compute_file_hash(path: &Path) -> anyhow::Result<String> {
    let mut hasher = Hasher::new();
    let mut file = File::open(path).with_context(|| format!("opening file for hashing: {:?}", path))?;
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize().to_hex().to_string())
}
