// src/workspace.rs

//! Local workspace handling: the per-run output directory, moving staged
//! files into place, and listing what the tool produced.
//!
//! Nothing here deletes anything; the execution host is discarded after the
//! run.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use tracing::debug;

use crate::types::RunName;

/// `<output_root>/<run_name>`.
pub fn run_dir(output_root: &Path, run_name: &RunName) -> PathBuf {
    output_root.join(run_name.as_str())
}

/// Create the run directory (and parents). Succeeds if it already exists.
pub fn prepare_workspace(output_root: &Path, run_name: &RunName) -> io::Result<PathBuf> {
    let dir = run_dir(output_root, run_name);
    fs::create_dir_all(&dir)?;
    debug!(dir = %dir.display(), "workspace ready");
    Ok(dir)
}

/// Move `from` to `to`, falling back to copy + remove when a rename is not
/// possible (e.g. across filesystems).
pub fn move_file(from: &Path, to: &Path) -> Result<()> {
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent).with_context(|| format!("creating dir {:?}", parent))?;
    }
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(e) => {
            debug!(from = %from.display(), to = %to.display(), error = %e, "rename failed; copying");
            fs::copy(from, to).with_context(|| format!("copying {:?} to {:?}", from, to))?;
            fs::remove_file(from).with_context(|| format!("removing {:?}", from))?;
            Ok(())
        }
    }
}

/// Compile output globs into a single matcher.
pub fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern).with_context(|| format!("invalid glob '{pattern}'"))?);
    }
    builder.build().context("building output glob set")
}

/// List files under `dir` whose path relative to `dir` matches `globs`.
///
/// The result is sorted. A missing directory yields an empty list.
pub fn collect_outputs(dir: &Path, globs: &GlobSet) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    if dir.is_dir() {
        walk(dir, dir, globs, &mut found)?;
    }
    found.sort();
    Ok(found)
}

fn walk(root: &Path, dir: &Path, globs: &GlobSet, found: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir).with_context(|| format!("reading dir {:?}", dir))? {
        let path = entry?.path();
        if path.is_dir() {
            walk(root, &path, globs, found)?;
        } else if let Ok(rel) = path.strip_prefix(root) {
            if globs.is_match(rel) {
                found.push(path);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workspace_is_deterministic_and_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("outputs");
        let name = RunName::parse("Test_Run").unwrap();

        let first = prepare_workspace(&root, &name).unwrap();
        let second = prepare_workspace(&root, &name).unwrap();

        assert_eq!(first, root.join("Test_Run"));
        assert_eq!(first, second);
        assert!(first.is_dir());
    }

    #[test]
    fn move_file_replaces_source() {
        let tmp = tempfile::tempdir().unwrap();
        let from = tmp.path().join("staging/model.pt");
        fs::create_dir_all(from.parent().unwrap()).unwrap();
        fs::write(&from, b"weights").unwrap();

        let to = tmp.path().join("root/model.pt");
        move_file(&from, &to).unwrap();

        assert!(!from.exists());
        assert_eq!(fs::read(&to).unwrap(), b"weights");
    }

    #[test]
    fn collects_matching_outputs_recursively() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path();
        fs::create_dir_all(dir.join("nested")).unwrap();
        fs::write(dir.join("a.pdb"), b"").unwrap();
        fs::write(dir.join("nested/b.pdb"), b"").unwrap();
        fs::write(dir.join("log.txt"), b"").unwrap();

        let globs = build_globset(&["**/*.pdb".to_string()]).unwrap();
        let outputs = collect_outputs(dir, &globs).unwrap();

        assert_eq!(outputs, vec![dir.join("a.pdb"), dir.join("nested/b.pdb")]);
    }

    #[test]
    fn missing_dir_has_no_outputs() {
        let globs = build_globset(&["*".to_string()]).unwrap();
        let outputs = collect_outputs(Path::new("/nonexistent/omegafold/run"), &globs).unwrap();
        assert!(outputs.is_empty());
    }
}
