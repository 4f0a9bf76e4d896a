use std::error::Error;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use omegafold_task::config::{load_and_validate, load_from_path, load_or_default};
use omegafold_task::errors::OmegafoldError;
use tempfile::NamedTempFile;

type TestResult = Result<(), Box<dyn Error>>;

fn write_config(contents: &str) -> Result<NamedTempFile, Box<dyn Error>> {
    let mut file = NamedTempFile::new()?;
    file.write_all(contents.as_bytes())?;
    Ok(file)
}

#[test]
fn full_config_is_loaded() -> TestResult {
    let file = write_config(
        r#"
[paths]
output_root = "/scratch/outputs"
staging_dir = "/scratch/inputs"

[tool]
program = "python3"
args = ["/opt/OmegaFold/main.py"]
timeout = "48h"

[diagnostics]
commands = [["nvidia-smi", "-L"]]

[weights]
base_url = "https://mirror.example.org/omegafold"
dir = "/scratch/weights"
reuse_existing = false

[weights.checksums]
"model.pt" = "d74981efa70a0c880b8d8c1985d075dbcbf679b99a5f9914e5aaf96b831a9e24"

[platform]
label_url = "http://127.0.0.1:9000/label"

[publish]
default_output_location = "s3://results/omegafold"
output_globs = ["**/*.pdb", "**/*.log"]
"#,
    )?;

    let cfg = load_and_validate(file.path())?;

    assert_eq!(cfg.paths.output_root, PathBuf::from("/scratch/outputs"));
    assert_eq!(cfg.paths.staging_dir, PathBuf::from("/scratch/inputs"));
    assert_eq!(cfg.tool.program, "python3");
    assert_eq!(cfg.tool.args, vec!["/opt/OmegaFold/main.py".to_string()]);
    assert_eq!(cfg.tool_timeout(), Some(Duration::from_secs(48 * 3600)));
    assert_eq!(cfg.diagnostics.commands, vec![vec!["nvidia-smi".to_string(), "-L".to_string()]]);
    assert_eq!(cfg.weights.base_url, "https://mirror.example.org/omegafold");
    assert!(!cfg.weights.reuse_existing);
    assert_eq!(cfg.weights.checksums.len(), 1);
    assert_eq!(cfg.platform.label_url.as_deref(), Some("http://127.0.0.1:9000/label"));
    assert!(cfg.platform.message_url.is_none());
    assert_eq!(cfg.publish.default_output_location.as_deref(), Some("s3://results/omegafold"));
    assert_eq!(cfg.publish.output_globs.len(), 2);

    Ok(())
}

#[test]
fn empty_file_gives_image_defaults() -> TestResult {
    let file = write_config("")?;
    let cfg = load_and_validate(file.path())?;

    assert_eq!(cfg.paths.output_root, PathBuf::from("/root/outputs"));
    assert_eq!(cfg.tool.program, "python3.9");
    assert_eq!(cfg.weights.base_url, "s3://latch-public/proteinengineering/omegafold");
    assert!(cfg.weights.reuse_existing);
    assert_eq!(cfg.publish.output_globs, vec!["**/*.pdb".to_string()]);
    assert!(cfg.tool_timeout().is_none());

    Ok(())
}

#[test]
fn unknown_keys_are_rejected() -> TestResult {
    let file = write_config("[tool]\nprogramme = \"python3\"\n")?;
    let err = load_from_path(file.path()).unwrap_err();
    assert!(matches!(err, OmegafoldError::TomlError(_)), "got {err:?}");
    Ok(())
}

#[test]
fn invalid_glob_is_a_config_error() -> TestResult {
    let file = write_config("[publish]\noutput_globs = [\"[unterminated\"]\n")?;
    match load_and_validate(file.path()) {
        Err(OmegafoldError::ConfigError(msg)) => assert!(msg.contains("output_globs")),
        other => panic!("expected ConfigError, got {other:?}"),
    }
    Ok(())
}

#[test]
fn empty_program_is_a_config_error() -> TestResult {
    let file = write_config("[tool]\nprogram = \"  \"\n")?;
    assert!(matches!(
        load_and_validate(file.path()),
        Err(OmegafoldError::ConfigError(_))
    ));
    Ok(())
}

#[test]
fn missing_default_config_falls_back_to_defaults() -> TestResult {
    let dir = tempfile::tempdir()?;
    let cfg = load_or_default(dir.path().join("Omegafold.toml"), false)?;
    assert_eq!(cfg.tool.program, "python3.9");
    Ok(())
}

#[test]
fn missing_explicit_config_is_an_error() -> TestResult {
    let dir = tempfile::tempdir()?;
    let err = load_or_default(dir.path().join("custom.toml"), true).unwrap_err();
    assert!(matches!(err, OmegafoldError::IoError(_)), "got {err:?}");
    Ok(())
}

#[test]
fn gpu_checks_cannot_be_disabled() -> TestResult {
    let file = write_config("[diagnostics]\ncommands = []\n")?;
    match load_and_validate(file.path()) {
        Err(OmegafoldError::ConfigError(msg)) => assert!(msg.contains("[diagnostics]")),
        other => panic!("expected ConfigError, got {other:?}"),
    }
    Ok(())
}
