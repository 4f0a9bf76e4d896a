// src/cli.rs

//! CLI argument parsing using `clap`.
//!
//! Every value that has a constraint is validated here, before any
//! orchestration starts.

use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Parser, ValueEnum};

use crate::types::{RunName, parse_duration};

/// Command-line arguments for `omegafold-task`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "omegafold-task",
    version,
    about = "Run OmegaFold structure prediction for one sequence file and report the output directory.",
    long_about = None
)]
pub struct CliArgs {
    /// Name of the run (letters, digits, underscores and dashes only).
    #[arg(long, value_name = "NAME")]
    pub run_name: RunName,

    /// Input FASTA file: local path, file://, http(s):// or s3:// reference.
    #[arg(long, alias = "input-fasta", value_name = "REF")]
    pub input_file: String,

    /// Remote location the output directory is published to.
    #[arg(long, value_name = "REF")]
    pub output_directory: Option<String>,

    /// Number of optimization cycles (tool default: 10).
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
    pub num_cycle: Option<u32>,

    /// Sub-batch size for attention; smaller values use less GPU memory.
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
    pub subbatch_size: Option<u32>,

    /// Local weights file. Takes precedence over `--weights`.
    #[arg(long, value_name = "PATH")]
    pub weights_file: Option<PathBuf>,

    /// Named weights preset passed through to the tool.
    #[arg(long, value_name = "NAME")]
    pub weights: Option<String>,

    /// Model whose default weights are downloaded (1 or 2).
    #[arg(long, value_name = "N", default_value_t = 1)]
    pub model: u32,

    /// Masking rate for pseudo MSAs, in [0, 1] (tool default: 0.15).
    #[arg(long, value_name = "RATE", value_parser = parse_unit_interval)]
    pub pseudo_msa_mask_rate: Option<f64>,

    /// Number of pseudo MSAs (tool default: 15).
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
    pub num_pseudo_msa: Option<u32>,

    /// Disable TF32 matrix multiplication.
    #[arg(long = "no-tf32", action = ArgAction::SetFalse)]
    pub allow_tf32: bool,

    /// Path to the config file (TOML).
    ///
    /// Default: `Omegafold.toml` in the current working directory, if present.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Deadline for the prediction process, e.g. `90m` or `48h`.
    ///
    /// Overrides `[tool].timeout` from the config file.
    #[arg(long, value_name = "DURATION", value_parser = parse_duration)]
    pub timeout: Option<Duration>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `OMEGAFOLD_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Print the resolved command without running anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Exit non-zero when the prediction process fails, after still
    /// reporting the (partial) output directory.
    #[arg(long)]
    pub strict: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

fn parse_unit_interval(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .trim()
        .parse()
        .map_err(|e| format!("invalid number '{s}': {e}"))?;
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(format!("{value} is outside [0, 1]"))
    }
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_from(extra: &[&str]) -> Result<CliArgs, clap::Error> {
        let mut argv = vec!["omegafold-task", "--input-file", "seq.fasta"];
        argv.extend_from_slice(extra);
        CliArgs::try_parse_from(argv)
    }

    #[test]
    fn run_name_is_validated_at_the_boundary() {
        assert!(parse_from(&["--run-name", "bad run"]).is_err());
        assert!(parse_from(&["--run-name", "bad/run"]).is_err());
        let args = parse_from(&["--run-name", "Good-Run_1"]).unwrap();
        assert_eq!(args.run_name.as_str(), "Good-Run_1");
    }

    #[test]
    fn defaults_leave_hyperparameters_unset() {
        let args = parse_from(&["--run-name", "r"]).unwrap();
        assert_eq!(args.num_cycle, None);
        assert_eq!(args.pseudo_msa_mask_rate, None);
        assert_eq!(args.model, 1);
        assert!(args.allow_tf32);
        assert!(!args.strict);
    }

    #[test]
    fn no_tf32_flag_disables_tf32() {
        let args = parse_from(&["--run-name", "r", "--no-tf32"]).unwrap();
        assert!(!args.allow_tf32);
    }

    #[test]
    fn rejects_out_of_range_values() {
        assert!(parse_from(&["--run-name", "r", "--pseudo-msa-mask-rate", "1.5"]).is_err());
        assert!(parse_from(&["--run-name", "r", "--num-cycle", "0"]).is_err());
        assert!(parse_from(&["--run-name", "r", "--timeout", "soon"]).is_err());
        assert!(parse_from(&["--run-name", "r", "--timeout", "18446744073709551615h"]).is_err());
    }

    #[test]
    fn input_fasta_alias() {
        let args = CliArgs::try_parse_from([
            "omegafold-task",
            "--run-name",
            "r",
            "--input-fasta",
            "s3://bucket/seq.fasta",
        ])
        .unwrap();
        assert_eq!(args.input_file, "s3://bucket/seq.fasta");
    }
}
