// src/command.rs

//! Deterministic translation of a [`RunRequest`] into the external tool's
//! command line.
//!
//! Layout:
//!
//! ```text
//! <program> <program args...> <input_path> <output_dir>
//!     [--weights_file PATH | --weights NAME]
//!     [--num_cycle N] [--subbatch_size N]
//!     [--pseudo_msa_mask_rate F] [--num_pseudo_msa N] [--no_tf32]
//! ```

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::ToolSection;
use crate::request::RunRequest;

/// The external tool's own defaults. A flag is only emitted when the caller
/// asked for something different.
pub mod defaults {
    pub const NUM_CYCLE: u32 = 10;
    pub const PSEUDO_MSA_MASK_RATE: f64 = 0.15;
    pub const NUM_PSEUDO_MSA: u32 = 15;
}

/// Resolved weights argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightsArg {
    /// `--weights_file <path>`
    File(PathBuf),
    /// `--weights <preset>`
    Preset(String),
}

/// A fully assembled process invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandInvocation {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandInvocation {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Program followed by its arguments.
    pub fn argv(&self) -> Vec<String> {
        std::iter::once(self.program.clone())
            .chain(self.args.iter().cloned())
            .collect()
    }

    /// Space-joined command line, used for logging.
    pub fn display(&self) -> String {
        self.argv().join(" ")
    }

    /// Number of times `flag` occurs in the argument list.
    pub fn count_flag(&self, flag: &str) -> usize {
        self.args.iter().filter(|a| a.as_str() == flag).count()
    }

    /// The value following the first occurrence of `flag`, if any.
    pub fn flag_value(&self, flag: &str) -> Option<&str> {
        self.args
            .iter()
            .position(|a| a == flag)
            .and_then(|i| self.args.get(i + 1))
            .map(String::as_str)
    }
}

/// Build the prediction command for one run.
pub fn build_invocation(
    tool: &ToolSection,
    input_path: &Path,
    output_dir: &Path,
    weights: &WeightsArg,
    req: &RunRequest,
) -> CommandInvocation {
    let mut args: Vec<String> = tool.args.clone();
    args.push(input_path.display().to_string());
    args.push(output_dir.display().to_string());

    match weights {
        WeightsArg::File(path) => {
            args.push("--weights_file".to_string());
            args.push(path.display().to_string());
        }
        WeightsArg::Preset(name) => {
            args.push("--weights".to_string());
            args.push(name.clone());
        }
    }

    push_hyperparameter_flags(&mut args, req);

    CommandInvocation::new(tool.program.clone(), args)
}

fn push_hyperparameter_flags(args: &mut Vec<String>, req: &RunRequest) {
    if let Some(v) = req.num_cycle.explicit() {
        args.push("--num_cycle".to_string());
        args.push(v.to_string());
    }
    if let Some(v) = req.subbatch_size {
        args.push("--subbatch_size".to_string());
        args.push(v.to_string());
    }
    if let Some(v) = req.pseudo_msa_mask_rate.explicit() {
        args.push("--pseudo_msa_mask_rate".to_string());
        args.push(format_float(*v));
    }
    if let Some(v) = req.num_pseudo_msa.explicit() {
        args.push("--num_pseudo_msa".to_string());
        args.push(v.to_string());
    }
    if !req.allow_tf32 {
        args.push("--no_tf32".to_string());
    }
}

/// Shortest round-trip form, keeping a trailing `.0` on whole numbers
/// (`1.0` stays `"1.0"`, `0.3` stays `"0.3"`).
pub fn format_float(v: f64) -> String {
    if v.is_finite() && v.fract() == 0.0 {
        format!("{v:.1}")
    } else {
        v.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Hyperparam, RunName};

    fn req() -> RunRequest {
        RunRequest::new(RunName::parse("Test_Run").unwrap(), "in.fasta")
    }

    fn build(req: &RunRequest, weights: WeightsArg) -> CommandInvocation {
        build_invocation(
            &ToolSection::default(),
            Path::new("/root/inputs/in.fasta"),
            Path::new("/root/outputs/Test_Run"),
            &weights,
            req,
        )
    }

    #[test]
    fn positional_layout() {
        let cmd = build(&req(), WeightsArg::File(PathBuf::from("/root/model.pt")));
        assert_eq!(
            cmd.argv(),
            vec![
                "python3.9",
                "/tmp/docker-build/work/OmegaFold/main.py",
                "/root/inputs/in.fasta",
                "/root/outputs/Test_Run",
                "--weights_file",
                "/root/model.pt",
            ]
        );
    }

    #[test]
    fn preset_uses_weights_flag_only() {
        let cmd = build(&req(), WeightsArg::Preset("release2".to_string()));
        assert_eq!(cmd.flag_value("--weights"), Some("release2"));
        assert_eq!(cmd.count_flag("--weights_file"), 0);
    }

    #[test]
    fn explicit_values_emit_flags_in_order() {
        let mut r = req();
        r.num_cycle = Hyperparam::Explicit(4);
        r.subbatch_size = Some(128);
        r.pseudo_msa_mask_rate = Hyperparam::Explicit(0.3);
        r.num_pseudo_msa = Hyperparam::Explicit(7);
        r.allow_tf32 = false;

        let cmd = build(&r, WeightsArg::Preset("p".to_string()));
        assert_eq!(
            &cmd.args[4..],
            &[
                "--weights",
                "p",
                "--num_cycle",
                "4",
                "--subbatch_size",
                "128",
                "--pseudo_msa_mask_rate",
                "0.3",
                "--num_pseudo_msa",
                "7",
                "--no_tf32",
            ]
        );
    }

    #[test]
    fn default_state_emits_nothing() {
        let mut r = req();
        r.num_cycle = Hyperparam::Default;
        r.pseudo_msa_mask_rate = Hyperparam::Default;
        r.num_pseudo_msa = Hyperparam::Default;

        let cmd = build(&r, WeightsArg::Preset("p".to_string()));
        assert_eq!(cmd.args.len(), 6);
        assert_eq!(cmd.count_flag("--no_tf32"), 0);
    }

    #[test]
    fn whole_number_rates_keep_their_decimal_point() {
        let mut r = req();
        r.pseudo_msa_mask_rate = Hyperparam::Explicit(1.0);
        let cmd = build(&r, WeightsArg::Preset("p".to_string()));
        assert_eq!(cmd.flag_value("--pseudo_msa_mask_rate"), Some("1.0"));

        assert_eq!(format_float(0.0), "0.0");
        assert_eq!(format_float(0.3), "0.3");
        assert_eq!(format_float(0.125), "0.125");
    }

    #[test]
    fn display_joins_with_spaces() {
        let cmd = CommandInvocation::new("nvcc", vec!["--version".to_string()]);
        assert_eq!(cmd.display(), "nvcc --version");
    }
}
