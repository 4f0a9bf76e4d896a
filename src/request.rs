// src/request.rs

//! The run request: everything the orchestrator needs to know about one run.

use tracing::warn;

use crate::cli::CliArgs;
use crate::command::defaults;
use crate::config::ConfigFile;
use crate::types::{Hyperparam, ModelNumber, RunName, WeightsSource};

/// One user-submitted prediction run.
///
/// Built once from validated parameters and never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct RunRequest {
    pub run_name: RunName,
    /// Reference to the input sequence file.
    pub input_file: String,
    /// Remote location the output root is published to, if known.
    pub output_location: Option<String>,
    pub num_cycle: Hyperparam<u32>,
    pub subbatch_size: Option<u32>,
    pub weights: WeightsSource,
    pub pseudo_msa_mask_rate: Hyperparam<f64>,
    pub num_pseudo_msa: Hyperparam<u32>,
    pub allow_tf32: bool,
}

impl RunRequest {
    /// A request with every optional parameter left to the tool.
    pub fn new(run_name: RunName, input_file: impl Into<String>) -> Self {
        Self {
            run_name,
            input_file: input_file.into(),
            output_location: None,
            num_cycle: Hyperparam::Unset,
            subbatch_size: None,
            weights: WeightsSource::Download(ModelNumber::default()),
            pseudo_msa_mask_rate: Hyperparam::Unset,
            num_pseudo_msa: Hyperparam::Unset,
            allow_tf32: true,
        }
    }

    /// Build the request from parsed CLI arguments, falling back to the
    /// configured default output location.
    pub fn from_args(args: &CliArgs, cfg: &ConfigFile) -> Self {
        let model = ModelNumber(args.model);
        if !model.is_known() {
            warn!(model = args.model, "unknown model number; using model 2 weights");
        }

        Self {
            run_name: args.run_name.clone(),
            input_file: args.input_file.clone(),
            output_location: args
                .output_directory
                .clone()
                .or_else(|| cfg.publish.default_output_location.clone()),
            num_cycle: Hyperparam::from_supplied(args.num_cycle, defaults::NUM_CYCLE),
            subbatch_size: args.subbatch_size,
            weights: WeightsSource::select(
                args.weights_file.clone(),
                args.weights.clone(),
                model,
            ),
            pseudo_msa_mask_rate: Hyperparam::from_supplied(
                args.pseudo_msa_mask_rate,
                defaults::PSEUDO_MSA_MASK_RATE,
            ),
            num_pseudo_msa: Hyperparam::from_supplied(args.num_pseudo_msa, defaults::NUM_PSEUDO_MSA),
            allow_tf32: args.allow_tf32,
        }
    }
}
