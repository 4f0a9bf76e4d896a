#![allow(dead_code)]

use std::path::{Path, PathBuf};

use omegafold_task::command::defaults;
use omegafold_task::config::{ConfigFile, RawConfigFile};
use omegafold_task::request::RunRequest;
use omegafold_task::types::{Hyperparam, ModelNumber, RunName, WeightsSource};

/// Program name used for the prediction tool in tests.
pub const TOOL_PROGRAM: &str = "omegafold-fake";

/// Builder for `ConfigFile` with every path rooted in a test directory.
///
/// Layout under `root`:
/// - `outputs/`  output root
/// - `inputs/`   staging dir
/// - `weights/`  weights dir
pub struct ConfigFileBuilder {
    raw: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new(root: &Path) -> Self {
        let mut raw = RawConfigFile::default();
        raw.paths.output_root = root.join("outputs");
        raw.paths.staging_dir = root.join("inputs");
        raw.weights.dir = root.join("weights");
        raw.weights.base_url = "s3://test-bucket/omegafold".to_string();
        raw.tool.program = TOOL_PROGRAM.to_string();
        raw.tool.args = vec!["main.py".to_string()];
        Self { raw }
    }

    pub fn with_timeout(mut self, timeout: &str) -> Self {
        self.raw.tool.timeout = Some(timeout.to_string());
        self
    }

    pub fn with_checksum(mut self, artifact: &str, digest: &str) -> Self {
        self.raw
            .weights
            .checksums
            .insert(artifact.to_string(), digest.to_string());
        self
    }

    pub fn with_weights_base(mut self, base: &str) -> Self {
        self.raw.weights.base_url = base.to_string();
        self
    }

    pub fn reuse_existing(mut self, val: bool) -> Self {
        self.raw.weights.reuse_existing = val;
        self
    }

    pub fn with_diagnostics(mut self, commands: &[&[&str]]) -> Self {
        self.raw.diagnostics.commands = commands
            .iter()
            .map(|argv| argv.iter().map(|s| s.to_string()).collect())
            .collect();
        self
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.raw).expect("Failed to build valid config from builder")
    }
}

/// Builder for `RunRequest`.
pub struct RunRequestBuilder {
    req: RunRequest,
}

impl RunRequestBuilder {
    pub fn new(run_name: &str, input_file: impl Into<String>) -> Self {
        let name = RunName::parse(run_name).expect("valid run name in test");
        Self {
            req: RunRequest::new(name, input_file),
        }
    }

    pub fn output_location(mut self, loc: &str) -> Self {
        self.req.output_location = Some(loc.to_string());
        self
    }

    pub fn num_cycle(mut self, v: u32) -> Self {
        self.req.num_cycle = Hyperparam::from_supplied(Some(v), defaults::NUM_CYCLE);
        self
    }

    pub fn subbatch_size(mut self, v: u32) -> Self {
        self.req.subbatch_size = Some(v);
        self
    }

    pub fn pseudo_msa_mask_rate(mut self, v: f64) -> Self {
        self.req.pseudo_msa_mask_rate = Hyperparam::from_supplied(Some(v), defaults::PSEUDO_MSA_MASK_RATE);
        self
    }

    pub fn num_pseudo_msa(mut self, v: u32) -> Self {
        self.req.num_pseudo_msa = Hyperparam::from_supplied(Some(v), defaults::NUM_PSEUDO_MSA);
        self
    }

    pub fn allow_tf32(mut self, v: bool) -> Self {
        self.req.allow_tf32 = v;
        self
    }

    pub fn weights_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.req.weights = WeightsSource::LocalFile(path.into());
        self
    }

    pub fn weights_preset(mut self, name: &str) -> Self {
        self.req.weights = WeightsSource::Preset(name.to_string());
        self
    }

    pub fn model(mut self, n: u32) -> Self {
        self.req.weights = WeightsSource::Download(ModelNumber(n));
        self
    }

    pub fn build(self) -> RunRequest {
        self.req
    }
}
