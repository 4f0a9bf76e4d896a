// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [paths]
/// output_root = "/root/outputs"
///
/// [tool]
/// program = "python3.9"
/// args = ["/tmp/docker-build/work/OmegaFold/main.py"]
/// timeout = "48h"
///
/// [weights]
/// base_url = "s3://latch-public/proteinengineering/omegafold"
/// ```
///
/// All sections are optional and default to the layout of the GPU image the
/// task runs in.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    #[serde(default)]
    pub paths: PathsSection,

    #[serde(default)]
    pub tool: ToolSection,

    #[serde(default)]
    pub diagnostics: DiagnosticsSection,

    #[serde(default)]
    pub weights: WeightsSection,

    #[serde(default)]
    pub platform: PlatformSection,

    #[serde(default)]
    pub publish: PublishSection,
}

/// Validated configuration.
///
/// Only obtainable through `TryFrom<RawConfigFile>` (see `validate.rs`), so
/// holders can rely on the invariants checked there.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub paths: PathsSection,
    pub tool: ToolSection,
    pub diagnostics: DiagnosticsSection,
    pub weights: WeightsSection,
    pub platform: PlatformSection,
    pub publish: PublishSection,
    timeout: Option<Duration>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(raw: RawConfigFile, timeout: Option<Duration>) -> Self {
        Self {
            paths: raw.paths,
            tool: raw.tool,
            diagnostics: raw.diagnostics,
            weights: raw.weights,
            platform: raw.platform,
            publish: raw.publish,
            timeout,
        }
    }

    /// Parsed `[tool].timeout`, if one was configured.
    pub fn tool_timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self::new_unchecked(RawConfigFile::default(), None)
    }
}

/// `[paths]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PathsSection {
    /// Root under which each run gets its own `<run_name>` directory. This is
    /// the directory handed back for publication.
    #[serde(default = "default_output_root")]
    pub output_root: PathBuf,

    /// Where remote inputs and downloaded artifacts are staged.
    #[serde(default = "default_staging_dir")]
    pub staging_dir: PathBuf,
}

fn default_output_root() -> PathBuf {
    PathBuf::from("/root/outputs")
}

fn default_staging_dir() -> PathBuf {
    PathBuf::from("/root/inputs")
}

impl Default for PathsSection {
    fn default() -> Self {
        Self {
            output_root: default_output_root(),
            staging_dir: default_staging_dir(),
        }
    }
}

/// `[tool]` section: how to launch the prediction program.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToolSection {
    #[serde(default = "default_program")]
    pub program: String,

    /// Arguments placed before the positional input/output paths.
    #[serde(default = "default_program_args")]
    pub args: Vec<String>,

    /// Duration string such as `"90m"` or `"48h"`. No deadline when absent.
    #[serde(default)]
    pub timeout: Option<String>,
}

fn default_program() -> String {
    "python3.9".to_string()
}

fn default_program_args() -> Vec<String> {
    vec!["/tmp/docker-build/work/OmegaFold/main.py".to_string()]
}

impl Default for ToolSection {
    fn default() -> Self {
        Self {
            program: default_program(),
            args: default_program_args(),
            timeout: None,
        }
    }
}

/// `[diagnostics]` section: commands that must succeed before any GPU work.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DiagnosticsSection {
    /// Each entry is an argv list.
    #[serde(default = "default_diagnostic_commands")]
    pub commands: Vec<Vec<String>>,
}

fn default_diagnostic_commands() -> Vec<Vec<String>> {
    vec![
        vec!["nvidia-smi".to_string()],
        vec!["nvcc".to_string(), "--version".to_string()],
    ]
}

impl Default for DiagnosticsSection {
    fn default() -> Self {
        Self {
            commands: default_diagnostic_commands(),
        }
    }
}

/// `[weights]` section: where the default model artifacts come from.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WeightsSection {
    /// Remote prefix holding `model.pt` and `model2.pt`.
    #[serde(default = "default_weights_base_url")]
    pub base_url: String,

    /// Local directory the downloaded artifact is moved into.
    #[serde(default = "default_weights_dir")]
    pub dir: PathBuf,

    /// Skip the download when the artifact is already in `dir`.
    #[serde(default = "default_true")]
    pub reuse_existing: bool,

    /// Optional blake3 digests keyed by artifact name.
    #[serde(default)]
    pub checksums: BTreeMap<String, String>,
}

fn default_weights_base_url() -> String {
    "s3://latch-public/proteinengineering/omegafold".to_string()
}

fn default_weights_dir() -> PathBuf {
    PathBuf::from("/root")
}

fn default_true() -> bool {
    true
}

impl Default for WeightsSection {
    fn default() -> Self {
        Self {
            base_url: default_weights_base_url(),
            dir: default_weights_dir(),
            reuse_existing: true,
            checksums: BTreeMap::new(),
        }
    }
}

/// `[platform]` section: optional hooks into the hosting platform.
///
/// When a URL is absent the corresponding action is only logged.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct PlatformSection {
    #[serde(default)]
    pub label_url: Option<String>,

    #[serde(default)]
    pub message_url: Option<String>,
}

/// `[publish]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PublishSection {
    /// Remote location used when the caller gives none.
    #[serde(default)]
    pub default_output_location: Option<String>,

    /// Globs (relative to the run directory) listed in the run result.
    #[serde(default = "default_output_globs")]
    pub output_globs: Vec<String>,
}

fn default_output_globs() -> Vec<String> {
    vec!["**/*.pdb".to_string()]
}

impl Default for PublishSection {
    fn default() -> Self {
        Self {
            default_output_location: None,
            output_globs: default_output_globs(),
        }
    }
}
