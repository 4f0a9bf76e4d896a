use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};

static RUN_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9_-]+$").expect("run name pattern is a valid regex")
});

/// Human-provided identifier of a run.
///
/// Only letters, digits, underscores and dashes are allowed, so the name is
/// always safe to use as a single path component.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RunName(String);

impl RunName {
    pub fn parse(s: &str) -> Result<Self, String> {
        if RUN_NAME_RE.is_match(s) {
            Ok(Self(s.to_string()))
        } else {
            Err(format!(
                "invalid run name {s:?}: must contain only letters, digits, underscores, and dashes (no spaces)"
            ))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for RunName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for RunName {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<RunName> for String {
    fn from(name: RunName) -> Self {
        name.0
    }
}

impl fmt::Display for RunName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A hyperparameter as supplied by the caller.
///
/// - `Unset`: the caller did not supply a value.
/// - `Default`: the caller supplied exactly the external tool's own default.
/// - `Explicit`: the caller supplied something else.
///
/// Only `Explicit` values are forwarded to the external tool, so the tool
/// keeps handling its own defaults.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Hyperparam<T> {
    #[default]
    Unset,
    Default,
    Explicit(T),
}

impl<T: PartialEq> Hyperparam<T> {
    pub fn from_supplied(value: Option<T>, tool_default: T) -> Self {
        match value {
            None => Hyperparam::Unset,
            Some(v) if v == tool_default => Hyperparam::Default,
            Some(v) => Hyperparam::Explicit(v),
        }
    }

    /// The value to forward to the tool, if any.
    pub fn explicit(&self) -> Option<&T> {
        match self {
            Hyperparam::Explicit(v) => Some(v),
            _ => None,
        }
    }
}

/// Which pretrained model the default weights download selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelNumber(pub u32);

impl ModelNumber {
    /// Remote artifact name for this model.
    ///
    /// Model 1 maps to `model.pt`; any other number maps to `model2.pt`.
    pub fn artifact_name(self) -> &'static str {
        if self.0 == 1 { "model.pt" } else { "model2.pt" }
    }

    pub fn is_known(self) -> bool {
        matches!(self.0, 1 | 2)
    }
}

impl Default for ModelNumber {
    fn default() -> Self {
        ModelNumber(1)
    }
}

/// Where the prediction tool gets its weights from.
///
/// Exactly one strategy applies per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WeightsSource {
    /// A weights file already present on the execution host.
    LocalFile(PathBuf),
    /// A named preset understood by the external tool.
    Preset(String),
    /// Download the default artifact for the given model.
    Download(ModelNumber),
}

impl WeightsSource {
    /// Pick the strategy from the raw parameters.
    ///
    /// An explicit file wins over a preset; with neither, the default
    /// artifact for `model` is downloaded.
    pub fn select(weights_file: Option<PathBuf>, weights: Option<String>, model: ModelNumber) -> Self {
        match (weights_file, weights) {
            (Some(path), _) => WeightsSource::LocalFile(path),
            (None, Some(preset)) => WeightsSource::Preset(preset),
            (None, None) => WeightsSource::Download(model),
        }
    }
}

/// Parse a duration string like `"500ms"`, `"30s"`, `"90m"` or `"48h"`.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    let idx = s
        .chars()
        .position(|c| !c.is_ascii_digit())
        .ok_or_else(|| "duration missing unit suffix".to_string())?;

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part
        .parse()
        .map_err(|e| format!("invalid duration number '{}': {}", num_part, e))?;

    let secs_per_unit = match unit_part.trim().to_lowercase().as_str() {
        "ms" => return Ok(Duration::from_millis(value)),
        "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        unit => {
            return Err(format!(
                "unsupported duration unit '{}'; expected ms, s, m, or h",
                unit
            ));
        }
    };

    value
        .checked_mul(secs_per_unit)
        .map(Duration::from_secs)
        .ok_or_else(|| format!("duration too large: '{}'", s))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_name_accepts_identifier_characters() {
        assert!(RunName::parse("Good-Run_1").is_ok());
        assert!(RunName::parse("Test_Run").is_ok());
    }

    #[test]
    fn run_name_rejects_spaces_and_slashes() {
        assert!(RunName::parse("bad run").is_err());
        assert!(RunName::parse("bad/run").is_err());
        assert!(RunName::parse("").is_err());
        assert!(RunName::parse("..").is_err());
    }

    #[test]
    fn hyperparam_tri_state() {
        assert_eq!(Hyperparam::from_supplied(None, 10u32), Hyperparam::Unset);
        assert_eq!(Hyperparam::from_supplied(Some(10u32), 10), Hyperparam::Default);
        assert_eq!(Hyperparam::from_supplied(Some(4u32), 10), Hyperparam::Explicit(4));
        assert_eq!(Hyperparam::Explicit(4u32).explicit(), Some(&4));
        assert_eq!(Hyperparam::<u32>::Default.explicit(), None);
    }

    #[test]
    fn artifact_depends_only_on_model_one() {
        assert_eq!(ModelNumber(1).artifact_name(), "model.pt");
        assert_eq!(ModelNumber(2).artifact_name(), "model2.pt");
        assert_eq!(ModelNumber(7).artifact_name(), "model2.pt");
    }

    #[test]
    fn weights_file_wins_over_preset() {
        let src = WeightsSource::select(
            Some(PathBuf::from("/w/model.pt")),
            Some("release1".to_string()),
            ModelNumber(2),
        );
        assert_eq!(src, WeightsSource::LocalFile(PathBuf::from("/w/model.pt")));

        let src = WeightsSource::select(None, Some("release1".to_string()), ModelNumber(2));
        assert_eq!(src, WeightsSource::Preset("release1".to_string()));

        let src = WeightsSource::select(None, None, ModelNumber(2));
        assert_eq!(src, WeightsSource::Download(ModelNumber(2)));
    }

    #[test]
    fn parses_duration_suffixes() {
        assert_eq!(parse_duration("250ms"), Ok(Duration::from_millis(250)));
        assert_eq!(parse_duration("90m"), Ok(Duration::from_secs(5400)));
        assert_eq!(parse_duration(" 2h "), Ok(Duration::from_secs(7200)));
        assert!(parse_duration("10").is_err());
        assert!(parse_duration("5d").is_err());
        assert!(parse_duration("").is_err());
    }

    #[test]
    fn oversized_durations_are_rejected() {
        let err = parse_duration("18446744073709551615h").unwrap_err();
        assert!(err.contains("too large"), "{err}");
        assert!(parse_duration("307445734561825861m").is_err());
        assert_eq!(
            parse_duration("18446744073709551615s"),
            Ok(Duration::from_secs(u64::MAX))
        );
    }
}
