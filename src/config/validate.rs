// src/config/validate.rs

use globset::Glob;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{OmegafoldError, Result};
use crate::types::parse_duration;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::OmegafoldError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        let timeout = match raw.tool.timeout.as_deref() {
            Some(s) => Some(parse_duration(s).map_err(|e| {
                OmegafoldError::ConfigError(format!("[tool].timeout: {e}"))
            })?),
            None => None,
        };
        Ok(ConfigFile::new_unchecked(raw, timeout))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_tool(cfg)?;
    validate_diagnostics(cfg)?;
    validate_weights(cfg)?;
    validate_publish(cfg)?;
    Ok(())
}

fn validate_tool(cfg: &RawConfigFile) -> Result<()> {
    if cfg.tool.program.trim().is_empty() {
        return Err(OmegafoldError::ConfigError(
            "[tool].program must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_diagnostics(cfg: &RawConfigFile) -> Result<()> {
    if cfg.diagnostics.commands.is_empty() {
        return Err(OmegafoldError::ConfigError(
            "[diagnostics].commands must list at least one command".to_string(),
        ));
    }
    for (idx, argv) in cfg.diagnostics.commands.iter().enumerate() {
        match argv.first() {
            Some(program) if !program.trim().is_empty() => {}
            _ => {
                return Err(OmegafoldError::ConfigError(format!(
                    "[diagnostics].commands[{idx}] must start with a program name"
                )));
            }
        }
    }
    Ok(())
}

fn validate_weights(cfg: &RawConfigFile) -> Result<()> {
    if cfg.weights.base_url.trim().is_empty() {
        return Err(OmegafoldError::ConfigError(
            "[weights].base_url must not be empty".to_string(),
        ));
    }

    for (artifact, digest) in cfg.weights.checksums.iter() {
        let well_formed = digest.len() == 64 && digest.chars().all(|c| c.is_ascii_hexdigit());
        if !well_formed {
            return Err(OmegafoldError::ConfigError(format!(
                "[weights.checksums].{artifact} must be a 64-character blake3 hex digest"
            )));
        }
    }
    Ok(())
}

fn validate_publish(cfg: &RawConfigFile) -> Result<()> {
    for pattern in cfg.publish.output_globs.iter() {
        Glob::new(pattern).map_err(|e| {
            OmegafoldError::ConfigError(format!(
                "[publish].output_globs: invalid glob '{pattern}': {e}"
            ))
        })?;
    }
    Ok(())
}
