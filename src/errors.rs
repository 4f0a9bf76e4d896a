// src/errors.rs

//! Crate-wide error aliases and helpers.

use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum OmegafoldError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Invalid run request: {0}")]
    InvalidRequest(String),

    #[error("GPU diagnostic `{command}` failed: {detail}")]
    Diagnostic { command: String, detail: String },

    #[error("Weights resolution failed: {0}")]
    Weights(String),

    #[error("Download failed: {0}")]
    Download(#[from] reqwest::Error),

    #[error("Prediction process exceeded its deadline of {0:?}")]
    Timeout(Duration),

    #[error("Run cancelled before the prediction process finished")]
    Cancelled,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, OmegafoldError>;
