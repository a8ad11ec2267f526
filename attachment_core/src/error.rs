//! Error types for the validation engine

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid rule configuration: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Metadata extraction failed for '{filename}': {source}")]
    Extraction {
        filename: String,
        #[source]
        source: ExtractionError,
    },

    #[error("Unsupported schema format: {0}")]
    UnsupportedSchemaFormat(String),

    #[error("Settings error: {0}")]
    Settings(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AppError {
    pub fn is_configuration(&self) -> bool {
        matches!(self, AppError::Configuration(_))
    }

    pub fn is_extraction(&self) -> bool {
        matches!(self, AppError::Extraction { .. })
    }
}

/// A rule that cannot be evaluated as declared.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("attribute '{attribute}', rule #{index} ({rule}): {reason}")]
pub struct ConfigurationError {
    pub attribute: String,
    pub index: usize,
    pub rule: &'static str,
    pub reason: String,
}

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("file is absent or unreadable at {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt {format} header: {reason}")]
    CorruptHeader { format: String, reason: String },

    #[error("IO error while probing: {0}")]
    Io(#[from] std::io::Error),
}

impl ExtractionError {
    pub fn corrupt(format: impl Into<String>, reason: impl Into<String>) -> Self {
        ExtractionError::CorruptHeader {
            format: format.into(),
            reason: reason.into(),
        }
    }
}
