use thiserror::Error;

use crate::log_store::LogCategory;

#[derive(Error, Debug)]
pub enum PlatecamError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    #[error("OCR error: {0}")]
    Ocr(#[from] OcrError),

    #[error("System error: {message}")]
    System { message: String },

    #[error("Component error in {component}: {message}")]
    Component { component: String, message: String },
}

impl PlatecamError {
    pub fn system<S: Into<String>>(message: S) -> Self {
        Self::System {
            message: message.into(),
        }
    }

    pub fn component<S: Into<String>>(component: S, message: S) -> Self {
        Self::Component {
            component: component.into(),
            message: message.into(),
        }
    }
}

/// Failures of the durable plate log
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StorageError {
    #[error("{category} log unavailable: {details}")]
    Unavailable {
        category: LogCategory,
        details: String,
    },
}

impl StorageError {
    pub fn unavailable(category: LogCategory, details: impl std::fmt::Display) -> Self {
        Self::Unavailable {
            category,
            details: details.to_string(),
        }
    }

    pub fn category(&self) -> LogCategory {
        match self {
            Self::Unavailable { category, .. } => *category,
        }
    }
}

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Failed to open frame source {source_name}: {details}")]
    Open { source_name: String, details: String },

    #[error("Failed to read frame: {details}")]
    Read { details: String },

    #[error("Frame source is not open")]
    NotOpen,
}

#[derive(Error, Debug)]
pub enum OcrError {
    #[error("Failed to launch OCR engine '{command}': {details}")]
    Spawn { command: String, details: String },

    #[error("OCR engine exited with status {status}: {stderr}")]
    Failed { status: String, stderr: String },

    #[error("OCR pipe error: {0}")]
    Pipe(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PlatecamError>;
