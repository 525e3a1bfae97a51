//! Error types for KhojNav

use thiserror::Error;

/// KhojNav error type
#[derive(Error, Debug)]
pub enum KhojError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Driver error: {0}")]
    Driver(String),

    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    #[error("Robot busy: {0}")]
    Busy(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<toml::de::Error> for KhojError {
    fn from(e: toml::de::Error) -> Self {
        KhojError::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, KhojError>;
