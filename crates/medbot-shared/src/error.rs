//! Error types for MedBot.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MedbotError {
    #[error("Message is empty")]
    EmptyInput,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("No intent has training patterns")]
    EmptyCorpus,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, MedbotError>;
