//! Error types and result aliases for the tabiji library.
//!
//! This module defines the core error type [`TabijiError`] and the [`Result`] type alias
//! used throughout the library. Failures that the conversation is supposed to survive
//! (weather outages, malformed map data, provider errors at the orchestration boundary)
//! are converted into fallback values before they reach the user, so most of these
//! variants only travel between internal layers.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TabijiError {
    #[error("LLM gateway error: {0}")]
    GatewayError(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Transcription error: {0}")]
    TranscriptionError(String),

    #[error("Session busy: {0}")]
    SessionBusy(String),
}

pub type Result<T> = std::result::Result<T, TabijiError>;
