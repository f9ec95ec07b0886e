//! Error types for the briefing pipeline.
//!
//! Only configuration and I/O failures ever reach a caller. Everything that
//! goes wrong inside a pipeline run (bad records, unreachable LLM, garbage
//! responses) is recovered locally and shows up as a log line plus a counter.

use std::time::Duration;

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Input error: {0}")]
    Input(#[from] InputError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// LLM provider errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Provider {provider} rate limited, retry after {retry_after:?}")]
    RateLimited {
        provider: String,
        retry_after: Option<Duration>,
    },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A raw message that cannot enter the pipeline.
///
/// The offending record is dropped; the rest of the batch continues.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InputError {
    #[error("Message {id:?} is missing required field `{field}`")]
    MissingField { id: String, field: &'static str },

    #[error("Record {index} could not be decoded: {reason}")]
    Malformed { index: usize, reason: String },

    #[error("Unsupported input document: {0}")]
    UnsupportedShape(String),
}

/// Why a cluster fell back to rule-based synthesis.
///
/// Never surfaced to the caller.
#[derive(Debug, thiserror::Error)]
pub enum SynthesisError {
    #[error("no text-generation provider configured")]
    Unavailable,

    #[error("request failed: {0}")]
    Request(#[from] LlmError),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("unparsable response: {0}")]
    Unparsable(String),

    #[error("cancelled before completion")]
    Cancelled,
}

/// Result type alias for the crate.
pub type Result<T> = std::result::Result<T, Error>;
