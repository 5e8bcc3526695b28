//! Error types for Ragline
//!
//! This module defines all error types used throughout the application,
//! using `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Main error type for Ragline operations
///
/// This enum encompasses all possible errors that can occur while talking
/// to the RAG backend, decoding its payloads, loading configuration, and
/// persisting panel settings.
#[derive(Error, Debug)]
pub enum RaglineError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Transport-level failures (connection refused, timeout, mid-stream abort)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Backend returned a non-2xx status
    #[error("Backend error: HTTP {status}: {message}")]
    Backend {
        /// HTTP status code returned by the backend
        status: u16,
        /// Response body or status text
        message: String,
    },

    /// A backend payload could not be decoded into an internal type
    #[error("Decode error: {0}")]
    Decode(String),

    /// Panel settings store errors (read/write of the key-value file)
    #[error("Settings error: {0}")]
    Settings(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type alias for Ragline operations
///
/// This is a convenience alias that uses `anyhow::Error` as the error type,
/// allowing for rich error context and easy error propagation.
pub type Result<T> = anyhow::Result<T>;
