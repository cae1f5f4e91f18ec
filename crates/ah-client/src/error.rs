//! Advanced Hosting client errors

use thiserror::Error;

/// Errors that can occur when interacting with the Advanced Hosting API
#[derive(Debug, Error)]
pub enum AhError {
    /// HTTP request/response error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error
    #[error("Advanced Hosting API error: {0}")]
    Api(String),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Authentication failed (invalid token, expired, etc.)
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid request (e.g., missing required fields)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl AhError {
    /// Whether the API reported the resource as missing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, AhError::NotFound(_))
    }
}
