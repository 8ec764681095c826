//! Repository client error types

use thiserror::Error;

/// Repository client errors
#[derive(Error, Debug)]
pub enum HubError {
    /// Listing or metadata request failed
    #[error("Metadata request to {url} failed: {reason}")]
    Metadata { url: String, reason: String },

    /// Content request returned a non-success status
    #[error("Request to {url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    /// Transport failure while reading a response body
    #[error("Transport error: {0}")]
    Transport(String),

    /// No packet arrived within the read timeout
    #[error("Request timed out")]
    Timeout,

    /// Glob filter could not be compiled
    #[error("Invalid glob pattern '{pattern}': {reason}")]
    InvalidGlob { pattern: String, reason: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl HubError {
    pub(crate) fn metadata(url: &str, reason: impl ToString) -> Self {
        HubError::Metadata {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl From<reqwest::Error> for HubError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            HubError::Timeout
        } else {
            HubError::Transport(err.to_string())
        }
    }
}
