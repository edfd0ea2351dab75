//! Error types for the Abiquo client

use thiserror::Error;

/// Errors that can occur when talking to the Abiquo API
#[derive(Error, Debug)]
pub enum ClientError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// API returned an error status
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Error message from server
        message: String,
    },

    /// Resource has no link with the requested relation
    #[error("no '{rel}' link on {resource}")]
    MissingLink {
        /// Relation that was looked up
        rel: String,
        /// Resource the lookup was made on
        resource: String,
    },

    /// Request could not be signed
    #[error("authentication error: {0}")]
    Auth(String),
}

impl ClientError {
    /// Check if the error is caused by a missing relation rather than I/O
    #[must_use]
    pub fn is_missing_link(&self) -> bool {
        matches!(self, ClientError::MissingLink { .. })
    }
}

/// Result type for client operations
pub type Result<T> = std::result::Result<T, ClientError>;
