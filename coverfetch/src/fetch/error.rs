//! Error types for image downloads.

use thiserror::Error;

/// Errors that can occur while fetching image bytes.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    /// The HTTP client could not be constructed.
    #[error("failed to create HTTP client: {0}")]
    Client(String),

    /// The request could not be sent or the connection failed.
    #[error("request failed: {0}")]
    Request(String),

    /// The server answered with a non-success status.
    #[error("HTTP {status} from {locator}")]
    Status { status: u16, locator: String },

    /// The response body could not be read.
    #[error("failed to read response: {0}")]
    Body(String),

    /// The response body was empty.
    #[error("empty response body from {0}")]
    EmptyBody(String),
}
