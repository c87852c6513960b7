//! Error types for the transform stage.

use thiserror::Error;

/// Errors that can occur while decoding, resizing or encoding an image.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransformError {
    /// The bytes do not start with a recognised image signature.
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// The bytes carry a known signature but could not be decoded.
    #[error("Decode failed: {0}")]
    Decode(String),

    /// Image dimensions are invalid for resizing.
    #[error("Invalid dimensions {width}×{height}: {reason}")]
    InvalidDimensions {
        width: u32,
        height: u32,
        reason: String,
    },

    /// JPEG encoding failed.
    #[error("Encoding failed: {0}")]
    EncodingFailed(String),

    /// Invalid transformer settings.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl TransformError {
    /// Returns true for errors raised while interpreting the input bytes.
    pub fn is_decode(&self) -> bool {
        matches!(
            self,
            TransformError::UnsupportedFormat(_) | TransformError::Decode(_)
        )
    }
}
