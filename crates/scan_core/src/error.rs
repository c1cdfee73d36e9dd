//! Error taxonomy for the scan pipeline
//!
//! Capture and preprocess failures are fatal to the current attempt.
//! Extraction-tier failures are recovered locally (next tier) and only
//! surface when every tier is exhausted. Lookup transport failures are
//! absorbed per widening step; the user sees "no matches", not a raw
//! lookup error.

use thiserror::Error;

/// Failure of one scan attempt
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ScanError {
    #[error("camera permission denied")]
    PermissionDenied,

    #[error("no camera device available")]
    DeviceUnavailable,

    #[error("could not read or decode image: {0}")]
    ImageDecode(String),

    #[error("extraction failed: both vision and OCR tiers exhausted")]
    ExtractionUnavailable,

    #[error("card lookup unreachable: {0}")]
    LookupTransport(String),

    #[error("i/o error: {0}")]
    Io(String),
}

impl From<std::io::Error> for ScanError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<image::ImageError> for ScanError {
    fn from(err: image::ImageError) -> Self {
        Self::ImageDecode(err.to_string())
    }
}

/// Failure of a single lookup call against the catalog collaborator
#[derive(Debug, Error)]
pub enum LookupError {
    /// Network/server failure; "no rows" is never an error
    #[error("catalog transport error: {0}")]
    Transport(String),

    /// Response arrived but could not be decoded
    #[error("catalog returned malformed response: {0}")]
    Malformed(String),
}
