//! Error types for seg-augment.

use thiserror::Error;

/// Main error type for the augmentation core.
///
/// Every variant is a precondition violation: the failing call returns
/// without producing any output, and there is no partial-success mode.
#[derive(Error, Debug)]
pub enum Error {
    /// Interpolation code outside the set accepted at this step.
    #[error("invalid inter_method {code} for {context}: valid values are {accepted}")]
    InvalidInterMethod {
        code: i32,
        context: &'static str,
        accepted: &'static str,
    },

    /// Crop range larger than the image, or an inverted crop range.
    #[error(
        "input image size {width}x{height} smaller than max_crop_size {max_crop_size} \
         (min_crop_size {min_crop_size})"
    )]
    CropTooLarge {
        width: usize,
        height: usize,
        max_crop_size: i32,
        min_crop_size: i32,
    },

    /// Image smaller than the configured output shape with no crop range set.
    #[error(
        "input image size {width}x{height} smaller than input shape \
         {target_width}x{target_height}"
    )]
    ImageSmallerThanShape {
        width: usize,
        height: usize,
        target_width: usize,
        target_height: usize,
    },

    /// Record buffer shorter than the fixed header.
    #[error("record buffer of {len} bytes is shorter than the {required}-byte header")]
    RecordTooShort { len: usize, required: usize },

    /// Record blobs extend past the end of the buffer.
    #[error("record declares {declared} payload bytes but only {available} follow the header")]
    RecordTruncated { declared: usize, available: usize },

    /// Invalid parameter value.
    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },

    /// Buffer shape mismatch.
    #[error("shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: String, actual: String },

    /// Failed to decode an encoded image or mask blob.
    #[error("failed to decode image blob: {0}")]
    ImageDecode(#[source] image::ImageError),

    /// Malformed configuration document.
    #[error("failed to parse configuration: {0}")]
    Config(#[from] serde_json::Error),

    /// No augmenter registered under this name.
    #[error("unknown augmenter {0:?}")]
    UnknownAugmenter(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn invalid(name: &str, reason: impl Into<String>) -> Self {
        Error::InvalidParameter {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for seg-augment operations.
pub type Result<T> = std::result::Result<T, Error>;
