//! Error types for embedding and extraction.

use std::fmt;
use thiserror::Error;

use crate::dwt::BandName;
use crate::selection::CoefficientAddress;

/// Result type alias for the crate.
pub type Result<T> = std::result::Result<T, StegoError>;

/// Errors that can occur while transforming, embedding or extracting.
///
/// All of them are fatal to the call that produced them, never to the process.
#[derive(Error)]
pub enum StegoError {
    /// Image sides are below the support of a two-level decomposition.
    #[error("image of {width}x{height} is too small: both sides must be at least {minimum}")]
    ImageTooSmall {
        width: usize,
        height: usize,
        minimum: usize,
    },

    /// A sub-band does not have the shape its layout dictates.
    #[error("sub-band {band} has shape {actual:?}, expected {expected:?}")]
    BandShape {
        band: BandName,
        expected: (usize, usize),
        actual: (usize, usize),
    },

    /// Two images that must share a shape do not.
    #[error("image shapes differ: {left:?} vs {right:?}")]
    DimensionMismatch {
        left: (u32, u32),
        right: (u32, u32),
    },

    /// Framed payload is larger than the cover can carry.
    #[error("capacity exceeded: framed payload needs {required} bytes but only {available} available")]
    CapacityExceeded { required: usize, available: usize },

    /// The selector has fewer eligible coefficients than requested.
    #[error("insufficient coefficients: need {required} but only {available} are eligible")]
    InsufficientCoefficients { required: usize, available: usize },

    /// The stego image did not decode back to the payload, even after compensating for
    /// samples clipped to `[0, 255]`. Covers with large black or white areas hit this.
    #[error("stego image does not decode after clipping to 8 bits: {bit_errors} of {bits} embedded bits flipped")]
    ClippingLoss { bit_errors: usize, bits: usize },

    /// Decoded length header points past what the image could hold.
    /// Usually means wrong strategy parameters or a re-encoded image.
    #[error("not decodable with these parameters: header announces {length} bytes, capacity is {capacity}")]
    DecodeMismatch { length: usize, capacity: usize },

    /// Fewer bits were available than the length header announced.
    #[error("framed payload truncated: need {required} bits, got {available}")]
    Truncated { required: usize, available: usize },

    /// Payload does not fit in the 32-bit length header.
    #[error("payload of {0} bytes does not fit the 32-bit length header")]
    PayloadTooLarge(usize),

    /// Address does not point into its band.
    #[error("coefficient address {0:?} is outside its band")]
    AddressOutOfRange(CoefficientAddress),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StegoError {
    /// True for the shape family: too-small images and mismatched bands.
    pub fn is_shape_error(&self) -> bool {
        matches!(
            self,
            StegoError::ImageTooSmall { .. }
                | StegoError::BandShape { .. }
                | StegoError::DimensionMismatch { .. }
        )
    }

    /// True when the cover cannot hold the requested bits.
    pub fn is_capacity_error(&self) -> bool {
        matches!(
            self,
            StegoError::CapacityExceeded { .. }
                | StegoError::InsufficientCoefficients { .. }
                | StegoError::ClippingLoss { .. }
        )
    }

    /// True when the image does not decode under the given parameters.
    pub fn is_decode_mismatch(&self) -> bool {
        matches!(
            self,
            StegoError::DecodeMismatch { .. } | StegoError::Truncated { .. }
        )
    }
}

impl fmt::Debug for StegoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}
