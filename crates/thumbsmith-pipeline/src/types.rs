//! Shared types for the thumbsmith operation pipeline.

use serde::{Deserialize, Serialize};

/// Re-export `DynamicImage` so downstream crates can hand decoded
/// images around without depending on `image` directly.
pub use image::DynamicImage;

/// Re-export `RgbaImage` for callers building fixtures or canvases.
pub use image::RgbaImage;

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Create new dimensions.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Dimensions of a decoded image.
    #[must_use]
    pub fn of(image: &DynamicImage) -> Self {
        Self::new(image.width(), image.height())
    }

    /// Number of pixels, widened so it cannot overflow.
    #[must_use]
    pub fn area(self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// Width divided by height.
    #[must_use]
    pub fn ratio(self) -> f64 {
        f64::from(self.width) / f64::from(self.height.max(1))
    }
}

/// Errors raised while building or running an operation chain.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// A caller-supplied parameter violates the operation contract.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The chain was finalized without any operations.
    #[error("no operations to apply")]
    NoOperations,

    /// The source bytes could not be decoded as any image.
    #[error("source is not a readable image: {0}")]
    NotReadable(String),

    /// The source is a recognized container the decoder does not support.
    #[error("unsupported image type: {0}")]
    UnsupportedType(String),

    /// An operation would produce an image above the pixel limit.
    #[error("{operation} would produce a {width}x{height} image, over the {limit} pixel limit")]
    TooLarge {
        /// Name of the offending operation.
        operation: &'static str,
        /// Requested output width.
        width: u32,
        /// Requested output height.
        height: u32,
        /// Pixel limit in force.
        limit: u64,
    },

    /// The final image could not be encoded.
    #[error("failed to encode image: {0}")]
    Encode(String),
}

impl PipelineError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dimensions_ratio() {
        assert!((Dimensions::new(400, 200).ratio() - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn area_does_not_wrap() {
        let max = Dimensions::new(u32::MAX, u32::MAX);
        assert_eq!(max.area(), u64::from(u32::MAX) * u64::from(u32::MAX));
        assert_eq!(Dimensions::new(7, 3).area(), 21);
    }

    #[test]
    fn dimensions_of_image() {
        let img = DynamicImage::new_rgba8(7, 3);
        assert_eq!(Dimensions::of(&img), Dimensions::new(7, 3));
    }

    #[test]
    fn display_prefixes_are_stable() {
        assert!(
            PipelineError::invalid("x")
                .to_string()
                .starts_with("invalid argument:")
        );
        assert_eq!(
            PipelineError::NoOperations.to_string(),
            "no operations to apply"
        );
    }
}
