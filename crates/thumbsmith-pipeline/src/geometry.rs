//! Dimension math for each operation.
//!
//! Pure functions from source dimensions plus resolved parameters to the
//! rectangle to crop and the size to produce. Backends only move pixels;
//! every sizing rule lives here so it can be tested without decoding.

use crate::anchor::Anchor;
use crate::types::Dimensions;

/// A rectangle inside an image, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    /// Left edge.
    pub x: u32,
    /// Top edge.
    pub y: u32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

/// How a `fit` operation transforms an image: crop to the target aspect
/// ratio first, then scale to `output`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FitPlan {
    /// Region of the source kept by the crop step.
    pub crop: Region,
    /// Final image size.
    pub output: Dimensions,
}

/// Round a non-negative pixel measure to the nearest whole pixel, never
/// below 1.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn round_px(value: f64) -> u32 {
    let rounded = value.round();
    if rounded < 1.0 {
        1
    } else if rounded >= f64::from(u32::MAX) {
        u32::MAX
    } else {
        rounded as u32
    }
}

/// Clamp a signed pixel measure to `1..=u32::MAX`.
fn clamp_px(value: i64) -> u32 {
    u32::try_from(value.max(1)).unwrap_or(u32::MAX)
}

/// Region kept by `crop(width, height, x, y)`.
///
/// The region is clamped to the image: an offset past the far edge is
/// pulled back to the last row/column and the size shrinks to what
/// remains, so the result is always at least 1x1.
#[must_use]
pub fn crop_region(source: Dimensions, width: u32, height: u32, x: u32, y: u32) -> Region {
    let x = x.min(source.width.saturating_sub(1));
    let y = y.min(source.height.saturating_sub(1));
    Region {
        x,
        y,
        width: width.min(source.width - x).max(1),
        height: height.min(source.height - y).max(1),
    }
}

/// Output size of `resize(width, height)`.
///
/// With `aspect_ratio`, the source is scaled uniformly to the largest size
/// that fits inside `width` x `height`, so the more constraining dimension
/// drives and the other follows the source ratio. Without it, the output
/// is exactly the requested size. `upsize` caps growth at the source's
/// native dimensions.
#[must_use]
pub fn resize_dimensions(
    source: Dimensions,
    width: u32,
    height: u32,
    aspect_ratio: bool,
    upsize: bool,
) -> Dimensions {
    if aspect_ratio {
        let scale_x = f64::from(width) / f64::from(source.width.max(1));
        let scale_y = f64::from(height) / f64::from(source.height.max(1));
        let mut scale = scale_x.min(scale_y);
        if upsize {
            scale = scale.min(1.0);
        }
        Dimensions::new(
            round_px(f64::from(source.width) * scale),
            round_px(f64::from(source.height) * scale),
        )
    } else if upsize {
        Dimensions::new(width.min(source.width), height.min(source.height))
    } else {
        Dimensions::new(width, height)
    }
}

/// Crop-then-scale plan for `fit(width, height)`.
///
/// The largest region of the source with the target aspect ratio is cut
/// at `position`, then scaled to `width` x `height`. With `upsize`, a
/// target larger than that region leaves the region at its native size.
#[must_use]
pub fn fit_plan(
    source: Dimensions,
    width: u32,
    height: u32,
    position: Anchor,
    upsize: bool,
) -> FitPlan {
    let target_ratio = f64::from(width) / f64::from(height.max(1));
    let (crop_width, crop_height) = if source.ratio() > target_ratio {
        (
            round_px(f64::from(source.height) * target_ratio).min(source.width),
            source.height,
        )
    } else {
        (
            source.width,
            round_px(f64::from(source.width) / target_ratio).min(source.height),
        )
    };

    let (x, y) = position.offset(
        (source.width, source.height),
        (crop_width, crop_height),
    );
    let crop = Region {
        x: u32::try_from(x).unwrap_or(0),
        y: u32::try_from(y).unwrap_or(0),
        width: crop_width,
        height: crop_height,
    };

    let output = if upsize && (width > crop_width || height > crop_height) {
        Dimensions::new(crop_width, crop_height)
    } else {
        Dimensions::new(width, height)
    };

    FitPlan { crop, output }
}

/// Canvas size of `resize_canvas(width, height)`.
///
/// In absolute mode an absent dimension keeps the source's; in relative
/// mode each given dimension is added to the source's (negative values
/// shrink). Results never drop below 1 pixel.
#[must_use]
pub fn canvas_dimensions(
    source: Dimensions,
    width: Option<i32>,
    height: Option<i32>,
    relative: bool,
) -> Dimensions {
    let axis = |native: u32, requested: Option<i32>| -> u32 {
        match (relative, requested) {
            (true, delta) => clamp_px(i64::from(native) + i64::from(delta.unwrap_or(0))),
            (false, Some(size)) => clamp_px(i64::from(size)),
            (false, None) => native,
        }
    };
    Dimensions::new(axis(source.width, width), axis(source.height, height))
}
