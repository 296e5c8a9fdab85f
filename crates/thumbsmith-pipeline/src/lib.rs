//! thumbsmith-pipeline: deferred thumbnail operations (sans-IO).
//!
//! Callers accumulate an ordered [`OperationChain`] of crop, fit, resize,
//! and canvas-resize requests. Each request is validated and resolved
//! (defaults filled in) when it is added; no pixels are touched until the
//! chain is rendered. The same resolved history feeds the cache
//! [`Fingerprint`], so two chains render the same thumbnail exactly when
//! they hash to the same name.
//!
//! This crate has **no I/O dependencies** -- it operates on in-memory
//! byte slices. Source reading, cache lookup, and atomic persistence live
//! in `thumbsmith-cache`.

pub mod anchor;
pub mod backend;
pub mod chain;
pub mod color;
pub mod filter;
pub mod fingerprint;
pub mod format;
pub mod geometry;
pub mod operation;
pub mod save;
pub mod types;

pub use anchor::Anchor;
pub use backend::{ImageBackend, RasterBackend};
pub use chain::{ChainState, DEFAULT_MAX_PIXELS, OperationChain};
pub use color::Color;
pub use filter::ResampleFilter;
pub use fingerprint::{Fingerprint, SaveEntry};
pub use format::OutputFormat;
pub use operation::{CanvasOptions, CropOptions, FitOptions, Operation, ResizeOptions};
pub use save::{DEFAULT_QUALITY, SaveOptions};
pub use types::{Dimensions, DynamicImage, PipelineError, RgbaImage};

/// Render a chain against encoded source bytes.
///
/// # Pipeline steps
///
/// 1. Decode the source
/// 2. Check every step's output size against `max_pixels`
/// 3. Apply every operation in call order
/// 4. Encode to `format` at `quality`
///
/// # Errors
///
/// Returns [`PipelineError::NoOperations`] if the chain is empty.
/// Returns [`PipelineError::TooLarge`] if a step exceeds `max_pixels`.
/// Returns [`PipelineError::NotReadable`] or
/// [`PipelineError::UnsupportedType`] if the source cannot be decoded.
/// Returns [`PipelineError::Encode`] if encoding fails.
pub fn render<B: ImageBackend + ?Sized>(
    backend: &B,
    source: &[u8],
    chain: &OperationChain,
    format: OutputFormat,
    quality: u8,
    max_pixels: u64,
) -> Result<Vec<u8>, PipelineError> {
    if chain.is_empty() {
        return Err(PipelineError::NoOperations);
    }
    let decoded = backend.decode(source)?;
    let transformed = chain.apply(backend, decoded, max_pixels)?;
    backend.encode(&transformed, format, quality)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn png(w: u32, h: u32) -> Vec<u8> {
        let img = RgbaImage::from_fn(w, h, |x, _y| {
            if x < w / 2 {
                image::Rgba([0, 0, 0, 255])
            } else {
                image::Rgba([255, 255, 255, 255])
            }
        });
        let mut buf = Vec::new();
        DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn render_empty_chain() {
        let result = render(
            &RasterBackend::default(),
            &png(4, 4),
            &OperationChain::new(),
            OutputFormat::Png,
            90,
            DEFAULT_MAX_PIXELS,
        );
        assert!(matches!(result, Err(PipelineError::NoOperations)));
    }

    #[test]
    fn render_corrupt_input() {
        let mut chain = OperationChain::new();
        chain.crop(2, None, CropOptions::default()).unwrap();
        let result = render(
            &RasterBackend::default(),
            &[0xFF, 0x00],
            &chain,
            OutputFormat::Png,
            90,
            DEFAULT_MAX_PIXELS,
        );
        assert!(matches!(result, Err(PipelineError::NotReadable(_))));
    }

    #[test]
    fn render_produces_expected_dimensions() {
        let mut chain = OperationChain::new();
        chain
            .resize_canvas(
                Some(300),
                Some(300),
                CanvasOptions {
                    relative: true,
                    ..CanvasOptions::default()
                },
            )
            .unwrap();
        let bytes = render(
            &RasterBackend::default(),
            &png(400, 400),
            &chain,
            OutputFormat::Png,
            90,
            DEFAULT_MAX_PIXELS,
        )
        .unwrap();
        let out = image::load_from_memory(&bytes).unwrap();
        assert_eq!(Dimensions::of(&out), Dimensions::new(700, 700));
    }

    #[test]
    fn render_is_byte_deterministic() {
        let mut chain = OperationChain::new();
        chain
            .fit(Some(30), Some(20), FitOptions::default())
            .unwrap();
        let backend = RasterBackend::default();
        let a = render(
            &backend,
            &png(64, 64),
            &chain,
            OutputFormat::Png,
            90,
            DEFAULT_MAX_PIXELS,
        )
        .unwrap();
        let b = render(
            &backend,
            &png(64, 64),
            &chain,
            OutputFormat::Png,
            90,
            DEFAULT_MAX_PIXELS,
        )
        .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn render_respects_pixel_limit() {
        let mut chain = OperationChain::new();
        chain
            .resize_canvas(Some(100), Some(100), CanvasOptions::default())
            .unwrap();
        let backend = RasterBackend::default();
        let result = render(&backend, &png(4, 4), &chain, OutputFormat::Png, 90, 100);
        assert!(matches!(result, Err(PipelineError::TooLarge { limit: 100, .. })));
        let bytes = render(&backend, &png(4, 4), &chain, OutputFormat::Png, 90, 10_000).unwrap();
        let out = image::load_from_memory(&bytes).unwrap();
        assert_eq!(Dimensions::of(&out), Dimensions::new(100, 100));
    }
}
