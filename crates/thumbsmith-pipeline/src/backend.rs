//! Pixel-level image operations behind a capability trait.
//!
//! The pipeline decides *what* to do (which operations, with which
//! resolved parameters, in which order); an [`ImageBackend`] decides *how*
//! pixels move. [`RasterBackend`] is the production implementation built
//! on the `image` crate. Tests wrap it to count or fail calls.

use std::io::Cursor;

use image::error::ImageFormatHint;
use image::{ColorType, ImageError};

use crate::anchor::Anchor;
use crate::color::Color;
use crate::filter::ResampleFilter;
use crate::format::OutputFormat;
use crate::geometry;
use crate::types::{Dimensions, DynamicImage, PipelineError, RgbaImage};

/// Decode, transform, and encode capabilities consumed by operations.
pub trait ImageBackend {
    /// Identifier hashed into cache fingerprints.
    ///
    /// Must change whenever the backend would produce different pixels for
    /// the same request.
    fn driver(&self) -> String;

    /// Decode encoded image bytes.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::NotReadable`] when the bytes are not an
    /// image, and [`PipelineError::UnsupportedType`] when the container is
    /// recognized but cannot be decoded.
    fn decode(&self, bytes: &[u8]) -> Result<DynamicImage, PipelineError>;

    fn crop(&self, image: DynamicImage, width: u32, height: u32, x: u32, y: u32) -> DynamicImage;

    fn fit(
        &self,
        image: DynamicImage,
        width: u32,
        height: u32,
        upsize: bool,
        position: Anchor,
    ) -> DynamicImage;

    fn resize(
        &self,
        image: DynamicImage,
        width: u32,
        height: u32,
        aspect_ratio: bool,
        upsize: bool,
    ) -> DynamicImage;

    fn resize_canvas(
        &self,
        image: DynamicImage,
        width: Option<i32>,
        height: Option<i32>,
        anchor: Anchor,
        relative: bool,
        bgcolor: Color,
    ) -> DynamicImage;

    /// Encode the final image.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Encode`] if the encoder rejects the image.
    fn encode(
        &self,
        image: &DynamicImage,
        format: OutputFormat,
        quality: u8,
    ) -> Result<Vec<u8>, PipelineError>;
}

/// Map an `image` decode failure onto the two caller-visible kinds.
///
/// An unsupported error that names a concrete format means the container
/// was recognized but cannot be handled; everything else (unknown
/// signature, corrupt data, I/O) means the bytes are not a readable image.
#[must_use]
pub fn classify_decode_error(err: &ImageError) -> PipelineError {
    match err {
        ImageError::Unsupported(unsupported)
            if !matches!(unsupported.format_hint(), ImageFormatHint::Unknown) =>
        {
            PipelineError::UnsupportedType(err.to_string())
        }
        _ => PipelineError::NotReadable(err.to_string()),
    }
}

/// [`ImageBackend`] implemented with the `image` crate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RasterBackend {
    filter: ResampleFilter,
}

impl RasterBackend {
    /// Create a backend that resamples with `filter`.
    #[must_use]
    pub const fn new(filter: ResampleFilter) -> Self {
        Self { filter }
    }

    /// The resampling filter in use.
    #[must_use]
    pub const fn filter(&self) -> ResampleFilter {
        self.filter
    }

    fn scale(&self, image: DynamicImage, target: Dimensions) -> DynamicImage {
        if Dimensions::of(&image) == target {
            return image;
        }
        image.resize_exact(target.width, target.height, self.filter.to_image_filter())
    }
}

impl ImageBackend for RasterBackend {
    fn driver(&self) -> String {
        format!("image/{}", self.filter.as_str())
    }

    fn decode(&self, bytes: &[u8]) -> Result<DynamicImage, PipelineError> {
        if bytes.is_empty() {
            return Err(PipelineError::NotReadable("source is empty".to_owned()));
        }
        image::load_from_memory(bytes).map_err(|e| classify_decode_error(&e))
    }

    fn crop(&self, image: DynamicImage, width: u32, height: u32, x: u32, y: u32) -> DynamicImage {
        let region = geometry::crop_region(Dimensions::of(&image), width, height, x, y);
        image.crop_imm(region.x, region.y, region.width, region.height)
    }

    fn fit(
        &self,
        image: DynamicImage,
        width: u32,
        height: u32,
        upsize: bool,
        position: Anchor,
    ) -> DynamicImage {
        let plan = geometry::fit_plan(Dimensions::of(&image), width, height, position, upsize);
        let cropped = image.crop_imm(
            plan.crop.x,
            plan.crop.y,
            plan.crop.width,
            plan.crop.height,
        );
        self.scale(cropped, plan.output)
    }

    fn resize(
        &self,
        image: DynamicImage,
        width: u32,
        height: u32,
        aspect_ratio: bool,
        upsize: bool,
    ) -> DynamicImage {
        let target = geometry::resize_dimensions(
            Dimensions::of(&image),
            width,
            height,
            aspect_ratio,
            upsize,
        );
        self.scale(image, target)
    }

    fn resize_canvas(
        &self,
        image: DynamicImage,
        width: Option<i32>,
        height: Option<i32>,
        anchor: Anchor,
        relative: bool,
        bgcolor: Color,
    ) -> DynamicImage {
        let source = Dimensions::of(&image);
        let canvas_size = geometry::canvas_dimensions(source, width, height, relative);
        let mut canvas =
            RgbaImage::from_pixel(canvas_size.width, canvas_size.height, bgcolor.to_rgba());
        let (x, y) = anchor.offset(
            (canvas_size.width, canvas_size.height),
            (source.width, source.height),
        );
        image::imageops::overlay(&mut canvas, &image.to_rgba8(), x, y);
        DynamicImage::ImageRgba8(canvas)
    }

    fn encode(
        &self,
        image: &DynamicImage,
        format: OutputFormat,
        quality: u8,
    ) -> Result<Vec<u8>, PipelineError> {
        let mut buf = Vec::new();
        let result = match format {
            OutputFormat::Jpg => {
                // JPEG has no alpha channel.
                let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
                let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(
                    &mut buf,
                    quality.clamp(1, 100),
                );
                rgb.write_with_encoder(encoder)
            }
            other => {
                let eight_bit = match image.color() {
                    ColorType::Rgb8 | ColorType::Rgba8 => None,
                    _ => Some(DynamicImage::ImageRgba8(image.to_rgba8())),
                };
                eight_bit
                    .as_ref()
                    .unwrap_or(image)
                    .write_to(&mut Cursor::new(&mut buf), other.image_format())
            }
        };
        result.map_err(|e| PipelineError::Encode(e.to_string()))?;
        Ok(buf)
    }
}
