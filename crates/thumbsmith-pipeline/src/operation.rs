//! Deferred thumbnail operations.
//!
//! Each [`Operation`] variant carries its fully resolved parameters:
//! defaults have been filled in and every value validated by the
//! constructor that produced it. The variant is both the history record
//! hashed into the cache fingerprint and the work item applied at render
//! time, so the two can never disagree.
//!
//! Operations can also be parsed from a compact textual form, used by the
//! CLI and JSON configs:
//!
//! ```text
//! crop:200x200+10+20
//! fit:450x450,upsize=false,position=top-left
//! resize:200x300,aspect=false
//! canvas:x200,bgcolor=#000
//! canvas:300x300,relative=true
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::anchor::Anchor;
use crate::backend::ImageBackend;
use crate::color::Color;
use crate::geometry;
use crate::types::{Dimensions, DynamicImage, PipelineError};

/// Options for [`Operation::crop`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CropOptions {
    /// Left edge of the crop region.
    pub x: u32,
    /// Top edge of the crop region.
    pub y: u32,
}

/// Options for [`Operation::fit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitOptions {
    /// Which part of the source survives the aspect-ratio crop.
    pub position: Anchor,
    /// Cap the output at the source's native size.
    pub upsize: bool,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            position: Anchor::Center,
            upsize: true,
        }
    }
}

/// Options for [`Operation::resize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResizeOptions {
    /// Preserve the source aspect ratio, fitting inside the requested box.
    pub aspect_ratio: bool,
    /// Cap the output at the source's native size.
    pub upsize: bool,
}

impl Default for ResizeOptions {
    fn default() -> Self {
        Self {
            aspect_ratio: true,
            upsize: true,
        }
    }
}

/// Options for [`Operation::resize_canvas`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasOptions {
    /// Where the source sits on the new canvas.
    pub anchor: Anchor,
    /// Treat width/height as deltas to the source size.
    pub relative: bool,
    /// Fill color for padding.
    pub bgcolor: Color,
}

/// A validated, fully resolved transformation request.
///
/// Variants built directly must pass [`validate`](Self::validate) before
/// they are accepted into a chain.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Cut a `width` x `height` region whose top-left corner is `(x, y)`.
    Crop {
        width: u32,
        height: u32,
        x: u32,
        y: u32,
    },
    /// Crop to the target aspect ratio at `position`, then scale to size.
    Fit {
        width: u32,
        height: u32,
        position: Anchor,
        upsize: bool,
    },
    /// Scale to the requested size.
    Resize {
        width: u32,
        height: u32,
        aspect_ratio: bool,
        upsize: bool,
    },
    /// Change the canvas size, padding with `bgcolor` or clipping.
    ///
    /// `None` on an axis keeps the source's size (absolute mode) or adds
    /// nothing (relative mode).
    ResizeCanvas {
        width: Option<i32>,
        height: Option<i32>,
        anchor: Anchor,
        relative: bool,
        bgcolor: Color,
    },
}

/// Treat zero as "not given".
fn given<T: Default + PartialEq>(value: Option<T>) -> Option<T> {
    value.filter(|v| *v != T::default())
}

impl Operation {
    /// Validate and resolve a crop request.
    ///
    /// `height` defaults to `width` when absent or zero.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidArgument`] if `width` is zero.
    pub fn crop(
        width: u32,
        height: Option<u32>,
        options: CropOptions,
    ) -> Result<Self, PipelineError> {
        if width == 0 {
            return Err(PipelineError::invalid("crop width must be greater than zero"));
        }
        Ok(Self::Crop {
            width,
            height: given(height).unwrap_or(width),
            x: options.x,
            y: options.y,
        })
    }

    /// Validate and resolve a fit request.
    ///
    /// An absent `width` defaults to `height`; an absent `height` then
    /// defaults to the (possibly defaulted) width.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidArgument`] if neither dimension is
    /// given.
    pub fn fit(
        width: Option<u32>,
        height: Option<u32>,
        options: FitOptions,
    ) -> Result<Self, PipelineError> {
        let height = given(height);
        let Some(width) = given(width).or(height) else {
            return Err(PipelineError::invalid(
                "fit requires a width or a height greater than zero",
            ));
        };
        Ok(Self::Fit {
            width,
            height: height.unwrap_or(width),
            position: options.position,
            upsize: options.upsize,
        })
    }

    /// Validate and resolve a resize request.
    ///
    /// `height` defaults to `width` when absent or zero.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidArgument`] if `width` is zero.
    pub fn resize(
        width: u32,
        height: Option<u32>,
        options: ResizeOptions,
    ) -> Result<Self, PipelineError> {
        if width == 0 {
            return Err(PipelineError::invalid(
                "resize width must be greater than zero",
            ));
        }
        Ok(Self::Resize {
            width,
            height: given(height).unwrap_or(width),
            aspect_ratio: options.aspect_ratio,
            upsize: options.upsize,
        })
    }

    /// Validate and resolve a canvas resize request.
    ///
    /// `height` defaults to `width` when absent or zero. An absent width
    /// with a given height keeps the source width.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidArgument`] if neither dimension is
    /// given, or if a dimension is negative in absolute mode.
    pub fn resize_canvas(
        width: Option<i32>,
        height: Option<i32>,
        options: CanvasOptions,
    ) -> Result<Self, PipelineError> {
        let width = given(width);
        let height = given(height).or(width);
        if height.is_none() {
            return Err(PipelineError::invalid(
                "resize_canvas requires a non-zero width or height",
            ));
        }
        if !options.relative && width.into_iter().chain(height).any(|v| v < 0) {
            return Err(PipelineError::invalid(
                "resize_canvas dimensions must be positive unless relative",
            ));
        }
        Ok(Self::ResizeCanvas {
            width,
            height,
            anchor: options.anchor,
            relative: options.relative,
            bgcolor: options.bgcolor,
        })
    }

    /// Check that this is exactly what its constructor would produce.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidArgument`] if the constructor
    /// rejects the parameters, or would resolve them to something else
    /// (a zero size that should have defaulted, for instance).
    pub fn validate(&self) -> Result<(), PipelineError> {
        let resolved = match *self {
            Self::Crop {
                width,
                height,
                x,
                y,
            } => Self::crop(width, Some(height), CropOptions { x, y })?,
            Self::Fit {
                width,
                height,
                position,
                upsize,
            } => Self::fit(Some(width), Some(height), FitOptions { position, upsize })?,
            Self::Resize {
                width,
                height,
                aspect_ratio,
                upsize,
            } => Self::resize(
                width,
                Some(height),
                ResizeOptions {
                    aspect_ratio,
                    upsize,
                },
            )?,
            Self::ResizeCanvas {
                width,
                height,
                anchor,
                relative,
                bgcolor,
            } => Self::resize_canvas(
                width,
                height,
                CanvasOptions {
                    anchor,
                    relative,
                    bgcolor,
                },
            )?,
        };
        if resolved != *self {
            return Err(PipelineError::invalid(format!(
                "{} parameters are not resolved, expected {resolved}",
                self.name()
            )));
        }
        Ok(())
    }

    /// Method name recorded in the argument history.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Crop { .. } => "crop",
            Self::Fit { .. } => "fit",
            Self::Resize { .. } => "resize",
            Self::ResizeCanvas { .. } => "resize_canvas",
        }
    }

    /// Size this operation produces from an image of `source` size.
    #[must_use]
    pub fn output_dimensions(&self, source: Dimensions) -> Dimensions {
        match *self {
            Self::Crop {
                width,
                height,
                x,
                y,
            } => {
                let region = geometry::crop_region(source, width, height, x, y);
                Dimensions::new(region.width, region.height)
            }
            Self::Fit {
                width,
                height,
                position,
                upsize,
            } => geometry::fit_plan(source, width, height, position, upsize).output,
            Self::Resize {
                width,
                height,
                aspect_ratio,
                upsize,
            } => geometry::resize_dimensions(source, width, height, aspect_ratio, upsize),
            Self::ResizeCanvas {
                width,
                height,
                relative,
                ..
            } => geometry::canvas_dimensions(source, width, height, relative),
        }
    }

    /// Run this operation through `backend`.
    pub fn apply<B: ImageBackend + ?Sized>(&self, backend: &B, image: DynamicImage) -> DynamicImage {
        match *self {
            Self::Crop {
                width,
                height,
                x,
                y,
            } => backend.crop(image, width, height, x, y),
            Self::Fit {
                width,
                height,
                position,
                upsize,
            } => backend.fit(image, width, height, upsize, position),
            Self::Resize {
                width,
                height,
                aspect_ratio,
                upsize,
            } => backend.resize(image, width, height, aspect_ratio, upsize),
            Self::ResizeCanvas {
                width,
                height,
                anchor,
                relative,
                bgcolor,
            } => backend.resize_canvas(image, width, height, anchor, relative, bgcolor),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Crop {
                width,
                height,
                x,
                y,
            } => write!(f, "crop:{width}x{height}+{x}+{y}"),
            Self::Fit {
                width,
                height,
                position,
                upsize,
            } => write!(f, "fit:{width}x{height},position={position},upsize={upsize}"),
            Self::Resize {
                width,
                height,
                aspect_ratio,
                upsize,
            } => write!(f, "resize:{width}x{height},aspect={aspect_ratio},upsize={upsize}"),
            Self::ResizeCanvas {
                width,
                height,
                anchor,
                relative,
                bgcolor,
            } => {
                f.write_str("canvas:")?;
                if let Some(w) = width {
                    write!(f, "{w}")?;
                }
                f.write_str("x")?;
                if let Some(h) = height {
                    write!(f, "{h}")?;
                }
                write!(f, ",anchor={anchor},relative={relative},bgcolor={bgcolor}")
            }
        }
    }
}

// ───────────────────────── Textual form ──────────────────────────────

fn parse_int(value: &str, what: &str) -> Result<i64, PipelineError> {
    value
        .trim()
        .parse::<i64>()
        .map_err(|_| PipelineError::invalid(format!("{what} must be an integer, got '{value}'")))
}

fn parse_unsigned(value: &str, what: &str) -> Result<u32, PipelineError> {
    let v = parse_int(value, what)?;
    u32::try_from(v)
        .map_err(|_| PipelineError::invalid(format!("{what} must not be negative, got {v}")))
}

fn parse_signed(value: &str, what: &str) -> Result<i32, PipelineError> {
    let v = parse_int(value, what)?;
    i32::try_from(v).map_err(|_| PipelineError::invalid(format!("{what} is out of range: {v}")))
}

fn parse_bool(value: &str, key: &str) -> Result<bool, PipelineError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(PipelineError::invalid(format!(
            "{key} must be a boolean, got '{value}'"
        ))),
    }
}

/// Split `WxH` into optional width and height strings.
///
/// A bare number is a width; `xH` is a height alone.
fn split_size(size: &str) -> (Option<&str>, Option<&str>) {
    fn non_empty(s: &str) -> Option<&str> {
        let s = s.trim();
        (!s.is_empty()).then_some(s)
    }
    match size.split_once(['x', 'X']) {
        Some((w, h)) => (non_empty(w), non_empty(h)),
        None => (non_empty(size), None),
    }
}

impl FromStr for Operation {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (name, rest) = s.split_once(':').unwrap_or((s, ""));
        let mut parts = rest.split(',');
        let geometry = parts.next().unwrap_or_default().trim();
        let options = parts
            .map(|kv| {
                kv.split_once('=')
                    .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim()))
                    .ok_or_else(|| {
                        PipelineError::invalid(format!("expected key=value option, got '{kv}'"))
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let unknown = |key: &str| {
            PipelineError::invalid(format!("unknown option '{key}' for {name}"))
        };

        match name.trim().to_ascii_lowercase().as_str() {
            "crop" => {
                let mut offsets = geometry.split('+');
                let (w, h) = split_size(offsets.next().unwrap_or_default());
                let mut opts = CropOptions::default();
                if let Some(x) = offsets.next() {
                    opts.x = parse_unsigned(x, "crop x")?;
                }
                if let Some(y) = offsets.next() {
                    opts.y = parse_unsigned(y, "crop y")?;
                }
                for (key, value) in &options {
                    match key.as_str() {
                        "x" => opts.x = parse_unsigned(value, "crop x")?,
                        "y" => opts.y = parse_unsigned(value, "crop y")?,
                        _ => return Err(unknown(key.as_str())),
                    }
                }
                let width = w.map(|w| parse_unsigned(w, "crop width")).transpose()?;
                let height = h.map(|h| parse_unsigned(h, "crop height")).transpose()?;
                Self::crop(width.unwrap_or(0), height, opts)
            }
            "fit" => {
                let (w, h) = split_size(geometry);
                let mut opts = FitOptions::default();
                for (key, value) in &options {
                    match key.as_str() {
                        "position" => opts.position = value.parse()?,
                        "upsize" => opts.upsize = parse_bool(value, key)?,
                        _ => return Err(unknown(key.as_str())),
                    }
                }
                let width = w.map(|w| parse_unsigned(w, "fit width")).transpose()?;
                let height = h.map(|h| parse_unsigned(h, "fit height")).transpose()?;
                Self::fit(width, height, opts)
            }
            "resize" => {
                let (w, h) = split_size(geometry);
                let mut opts = ResizeOptions::default();
                for (key, value) in &options {
                    match key.as_str() {
                        "aspect" | "aspect_ratio" | "aspectratio" => {
                            opts.aspect_ratio = parse_bool(value, key)?;
                        }
                        "upsize" => opts.upsize = parse_bool(value, key)?,
                        _ => return Err(unknown(key.as_str())),
                    }
                }
                let width = w.map(|w| parse_unsigned(w, "resize width")).transpose()?;
                let height = h.map(|h| parse_unsigned(h, "resize height")).transpose()?;
                Self::resize(width.unwrap_or(0), height, opts)
            }
            "canvas" | "resize_canvas" | "resizecanvas" => {
                let (w, h) = split_size(geometry);
                let mut opts = CanvasOptions::default();
                for (key, value) in &options {
                    match key.as_str() {
                        "anchor" => opts.anchor = value.parse()?,
                        "relative" => opts.relative = parse_bool(value, key)?,
                        "bgcolor" => opts.bgcolor = value.parse()?,
                        _ => return Err(unknown(key.as_str())),
                    }
                }
                let width = w.map(|w| parse_signed(w, "canvas width")).transpose()?;
                let height = h.map(|h| parse_signed(h, "canvas height")).transpose()?;
                Self::resize_canvas(width, height, opts)
            }
            other => Err(PipelineError::invalid(format!(
                "unknown operation '{other}'"
            ))),
        }
    }
}

impl Serialize for Operation {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Operation {
    /// Operations deserialize from their textual form so every entry
    /// passes through the validating constructors.
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
