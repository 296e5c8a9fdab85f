//! Output formats and file-extension normalization.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::types::PipelineError;

/// Encodings a thumbnail can be written in.
///
/// The canonical name doubles as the cache file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Jpg,
    Png,
    Gif,
    Bmp,
    Tiff,
    Webp,
}

impl OutputFormat {
    /// Canonical extension, without the leading dot.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Jpg => "jpg",
            Self::Png => "png",
            Self::Gif => "gif",
            Self::Bmp => "bmp",
            Self::Tiff => "tiff",
            Self::Webp => "webp",
        }
    }

    /// The matching `image` crate format.
    #[must_use]
    pub const fn image_format(self) -> image::ImageFormat {
        match self {
            Self::Jpg => image::ImageFormat::Jpeg,
            Self::Png => image::ImageFormat::Png,
            Self::Gif => image::ImageFormat::Gif,
            Self::Bmp => image::ImageFormat::Bmp,
            Self::Tiff => image::ImageFormat::Tiff,
            Self::Webp => image::ImageFormat::WebP,
        }
    }

    /// Whether the encoder honors the `quality` setting.
    #[must_use]
    pub const fn is_lossy(self) -> bool {
        matches!(self, Self::Jpg)
    }

    /// Resolve a file extension (`"JPEG"`, `".tif"`, ...) to a format.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidArgument`] for extensions that do
    /// not name a supported output format.
    pub fn from_extension(ext: &str) -> Result<Self, PipelineError> {
        let ext = normalize_extension(ext);
        match ext.as_str() {
            "jpg" => Ok(Self::Jpg),
            "png" => Ok(Self::Png),
            "gif" => Ok(Self::Gif),
            "bmp" => Ok(Self::Bmp),
            "tiff" => Ok(Self::Tiff),
            "webp" => Ok(Self::Webp),
            "" => Err(PipelineError::invalid(
                "cannot derive an output format from an empty extension",
            )),
            other => Err(PipelineError::invalid(format!(
                "unsupported output format '{other}'"
            ))),
        }
    }
}

/// Lowercase an extension, strip a leading dot, and fold aliases
/// (`jpeg` to `jpg`, `tif` to `tiff`).
#[must_use]
pub fn normalize_extension(ext: &str) -> String {
    let ext = ext.trim().trim_start_matches('.').to_ascii_lowercase();
    match ext.as_str() {
        "jpeg" => "jpg".to_owned(),
        "tif" => "tiff".to_owned(),
        _ => ext,
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_extension(s)
    }
}
