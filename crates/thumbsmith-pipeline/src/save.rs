//! Options controlling how a finalized chain is encoded and named.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::format::OutputFormat;
use crate::types::PipelineError;

/// Quality used when neither the call nor the configuration sets one.
pub const DEFAULT_QUALITY: u8 = 90;

/// Per-call save options.
///
/// Every field is optional: `format` falls back to the source's
/// extension, `quality` to the configured default, and `target` to the
/// fingerprint-derived cache name. An explicit `target` also fixes the
/// format, which is re-derived from its extension.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaveOptions {
    /// Output encoding.
    pub format: Option<OutputFormat>,
    /// Encoder quality, 1..=100.
    pub quality: Option<u8>,
    /// Explicit output path, bypassing fingerprint naming.
    pub target: Option<PathBuf>,
}

/// Extension of `path` without the dot, or `""`.
#[must_use]
pub fn extension_of(path: &str) -> &str {
    Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or_default()
}

impl SaveOptions {
    /// Set the output format.
    #[must_use]
    pub const fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = Some(format);
        self
    }

    /// Set the encoder quality.
    #[must_use]
    pub const fn with_quality(mut self, quality: u8) -> Self {
        self.quality = Some(quality);
        self
    }

    /// Write to an explicit path instead of the cache name.
    #[must_use]
    pub fn with_target(mut self, target: impl Into<PathBuf>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Pick the output format for a source with extension `source_ext`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidArgument`] if the governing
    /// extension (target's, else source's) names no supported format.
    pub fn resolve_format(&self, source_ext: &str) -> Result<OutputFormat, PipelineError> {
        if let Some(target) = &self.target {
            let ext = target
                .extension()
                .and_then(|ext| ext.to_str())
                .unwrap_or_default();
            return OutputFormat::from_extension(ext);
        }
        match self.format {
            Some(format) => Ok(format),
            None => OutputFormat::from_extension(source_ext),
        }
    }

    /// Pick the encoder quality, falling back to `default`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidArgument`] if the quality is outside
    /// 1..=100.
    pub fn resolve_quality(&self, default: u8) -> Result<u8, PipelineError> {
        let quality = self.quality.unwrap_or(default);
        if (1..=100).contains(&quality) {
            Ok(quality)
        } else {
            Err(PipelineError::invalid(format!(
                "quality must be between 1 and 100, got {quality}"
            )))
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn format_defaults_to_normalized_source_extension() {
        let opts = SaveOptions::default();
        assert_eq!(opts.resolve_format("JPEG").unwrap(), OutputFormat::Jpg);
        assert_eq!(opts.resolve_format("tif").unwrap(), OutputFormat::Tiff);
    }

    #[test]
    fn explicit_format_wins_over_source() {
        let opts = SaveOptions::default().with_format(OutputFormat::Webp);
        assert_eq!(opts.resolve_format("png").unwrap(), OutputFormat::Webp);
    }

    #[test]
    fn target_extension_wins_over_format() {
        let opts = SaveOptions::default()
            .with_format(OutputFormat::Webp)
            .with_target("/out/thumb.jpeg");
        assert_eq!(opts.resolve_format("png").unwrap(), OutputFormat::Jpg);
    }

    #[test]
    fn target_without_extension_is_invalid() {
        let opts = SaveOptions::default().with_target("/out/thumb");
        assert!(matches!(
            opts.resolve_format("png"),
            Err(PipelineError::InvalidArgument(_))
        ));
    }

    #[test]
    fn quality_defaults_and_bounds() {
        assert_eq!(
            SaveOptions::default()
                .resolve_quality(DEFAULT_QUALITY)
                .unwrap(),
            90
        );
        assert_eq!(
            SaveOptions::default()
                .with_quality(55)
                .resolve_quality(90)
                .unwrap(),
            55
        );
        assert!(SaveOptions::default().with_quality(0).resolve_quality(90).is_err());
        assert!(
            SaveOptions::default()
                .with_quality(101)
                .resolve_quality(90)
                .is_err()
        );
    }

    #[test]
    fn extension_of_paths_and_urls() {
        assert_eq!(extension_of("/a/b/photo.JPG"), "JPG");
        assert_eq!(extension_of("https://example.com/x/photo.png"), "png");
        assert_eq!(extension_of("/a/b/noext"), "");
    }

    #[test]
    fn deserializes_partial_json() {
        let opts: SaveOptions = serde_json::from_str(r#"{"format":"webp"}"#).unwrap();
        assert_eq!(opts.format, Some(OutputFormat::Webp));
        assert_eq!(opts.quality, None);
    }
}
