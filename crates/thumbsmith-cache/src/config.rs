//! Cache configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thumbsmith_pipeline::ResampleFilter;

use crate::error::CacheError;

/// Settings shared by every thumbnail a [`ThumbnailCache`](crate::ThumbnailCache)
/// resolves.
///
/// Every field has a default, so a partial JSON document is a valid
/// configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Directory cached thumbnails are written to. Relative paths resolve
    /// against the working directory when the cache is opened.
    pub output_dir: PathBuf,

    /// Encoder quality when a save does not specify one (1..=100).
    pub default_quality: u8,

    /// Create `output_dir` on first write if it is missing.
    pub create_output_dir: bool,

    /// Resampling filter for fit and resize.
    pub filter: ResampleFilter,

    /// Largest image, in pixels, any operation may produce.
    pub max_pixels: u64,
}

impl CacheConfig {
    /// Default output directory.
    pub const DEFAULT_OUTPUT_DIR: &'static str = "thumbnails";

    /// Default encoder quality.
    pub const DEFAULT_QUALITY: u8 = thumbsmith_pipeline::DEFAULT_QUALITY;

    /// Default for [`create_output_dir`](Self::create_output_dir).
    pub const DEFAULT_CREATE_OUTPUT_DIR: bool = true;

    /// Default resampling filter.
    pub const DEFAULT_FILTER: ResampleFilter = ResampleFilter::Lanczos3;

    /// Default for [`max_pixels`](Self::max_pixels).
    pub const DEFAULT_MAX_PIXELS: u64 = thumbsmith_pipeline::DEFAULT_MAX_PIXELS;

    /// Parse a JSON configuration.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Config`] if the JSON is malformed or the
    /// values are out of range.
    pub fn from_json(json: &str) -> Result<Self, CacheError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| CacheError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Config`] if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, CacheError> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| CacheError::Config(format!("{}: {e}", path.display())))?;
        Self::from_json(&json)
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Config`] naming the offending field.
    pub fn validate(&self) -> Result<(), CacheError> {
        if !(1..=100).contains(&self.default_quality) {
            return Err(CacheError::Config(format!(
                "default_quality must be between 1 and 100, got {}",
                self.default_quality
            )));
        }
        if self.max_pixels == 0 {
            return Err(CacheError::Config(
                "max_pixels must be greater than zero".to_owned(),
            ));
        }
        if self.output_dir.as_os_str().is_empty() {
            return Err(CacheError::Config("output_dir must not be empty".to_owned()));
        }
        Ok(())
    }

    /// Set the output directory.
    #[must_use]
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(Self::DEFAULT_OUTPUT_DIR),
            default_quality: Self::DEFAULT_QUALITY,
            create_output_dir: Self::DEFAULT_CREATE_OUTPUT_DIR,
            filter: Self::DEFAULT_FILTER,
            max_pixels: Self::DEFAULT_MAX_PIXELS,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = CacheConfig::default();
        assert_eq!(config.output_dir, PathBuf::from("thumbnails"));
        assert_eq!(config.default_quality, 90);
        assert!(config.create_output_dir);
        assert_eq!(config.filter, ResampleFilter::Lanczos3);
        assert_eq!(config.max_pixels, 100_000_000);
        config.validate().unwrap();
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config =
            CacheConfig::from_json(r#"{"output_dir":"/var/thumbs","filter":"nearest"}"#).unwrap();
        assert_eq!(config.output_dir, PathBuf::from("/var/thumbs"));
        assert_eq!(config.filter, ResampleFilter::Nearest);
        assert_eq!(config.default_quality, CacheConfig::DEFAULT_QUALITY);
    }

    #[test]
    fn out_of_range_quality_is_rejected() {
        assert!(matches!(
            CacheConfig::from_json(r#"{"default_quality":0}"#),
            Err(CacheError::Config(_))
        ));
        assert!(matches!(
            CacheConfig::from_json(r#"{"default_quality":101}"#),
            Err(CacheError::Config(_))
        ));
    }

    #[test]
    fn zero_pixel_limit_is_rejected() {
        assert!(matches!(
            CacheConfig::from_json(r#"{"max_pixels":0}"#),
            Err(CacheError::Config(_))
        ));
        let config = CacheConfig::from_json(r#"{"max_pixels":640000}"#).unwrap();
        assert_eq!(config.max_pixels, 640_000);
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        assert!(matches!(
            CacheConfig::from_json("{not json"),
            Err(CacheError::Config(_))
        ));
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        std::fs::write(&path, r#"{"default_quality":70}"#).unwrap();
        assert_eq!(CacheConfig::load(&path).unwrap().default_quality, 70);
        assert!(CacheConfig::load(&dir.path().join("missing.json")).is_err());
    }
}
