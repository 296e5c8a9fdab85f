//! The cache resolver.
//!
//! A [`ThumbnailCache`] owns the configuration, the image backend, and the
//! filesystem collaborator. It hands out [`Thumbnail`] builders and, when
//! one is saved, maps its chain to a target path, renders on a miss, and
//! persists the result atomically.

use std::io;
use std::path::{Path, PathBuf};

use thumbsmith_pipeline::fingerprint::source_digest;
use thumbsmith_pipeline::{
    ImageBackend, OperationChain, OutputFormat, RasterBackend, SaveEntry, SaveOptions,
};
use tracing::debug;

use crate::config::CacheConfig;
use crate::error::CacheError;
use crate::fs::{Filesystem, LocalFilesystem};
use crate::inflight::InFlight;
use crate::source::{self, Source};
use crate::thumbnail::Thumbnail;

/// Where and how one save will be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SavePlan {
    pub(crate) target: PathBuf,
    pub(crate) format: OutputFormat,
    pub(crate) quality: u8,
}

/// Resolves operation chains to thumbnails on disk.
///
/// ```no_run
/// # use thumbsmith_cache::{CacheConfig, CacheError, ThumbnailCache};
/// # use thumbsmith_pipeline::{CropOptions, SaveOptions};
/// # fn run() -> Result<(), CacheError> {
/// let cache = ThumbnailCache::new(CacheConfig::default())?;
/// let path = cache
///     .open("photos/cat.jpg")?
///     .crop(200, None, CropOptions::default())?
///     .save(&SaveOptions::default())?;
/// println!("{}", path.display());
/// # Ok(())
/// # }
/// ```
pub struct ThumbnailCache {
    config: CacheConfig,
    base_dir: PathBuf,
    output_dir: PathBuf,
    backend: Box<dyn ImageBackend + Send + Sync>,
    fs: Box<dyn Filesystem>,
    inflight: InFlight,
}

impl std::fmt::Debug for ThumbnailCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThumbnailCache")
            .field("output_dir", &self.output_dir)
            .field("driver", &self.backend.driver())
            .finish_non_exhaustive()
    }
}

impl ThumbnailCache {
    /// A cache on the local disk rendering with [`RasterBackend`].
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Config`] if the configuration is invalid or
    /// the working directory cannot be determined.
    pub fn new(config: CacheConfig) -> Result<Self, CacheError> {
        let backend = RasterBackend::new(config.filter);
        Self::with_parts(config, backend, LocalFilesystem)
    }

    /// A cache with an explicit backend and filesystem.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Config`] if the configuration is invalid or
    /// the working directory cannot be determined.
    pub fn with_parts(
        config: CacheConfig,
        backend: impl ImageBackend + Send + Sync + 'static,
        fs: impl Filesystem + 'static,
    ) -> Result<Self, CacheError> {
        config.validate()?;
        let base_dir = std::env::current_dir()
            .map_err(|e| CacheError::Config(format!("cannot determine working directory: {e}")))?;
        let output_dir = fs.make_absolute(&config.output_dir, &base_dir);
        Ok(Self {
            config,
            base_dir,
            output_dir,
            backend: Box::new(backend),
            fs: Box::new(fs),
            inflight: InFlight::default(),
        })
    }

    /// The configuration this cache was built with.
    #[must_use]
    pub const fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Absolute directory thumbnails are written to.
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Driver identifier hashed into every fingerprint.
    #[must_use]
    pub fn driver(&self) -> String {
        self.backend.driver()
    }

    /// Start a thumbnail of `source`, a local path or an `http(s)` URL.
    ///
    /// Local paths are made absolute and must name a readable file.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::InvalidArgument`] for an empty source and
    /// [`CacheError::NotReadable`] for a local path that cannot be read.
    pub fn open(&self, source: &str) -> Result<Thumbnail<'_>, CacheError> {
        let source = self.identify(source)?;
        if let Some(path) = source.as_path() {
            self.fs
                .check_readable(path)
                .map_err(|e| CacheError::not_readable(&source.identity(), &e))?;
        }
        Ok(Thumbnail::new(self, source))
    }

    /// Whether a file already exists at `target`.
    #[must_use]
    pub fn is_cached(&self, target: &Path) -> bool {
        self.fs.exists(target)
    }

    /// Delete every cached thumbnail of `source`, returning how many were
    /// removed. Explicit targets outside the naming scheme are untouched.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::InvalidArgument`] for an empty source and
    /// [`CacheError::NotWritable`] if a file cannot be listed or removed.
    pub fn purge_source(&self, source: &str) -> Result<usize, CacheError> {
        let source = self.identify(source)?;
        let prefix = format!("{}_", source_digest(&source.identity()));

        let files = match self.fs.list(&self.output_dir) {
            Ok(files) => files,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(CacheError::not_writable(&self.output_dir, &e)),
        };

        let mut removed = 0;
        for file in files {
            let matches = file
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with(&prefix));
            if matches {
                self.fs
                    .remove(&file)
                    .map_err(|e| CacheError::not_writable(&file, &e))?;
                removed += 1;
            }
        }
        debug!(source = %source, removed, "purged cached thumbnails");
        Ok(removed)
    }

    fn identify(&self, source: &str) -> Result<Source, CacheError> {
        let trimmed = source.trim();
        if trimmed.is_empty() {
            return Err(CacheError::InvalidArgument(
                "source must not be empty".to_owned(),
            ));
        }
        if source::is_url(trimmed) {
            return Ok(Source::Url(trimmed.to_owned()));
        }
        Ok(Source::Path(
            self.fs.make_absolute(Path::new(trimmed), &self.base_dir),
        ))
    }

    /// Work out format, quality, and target path for one save.
    pub(crate) fn plan(
        &self,
        source: &Source,
        chain: &OperationChain,
        options: &SaveOptions,
    ) -> Result<SavePlan, CacheError> {
        if chain.is_empty() {
            return Err(CacheError::NoOperations);
        }
        let format = options.resolve_format(&source.extension())?;
        let quality = options.resolve_quality(self.config.default_quality)?;

        let target = match &options.target {
            Some(explicit) => self.fs.make_absolute(explicit, &self.output_dir),
            None => {
                let entry = SaveEntry {
                    driver: self.backend.driver(),
                    format,
                    quality,
                };
                let fingerprint = chain.fingerprint(&source.identity(), &entry)?;
                self.output_dir.join(fingerprint.file_name())
            }
        };

        Ok(SavePlan {
            target,
            format,
            quality,
        })
    }

    /// Make sure `plan.target` exists, rendering it at most once.
    pub(crate) fn materialize(
        &self,
        source: &Source,
        chain: &OperationChain,
        plan: &SavePlan,
    ) -> Result<(), CacheError> {
        if self.fs.exists(&plan.target) {
            return Ok(());
        }
        let key = plan.target.to_string_lossy();
        self.inflight.with_lock(&key, || {
            // Another save may have finished while we waited.
            if self.fs.exists(&plan.target) {
                return Ok(());
            }
            self.render(source, chain, plan)
        })
    }

    fn render(
        &self,
        source: &Source,
        chain: &OperationChain,
        plan: &SavePlan,
    ) -> Result<(), CacheError> {
        let identity = source.identity();
        debug!(
            target = %plan.target.display(),
            format = %plan.format,
            quality = plan.quality,
            operations = chain.len(),
            "rendering thumbnail"
        );

        let bytes = self
            .fs
            .read(source)
            .map_err(|e| CacheError::not_readable(&identity, &e))?;
        let encoded = thumbsmith_pipeline::render(
            &*self.backend,
            &bytes,
            chain,
            plan.format,
            plan.quality,
            self.config.max_pixels,
        )
        .map_err(|e| CacheError::from_pipeline(e, &identity, &plan.target))?;

        if self.config.create_output_dir
            && let Some(parent) = plan.target.parent()
        {
            self.fs
                .create_dir_all(parent)
                .map_err(|e| CacheError::not_writable(&plan.target, &e))?;
        }
        self.fs
            .atomic_write(&plan.target, &encoded)
            .map_err(|e| CacheError::not_writable(&plan.target, &e))?;

        debug!(
            target = %plan.target.display(),
            bytes = encoded.len(),
            "persisted thumbnail"
        );
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use thumbsmith_pipeline::{CropOptions, ResizeOptions};

    use super::*;

    fn cache_in(dir: &Path) -> ThumbnailCache {
        ThumbnailCache::new(CacheConfig::default().with_output_dir(dir.join("thumbs"))).unwrap()
    }

    fn chain() -> OperationChain {
        let mut chain = OperationChain::new();
        chain.crop(10, None, CropOptions::default()).unwrap();
        chain
    }

    #[test]
    fn relative_output_dir_is_made_absolute() {
        let cache = ThumbnailCache::new(CacheConfig::default()).unwrap();
        assert!(cache.output_dir().is_absolute());
        assert!(cache.output_dir().ends_with("thumbnails"));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = CacheConfig {
            default_quality: 0,
            ..CacheConfig::default()
        };
        assert!(matches!(
            ThumbnailCache::new(config),
            Err(CacheError::Config(_))
        ));
    }

    #[test]
    fn open_rejects_empty_and_missing_sources() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache_in(dir.path());
        assert!(matches!(
            cache.open("  "),
            Err(CacheError::InvalidArgument(_))
        ));
        assert!(matches!(
            cache.open(&dir.path().join("missing.png").to_string_lossy()),
            Err(CacheError::NotReadable { .. })
        ));
    }

    #[test]
    fn urls_open_without_a_read() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache_in(dir.path());
        let thumb = cache.open("https://example.com/img/cat.png").unwrap();
        assert_eq!(
            thumb.source(),
            &Source::Url("https://example.com/img/cat.png".to_owned())
        );
    }

    #[test]
    fn plan_names_target_by_fingerprint() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache_in(dir.path());
        let source = Source::Path(PathBuf::from("/srv/img/cat.png"));

        let plan = cache
            .plan(&source, &chain(), &SaveOptions::default())
            .unwrap();
        assert_eq!(plan.format, OutputFormat::Png);
        assert_eq!(plan.quality, 90);
        assert_eq!(plan.target.parent(), Some(cache.output_dir()));

        let name = plan.target.file_name().unwrap().to_string_lossy().into_owned();
        let prefix = format!("{}_", source_digest("/srv/img/cat.png"));
        assert!(name.starts_with(&prefix), "{name}");
        assert!(name.ends_with(".png"));
        // md5 hex on both sides of the separator.
        assert_eq!(name.len(), 32 + 1 + 32 + ".png".len());
    }

    #[test]
    fn plan_changes_with_every_input() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache_in(dir.path());
        let source = Source::Path(PathBuf::from("/srv/img/cat.png"));
        let base = cache
            .plan(&source, &chain(), &SaveOptions::default())
            .unwrap()
            .target;

        let other_source = Source::Path(PathBuf::from("/srv/img/dog.png"));
        let mut other_chain = chain();
        other_chain
            .resize(5, None, ResizeOptions::default())
            .unwrap();

        let variants = [
            cache.plan(&other_source, &chain(), &SaveOptions::default()),
            cache.plan(&source, &other_chain, &SaveOptions::default()),
            cache.plan(&source, &chain(), &SaveOptions::default().with_quality(80)),
            cache.plan(
                &source,
                &chain(),
                &SaveOptions::default().with_format(OutputFormat::Webp),
            ),
        ];
        for plan in variants {
            assert_ne!(plan.unwrap().target, base);
        }
    }

    #[test]
    fn explicit_relative_target_lands_in_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache_in(dir.path());
        let source = Source::Path(PathBuf::from("/srv/img/cat.png"));
        let plan = cache
            .plan(
                &source,
                &chain(),
                &SaveOptions::default().with_target("small/cat.jpeg"),
            )
            .unwrap();
        assert_eq!(plan.target, cache.output_dir().join("small/cat.jpeg"));
        assert_eq!(plan.format, OutputFormat::Jpg);
    }

    #[test]
    fn empty_chain_has_no_plan() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache_in(dir.path());
        let source = Source::Path(PathBuf::from("/srv/img/cat.png"));
        assert!(matches!(
            cache.plan(&source, &OperationChain::new(), &SaveOptions::default()),
            Err(CacheError::NoOperations)
        ));
    }

    #[test]
    fn purge_of_missing_output_dir_is_zero() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache_in(dir.path());
        assert_eq!(cache.purge_source("/srv/img/cat.png").unwrap(), 0);
    }
}
