//! A thumbnail being built against one source.

use std::path::{Path, PathBuf};

use thumbsmith_pipeline::{
    CanvasOptions, ChainState, CropOptions, FitOptions, Operation, OperationChain, ResizeOptions,
    SaveOptions,
};

use crate::cache::ThumbnailCache;
use crate::error::CacheError;
use crate::source::Source;

/// Chainable builder returned by [`ThumbnailCache::open`].
///
/// Operations are validated when added and only executed by
/// [`save`](Self::save). A successful save empties the chain, so the same
/// builder can produce several thumbnails of one source in turn.
#[derive(Debug)]
pub struct Thumbnail<'c> {
    cache: &'c ThumbnailCache,
    source: Source,
    chain: OperationChain,
}

impl<'c> Thumbnail<'c> {
    pub(crate) fn new(cache: &'c ThumbnailCache, source: Source) -> Self {
        Self {
            cache,
            source,
            chain: OperationChain::new(),
        }
    }

    /// Crop `width` x `height` (height defaults to width) at the offset in
    /// `options`.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::InvalidArgument`] if `width` is zero. The
    /// chain is left unchanged.
    pub fn crop(
        &mut self,
        width: u32,
        height: Option<u32>,
        options: CropOptions,
    ) -> Result<&mut Self, CacheError> {
        self.chain.crop(width, height, options)?;
        Ok(self)
    }

    /// Crop to the target aspect ratio at `options.position`, then scale.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::InvalidArgument`] if neither side is given.
    /// The chain is left unchanged.
    pub fn fit(
        &mut self,
        width: Option<u32>,
        height: Option<u32>,
        options: FitOptions,
    ) -> Result<&mut Self, CacheError> {
        self.chain.fit(width, height, options)?;
        Ok(self)
    }

    /// Scale to `width` x `height` (height defaults to width).
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::InvalidArgument`] if `width` is zero. The
    /// chain is left unchanged.
    pub fn resize(
        &mut self,
        width: u32,
        height: Option<u32>,
        options: ResizeOptions,
    ) -> Result<&mut Self, CacheError> {
        self.chain.resize(width, height, options)?;
        Ok(self)
    }

    /// Grow or shrink the canvas around the image.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::InvalidArgument`] if no size is given or an
    /// absolute size is not positive. The chain is left unchanged.
    pub fn resize_canvas(
        &mut self,
        width: Option<i32>,
        height: Option<i32>,
        options: CanvasOptions,
    ) -> Result<&mut Self, CacheError> {
        self.chain.resize_canvas(width, height, options)?;
        Ok(self)
    }

    /// Append an operation built elsewhere, e.g. parsed from text.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::InvalidArgument`] if `op` is not in the form
    /// its validating constructor produces. The chain is left unchanged.
    pub fn push(&mut self, op: Operation) -> Result<&mut Self, CacheError> {
        self.chain.push(op)?;
        Ok(self)
    }

    /// The source this thumbnail is built from.
    #[must_use]
    pub const fn source(&self) -> &Source {
        &self.source
    }

    /// Pending operations, in call order.
    #[must_use]
    pub fn history(&self) -> &[Operation] {
        self.chain.history()
    }

    /// Lifecycle state of the underlying chain.
    #[must_use]
    pub const fn state(&self) -> &ChainState {
        self.chain.state()
    }

    /// Path returned by the most recent successful save.
    #[must_use]
    pub fn resolved_target(&self) -> Option<&Path> {
        self.chain.resolved_target()
    }

    /// The path [`save`](Self::save) would return, without rendering or
    /// resetting the chain.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::NoOperations`] for an empty chain and
    /// [`CacheError::InvalidArgument`] for unusable save options.
    pub fn target_path(&self, options: &SaveOptions) -> Result<PathBuf, CacheError> {
        Ok(self.cache.plan(&self.source, &self.chain, options)?.target)
    }

    /// Whether [`save`](Self::save) would be a cache hit.
    ///
    /// # Errors
    ///
    /// Same as [`target_path`](Self::target_path).
    pub fn is_cached(&self, options: &SaveOptions) -> Result<bool, CacheError> {
        let target = self.target_path(options)?;
        Ok(self.cache.is_cached(&target))
    }

    /// Resolve the chain to a file and return its absolute path.
    ///
    /// # Save steps
    ///
    /// 1. Pick format, quality, and target (fingerprint name unless
    ///    `options.target` is set)
    /// 2. Return at once if the target exists
    /// 3. Otherwise read and decode the source, apply every operation in
    ///    call order, encode, and write the target atomically
    /// 4. Empty the chain
    ///
    /// # Errors
    ///
    /// - [`CacheError::NoOperations`] if nothing was added since the last
    ///   save
    /// - [`CacheError::InvalidArgument`] for unusable save options
    /// - [`CacheError::NotReadable`] / [`CacheError::UnsupportedType`] if
    ///   the source cannot be decoded
    /// - [`CacheError::NotWritable`] if the thumbnail cannot be encoded or
    ///   persisted
    ///
    /// On error the chain is kept, so the save can be retried.
    #[tracing::instrument(level = "debug", skip_all, fields(source = %self.source))]
    pub fn save(&mut self, options: &SaveOptions) -> Result<PathBuf, CacheError> {
        let plan = self.cache.plan(&self.source, &self.chain, options)?;
        self.cache.materialize(&self.source, &self.chain, &plan)?;
        self.chain.resolve(plan.target.clone());
        Ok(plan.target)
    }
}
