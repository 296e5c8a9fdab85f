//! Ordered chain of deferred operations with an explicit reuse contract.
//!
//! ```rust
//! # use thumbsmith_pipeline::{OperationChain, CropOptions, ResizeOptions, PipelineError};
//! # fn run() -> Result<(), PipelineError> {
//! let mut chain = OperationChain::new();
//! chain
//!     .crop(200, None, CropOptions::default())?
//!     .resize(100, None, ResizeOptions::default())?;
//! assert_eq!(chain.len(), 2);
//! # Ok(())
//! # }
//! ```
//!
//! A chain moves between two states. It starts in
//! [`ChainState::Building`]; [`OperationChain::resolve`] drains the
//! operations and moves it to [`ChainState::Resolved`], remembering the
//! target path; the next operation moves it back to `Building`. A rejected
//! operation leaves the chain untouched.

use std::path::{Path, PathBuf};

use crate::backend::ImageBackend;
use crate::fingerprint::{Fingerprint, SaveEntry};
use crate::operation::{CanvasOptions, CropOptions, FitOptions, Operation, ResizeOptions};
use crate::types::{Dimensions, DynamicImage, PipelineError};

/// Largest image, in pixels, any step of a chain may produce unless the
/// caller sets its own limit. 10000 x 10000.
pub const DEFAULT_MAX_PIXELS: u64 = 100_000_000;

/// Lifecycle state of an [`OperationChain`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ChainState {
    /// Accepting operations.
    #[default]
    Building,
    /// Finalized; the operations have been drained.
    Resolved {
        /// Path the last finalize produced or found.
        target: PathBuf,
    },
}

/// Operations accumulated against one source image.
#[derive(Debug, Clone, Default)]
pub struct OperationChain {
    operations: Vec<Operation>,
    state: ChainState,
    last_target: Option<PathBuf>,
}

impl OperationChain {
    /// An empty chain in the `Building` state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an operation built outside the chain, e.g. parsed from text
    /// or assembled from its variant.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidArgument`] without modifying the
    /// chain if `op` fails [`Operation::validate`].
    pub fn push(&mut self, op: Operation) -> Result<&mut Self, PipelineError> {
        op.validate()?;
        Ok(self.append(op))
    }

    fn append(&mut self, op: Operation) -> &mut Self {
        self.operations.push(op);
        self.state = ChainState::Building;
        self
    }

    /// Append a crop. See [`Operation::crop`].
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidArgument`] without modifying the
    /// chain if the parameters are invalid.
    pub fn crop(
        &mut self,
        width: u32,
        height: Option<u32>,
        options: CropOptions,
    ) -> Result<&mut Self, PipelineError> {
        Ok(self.append(Operation::crop(width, height, options)?))
    }

    /// Append a fit. See [`Operation::fit`].
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidArgument`] without modifying the
    /// chain if the parameters are invalid.
    pub fn fit(
        &mut self,
        width: Option<u32>,
        height: Option<u32>,
        options: FitOptions,
    ) -> Result<&mut Self, PipelineError> {
        Ok(self.append(Operation::fit(width, height, options)?))
    }

    /// Append a resize. See [`Operation::resize`].
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidArgument`] without modifying the
    /// chain if the parameters are invalid.
    pub fn resize(
        &mut self,
        width: u32,
        height: Option<u32>,
        options: ResizeOptions,
    ) -> Result<&mut Self, PipelineError> {
        Ok(self.append(Operation::resize(width, height, options)?))
    }

    /// Append a canvas resize. See [`Operation::resize_canvas`].
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidArgument`] without modifying the
    /// chain if the parameters are invalid.
    pub fn resize_canvas(
        &mut self,
        width: Option<i32>,
        height: Option<i32>,
        options: CanvasOptions,
    ) -> Result<&mut Self, PipelineError> {
        Ok(self.append(Operation::resize_canvas(width, height, options)?))
    }

    /// The resolved operations, in call order.
    #[must_use]
    pub fn history(&self) -> &[Operation] {
        &self.operations
    }

    /// Number of pending operations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Whether no operations are pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> &ChainState {
        &self.state
    }

    /// Target of the most recent finalize, kept across later `Building`
    /// phases.
    #[must_use]
    pub fn resolved_target(&self) -> Option<&Path> {
        self.last_target.as_deref()
    }

    /// Fingerprint the pending operations against `source`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::NoOperations`] if the chain is empty.
    pub fn fingerprint(&self, source: &str, save: &SaveEntry) -> Result<Fingerprint, PipelineError> {
        if self.is_empty() {
            return Err(PipelineError::NoOperations);
        }
        Ok(Fingerprint::compute(source, &self.operations, save))
    }

    /// Size the chain produces from a `source` sized image.
    ///
    /// Every intermediate size is checked against `max_pixels`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::TooLarge`] naming the first operation
    /// whose output exceeds `max_pixels`.
    pub fn output_dimensions(
        &self,
        source: Dimensions,
        max_pixels: u64,
    ) -> Result<Dimensions, PipelineError> {
        self.operations.iter().try_fold(source, |size, op| {
            let next = op.output_dimensions(size);
            if next.area() > max_pixels {
                return Err(PipelineError::TooLarge {
                    operation: op.name(),
                    width: next.width,
                    height: next.height,
                    limit: max_pixels,
                });
            }
            Ok(next)
        })
    }

    /// Apply every pending operation to `image`, in call order.
    ///
    /// Sizes are checked up front, so no pixels are allocated for a chain
    /// that would exceed `max_pixels`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::NoOperations`] if the chain is empty, or
    /// [`PipelineError::TooLarge`] if any step exceeds `max_pixels`.
    pub fn apply<B: ImageBackend + ?Sized>(
        &self,
        backend: &B,
        image: DynamicImage,
        max_pixels: u64,
    ) -> Result<DynamicImage, PipelineError> {
        if self.is_empty() {
            return Err(PipelineError::NoOperations);
        }
        self.output_dimensions(Dimensions::of(&image), max_pixels)?;
        Ok(self
            .operations
            .iter()
            .fold(image, |image, op| op.apply(backend, image)))
    }

    /// Finish a cycle: drain the operations and record `target`.
    ///
    /// Returns the drained operations.
    pub fn resolve(&mut self, target: PathBuf) -> Vec<Operation> {
        self.last_target = Some(target.clone());
        self.state = ChainState::Resolved { target };
        std::mem::take(&mut self.operations)
    }
}
