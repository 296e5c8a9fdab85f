//! Errors surfaced by the cache resolver.

use std::path::{Path, PathBuf};

use thumbsmith_pipeline::PipelineError;

/// Errors that can occur while building or saving a thumbnail.
///
/// Validation problems (`InvalidArgument`, `NoOperations`) surface at the
/// call that caused them. Decode and persistence problems surface only
/// from `save`, since nothing is read or written before then.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// A caller-supplied parameter violates an operation's contract.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// `save` was called with no pending operations.
    #[error("no operations to apply")]
    NoOperations,

    /// The source cannot be read or decoded as an image.
    #[error("source '{path}' is not readable: {reason}")]
    NotReadable {
        /// Source path or URL.
        path: String,
        /// Underlying failure.
        reason: String,
    },

    /// The source is a recognized container the decoder cannot handle.
    #[error("source '{path}' has an unsupported image type: {reason}")]
    UnsupportedType {
        /// Source path or URL.
        path: String,
        /// Underlying failure.
        reason: String,
    },

    /// The thumbnail could not be produced at its target.
    #[error("cannot write thumbnail to '{}': {reason}", target.display())]
    NotWritable {
        /// Intended output path.
        target: PathBuf,
        /// Underlying failure.
        reason: String,
    },

    /// The cache configuration is invalid or could not be loaded.
    #[error("invalid cache configuration: {0}")]
    Config(String),
}

impl CacheError {
    /// Attach source and target context to a pipeline failure.
    #[must_use]
    pub fn from_pipeline(err: PipelineError, source: &str, target: &Path) -> Self {
        match err {
            PipelineError::InvalidArgument(msg) => Self::InvalidArgument(msg),
            PipelineError::NoOperations => Self::NoOperations,
            PipelineError::NotReadable(reason) => Self::NotReadable {
                path: source.to_owned(),
                reason,
            },
            PipelineError::UnsupportedType(reason) => Self::UnsupportedType {
                path: source.to_owned(),
                reason,
            },
            err @ PipelineError::TooLarge { .. } => Self::InvalidArgument(err.to_string()),
            PipelineError::Encode(reason) => Self::NotWritable {
                target: target.to_path_buf(),
                reason,
            },
        }
    }

    pub(crate) fn not_writable(target: &Path, err: &std::io::Error) -> Self {
        Self::NotWritable {
            target: target.to_path_buf(),
            reason: err.to_string(),
        }
    }

    pub(crate) fn not_readable(source: &str, err: &std::io::Error) -> Self {
        Self::NotReadable {
            path: source.to_owned(),
            reason: err.to_string(),
        }
    }
}

/// Validation failures carry no source or target context.
impl From<PipelineError> for CacheError {
    fn from(err: PipelineError) -> Self {
        Self::from_pipeline(err, "", Path::new(""))
    }
}
