//! Source images: local paths or remote URLs.

use std::fmt;
use std::path::{Path, PathBuf};

use thumbsmith_pipeline::save::extension_of;

/// Where a thumbnail's pixels come from.
///
/// The string form is hashed into every fingerprint, so a path is always
/// stored absolute: the same file reached through different relative paths
/// shares one cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Source {
    /// An absolute local path.
    Path(PathBuf),
    /// A remote `http`/`https` URL.
    Url(String),
}

/// Whether `s` looks like a remote URL rather than a path.
#[must_use]
pub fn is_url(s: &str) -> bool {
    let lower = s.trim_start().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

impl Source {
    /// The identity hashed into fingerprints.
    #[must_use]
    pub fn identity(&self) -> String {
        match self {
            Self::Path(path) => path.to_string_lossy().into_owned(),
            Self::Url(url) => url.clone(),
        }
    }

    /// File extension of the source, used as the default output format.
    #[must_use]
    pub fn extension(&self) -> String {
        match self {
            Self::Path(path) => path
                .extension()
                .and_then(|ext| ext.to_str())
                .unwrap_or_default()
                .to_owned(),
            Self::Url(url) => {
                let path = url.split(['?', '#']).next().unwrap_or_default();
                extension_of(path).to_owned()
            }
        }
    }

    /// The local path, if this is not a URL.
    #[must_use]
    pub fn as_path(&self) -> Option<&Path> {
        match self {
            Self::Path(path) => Some(path),
            Self::Url(_) => None,
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(path) => write!(f, "{}", path.display()),
            Self::Url(url) => f.write_str(url),
        }
    }
}
