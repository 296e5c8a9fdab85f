//! The filesystem collaborator.
//!
//! The resolver never touches `std::fs` directly: every existence check,
//! read, and write goes through a [`Filesystem`]. [`LocalFilesystem`] is
//! the production implementation; hosts that fetch remote sources plug in
//! their own.

use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};

use thumbsmith_pipeline::format::normalize_extension;

use crate::source::Source;

/// Storage operations the cache resolver depends on.
pub trait Filesystem: Send + Sync {
    /// Whether a file exists at `path`.
    fn exists(&self, path: &Path) -> bool;

    /// Resolve `path` against `base` and normalize `.` and `..` lexically.
    fn make_absolute(&self, path: &Path, base: &Path) -> PathBuf {
        let joined = if path.is_absolute() {
            path.to_path_buf()
        } else {
            base.join(path)
        };
        normalize(&joined)
    }

    /// Fail unless `path` names a readable regular file.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error, or `InvalidInput` for a directory.
    fn check_readable(&self, path: &Path) -> io::Result<()>;

    /// Read the encoded bytes of `source`.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error.
    fn read(&self, source: &Source) -> io::Result<Vec<u8>>;

    /// Write `bytes` to `path` so readers see either nothing or the whole
    /// file.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error. No partial file is left at `path`.
    fn atomic_write(&self, path: &Path, bytes: &[u8]) -> io::Result<()>;

    /// Create `path` and all missing parents.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error.
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Files directly inside `dir`.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error.
    fn list(&self, dir: &Path) -> io::Result<Vec<PathBuf>>;

    /// Delete the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error.
    fn remove(&self, path: &Path) -> io::Result<()>;

    /// Lowercase extension of `path` with `jpeg`/`tif` normalized.
    fn extension(&self, path: &Path) -> String {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(normalize_extension)
            .unwrap_or_default()
    }
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// [`Filesystem`] backed by the local disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFilesystem;

impl Filesystem for LocalFilesystem {
    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn check_readable(&self, path: &Path) -> io::Result<()> {
        let metadata = std::fs::metadata(path)?;
        if !metadata.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "not a regular file",
            ));
        }
        std::fs::File::open(path).map(drop)
    }

    fn read(&self, source: &Source) -> io::Result<Vec<u8>> {
        match source {
            Source::Path(path) => std::fs::read(path),
            Source::Url(_) => Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "remote sources need a fetching filesystem",
            )),
        }
    }

    fn atomic_write(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        let parent = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        // Same directory as the target so the rename cannot cross devices.
        let mut tmp = tempfile::Builder::new()
            .prefix(".thumbsmith-")
            .suffix(".tmp")
            .tempfile_in(parent)?;
        tmp.write_all(bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| e.error)?;
        Ok(())
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        std::fs::create_dir_all(path)
    }

    fn list(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                files.push(entry.path());
            }
        }
        files.sort();
        Ok(files)
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        std::fs::remove_file(path)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn make_absolute_joins_and_normalizes() {
        let fs = LocalFilesystem;
        assert_eq!(
            fs.make_absolute(Path::new("thumbs/./a/../b"), Path::new("/srv/app")),
            PathBuf::from("/srv/app/thumbs/b")
        );
        assert_eq!(
            fs.make_absolute(Path::new("/var/cache"), Path::new("/srv/app")),
            PathBuf::from("/var/cache")
        );
    }

    #[test]
    fn extension_is_normalized() {
        let fs = LocalFilesystem;
        assert_eq!(fs.extension(Path::new("/a/photo.JPEG")), "jpg");
        assert_eq!(fs.extension(Path::new("/a/scan.tif")), "tiff");
        assert_eq!(fs.extension(Path::new("/a/noext")), "");
    }

    #[test]
    fn atomic_write_replaces_and_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out.bin");
        let fs = LocalFilesystem;

        fs.atomic_write(&target, b"first").unwrap();
        fs.atomic_write(&target, b"second").unwrap();

        assert_eq!(std::fs::read(&target).unwrap(), b"second");
        assert_eq!(fs.list(dir.path()).unwrap(), vec![target]);
    }

    #[test]
    fn atomic_write_into_missing_dir_fails_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("missing").join("out.bin");
        assert!(LocalFilesystem.atomic_write(&target, b"x").is_err());
        assert!(!target.exists());
    }

    #[test]
    fn failed_rename_removes_the_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out.png");
        std::fs::create_dir(&target).unwrap();
        std::fs::write(target.join("keep"), b"x").unwrap();

        assert!(LocalFilesystem.atomic_write(&target, b"pixels").is_err());

        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(names, ["out.png"]);
        assert!(target.join("keep").is_file());
    }

    #[test]
    fn check_readable_rejects_directories_and_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let fs = LocalFilesystem;
        assert!(fs.check_readable(dir.path()).is_err());
        assert!(fs.check_readable(&dir.path().join("nope.png")).is_err());

        let file = dir.path().join("a.png");
        std::fs::write(&file, b"x").unwrap();
        fs.check_readable(&file).unwrap();
        assert!(fs.exists(&file));
        assert!(!fs.exists(dir.path()));
    }

    #[test]
    fn urls_are_not_readable_locally() {
        let err = LocalFilesystem
            .read(&Source::Url("https://example.com/a.png".to_owned()))
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::Unsupported);
    }
}
