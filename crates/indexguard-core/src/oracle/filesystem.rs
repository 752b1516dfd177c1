//! Filesystem metadata primitives used for freshness checks.
//!
//! The checker never reads file contents; it only stats paths, walks symlink
//! chains, and canonicalizes main-file paths. The trait exists so tests can
//! count stats and inject failures.

use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// The metadata of a single path, without following symlinks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FileStat {
    pub modified: SystemTime,
    pub is_symlink: bool,
}

pub trait FileSystem: Send + Sync {
    /// Stat `path` itself (an `lstat`): a symlink reports its own mtime.
    fn symlink_metadata(&self, path: &Path) -> io::Result<FileStat>;

    /// The raw target of the symlink at `path`, possibly relative.
    fn read_link(&self, path: &Path) -> io::Result<PathBuf>;

    /// Resolve every symlink and `..` in `path`.
    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf>;

    /// Whether `path` exists, following symlinks.
    fn exists(&self, path: &Path) -> bool;
}

/// [`FileSystem`] backed by `std::fs`.
#[derive(Clone, Copy, Debug, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn symlink_metadata(&self, path: &Path) -> io::Result<FileStat> {
        let metadata = std::fs::symlink_metadata(path)?;
        Ok(FileStat {
            modified: metadata.modified()?,
            is_symlink: metadata.file_type().is_symlink(),
        })
    }

    fn read_link(&self, path: &Path) -> io::Result<PathBuf> {
        std::fs::read_link(path)
    }

    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
        std::fs::canonicalize(path)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn real_file_system_reports_symlinks() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("target.swift");
        std::fs::write(&target, "struct A {}").unwrap();

        let fs = RealFileSystem;
        assert!(!fs.symlink_metadata(&target).unwrap().is_symlink);
        assert!(fs.exists(&target));
        assert!(!fs.exists(&dir.path().join("missing.swift")));

        #[cfg(unix)]
        {
            let link = dir.path().join("link.swift");
            std::os::unix::fs::symlink("target.swift", &link).unwrap();
            assert!(fs.symlink_metadata(&link).unwrap().is_symlink);
            assert_eq!(fs.read_link(&link).unwrap(), PathBuf::from("target.swift"));
            assert_eq!(
                fs.canonicalize(&link).unwrap(),
                fs.canonicalize(&target).unwrap()
            );
        }
    }

    #[test]
    fn missing_path_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = RealFileSystem
            .symlink_metadata(&dir.path().join("gone.swift"))
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
