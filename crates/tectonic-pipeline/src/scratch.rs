//! Scratch directory ownership.
//!
//! A [`ScratchDir`] owns the scratch tree for one pipeline run. Dropping it
//! removes the tree, so every exit path (early `?` return, panic unwind)
//! cleans up. The success path calls [`ScratchDir::close`] to remove it
//! explicitly and observe the result.

use std::io;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

/// Guard over the scratch directory of a pipeline run.
#[derive(Debug)]
pub struct ScratchDir {
    path: PathBuf,
    removed: bool,
}

impl ScratchDir {
    /// Take ownership of `path`. Nothing is created; acquisition creates the
    /// directory when it first needs it.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            removed: false,
        }
    }

    /// The scratch root.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the scratch tree now and disarm the guard.
    ///
    /// # Errors
    ///
    /// Returns the I/O error if the tree exists but cannot be removed.
    pub fn close(mut self) -> io::Result<()> {
        self.removed = true;
        remove_tree(&self.path)
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        if self.removed {
            return;
        }
        if let Err(e) = remove_tree(&self.path) {
            warn!(path = %self.path.display(), error = %e, "failed to remove scratch directory");
        }
    }
}

/// Remove `path` recursively. A missing directory is not an error.
fn remove_tree(path: &Path) -> io::Result<()> {
    match std::fs::remove_dir_all(path) {
        Ok(()) => {
            info!(path = %path.display(), "scratch directory removed");
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn populated_scratch(root: &Path) -> PathBuf {
        let scratch = root.join("temp");
        std::fs::create_dir_all(scratch.join("tectonicplates")).unwrap();
        std::fs::write(scratch.join("tectonicplates/PB2002_plates.shp"), b"shp").unwrap();
        scratch
    }

    #[test]
    fn close_removes_tree() {
        let root = tempfile::tempdir().unwrap();
        let scratch = populated_scratch(root.path());

        ScratchDir::new(&scratch).close().unwrap();
        assert!(!scratch.exists());
    }

    #[test]
    fn drop_removes_tree() {
        let root = tempfile::tempdir().unwrap();
        let scratch = populated_scratch(root.path());

        {
            let _guard = ScratchDir::new(&scratch);
        }
        assert!(!scratch.exists());
    }

    #[test]
    fn drop_removes_tree_on_error_return() {
        fn failing_stage(scratch: &Path) -> Result<(), String> {
            let _guard = ScratchDir::new(scratch);
            Err("conversion failed".to_owned())
        }

        let root = tempfile::tempdir().unwrap();
        let scratch = populated_scratch(root.path());
        assert!(failing_stage(&scratch).is_err());
        assert!(!scratch.exists());
    }

    #[test]
    fn missing_directory_is_not_an_error() {
        let root = tempfile::tempdir().unwrap();
        let guard = ScratchDir::new(root.path().join("never-created"));
        assert!(guard.close().is_ok());
    }
}
