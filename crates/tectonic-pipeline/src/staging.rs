//! Promotion of validated artifacts into the output directory.
//!
//! Artifacts are written under the scratch staging directory and only
//! promoted once validation has passed, so a failed run leaves the
//! previously published files untouched.

use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

/// Errors that can occur while preparing the staging area or promoting
/// artifacts out of it.
#[derive(Debug, thiserror::Error)]
pub enum StagingError {
    /// A directory could not be created.
    #[error("failed to create directory {}: {source}", .path.display())]
    CreateDir {
        /// The directory.
        path: PathBuf,
        /// The underlying I/O error.
        source: io::Error,
    },

    /// An artifact could not be moved into place.
    #[error("failed to promote {} to {}: {source}", .from.display(), .to.display())]
    Promote {
        /// Staged file.
        from: PathBuf,
        /// Final destination.
        to: PathBuf,
        /// The underlying I/O error.
        source: io::Error,
    },
}

/// Create `dir` and its parents. Existing directories are left alone.
///
/// # Errors
///
/// Returns [`StagingError::CreateDir`] if creation fails.
pub async fn ensure_dir(dir: &Path) -> Result<(), StagingError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|source| StagingError::CreateDir {
            path: dir.to_path_buf(),
            source,
        })
}

/// Move a staged file to its final path, replacing any existing file.
///
/// A plain rename is tried first. When that fails (typically because the
/// staging and output directories are on different filesystems) the file is
/// copied next to the destination and renamed over it, so readers never see
/// a partially written artifact.
///
/// # Errors
///
/// Returns [`StagingError`] if the output directory cannot be created or
/// the file cannot be moved.
pub async fn promote(staged: &Path, destination: &Path) -> Result<(), StagingError> {
    if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
        ensure_dir(parent).await?;
    }

    let promote_err = |source: io::Error| StagingError::Promote {
        from: staged.to_path_buf(),
        to: destination.to_path_buf(),
        source,
    };

    if let Err(e) = tokio::fs::rename(staged, destination).await {
        debug!(error = %e, "rename failed, copying instead");
        let sibling = sibling_temp(destination);
        tokio::fs::copy(staged, &sibling).await.map_err(promote_err)?;
        if let Err(source) = tokio::fs::rename(&sibling, destination).await {
            let _ = tokio::fs::remove_file(&sibling).await;
            return Err(promote_err(source));
        }
    }

    info!(
        from = %staged.display(),
        to = %destination.display(),
        "artifact promoted"
    );
    Ok(())
}

/// Temporary path in the same directory as `destination`.
fn sibling_temp(destination: &Path) -> PathBuf {
    let mut name = destination
        .file_name()
        .map(ToOwned::to_owned)
        .unwrap_or_default();
    name.push(".partial");
    destination.with_file_name(name)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn promote_creates_output_dir_and_moves_file() {
        let dir = tempfile::tempdir().unwrap();
        let staged = dir.path().join("staging/plates.json");
        std::fs::create_dir_all(staged.parent().unwrap()).unwrap();
        std::fs::write(&staged, b"[]\n").unwrap();

        let dest = dir.path().join("public/data/plates.json");
        promote(&staged, &dest).await.unwrap();

        assert_eq!(std::fs::read(&dest).unwrap(), b"[]\n");
        assert!(!staged.exists());
    }

    #[tokio::test]
    async fn promote_replaces_existing_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let staged = dir.path().join("new.json");
        let dest = dir.path().join("out/plates.json");
        std::fs::create_dir_all(dest.parent().unwrap()).unwrap();
        std::fs::write(&dest, b"old").unwrap();
        std::fs::write(&staged, b"new").unwrap();

        promote(&staged, &dest).await.unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"new");
        assert!(!sibling_temp(&dest).exists());
    }

    #[tokio::test]
    async fn missing_staged_file_is_a_promote_error() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out/plates.json");
        let err = promote(&dir.path().join("absent.json"), &dest).await.unwrap_err();
        assert!(matches!(err, StagingError::Promote { .. }));
        assert!(!dest.exists());
    }

    #[test]
    fn sibling_temp_stays_in_destination_dir() {
        let tmp = sibling_temp(Path::new("public/data/platesTopo.json"));
        assert_eq!(tmp, Path::new("public/data/platesTopo.json.partial"));
    }
}
