//! Source acquisition: materialize the plate-boundary shapefile locally.
//!
//! Uses enum dispatch instead of trait objects because async methods are
//! not dyn-compatible. Three backends exist:
//!
//! - [`HttpSource`] downloads each shapefile component with `reqwest`.
//! - [`GitSource`] shallow-clones the upstream repository.
//! - [`LocalSource`] copies the components from a directory on disk.
//!
//! Every backend writes into the checkout directory under the scratch root
//! and returns the path of the `.shp` file.

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};

use tokio::process::Command;
use tracing::{debug, info};

use crate::config::{SourceConfig, SourceKind};

/// Errors that can occur while acquiring the shapefile.
#[derive(Debug, thiserror::Error)]
pub enum AcquisitionError {
    /// The scratch or checkout directory could not be created.
    #[error("failed to create scratch directory {}: {source}", .path.display())]
    ScratchDir {
        /// Directory that could not be created.
        path: PathBuf,
        /// The underlying I/O error.
        source: io::Error,
    },

    /// An HTTP request could not be completed.
    #[error("request to {url} failed: {source}")]
    Request {
        /// Requested URL.
        url: String,
        /// The underlying client error.
        source: reqwest::Error,
    },

    /// The server answered with a non-success status.
    #[error("{url} returned HTTP {status}")]
    HttpStatus {
        /// Requested URL.
        url: String,
        /// Response status code.
        status: u16,
    },

    /// A fetched component could not be written to disk.
    #[error("failed to write {}: {source}", .path.display())]
    Write {
        /// Destination path.
        path: PathBuf,
        /// The underlying I/O error.
        source: io::Error,
    },

    /// A helper program could not be started.
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        /// Program name.
        program: String,
        /// The underlying I/O error.
        source: io::Error,
    },

    /// `git clone` exited unsuccessfully.
    #[error("git clone of {url} failed ({status}): {stderr}")]
    Clone {
        /// Repository URL.
        url: String,
        /// Exit status description.
        status: String,
        /// Captured standard error.
        stderr: String,
    },

    /// A shapefile component was not present after acquisition.
    #[error("shapefile component missing: {}", .0.display())]
    MissingComponent(PathBuf),

    /// The local backend was selected without a source directory.
    #[error("local source selected but no local_dir configured")]
    MissingLocalDir,
}

// ---------------------------------------------------------------------------
// Unified source enum
// ---------------------------------------------------------------------------

/// A shapefile source selected from configuration.
#[derive(Debug)]
pub enum ShapefileSource {
    /// HTTP download of each component.
    Http(HttpSource),
    /// Shallow git clone.
    Git(GitSource),
    /// Copy from a local directory.
    Local(LocalSource),
}

impl ShapefileSource {
    /// Materialize the shapefile into `checkout_dir` and return the path of
    /// the `.shp` component.
    ///
    /// The directory and its parents are created if missing; creating an
    /// existing directory is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`AcquisitionError`] if the directory cannot be created, the
    /// transfer fails, or the `.shp` file is absent afterwards.
    pub async fn fetch(&self, checkout_dir: &Path) -> Result<PathBuf, AcquisitionError> {
        let shapefile = match self {
            Self::Http(source) => source.fetch(checkout_dir).await?,
            Self::Git(source) => source.fetch(checkout_dir).await?,
            Self::Local(source) => source.fetch(checkout_dir).await?,
        };

        if !tokio::fs::try_exists(&shapefile).await.unwrap_or(false) {
            return Err(AcquisitionError::MissingComponent(shapefile));
        }
        Ok(shapefile)
    }

    /// Human-readable name for logging.
    pub const fn name(&self) -> &str {
        match self {
            Self::Http(_) => "http",
            Self::Git(_) => "git",
            Self::Local(_) => "local",
        }
    }
}

/// Create the source backend named by `config.kind`.
///
/// # Errors
///
/// Returns [`AcquisitionError::MissingLocalDir`] when the local backend is
/// selected without a directory.
pub fn create_source(config: &SourceConfig) -> Result<ShapefileSource, AcquisitionError> {
    Ok(match config.kind {
        SourceKind::Http => ShapefileSource::Http(HttpSource::new(config)),
        SourceKind::Git => ShapefileSource::Git(GitSource::new(config)),
        SourceKind::Local => {
            let dir = config
                .local_dir
                .clone()
                .ok_or(AcquisitionError::MissingLocalDir)?;
            ShapefileSource::Local(LocalSource::new(config, dir))
        }
    })
}

/// Create `dir` and its parents.
async fn prepare_dir(dir: &Path) -> Result<(), AcquisitionError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|source| AcquisitionError::ScratchDir {
            path: dir.to_path_buf(),
            source,
        })
}

// ---------------------------------------------------------------------------
// HTTP backend
// ---------------------------------------------------------------------------

/// Downloads `{base_url}/{layer}.{ext}` for every configured extension.
#[derive(Debug)]
pub struct HttpSource {
    client: reqwest::Client,
    base_url: String,
    files: Vec<String>,
    shapefile: String,
}

impl HttpSource {
    /// Create an HTTP source from configuration.
    pub fn new(config: &SourceConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.raw_base_url.trim_end_matches('/').to_owned(),
            files: config.component_files(),
            shapefile: config.shapefile_name(),
        }
    }

    async fn fetch(&self, checkout_dir: &Path) -> Result<PathBuf, AcquisitionError> {
        prepare_dir(checkout_dir).await?;

        for file in &self.files {
            let url = format!("{}/{file}", self.base_url);
            let response = self
                .client
                .get(&url)
                .send()
                .await
                .map_err(|source| AcquisitionError::Request {
                    url: url.clone(),
                    source,
                })?;

            let status = response.status();
            if !status.is_success() {
                return Err(AcquisitionError::HttpStatus {
                    url,
                    status: status.as_u16(),
                });
            }

            let body = response
                .bytes()
                .await
                .map_err(|source| AcquisitionError::Request {
                    url: url.clone(),
                    source,
                })?;

            let path = checkout_dir.join(file);
            tokio::fs::write(&path, &body)
                .await
                .map_err(|source| AcquisitionError::Write {
                    path: path.clone(),
                    source,
                })?;
            debug!(url, bytes = body.len(), "component downloaded");
        }

        info!(files = self.files.len(), "shapefile downloaded");
        Ok(checkout_dir.join(&self.shapefile))
    }
}

// ---------------------------------------------------------------------------
// Git backend
// ---------------------------------------------------------------------------

/// Runs `git clone --depth 1 <repository> <checkout_dir>`.
#[derive(Debug)]
pub struct GitSource {
    program: String,
    repository_url: String,
    shapefile: String,
}

impl GitSource {
    /// Create a git source from configuration.
    pub fn new(config: &SourceConfig) -> Self {
        Self {
            program: "git".to_owned(),
            repository_url: config.repository_url.clone(),
            shapefile: config.shapefile_name(),
        }
    }

    /// Arguments passed to `git`.
    pub fn args(&self, checkout_dir: &Path) -> Vec<OsString> {
        vec![
            "clone".into(),
            "--depth".into(),
            "1".into(),
            "--quiet".into(),
            self.repository_url.as_str().into(),
            checkout_dir.as_os_str().to_owned(),
        ]
    }

    async fn fetch(&self, checkout_dir: &Path) -> Result<PathBuf, AcquisitionError> {
        // git refuses to clone into a non-empty directory left by a killed run.
        match tokio::fs::remove_dir_all(checkout_dir).await {
            Ok(()) => debug!(path = %checkout_dir.display(), "stale checkout removed"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(source) => {
                return Err(AcquisitionError::ScratchDir {
                    path: checkout_dir.to_path_buf(),
                    source,
                });
            }
        }
        if let Some(parent) = checkout_dir.parent() {
            prepare_dir(parent).await?;
        }

        let output = Command::new(&self.program)
            .args(self.args(checkout_dir))
            .output()
            .await
            .map_err(|source| AcquisitionError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(AcquisitionError::Clone {
                url: self.repository_url.clone(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            });
        }

        info!(url = self.repository_url, "repository cloned");
        Ok(checkout_dir.join(&self.shapefile))
    }
}

// ---------------------------------------------------------------------------
// Local backend
// ---------------------------------------------------------------------------

/// Copies the shapefile components from a directory on disk.
#[derive(Debug)]
pub struct LocalSource {
    dir: PathBuf,
    files: Vec<String>,
    shapefile: String,
}

impl LocalSource {
    /// Create a local source reading from `dir`.
    pub fn new(config: &SourceConfig, dir: PathBuf) -> Self {
        Self {
            dir,
            files: config.component_files(),
            shapefile: config.shapefile_name(),
        }
    }

    async fn fetch(&self, checkout_dir: &Path) -> Result<PathBuf, AcquisitionError> {
        prepare_dir(checkout_dir).await?;

        for file in &self.files {
            let from = self.dir.join(file);
            let to = checkout_dir.join(file);
            tokio::fs::copy(&from, &to).await.map_err(|source| {
                if source.kind() == io::ErrorKind::NotFound {
                    AcquisitionError::MissingComponent(from.clone())
                } else {
                    AcquisitionError::Write { path: to.clone(), source }
                }
            })?;
        }

        info!(dir = %self.dir.display(), files = self.files.len(), "shapefile copied");
        Ok(checkout_dir.join(&self.shapefile))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    fn local_config(dir: &Path) -> SourceConfig {
        SourceConfig {
            kind: SourceKind::Local,
            local_dir: Some(dir.to_path_buf()),
            ..SourceConfig::default()
        }
    }

    #[test]
    fn create_source_dispatches_on_kind() {
        let http = create_source(&SourceConfig::default()).unwrap();
        assert_eq!(http.name(), "http");

        let git = create_source(&SourceConfig {
            kind: SourceKind::Git,
            ..SourceConfig::default()
        })
        .unwrap();
        assert_eq!(git.name(), "git");

        let local = create_source(&local_config(Path::new("/tmp"))).unwrap();
        assert_eq!(local.name(), "local");
    }

    #[test]
    fn local_without_dir_is_rejected() {
        let config = SourceConfig {
            kind: SourceKind::Local,
            ..SourceConfig::default()
        };
        assert!(matches!(
            create_source(&config),
            Err(AcquisitionError::MissingLocalDir)
        ));
    }

    #[test]
    fn git_args_are_structured() {
        let source = GitSource::new(&SourceConfig::default());
        let args = source.args(Path::new("temp/tectonicplates"));
        assert_eq!(
            args,
            vec![
                "clone",
                "--depth",
                "1",
                "--quiet",
                "https://github.com/fraxen/tectonicplates.git",
                "temp/tectonicplates"
            ]
        );
    }

    #[cfg(unix)]
    #[test]
    fn git_checkout_dir_is_passed_verbatim() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let source = GitSource::new(&SourceConfig::default());
        let checkout = Path::new(OsStr::from_bytes(b"temp/pl\xe4tes"));
        let args = source.args(checkout);
        assert_eq!(args.last().unwrap().as_bytes(), b"temp/pl\xe4tes");
    }

    #[test]
    fn http_base_url_drops_trailing_slash() {
        let source = HttpSource::new(&SourceConfig {
            raw_base_url: "http://localhost:9/plates/".to_owned(),
            ..SourceConfig::default()
        });
        assert_eq!(source.base_url, "http://localhost:9/plates");
        assert_eq!(source.files.len(), 4);
    }

    #[tokio::test]
    async fn local_source_copies_every_component() {
        let upstream = tempfile::tempdir().unwrap();
        for file in SourceConfig::default().component_files() {
            std::fs::write(upstream.path().join(file), b"component").unwrap();
        }
        let scratch = tempfile::tempdir().unwrap();
        let checkout = scratch.path().join("temp/tectonicplates");

        let source = create_source(&local_config(upstream.path())).unwrap();
        let shp = source.fetch(&checkout).await.unwrap();

        assert_eq!(shp, checkout.join("PB2002_plates.shp"));
        for file in SourceConfig::default().component_files() {
            assert!(checkout.join(file).exists());
        }
    }

    #[tokio::test]
    async fn fetching_twice_into_existing_directory_succeeds() {
        let upstream = tempfile::tempdir().unwrap();
        for file in SourceConfig::default().component_files() {
            std::fs::write(upstream.path().join(file), b"component").unwrap();
        }
        let scratch = tempfile::tempdir().unwrap();
        let checkout = scratch.path().join("tectonicplates");
        let source = create_source(&local_config(upstream.path())).unwrap();

        assert!(source.fetch(&checkout).await.is_ok());
        assert!(source.fetch(&checkout).await.is_ok());
    }

    #[tokio::test]
    async fn local_source_reports_missing_component() {
        let upstream = tempfile::tempdir().unwrap();
        std::fs::write(upstream.path().join("PB2002_plates.shp"), b"shp").unwrap();
        let scratch = tempfile::tempdir().unwrap();

        let source = create_source(&local_config(upstream.path())).unwrap();
        let err = source
            .fetch(&scratch.path().join("tectonicplates"))
            .await
            .unwrap_err();
        match err {
            AcquisitionError::MissingComponent(path) => {
                assert_eq!(path, upstream.path().join("PB2002_plates.shx"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn unwritable_scratch_is_an_acquisition_error() {
        let root = tempfile::tempdir().unwrap();
        // A regular file where the scratch directory should be.
        let blocker = root.path().join("temp");
        std::fs::write(&blocker, b"not a directory").unwrap();

        let source = create_source(&local_config(root.path())).unwrap();
        let err = source
            .fetch(&blocker.join("tectonicplates"))
            .await
            .unwrap_err();
        assert!(matches!(err, AcquisitionError::ScratchDir { .. }));
    }
}
