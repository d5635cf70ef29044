//! Error types for a pipeline run.
//!
//! [`PipelineError`] is the top-level error that wraps the failure of each
//! stage, giving the build binary a single error type to propagate with `?`.

use std::path::PathBuf;

/// Top-level error for a pipeline run.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: crate::config::ConfigError,
    },

    /// Shapefile acquisition failed.
    #[error("acquisition error: {source}")]
    Acquisition {
        /// The underlying acquisition error.
        #[from]
        source: crate::acquire::AcquisitionError,
    },

    /// Geometry reduction failed.
    #[error("conversion error: {source}")]
    Conversion {
        /// The underlying conversion error.
        #[from]
        source: crate::reduce::ConversionError,
    },

    /// Metadata synthesis failed.
    #[error("metadata error: {source}")]
    Metadata {
        /// The underlying metadata error.
        #[from]
        source: crate::metadata::MetadataError,
    },

    /// The written artifacts are inconsistent.
    #[error("validation error: {source}")]
    Validation {
        /// The violated invariant.
        #[from]
        source: crate::validate::ValidationError,
    },

    /// Staging or promotion failed.
    #[error("staging error: {source}")]
    Staging {
        /// The underlying staging error.
        #[from]
        source: crate::staging::StagingError,
    },

    /// The scratch directory could not be removed after a successful run.
    #[error("cleanup of {} failed: {source}", .path.display())]
    Cleanup {
        /// The scratch directory.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },
}
