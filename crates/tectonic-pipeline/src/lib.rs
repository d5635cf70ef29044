//! Build-time data pipeline for the tectonic plates globe.
//!
//! The pipeline fetches the PB2002 plate-boundary shapefile, reduces it to a
//! compact `TopoJSON` topology of the seven major plates, synthesizes the
//! matching `plates.json` metadata from a curated catalog, validates the two
//! artifacts against each other, and publishes them.
//!
//! # Modules
//!
//! - [`acquire`] -- Shapefile sources (HTTP, git clone, local copy).
//! - [`catalog`] -- Curated plate ids, motions, and collision earthquakes.
//! - [`config`] -- Configuration loading from `tectonic-config.yaml` into
//!   strongly-typed structs.
//! - [`error`] -- [`PipelineError`], wrapping every stage error.
//! - [`metadata`] -- Metadata synthesis and serialization.
//! - [`pipeline`] -- Stage orchestration.
//! - [`reduce`] -- Geometry reduction through `mapshaper`.
//! - [`scratch`] -- Scratch directory guard.
//! - [`staging`] -- Promotion of validated artifacts.
//! - [`validate`] -- Cross-artifact invariant checks.
//!
//! [`PipelineError`]: error::PipelineError

pub mod acquire;
pub mod catalog;
pub mod config;
pub mod error;
pub mod metadata;
pub mod pipeline;
pub mod reduce;
pub mod scratch;
pub mod staging;
pub mod validate;

pub use config::{DEFAULT_CONFIG_FILE, PipelineConfig};
pub use error::PipelineError;
pub use pipeline::{Pipeline, PipelineReport};
