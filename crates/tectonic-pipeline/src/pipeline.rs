//! Pipeline orchestration.
//!
//! A run executes the stages strictly in order and stops at the first
//! failure:
//!
//! 1. **Acquisition** -- materialize the shapefile in the scratch checkout.
//! 2. **Reduction** -- filter, dissolve and simplify into a staged topology.
//! 3. **Synthesis** -- write the staged metadata from the curated catalog.
//! 4. **Validation** -- check both staged artifacts against each other.
//! 5. **Promotion** -- move both artifacts into the output directory.
//! 6. **Cleanup** -- remove the scratch directory.
//!
//! The scratch directory is held by a [`ScratchDir`] guard for the whole
//! run, so it is removed on every exit path. Nothing reaches the output
//! directory unless validation has passed.

use std::path::PathBuf;

use tectonic_types::PlateName;
use tracing::info;

use crate::acquire::{ShapefileSource, create_source};
use crate::catalog::PlateCatalog;
use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::metadata::{synthesize, write_metadata};
use crate::reduce::GeometryReducer;
use crate::scratch::ScratchDir;
use crate::staging::{ensure_dir, promote};
use crate::validate::Validator;

/// Summary of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineReport {
    /// Number of plates in the published artifacts.
    pub plates: usize,
    /// Number of arcs in the published topology.
    pub arcs: usize,
    /// Published topology path.
    pub topology_path: PathBuf,
    /// Published topology size in bytes.
    pub topology_bytes: u64,
    /// Published metadata path.
    pub metadata_path: PathBuf,
    /// Published metadata size in bytes.
    pub metadata_bytes: u64,
}

/// One configured build of the plate artifacts.
#[derive(Debug)]
pub struct Pipeline {
    config: PipelineConfig,
    plates: Vec<PlateName>,
    source: ShapefileSource,
    reducer: GeometryReducer,
    catalog: PlateCatalog,
    validator: Validator,
}

impl Pipeline {
    /// Build a pipeline for all seven plates with the curated catalog.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if the configuration is invalid or names a
    /// source that cannot be constructed.
    pub fn new(config: PipelineConfig) -> Result<Self, PipelineError> {
        config.validate()?;
        let source = create_source(&config.source)?;
        let reducer = GeometryReducer::new(&config.reducer);
        let validator = Validator::new(config.reducer.collection.clone())
            .with_max_topology_bytes(config.validation.max_topology_bytes);

        Ok(Self {
            config,
            plates: PlateName::ALL.to_vec(),
            source,
            reducer,
            catalog: PlateCatalog::curated(),
            validator,
        })
    }

    /// Replace the curated catalog.
    #[must_use]
    pub fn with_catalog(mut self, catalog: PlateCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Fix the upper bound for earthquake years instead of using the clock.
    #[must_use]
    pub fn with_current_year(mut self, year: i32) -> Self {
        self.validator = self.validator.with_current_year(year);
        self
    }

    /// Execute every stage in order.
    ///
    /// # Errors
    ///
    /// Returns the [`PipelineError`] of the first failing stage. The scratch
    /// directory has been removed and the output directory is unchanged.
    pub async fn run(&self) -> Result<PipelineReport, PipelineError> {
        let paths = &self.config.paths;
        let scratch = ScratchDir::new(&paths.scratch_dir);

        info!(
            source = self.source.name(),
            scratch = %scratch.path().display(),
            output = %paths.output_dir.display(),
            plates = self.plates.len(),
            "pipeline starting"
        );

        // --- Stage 1: acquisition ---
        let shapefile = self.source.fetch(&paths.checkout_dir()).await?;
        info!(shapefile = %shapefile.display(), "shapefile acquired");

        // --- Stage 2: reduction ---
        let staging = paths.staging_dir();
        ensure_dir(&staging).await?;
        let conversion = self
            .reducer
            .run(
                &shapefile,
                &staging.join(&paths.topology_file),
                &self.plates,
                scratch.path(),
            )
            .await?;
        let staged_topology = conversion.output;

        // --- Stage 3: metadata synthesis ---
        let staged_metadata = staging.join(&paths.metadata_file);
        let records = synthesize(&self.plates, &self.catalog)?;
        write_metadata(&staged_metadata, &records).await?;

        // --- Stage 4: validation ---
        let validation = self
            .validator
            .validate(&staged_topology, &staged_metadata)
            .await?;

        // --- Stage 5: promotion ---
        let topology_path = paths.topology_output();
        let metadata_path = paths.metadata_output();
        promote(&staged_topology, &topology_path).await?;
        promote(&staged_metadata, &metadata_path).await?;

        // --- Stage 6: cleanup ---
        let scratch_path = scratch.path().to_path_buf();
        scratch
            .close()
            .map_err(|source| PipelineError::Cleanup {
                path: scratch_path,
                source,
            })?;

        info!(
            plates = validation.plates,
            arcs = validation.arcs,
            topology = %topology_path.display(),
            metadata = %metadata_path.display(),
            "pipeline complete"
        );

        Ok(PipelineReport {
            plates: validation.plates,
            arcs: validation.arcs,
            topology_path,
            topology_bytes: validation.topology_bytes,
            metadata_path,
            metadata_bytes: validation.metadata_bytes,
        })
    }
}
