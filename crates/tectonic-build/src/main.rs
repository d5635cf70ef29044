//! Build binary for the tectonic plates globe data.
//!
//! Regenerates `public/data/platesTopo.json` and `public/data/plates.json`.
//! Takes no arguments; settings come from `tectonic-config.yaml` in the
//! working directory when present, compiled-in defaults otherwise.
//!
//! # Sequence
//!
//! 1. Initialize structured logging (tracing, filtered by `RUST_LOG`)
//! 2. Load configuration
//! 3. Run the pipeline
//! 4. Exit 0 on success, 1 after cleanup on any failure

use std::path::Path;
use std::process::ExitCode;

use anyhow::Context;
use tectonic_pipeline::{DEFAULT_CONFIG_FILE, Pipeline, PipelineConfig, PipelineReport};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("tectonic-build starting");

    match run().await {
        Ok(report) => {
            info!(
                plates = report.plates,
                topology_bytes = report.topology_bytes,
                metadata_bytes = report.metadata_bytes,
                "plate data built"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("build failed: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> anyhow::Result<PipelineReport> {
    let config = PipelineConfig::load(Path::new(DEFAULT_CONFIG_FILE))
        .with_context(|| format!("loading {DEFAULT_CONFIG_FILE}"))?;
    info!(
        source = ?config.source.kind,
        output_dir = %config.paths.output_dir.display(),
        retention_percent = config.reducer.retention_percent,
        "Configuration loaded"
    );

    let pipeline = Pipeline::new(config).context("configuring pipeline")?;
    pipeline.run().await.context("pipeline run failed")
}
