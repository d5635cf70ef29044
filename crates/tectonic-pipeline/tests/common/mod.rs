//! Shared fixtures for the pipeline integration tests.

#![allow(dead_code, clippy::unwrap_used)]

use std::path::{Path, PathBuf};

use serde_json::{Value, json};
use tectonic_pipeline::PipelineConfig;
use tectonic_pipeline::config::{PathsConfig, ReducerConfig, SourceConfig, SourceKind};
use tectonic_types::PlateName;

/// Collection name the reducer is configured to produce.
pub const COLLECTION: &str = "PB2002_plates";

/// Year used as the earthquake upper bound in tests.
pub const CURRENT_YEAR: i32 = 2026;

/// Names of all seven plates in declaration order.
pub fn all_names() -> Vec<&'static str> {
    PlateName::ALL.iter().map(|p| p.as_str()).collect()
}

/// A quantized topology with one triangle per name, shaped like mapshaper
/// output. Geometry `i` uses arc `i`.
pub fn topology(names: &[&str]) -> Value {
    let arcs: Vec<Value> = names
        .iter()
        .map(|_| json!([[100, 100], [50, 0], [-50, 50], [0, -150]]))
        .collect();
    let geometries: Vec<Value> = names
        .iter()
        .enumerate()
        .map(|(i, name)| {
            json!({
                "type": "Polygon",
                "arcs": [[i]],
                "id": name,
                "properties": { "PlateName": name }
            })
        })
        .collect();
    json!({
        "type": "Topology",
        "arcs": arcs,
        "transform": { "scale": [0.036, 0.018], "translate": [-180, -90] },
        "objects": {
            COLLECTION: { "type": "GeometryCollection", "geometries": geometries }
        }
    })
}

/// Write `value` as JSON to `path`.
pub fn write_json(path: &Path, value: &Value) {
    std::fs::write(path, serde_json::to_vec_pretty(value).unwrap()).unwrap();
}

/// Populate `dir` with placeholder shapefile components.
pub fn shapefile_dir(dir: &Path) -> PathBuf {
    std::fs::create_dir_all(dir).unwrap();
    for file in SourceConfig::default().component_files() {
        std::fs::write(dir.join(file), b"component").unwrap();
    }
    dir.to_path_buf()
}

/// Configuration rooted at `root` that copies the shapefile from
/// `upstream` and replaces mapshaper with a shell script copying
/// `fixture_topology` to the output path.
pub fn config(root: &Path, upstream: &Path, fixture_topology: &Path) -> PipelineConfig {
    PipelineConfig {
        source: SourceConfig {
            kind: SourceKind::Local,
            local_dir: Some(upstream.to_path_buf()),
            ..SourceConfig::default()
        },
        paths: PathsConfig {
            scratch_dir: root.join("temp"),
            output_dir: root.join("public/data"),
            ..PathsConfig::default()
        },
        reducer: ReducerConfig {
            program: "sh".to_owned(),
            leading_args: vec![
                "-c".to_owned(),
                // The output path is always the last argument.
                format!(
                    "for last; do :; done; cp '{}' \"$last\"",
                    fixture_topology.display()
                ),
                "mapshaper".to_owned(),
            ],
            ..ReducerConfig::default()
        },
        ..PipelineConfig::default()
    }
}
