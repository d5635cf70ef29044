//! Configuration for the data pipeline.
//!
//! Every value has a compiled-in default; a run with no configuration file
//! reproduces the canonical build. An optional `tectonic-config.yaml` in the
//! working directory can override any field. Curated plate data is not
//! configuration and lives in [`crate::catalog`].

use std::path::{Component, Path, PathBuf};

use serde::Deserialize;
use tracing::info;

/// File name looked up in the working directory by [`PipelineConfig::load`].
pub const DEFAULT_CONFIG_FILE: &str = "tectonic-config.yaml";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A value parsed but is out of its allowed range.
    #[error("invalid config: {0}")]
    Invalid(String),
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level pipeline configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PipelineConfig {
    /// Where the shapefile comes from.
    #[serde(default)]
    pub source: SourceConfig,

    /// Scratch and output locations.
    #[serde(default)]
    pub paths: PathsConfig,

    /// Geometry tool invocation and simplification settings.
    #[serde(default)]
    pub reducer: ReducerConfig,

    /// Validation thresholds.
    #[serde(default)]
    pub validation: ValidationConfig,
}

impl PipelineConfig {
    /// Load `path` if it exists, otherwise fall back to the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file exists but cannot be read,
    /// parsed, or fails validation.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            let config = Self::from_file(path)?;
            info!(path = %path.display(), "configuration file loaded");
            Ok(config)
        } else {
            info!("config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load configuration from a YAML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let retention = self.reducer.retention_percent;
        if !(retention > 0.0 && retention <= 100.0) {
            return Err(ConfigError::Invalid(format!(
                "reducer.retention_percent must be in (0, 100], got {retention}"
            )));
        }
        if self.reducer.program.trim().is_empty() {
            return Err(ConfigError::Invalid("reducer.program is empty".to_owned()));
        }
        if self.reducer.collection.trim().is_empty() {
            return Err(ConfigError::Invalid("reducer.collection is empty".to_owned()));
        }
        if self.source.layer.trim().is_empty() {
            return Err(ConfigError::Invalid("source.layer is empty".to_owned()));
        }
        if self.source.kind == SourceKind::Local && self.source.local_dir.is_none() {
            return Err(ConfigError::Invalid(
                "source.kind is local but source.local_dir is not set".to_owned(),
            ));
        }
        if !self.source.extensions.iter().any(|ext| ext == "shp") {
            return Err(ConfigError::Invalid(
                "source.extensions must include shp".to_owned(),
            ));
        }
        self.paths.validate()?;
        if self.paths.topology_file == self.paths.metadata_file {
            return Err(ConfigError::Invalid(
                "paths.topology_file and paths.metadata_file must differ".to_owned(),
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Source
// ---------------------------------------------------------------------------

/// How the shapefile is acquired.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Download each component file over HTTP.
    #[default]
    Http,
    /// Shallow `git clone` of the repository.
    Git,
    /// Copy from a directory on disk.
    Local,
}

/// Shapefile source settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SourceConfig {
    /// Acquisition backend.
    #[serde(default)]
    pub kind: SourceKind,

    /// Repository cloned by the `git` backend.
    #[serde(default = "default_repository_url")]
    pub repository_url: String,

    /// Base URL the `http` backend appends component file names to.
    #[serde(default = "default_raw_base_url")]
    pub raw_base_url: String,

    /// Directory the `local` backend copies from.
    #[serde(default)]
    pub local_dir: Option<PathBuf>,

    /// Shapefile layer name (file stem of every component).
    #[serde(default = "default_layer")]
    pub layer: String,

    /// Component file extensions to fetch. Must include `shp`.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: SourceKind::default(),
            repository_url: default_repository_url(),
            raw_base_url: default_raw_base_url(),
            local_dir: None,
            layer: default_layer(),
            extensions: default_extensions(),
        }
    }
}

impl SourceConfig {
    /// File names of every shapefile component, e.g. `PB2002_plates.dbf`.
    pub fn component_files(&self) -> Vec<String> {
        self.extensions
            .iter()
            .map(|ext| format!("{}.{ext}", self.layer))
            .collect()
    }

    /// File name of the geometry component, e.g. `PB2002_plates.shp`.
    pub fn shapefile_name(&self) -> String {
        format!("{}.shp", self.layer)
    }
}

// ---------------------------------------------------------------------------
// Paths
// ---------------------------------------------------------------------------

/// Scratch and output locations, relative to the working directory unless
/// absolute.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PathsConfig {
    /// Scratch directory, removed at the end of every run.
    #[serde(default = "default_scratch_dir")]
    pub scratch_dir: PathBuf,

    /// Directory the validated artifacts are promoted into.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// File name of the topology artifact.
    #[serde(default = "default_topology_file")]
    pub topology_file: String,

    /// File name of the metadata artifact.
    #[serde(default = "default_metadata_file")]
    pub metadata_file: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            scratch_dir: default_scratch_dir(),
            output_dir: default_output_dir(),
            topology_file: default_topology_file(),
            metadata_file: default_metadata_file(),
        }
    }
}

impl PathsConfig {
    /// Directory the source is materialized into.
    pub fn checkout_dir(&self) -> PathBuf {
        self.scratch_dir.join("tectonicplates")
    }

    /// Directory artifacts are written to before validation.
    pub fn staging_dir(&self) -> PathBuf {
        self.scratch_dir.join("staging")
    }

    /// Final path of the topology artifact.
    pub fn topology_output(&self) -> PathBuf {
        self.output_dir.join(&self.topology_file)
    }

    /// Final path of the metadata artifact.
    pub fn metadata_output(&self) -> PathBuf {
        self.output_dir.join(&self.metadata_file)
    }

    /// Reject layouts where removing the scratch directory would remove the
    /// published artifacts or the working directory.
    fn validate(&self) -> Result<(), ConfigError> {
        let covers_cwd = || {
            ConfigError::Invalid(format!(
                "paths.scratch_dir {:?} would remove the working directory",
                self.scratch_dir
            ))
        };
        if !self
            .scratch_dir
            .components()
            .any(|c| matches!(c, Component::Normal(_)))
        {
            return Err(covers_cwd());
        }

        let scratch = resolve(&self.scratch_dir)?;
        let output = resolve(&self.output_dir)?;
        if resolve(Path::new("."))?.starts_with(&scratch) {
            return Err(covers_cwd());
        }
        if output.starts_with(&scratch) {
            return Err(ConfigError::Invalid(format!(
                "paths.output_dir {} lies inside paths.scratch_dir {}",
                self.output_dir.display(),
                self.scratch_dir.display()
            )));
        }
        Ok(())
    }
}

/// Absolute, lexically normalized form of `path`. `.` is dropped and `..`
/// pops the previous component; the filesystem is not consulted.
fn resolve(path: &Path) -> Result<PathBuf, ConfigError> {
    let path = if path.as_os_str().is_empty() { Path::new(".") } else { path };
    let absolute = std::path::absolute(path)?;
    let mut resolved = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                resolved.pop();
            }
            other => resolved.push(other),
        }
    }
    Ok(resolved)
}

// ---------------------------------------------------------------------------
// Reducer
// ---------------------------------------------------------------------------

/// Geometry tool settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ReducerConfig {
    /// Program to spawn.
    #[serde(default = "default_program")]
    pub program: String,

    /// Arguments placed before the mapshaper command list.
    #[serde(default = "default_leading_args")]
    pub leading_args: Vec<String>,

    /// Percentage of removable vertices to retain.
    #[serde(default = "default_retention_percent")]
    pub retention_percent: f64,

    /// Name of the geometry collection in the output topology.
    #[serde(default = "default_collection")]
    pub collection: String,
}

impl Default for ReducerConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            leading_args: default_leading_args(),
            retention_percent: default_retention_percent(),
            collection: default_collection(),
        }
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validation thresholds.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ValidationConfig {
    /// Topology size above which a warning is logged.
    #[serde(default = "default_max_topology_bytes")]
    pub max_topology_bytes: u64,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            max_topology_bytes: default_max_topology_bytes(),
        }
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

fn default_repository_url() -> String {
    "https://github.com/fraxen/tectonicplates.git".to_owned()
}

fn default_raw_base_url() -> String {
    "https://raw.githubusercontent.com/fraxen/tectonicplates/master".to_owned()
}

fn default_layer() -> String {
    "PB2002_plates".to_owned()
}

fn default_extensions() -> Vec<String> {
    ["shp", "shx", "dbf", "prj"]
        .into_iter()
        .map(ToOwned::to_owned)
        .collect()
}

fn default_scratch_dir() -> PathBuf {
    PathBuf::from("temp")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("public/data")
}

fn default_topology_file() -> String {
    "platesTopo.json".to_owned()
}

fn default_metadata_file() -> String {
    "plates.json".to_owned()
}

fn default_program() -> String {
    "npx".to_owned()
}

fn default_leading_args() -> Vec<String> {
    vec!["--yes".to_owned(), "mapshaper".to_owned()]
}

const fn default_retention_percent() -> f64 {
    5.0
}

fn default_collection() -> String {
    "PB2002_plates".to_owned()
}

const fn default_max_topology_bytes() -> u64 {
    200 * 1024
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn empty_yaml_yields_defaults() {
        let config = PipelineConfig::parse("{}").unwrap();
        assert_eq!(config, PipelineConfig::default());
        assert_eq!(config.reducer.retention_percent, 5.0);
        assert_eq!(config.paths.topology_output(), PathBuf::from("public/data/platesTopo.json"));
        assert_eq!(config.paths.metadata_output(), PathBuf::from("public/data/plates.json"));
    }

    #[test]
    fn component_files_follow_layer_name() {
        let source = SourceConfig::default();
        assert_eq!(
            source.component_files(),
            vec![
                "PB2002_plates.shp",
                "PB2002_plates.shx",
                "PB2002_plates.dbf",
                "PB2002_plates.prj"
            ]
        );
        assert_eq!(source.shapefile_name(), "PB2002_plates.shp");
    }

    #[test]
    fn partial_yaml_overrides_only_named_fields() {
        let yaml = r"
reducer:
  retention_percent: 10
  program: mapshaper
  leading_args: []
paths:
  output_dir: dist/data
";
        let config = PipelineConfig::parse(yaml).unwrap();
        assert_eq!(config.reducer.retention_percent, 10.0);
        assert_eq!(config.reducer.program, "mapshaper");
        assert!(config.reducer.leading_args.is_empty());
        assert_eq!(config.paths.output_dir, PathBuf::from("dist/data"));
        assert_eq!(config.paths.scratch_dir, PathBuf::from("temp"));
        assert_eq!(config.source, SourceConfig::default());
    }

    #[test]
    fn source_kind_parses_lowercase() {
        let config = PipelineConfig::parse("source:\n  kind: git\n").unwrap();
        assert_eq!(config.source.kind, SourceKind::Git);
    }

    #[test]
    fn out_of_range_retention_is_rejected() {
        for bad in ["0", "-5", "150"] {
            let yaml = format!("reducer:\n  retention_percent: {bad}\n");
            assert!(matches!(
                PipelineConfig::parse(&yaml),
                Err(ConfigError::Invalid(_))
            ));
        }
    }

    #[test]
    fn local_source_requires_directory() {
        let err = PipelineConfig::parse("source:\n  kind: local\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let ok = PipelineConfig::parse("source:\n  kind: local\n  local_dir: /data/plates\n");
        assert!(ok.is_ok());
    }

    #[test]
    fn output_inside_scratch_is_rejected() {
        let yaml = "paths:\n  scratch_dir: build\n  output_dir: build/public/data\n";
        let err = PipelineConfig::parse(yaml).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(ref msg) if msg.contains("output_dir")));

        let yaml = "paths:\n  scratch_dir: build\n  output_dir: build\n";
        assert!(matches!(PipelineConfig::parse(yaml), Err(ConfigError::Invalid(_))));

        let yaml = "paths:\n  scratch_dir: ./build/\n  output_dir: other/../build/data\n";
        assert!(matches!(PipelineConfig::parse(yaml), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn scratch_covering_working_directory_is_rejected() {
        for bad in ["''", ".", "./", "..", "temp/..", "/"] {
            let yaml = format!("paths:\n  scratch_dir: {bad}\n");
            assert!(
                matches!(PipelineConfig::parse(&yaml), Err(ConfigError::Invalid(_))),
                "scratch_dir {bad} accepted"
            );
        }
    }

    #[test]
    fn sibling_scratch_and_output_are_accepted() {
        let yaml = "paths:\n  scratch_dir: build/tmp\n  output_dir: build/data\n";
        assert!(PipelineConfig::parse(yaml).is_ok());

        let yaml = "paths:\n  scratch_dir: public/data/tmp\n  output_dir: public/data\n";
        assert!(PipelineConfig::parse(yaml).is_ok());
    }

    #[test]
    fn extensions_must_include_shapefile() {
        let yaml = "source:\n  extensions: [shx, dbf, prj]\n";
        assert!(matches!(PipelineConfig::parse(yaml), Err(ConfigError::Invalid(_))));

        let yaml = "source:\n  extensions: [dbf, shp]\n";
        assert!(PipelineConfig::parse(yaml).is_ok());
    }

    #[test]
    fn malformed_yaml_is_a_yaml_error() {
        let err = PipelineConfig::parse("reducer: [unclosed").unwrap_err();
        assert!(matches!(err, ConfigError::Yaml { .. }));
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig::load(&dir.path().join(DEFAULT_CONFIG_FILE)).unwrap();
        assert_eq!(config, PipelineConfig::default());
    }

    #[test]
    fn existing_file_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_FILE);
        std::fs::write(&path, "reducer:\n  collection: plates\n").unwrap();
        let config = PipelineConfig::load(&path).unwrap();
        assert_eq!(config.reducer.collection, "plates");
    }
}
