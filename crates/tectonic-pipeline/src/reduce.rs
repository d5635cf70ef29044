//! Geometry reduction through `mapshaper`.
//!
//! The reducer turns the full plate-boundary shapefile into a simplified
//! `TopoJSON` topology of the target plates. The work is done by an external
//! tool invoked with an explicit argument list (never a shell string) so the
//! call is inspectable and immune to quoting problems:
//!
//! ```text
//! <input.shp> -filter <expr> -dissolve PlateName -simplify 5% keep-shapes
//!     -each id=PlateName -rename-layers <collection>
//!     -o format=topojson id-field=id <output.json>
//! ```
//!
//! The reducer only surfaces tool failures. Whether the output holds the
//! right number of plates is the validator's concern.

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tectonic_types::{PLATE_NAME_FIELD, PlateName};
use tokio::process::Command;
use tracing::{debug, info};

use crate::config::ReducerConfig;

/// Errors that can occur while running the geometry tool.
#[derive(Debug, thiserror::Error)]
pub enum ConversionError {
    /// The tool could not be started (not installed, not executable).
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        /// Program name.
        program: String,
        /// The underlying I/O error.
        source: io::Error,
    },

    /// The tool ran and exited unsuccessfully.
    #[error("{program} failed ({status}): {stderr}")]
    ToolFailed {
        /// Program name.
        program: String,
        /// Exit status description.
        status: String,
        /// Captured standard error.
        stderr: String,
    },

    /// The tool exited successfully but wrote no output file.
    #[error("{program} produced no output at {}", .path.display())]
    MissingOutput {
        /// Program name.
        program: String,
        /// Expected output path.
        path: PathBuf,
    },

    /// An input or output path could not be resolved.
    #[error("cannot resolve path {}: {source}", .path.display())]
    Path {
        /// The offending path.
        path: PathBuf,
        /// The underlying I/O error.
        source: io::Error,
    },
}

/// Outcome of a successful reduction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionReport {
    /// Absolute path of the written topology.
    pub output: PathBuf,
    /// Size of the written topology in bytes.
    pub output_bytes: u64,
}

/// Runs the filter / dissolve / simplify / serialize chain.
#[derive(Debug, Clone)]
pub struct GeometryReducer {
    program: String,
    leading_args: Vec<String>,
    retention_percent: f64,
    collection: String,
}

impl GeometryReducer {
    /// Create a reducer from configuration.
    pub fn new(config: &ReducerConfig) -> Self {
        Self {
            program: config.program.clone(),
            leading_args: config.leading_args.clone(),
            retention_percent: config.retention_percent,
            collection: config.collection.clone(),
        }
    }

    /// Filter expression keeping only features named in `plates`.
    pub fn filter_expression(plates: &[PlateName]) -> String {
        plates
            .iter()
            .map(|plate| format!("{PLATE_NAME_FIELD} == \"{}\"", plate.as_str()))
            .collect::<Vec<_>>()
            .join(" || ")
    }

    /// Mapshaper command list for one reduction, without the leading
    /// program arguments.
    ///
    /// Paths are passed through as OS strings, unchanged.
    pub fn tool_args(&self, input: &Path, output: &Path, plates: &[PlateName]) -> Vec<OsString> {
        vec![
            input.as_os_str().to_owned(),
            "-filter".into(),
            Self::filter_expression(plates).into(),
            "-dissolve".into(),
            PLATE_NAME_FIELD.into(),
            "-simplify".into(),
            format!("{}%", self.retention_percent).into(),
            "keep-shapes".into(),
            "-each".into(),
            format!("id={PLATE_NAME_FIELD}").into(),
            "-rename-layers".into(),
            self.collection.as_str().into(),
            "-o".into(),
            "format=topojson".into(),
            "id-field=id".into(),
            output.as_os_str().to_owned(),
        ]
    }

    /// Run the tool, writing the topology to `output`.
    ///
    /// `input` and `output` are resolved to absolute paths before the tool
    /// is started in `working_dir`. Standard output and error are captured;
    /// standard error is reported on failure.
    ///
    /// # Errors
    ///
    /// Returns [`ConversionError`] if the tool cannot be spawned, exits
    /// unsuccessfully, or leaves no file at `output`.
    pub async fn run(
        &self,
        input: &Path,
        output: &Path,
        plates: &[PlateName],
        working_dir: &Path,
    ) -> Result<ConversionReport, ConversionError> {
        let input = absolute(input)?;
        let output = absolute(output)?;
        let args = self.tool_args(&input, &output, plates);

        info!(
            program = self.program,
            plates = plates.len(),
            retention_percent = self.retention_percent,
            collection = self.collection,
            "running geometry reducer"
        );
        debug!(?args, working_dir = %working_dir.display(), "reducer command");

        let result = Command::new(&self.program)
            .args(&self.leading_args)
            .args(&args)
            .current_dir(working_dir)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| ConversionError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let stderr = String::from_utf8_lossy(&result.stderr).trim().to_owned();
        if !result.status.success() {
            return Err(ConversionError::ToolFailed {
                program: self.program.clone(),
                status: result.status.to_string(),
                stderr,
            });
        }
        for line in stderr.lines() {
            debug!(tool = self.program, "{line}");
        }

        let metadata = tokio::fs::metadata(&output).await.map_err(|e| {
            debug!(error = %e, "reducer output not found");
            ConversionError::MissingOutput {
                program: self.program.clone(),
                path: output.clone(),
            }
        })?;

        info!(
            output = %output.display(),
            bytes = metadata.len(),
            "topology written"
        );
        Ok(ConversionReport {
            output,
            output_bytes: metadata.len(),
        })
    }
}

/// Resolve `path` against the current directory without touching the
/// filesystem.
fn absolute(path: &Path) -> Result<PathBuf, ConversionError> {
    std::path::absolute(path).map_err(|source| ConversionError::Path {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::panic,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects
)]
mod tests {
    use super::*;

    fn reducer(program: &str, leading_args: &[&str]) -> GeometryReducer {
        GeometryReducer::new(&ReducerConfig {
            program: program.to_owned(),
            leading_args: leading_args.iter().map(|s| (*s).to_owned()).collect(),
            ..ReducerConfig::default()
        })
    }

    #[test]
    fn filter_expression_lists_every_plate() {
        let expr = GeometryReducer::filter_expression(&[PlateName::Pacific, PlateName::IndoAustralia]);
        assert_eq!(
            expr,
            "PlateName == \"Pacific\" || PlateName == \"Indo-Australia\""
        );
    }

    #[test]
    fn tool_args_follow_mapshaper_command_order() {
        let r = GeometryReducer::new(&ReducerConfig::default());
        let args = r.tool_args(
            Path::new("/s/PB2002_plates.shp"),
            Path::new("/o/platesTopo.json"),
            &PlateName::ALL,
        );

        let expected_tail = [
            "-dissolve",
            "PlateName",
            "-simplify",
            "5%",
            "keep-shapes",
            "-each",
            "id=PlateName",
            "-rename-layers",
            "PB2002_plates",
            "-o",
            "format=topojson",
            "id-field=id",
            "/o/platesTopo.json",
        ];
        assert_eq!(args[0], "/s/PB2002_plates.shp");
        assert_eq!(args[1], "-filter");
        assert!(args[2].to_str().unwrap().contains("PlateName == \"Antarctica\""));
        assert_eq!(&args[3..], expected_tail.map(OsString::from));
    }

    #[test]
    fn fractional_retention_still_keeps_shapes() {
        let r = GeometryReducer::new(&ReducerConfig {
            retention_percent: 2.5,
            ..ReducerConfig::default()
        });
        let args = r.tool_args(Path::new("in.shp"), Path::new("out.json"), &PlateName::ALL);
        let simplify = args.iter().position(|a| a == "-simplify").unwrap();
        assert_eq!(args[simplify + 1], "2.5%");
        assert_eq!(args[simplify + 2], "keep-shapes");
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_paths_are_passed_verbatim() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let input = Path::new(OsStr::from_bytes(b"/data/pl\xe4tes.shp"));
        let output = Path::new(OsStr::from_bytes(b"/out/\xffTopo.json"));
        let r = GeometryReducer::new(&ReducerConfig::default());
        let args = r.tool_args(input, output, &PlateName::ALL);

        assert_eq!(args.first().unwrap().as_bytes(), b"/data/pl\xe4tes.shp");
        assert_eq!(args.last().unwrap().as_bytes(), b"/out/\xffTopo.json");
    }

    #[tokio::test]
    async fn missing_program_is_a_spawn_error() {
        let dir = tempfile::tempdir().unwrap();
        let r = reducer("tectonic-no-such-mapshaper", &[]);
        let err = r
            .run(
                &dir.path().join("in.shp"),
                &dir.path().join("out.json"),
                &PlateName::ALL,
                dir.path(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ConversionError::Spawn { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failing_tool_reports_status_and_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let r = reducer("sh", &["-c", "echo 'Error: invalid layer' >&2; exit 3", "mapshaper"]);
        let err = r
            .run(
                &dir.path().join("in.shp"),
                &dir.path().join("out.json"),
                &PlateName::ALL,
                dir.path(),
            )
            .await
            .unwrap_err();
        match err {
            ConversionError::ToolFailed { stderr, status, .. } => {
                assert_eq!(stderr, "Error: invalid layer");
                assert!(status.contains('3'));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn silent_success_without_output_is_detected() {
        let dir = tempfile::tempdir().unwrap();
        let r = reducer("true", &[]);
        let err = r
            .run(
                &dir.path().join("in.shp"),
                &dir.path().join("out.json"),
                &PlateName::ALL,
                dir.path(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ConversionError::MissingOutput { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn tool_receives_output_path_as_last_argument() {
        let dir = tempfile::tempdir().unwrap();
        // Writes a marker to the last argument, as mapshaper writes to -o.
        let r = reducer(
            "sh",
            &["-c", "for last; do :; done; printf '{}' > \"$last\"", "mapshaper"],
        );
        let out = dir.path().join("out.json");
        let report = r
            .run(&dir.path().join("in.shp"), &out, &PlateName::ALL, dir.path())
            .await
            .unwrap();
        assert_eq!(report.output, out);
        assert_eq!(report.output_bytes, 2);
    }
}
