//! Metadata synthesis for `plates.json`.
//!
//! Metadata is built from the fixed plate list and the curated
//! [`PlateCatalog`], never from the converted topology, so the two artifacts
//! can only agree through validation. Output order follows the plate list
//! and the JSON is pretty-printed with a trailing newline, which makes
//! repeated runs byte-identical.

use std::io;
use std::path::{Path, PathBuf};

use tectonic_types::{PlateMeta, PlateName};
use tracing::info;

use crate::catalog::PlateCatalog;

/// Errors that can occur while synthesizing or writing metadata.
#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    /// The catalog has no two-letter code for a plate.
    #[error("no id for plate {0}")]
    MissingId(PlateName),

    /// The catalog has no motion entry for a plate.
    #[error("no motion for plate {0}")]
    MissingMotion(PlateName),

    /// The records could not be serialized.
    #[error("failed to serialize metadata: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The metadata file could not be written.
    #[error("failed to write {}: {source}", .path.display())]
    Write {
        /// Destination path.
        path: PathBuf,
        /// The underlying I/O error.
        source: io::Error,
    },
}

/// Build one [`PlateMeta`] per plate, in the order given.
///
/// A plate with no collision entry gets an empty collision list; validation
/// rejects that later.
///
/// # Errors
///
/// Returns [`MetadataError::MissingId`] or [`MetadataError::MissingMotion`]
/// when the catalog lacks the entry for a plate.
pub fn synthesize(
    plates: &[PlateName],
    catalog: &PlateCatalog,
) -> Result<Vec<PlateMeta>, MetadataError> {
    plates
        .iter()
        .map(|&plate| {
            let name = plate.as_str();
            let id = catalog
                .ids
                .get(name)
                .ok_or(MetadataError::MissingId(plate))?;
            let motion = catalog
                .motions
                .get(id)
                .ok_or(MetadataError::MissingMotion(plate))?;
            let collisions = catalog.collisions.get(id).cloned().unwrap_or_default();

            Ok(PlateMeta {
                id: id.clone(),
                name: name.to_owned(),
                motion: motion.clone(),
                collisions,
            })
        })
        .collect()
}

/// Render records as pretty-printed JSON with a trailing newline.
///
/// # Errors
///
/// Returns [`MetadataError::Serialize`] if serialization fails.
pub fn render(records: &[PlateMeta]) -> Result<String, MetadataError> {
    let mut json = serde_json::to_string_pretty(records)?;
    json.push('\n');
    Ok(json)
}

/// Write records to `path`, replacing any existing file.
///
/// # Errors
///
/// Returns [`MetadataError`] if serialization or the write fails.
pub async fn write_metadata(path: &Path, records: &[PlateMeta]) -> Result<u64, MetadataError> {
    let json = render(records)?;
    tokio::fs::write(path, json.as_bytes())
        .await
        .map_err(|source| MetadataError::Write {
            path: path.to_path_buf(),
            source,
        })?;

    let bytes = u64::try_from(json.len()).unwrap_or(u64::MAX);
    info!(path = %path.display(), plates = records.len(), bytes, "metadata written");
    Ok(bytes)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn one_record_per_plate_in_list_order() {
        let records = synthesize(&PlateName::ALL, &PlateCatalog::curated()).unwrap();
        let names: Vec<&str> = records.iter().map(|r| r.name.as_str()).collect();
        let expected: Vec<&str> = PlateName::ALL.iter().map(|p| p.as_str()).collect();
        assert_eq!(names, expected);
    }

    #[test]
    fn order_follows_caller_not_catalog() {
        let plates = [PlateName::Antarctica, PlateName::Pacific];
        let records = synthesize(&plates, &PlateCatalog::curated()).unwrap();
        assert_eq!(records[0].id, "AN");
        assert_eq!(records[1].id, "PA");
    }

    #[test]
    fn missing_id_is_an_error() {
        let mut catalog = PlateCatalog::curated();
        catalog.ids.remove("Eurasia");
        let err = synthesize(&PlateName::ALL, &catalog).unwrap_err();
        assert!(matches!(err, MetadataError::MissingId(PlateName::Eurasia)));
    }

    #[test]
    fn missing_motion_is_an_error() {
        let mut catalog = PlateCatalog::curated();
        catalog.motions.remove("AF");
        let err = synthesize(&PlateName::ALL, &catalog).unwrap_err();
        assert!(matches!(err, MetadataError::MissingMotion(PlateName::Africa)));
    }

    #[test]
    fn motion_is_looked_up_by_code_not_name() {
        let mut catalog = PlateCatalog::curated();
        catalog.ids.insert("Africa".to_owned(), "XX".to_owned());
        let err = synthesize(&PlateName::ALL, &catalog).unwrap_err();
        assert!(matches!(err, MetadataError::MissingMotion(PlateName::Africa)));

        let motion = catalog.motions.remove("AF").unwrap();
        catalog.motions.insert("XX".to_owned(), motion);
        let records = synthesize(&PlateName::ALL, &catalog).unwrap();
        let africa = records.iter().find(|r| r.name == "Africa").unwrap();
        assert_eq!(africa.id, "XX");
        assert!(africa.collisions.is_empty());
    }

    #[test]
    fn missing_collisions_yield_empty_list() {
        let mut catalog = PlateCatalog::curated();
        catalog.collisions.remove("AN");
        let records = synthesize(&PlateName::ALL, &catalog).unwrap();
        let antarctica = records.iter().find(|r| r.name == "Antarctica").unwrap();
        assert!(antarctica.collisions.is_empty());
    }

    #[test]
    fn render_is_pretty_with_trailing_newline() {
        let records = synthesize(&[PlateName::SouthAmerica], &PlateCatalog::curated()).unwrap();
        let json = render(&records).unwrap();
        assert!(json.starts_with("[\n  {\n"));
        assert!(json.ends_with("]\n"));
        assert!(json.contains("\"Mw\": 9.5"));
    }

    #[tokio::test]
    async fn repeated_writes_are_byte_identical() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plates.json");
        let records = synthesize(&PlateName::ALL, &PlateCatalog::curated()).unwrap();

        write_metadata(&path, &records).await.unwrap();
        let first = std::fs::read(&path).unwrap();
        write_metadata(&path, &records).await.unwrap();
        let second = std::fs::read(&path).unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn write_into_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent").join("plates.json");
        let err = write_metadata(&path, &[]).await.unwrap_err();
        assert!(matches!(err, MetadataError::Write { .. }));
    }
}
