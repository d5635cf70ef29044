//! Cross-artifact validation.
//!
//! The validator reads the two written artifacts back from disk and checks
//! every invariant the globe relies on. Checks run in a fixed order and stop
//! at the first failure; each failure is its own [`ValidationError`] variant
//! so the build log names exactly which invariant broke.
//!
//! Check order:
//!
//! 1. Both files exist.
//! 2. The topology parses, is a `Topology`, has a non-empty `objects` map
//!    holding the expected collection with exactly one geometry per plate.
//! 3. Every geometry names a known plate, once, and decodes without
//!    dangling arc references.
//! 4. The metadata is an array of exactly one record per plate.
//! 5. Each record has a unique two-letter id, a name, a positive rate, and
//!    well-formed collisions.
//! 6. The metadata name set equals the plate set, and every topology plate
//!    appears in the metadata.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use chrono::{Datelike, Utc};
use serde_json::Value;
use tectonic_types::{PlateMeta, PlateName, Topology, TopologyError};
use tracing::{info, warn};

/// Earthquakes must be strictly after this year.
pub const EARLIEST_YEAR_EXCLUSIVE: i32 = 1700;

/// Smallest magnitude worth listing.
pub const MIN_MAGNITUDE: f64 = 6.5;

/// Largest plausible magnitude.
pub const MAX_MAGNITUDE: f64 = 10.0;

/// Maximum earthquakes per collision.
pub const MAX_EARTHQUAKES: usize = 3;

/// Required length of a plate id.
pub const ID_LENGTH: usize = 2;

/// A violated artifact invariant.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    /// The topology file does not exist.
    #[error("topology file missing: {}", .0.display())]
    TopologyMissing(PathBuf),

    /// The metadata file does not exist.
    #[error("metadata file missing: {}", .0.display())]
    MetadataMissing(PathBuf),

    /// An artifact exists but could not be read.
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        /// The artifact path.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The topology is not valid `TopoJSON`.
    #[error("topology does not parse: {0}")]
    TopologyParse(#[source] serde_json::Error),

    /// The topology `type` is not `Topology`.
    #[error("topology type is {0:?}, expected \"Topology\"")]
    NotATopology(String),

    /// The topology has no objects.
    #[error("topology has no objects")]
    EmptyObjects,

    /// The expected collection is not among the topology objects.
    #[error("topology has no collection {expected:?} (found {found:?})")]
    CollectionMissing {
        /// Expected collection name.
        expected: String,
        /// Collection names present.
        found: Vec<String>,
    },

    /// The collection has the wrong number of geometries.
    #[error("expected {expected} geometries, found {found}")]
    GeometryCount {
        /// Number of target plates.
        expected: usize,
        /// Number of geometries in the collection.
        found: usize,
    },

    /// A geometry has no `PlateName` property.
    #[error("geometry {index} has no PlateName property")]
    MissingPlateName {
        /// Position in the collection.
        index: usize,
    },

    /// A geometry names a plate outside the target set.
    #[error("geometry {index} has unknown PlateName {name:?}")]
    UnknownPlateName {
        /// Position in the collection.
        index: usize,
        /// The offending name.
        name: String,
    },

    /// Two geometries carry the same plate name.
    #[error("duplicate PlateName {0:?} in topology")]
    DuplicatePlateName(String),

    /// A geometry cannot be decoded into rings.
    #[error("geometry for {plate} does not decode: {source}")]
    Geometry {
        /// The plate whose geometry failed.
        plate: String,
        /// The decoding failure.
        source: TopologyError,
    },

    /// The metadata is not valid JSON.
    #[error("metadata does not parse: {0}")]
    MetadataParse(#[source] serde_json::Error),

    /// The metadata root is not an array.
    #[error("metadata is not an array")]
    MetadataNotArray,

    /// A metadata record does not match the record schema.
    #[error("metadata record {index} is malformed: {source}")]
    MetadataRecord {
        /// Position in the array.
        index: usize,
        /// The schema mismatch.
        source: serde_json::Error,
    },

    /// The metadata has the wrong number of records.
    #[error("expected {expected} metadata records, found {found}")]
    MetadataCount {
        /// Number of target plates.
        expected: usize,
        /// Number of records present.
        found: usize,
    },

    /// A record has an empty id.
    #[error("metadata record {index} has an empty id")]
    EmptyId {
        /// Position in the array.
        index: usize,
    },

    /// A record id is not two characters long.
    #[error("plate id {0:?} is not {len} characters", len = ID_LENGTH)]
    BadIdLength(String),

    /// Two records share an id.
    #[error("duplicate plate id {0:?}")]
    DuplicateId(String),

    /// A record has an empty name.
    #[error("metadata record {index} has an empty name")]
    EmptyName {
        /// Position in the array.
        index: usize,
    },

    /// A record has a zero or negative motion rate.
    #[error("plate {plate} has non-positive rate {rate}")]
    NonPositiveRate {
        /// Plate name.
        plate: String,
        /// The offending rate.
        rate: f64,
    },

    /// A record lists no collisions.
    #[error("plate {0} has no collisions")]
    NoCollisions(String),

    /// A collision lists no earthquakes or too many.
    #[error(
        "collision {plate}/{with} lists {count} earthquakes (expected 1..={max})",
        max = MAX_EARTHQUAKES
    )]
    EarthquakeCount {
        /// Plate name.
        plate: String,
        /// Neighbor plate.
        with: String,
        /// Number of earthquakes listed.
        count: usize,
    },

    /// An earthquake year is out of range.
    #[error(
        "earthquake at {place:?} has year {year} outside ({floor}, {current_year}]",
        floor = EARLIEST_YEAR_EXCLUSIVE
    )]
    YearOutOfRange {
        /// Earthquake place.
        place: String,
        /// The offending year.
        year: i32,
        /// Upper bound used.
        current_year: i32,
    },

    /// An earthquake magnitude is out of range.
    #[error(
        "earthquake at {place:?} has magnitude {mw} outside [{min}, {max}]",
        min = MIN_MAGNITUDE,
        max = MAX_MAGNITUDE
    )]
    MagnitudeOutOfRange {
        /// Earthquake place.
        place: String,
        /// The offending magnitude.
        mw: f64,
    },

    /// An earthquake has an empty place.
    #[error("collision {plate}/{with} has an earthquake with an empty place")]
    EmptyPlace {
        /// Plate name.
        plate: String,
        /// Neighbor plate.
        with: String,
    },

    /// The metadata names differ from the target plate set.
    #[error("metadata names {found:?} do not match plates {expected:?}")]
    NameSetMismatch {
        /// Target plate names.
        expected: Vec<String>,
        /// Names present in the metadata.
        found: Vec<String>,
    },

    /// A topology plate has no metadata record.
    #[error("topology plate {0:?} has no metadata record")]
    NameNotInMetadata(String),
}

/// Summary of a successful validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    /// Number of plates in both artifacts.
    pub plates: usize,
    /// Number of arcs in the topology.
    pub arcs: usize,
    /// Size of the topology file in bytes.
    pub topology_bytes: u64,
    /// Size of the metadata file in bytes.
    pub metadata_bytes: u64,
}

/// Checks the topology and metadata artifacts against each other.
#[derive(Debug, Clone)]
pub struct Validator {
    plates: Vec<PlateName>,
    collection: String,
    current_year: i32,
    max_topology_bytes: u64,
}

impl Validator {
    /// Validator for all seven plates in `collection`, bounded by the
    /// current UTC year.
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            plates: PlateName::ALL.to_vec(),
            collection: collection.into(),
            current_year: Utc::now().year(),
            max_topology_bytes: u64::MAX,
        }
    }

    /// Use a fixed upper bound for earthquake years.
    #[must_use]
    pub const fn with_current_year(mut self, year: i32) -> Self {
        self.current_year = year;
        self
    }

    /// Warn when the topology exceeds `bytes`.
    #[must_use]
    pub const fn with_max_topology_bytes(mut self, bytes: u64) -> Self {
        self.max_topology_bytes = bytes;
        self
    }

    /// Read both artifacts from disk and check them.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] encountered.
    pub async fn validate(
        &self,
        topology_path: &Path,
        metadata_path: &Path,
    ) -> Result<ValidationReport, ValidationError> {
        let topology = read_artifact(topology_path, ValidationError::TopologyMissing).await?;
        let metadata = read_artifact(metadata_path, ValidationError::MetadataMissing).await?;

        let report = self.check(&topology, &metadata)?;
        if report.topology_bytes > self.max_topology_bytes {
            warn!(
                bytes = report.topology_bytes,
                limit = self.max_topology_bytes,
                "topology exceeds size budget"
            );
        }
        info!(
            plates = report.plates,
            arcs = report.arcs,
            topology_bytes = report.topology_bytes,
            metadata_bytes = report.metadata_bytes,
            "artifacts validated"
        );
        Ok(report)
    }

    /// Check artifact contents already in memory.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] encountered.
    pub fn check(&self, topology: &[u8], metadata: &[u8]) -> Result<ValidationReport, ValidationError> {
        let (topo_names, arcs) = self.check_topology(topology)?;
        let records = self.check_metadata(metadata)?;
        Self::check_cross(&topo_names, &records)?;

        Ok(ValidationReport {
            plates: records.len(),
            arcs,
            topology_bytes: byte_len(topology),
            metadata_bytes: byte_len(metadata),
        })
    }

    /// Returns the plate names in collection order and the arc count.
    fn check_topology(&self, bytes: &[u8]) -> Result<(Vec<String>, usize), ValidationError> {
        let topology: Topology =
            serde_json::from_slice(bytes).map_err(ValidationError::TopologyParse)?;

        if topology.kind != "Topology" {
            return Err(ValidationError::NotATopology(topology.kind));
        }
        if topology.objects.is_empty() {
            return Err(ValidationError::EmptyObjects);
        }
        let collection = topology.collection(&self.collection).ok_or_else(|| {
            ValidationError::CollectionMissing {
                expected: self.collection.clone(),
                found: topology.objects.keys().cloned().collect(),
            }
        })?;
        if collection.geometries.len() != self.plates.len() {
            return Err(ValidationError::GeometryCount {
                expected: self.plates.len(),
                found: collection.geometries.len(),
            });
        }

        let mut seen = BTreeSet::new();
        let mut names = Vec::with_capacity(collection.geometries.len());
        for (index, geometry) in collection.geometries.iter().enumerate() {
            let name = geometry
                .plate_name()
                .ok_or(ValidationError::MissingPlateName { index })?;
            if !self.is_target(name) {
                return Err(ValidationError::UnknownPlateName {
                    index,
                    name: name.to_owned(),
                });
            }
            if !seen.insert(name) {
                return Err(ValidationError::DuplicatePlateName(name.to_owned()));
            }
            topology
                .polygons(geometry)
                .map_err(|source| ValidationError::Geometry {
                    plate: name.to_owned(),
                    source,
                })?;
            names.push(name.to_owned());
        }

        Ok((names, topology.arcs.len()))
    }

    fn check_metadata(&self, bytes: &[u8]) -> Result<Vec<PlateMeta>, ValidationError> {
        let value: Value = serde_json::from_slice(bytes).map_err(ValidationError::MetadataParse)?;
        let Value::Array(items) = value else {
            return Err(ValidationError::MetadataNotArray);
        };
        if items.len() != self.plates.len() {
            return Err(ValidationError::MetadataCount {
                expected: self.plates.len(),
                found: items.len(),
            });
        }

        let records = items
            .into_iter()
            .enumerate()
            .map(|(index, item)| {
                serde_json::from_value::<PlateMeta>(item)
                    .map_err(|source| ValidationError::MetadataRecord { index, source })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut ids = BTreeSet::new();
        for (index, record) in records.iter().enumerate() {
            if record.id.is_empty() {
                return Err(ValidationError::EmptyId { index });
            }
            if record.id.chars().count() != ID_LENGTH {
                return Err(ValidationError::BadIdLength(record.id.clone()));
            }
            if !ids.insert(record.id.as_str()) {
                return Err(ValidationError::DuplicateId(record.id.clone()));
            }
            if record.name.is_empty() {
                return Err(ValidationError::EmptyName { index });
            }
            if record.motion.rate <= 0.0 {
                return Err(ValidationError::NonPositiveRate {
                    plate: record.name.clone(),
                    rate: record.motion.rate,
                });
            }
            self.check_collisions(record)?;
        }

        let expected: BTreeSet<&str> = self.plates.iter().map(|p| p.as_str()).collect();
        let found: BTreeSet<&str> = records.iter().map(|r| r.name.as_str()).collect();
        if expected != found {
            return Err(ValidationError::NameSetMismatch {
                expected: expected.into_iter().map(str::to_owned).collect(),
                found: found.into_iter().map(str::to_owned).collect(),
            });
        }

        Ok(records)
    }

    fn check_collisions(&self, record: &PlateMeta) -> Result<(), ValidationError> {
        if record.collisions.is_empty() {
            return Err(ValidationError::NoCollisions(record.name.clone()));
        }
        for collision in &record.collisions {
            let count = collision.eqs.len();
            if count == 0 || count > MAX_EARTHQUAKES {
                return Err(ValidationError::EarthquakeCount {
                    plate: record.name.clone(),
                    with: collision.with.clone(),
                    count,
                });
            }
            for eq in &collision.eqs {
                if eq.year <= EARLIEST_YEAR_EXCLUSIVE || eq.year > self.current_year {
                    return Err(ValidationError::YearOutOfRange {
                        place: eq.place.clone(),
                        year: eq.year,
                        current_year: self.current_year,
                    });
                }
                if !(MIN_MAGNITUDE..=MAX_MAGNITUDE).contains(&eq.mw) {
                    return Err(ValidationError::MagnitudeOutOfRange {
                        place: eq.place.clone(),
                        mw: eq.mw,
                    });
                }
                if eq.place.trim().is_empty() {
                    return Err(ValidationError::EmptyPlace {
                        plate: record.name.clone(),
                        with: collision.with.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    fn check_cross(topo_names: &[String], records: &[PlateMeta]) -> Result<(), ValidationError> {
        let meta_names: BTreeSet<&str> = records.iter().map(|r| r.name.as_str()).collect();
        match topo_names.iter().find(|name| !meta_names.contains(name.as_str())) {
            Some(name) => Err(ValidationError::NameNotInMetadata(name.clone())),
            None => Ok(()),
        }
    }

    fn is_target(&self, name: &str) -> bool {
        self.plates.iter().any(|p| p.as_str() == name)
    }
}

/// Read an artifact, mapping a missing file to `missing`.
async fn read_artifact(
    path: &Path,
    missing: fn(PathBuf) -> ValidationError,
) -> Result<Vec<u8>, ValidationError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(bytes),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(missing(path.to_path_buf())),
        Err(source) => Err(ValidationError::Read {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn byte_len(bytes: &[u8]) -> u64 {
    u64::try_from(bytes.len()).unwrap_or(u64::MAX)
}
