//! The seven major plates and the metadata records the globe reads.
//!
//! [`PlateName`] is the closed set of plates the pipeline produces. The
//! record types ([`PlateMeta`], [`Motion`], [`Collision`], [`Earthquake`])
//! mirror the JSON shape of `plates.json` exactly and are exported to
//! `TypeScript` for the front end.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Property key carrying the plate name in the source shapefile and in the
/// topology geometries.
pub const PLATE_NAME_FIELD: &str = "PlateName";

// ---------------------------------------------------------------------------
// PlateName
// ---------------------------------------------------------------------------

/// One of the seven major tectonic plates.
///
/// Variant order is the declaration order used everywhere the pipeline emits
/// plates (metadata records, legend colors).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum PlateName {
    /// Pacific plate.
    Pacific,
    /// North American plate.
    #[serde(rename = "North America")]
    NorthAmerica,
    /// South American plate.
    #[serde(rename = "South America")]
    SouthAmerica,
    /// Eurasian plate.
    Eurasia,
    /// African plate.
    Africa,
    /// Indo-Australian plate.
    #[serde(rename = "Indo-Australia")]
    IndoAustralia,
    /// Antarctic plate.
    Antarctica,
}

impl PlateName {
    /// Number of plates in the fixed set.
    pub const COUNT: usize = 7;

    /// All plates in declaration order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::Pacific,
        Self::NorthAmerica,
        Self::SouthAmerica,
        Self::Eurasia,
        Self::Africa,
        Self::IndoAustralia,
        Self::Antarctica,
    ];

    /// The name as it appears in the shapefile and in `plates.json`.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pacific => "Pacific",
            Self::NorthAmerica => "North America",
            Self::SouthAmerica => "South America",
            Self::Eurasia => "Eurasia",
            Self::Africa => "Africa",
            Self::IndoAustralia => "Indo-Australia",
            Self::Antarctica => "Antarctica",
        }
    }

    /// Zero-based position in [`PlateName::ALL`].
    pub const fn index(self) -> usize {
        match self {
            Self::Pacific => 0,
            Self::NorthAmerica => 1,
            Self::SouthAmerica => 2,
            Self::Eurasia => 3,
            Self::Africa => 4,
            Self::IndoAustralia => 5,
            Self::Antarctica => 6,
        }
    }

    /// Look a plate up by its exact name. Matching is case-sensitive, as
    /// it is in the shapefile attribute table.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|plate| plate.as_str() == name)
    }
}

impl fmt::Display for PlateName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A string did not name one of the seven plates.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown plate name: {0:?}")]
pub struct UnknownPlate(pub String);

impl FromStr for PlateName {
    type Err = UnknownPlate;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| UnknownPlate(s.to_owned()))
    }
}

// ---------------------------------------------------------------------------
// Metadata records
// ---------------------------------------------------------------------------

/// A historical earthquake on a plate boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Earthquake {
    /// Calendar year of the event.
    pub year: i32,
    /// Human-readable location.
    pub place: String,
    /// Moment magnitude.
    #[serde(rename = "Mw")]
    pub mw: f64,
}

/// A boundary relationship with a neighboring plate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Collision {
    /// Name of the neighboring plate. Not restricted to the seven major
    /// plates (e.g. `Nazca`, `Scotia`).
    pub with: String,
    /// Notable earthquakes along this boundary, most significant first.
    pub eqs: Vec<Earthquake>,
}

/// Plate motion relative to a fixed reference frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Motion {
    /// Direction vector `[dx, dy]` in cm/year.
    pub vector: [f64; 2],
    /// Reported rate in cm/year. Curated independently of the vector's
    /// magnitude.
    pub rate: f64,
}

/// One record of `plates.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct PlateMeta {
    /// Two-letter plate code (e.g. `PA`).
    pub id: String,
    /// Plate name, matching a `PlateName` property in the topology.
    pub name: String,
    /// Motion vector and rate.
    pub motion: Motion,
    /// Boundary collisions with historical earthquakes.
    pub collisions: Vec<Collision>,
}
