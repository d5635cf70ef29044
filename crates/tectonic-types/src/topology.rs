//! `TopoJSON` document model for `platesTopo.json`.
//!
//! Only the parts of the `TopoJSON` format the plates artifact uses are
//! modelled: a topology with shared arcs, an optional quantization
//! transform, and named geometry collections whose geometries reference arcs
//! by index. A negative arc index `i` refers to arc `!i` traversed in
//! reverse.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::plate::PLATE_NAME_FIELD;

/// A position decoded to absolute coordinates (longitude, latitude).
pub type Position = [f64; 2];

/// A closed ring of decoded positions.
pub type Ring = Vec<Position>;

/// Errors raised while decoding geometries out of a topology.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TopologyError {
    /// A geometry references an arc past the end of the arcs table.
    #[error("arc reference {reference} out of range ({arc_count} arcs)")]
    DanglingArc {
        /// The raw (possibly negative) reference.
        reference: i64,
        /// Number of arcs in the topology.
        arc_count: usize,
    },

    /// The geometry type cannot be decoded into polygon rings.
    #[error("unsupported geometry type: {0}")]
    UnsupportedGeometry(String),
}

/// Quantization transform applied to delta-encoded arcs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    /// Scale factors `[sx, sy]`.
    pub scale: [f64; 2],
    /// Translation `[tx, ty]`.
    pub translate: [f64; 2],
}

/// A `TopoJSON` topology document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topology {
    /// Document type, `"Topology"` for a valid document.
    #[serde(rename = "type")]
    pub kind: String,
    /// Shared arcs. Each arc is a sequence of positions; delta-encoded when
    /// [`Topology::transform`] is present.
    #[serde(default)]
    pub arcs: Vec<Vec<Vec<f64>>>,
    /// Quantization transform, if the arcs are quantized.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<Transform>,
    /// Bounding box `[x0, y0, x1, y1]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<Vec<f64>>,
    /// Named top-level objects.
    #[serde(default)]
    pub objects: BTreeMap<String, TopoObject>,
}

/// A named top-level object, normally a `GeometryCollection`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopoObject {
    /// Object type (`GeometryCollection` for the plates layer).
    #[serde(rename = "type")]
    pub kind: String,
    /// Member geometries.
    #[serde(default)]
    pub geometries: Vec<TopoGeometry>,
}

/// One geometry inside a collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopoGeometry {
    /// Geometry type; `null` for empty geometries.
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    /// Arc references, nested according to the geometry type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arcs: Option<ArcRefs>,
    /// Geometry identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    /// Attribute table row.
    #[serde(default)]
    pub properties: Map<String, Value>,
}

/// Arc references at the nesting depth of the owning geometry type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArcRefs {
    /// `LineString`: one list of arcs.
    Line(Vec<i64>),
    /// `Polygon` rings or `MultiLineString` parts.
    Rings(Vec<Vec<i64>>),
    /// `MultiPolygon`: polygons of rings.
    Polygons(Vec<Vec<Vec<i64>>>),
}

/// Resolve a raw arc reference into `(arc index, reversed)`.
///
/// Returns `None` only when the index does not fit in `usize`.
pub fn resolve_arc(reference: i64) -> Option<(usize, bool)> {
    if reference >= 0 {
        usize::try_from(reference).ok().map(|i| (i, false))
    } else {
        usize::try_from(!reference).ok().map(|i| (i, true))
    }
}

impl TopoGeometry {
    /// The `PlateName` attribute, if present and a string.
    pub fn plate_name(&self) -> Option<&str> {
        self.properties.get(PLATE_NAME_FIELD).and_then(Value::as_str)
    }
}

impl Topology {
    /// Look up a named object.
    pub fn collection(&self, name: &str) -> Option<&TopoObject> {
        self.objects.get(name)
    }

    /// Decode one arc to absolute positions.
    ///
    /// Undoes delta encoding and the quantization transform when the
    /// topology is quantized. Positions with fewer than two coordinates are
    /// skipped. Returns `None` if the arc does not exist.
    pub fn decode_arc(&self, index: usize) -> Option<Vec<Position>> {
        let arc = self.arcs.get(index)?;
        let coords = arc
            .iter()
            .filter_map(|p| match (p.first(), p.get(1)) {
                (Some(&x), Some(&y)) => Some([x, y]),
                _ => None,
            });

        let decoded = match &self.transform {
            Some(t) => {
                let (mut x, mut y) = (0.0_f64, 0.0_f64);
                coords
                    .map(|[dx, dy]| {
                        x += dx;
                        y += dy;
                        [x.mul_add(t.scale[0], t.translate[0]), y.mul_add(t.scale[1], t.translate[1])]
                    })
                    .collect()
            }
            None => coords.collect(),
        };
        Some(decoded)
    }

    /// Assemble one ring from a list of arc references.
    ///
    /// Consecutive arcs share their joint position; it is kept once.
    pub fn ring(&self, references: &[i64]) -> Result<Ring, TopologyError> {
        let mut ring: Ring = Vec::new();
        for &reference in references {
            let dangling = TopologyError::DanglingArc {
                reference,
                arc_count: self.arcs.len(),
            };
            let (index, reversed) = resolve_arc(reference).ok_or_else(|| dangling.clone())?;
            let mut points = self.decode_arc(index).ok_or(dangling)?;
            if reversed {
                points.reverse();
            }
            let skip = usize::from(!ring.is_empty());
            ring.extend(points.into_iter().skip(skip));
        }
        Ok(ring)
    }

    /// Decode a geometry into polygons of rings.
    ///
    /// A `Polygon` yields one polygon; a `MultiPolygon` yields one per part.
    /// A `null` geometry yields no polygons.
    pub fn polygons(&self, geometry: &TopoGeometry) -> Result<Vec<Vec<Ring>>, TopologyError> {
        let rings_of = |rings: &[Vec<i64>]| -> Result<Vec<Ring>, TopologyError> {
            rings.iter().map(|r| self.ring(r)).collect()
        };

        match (geometry.kind.as_deref(), &geometry.arcs) {
            (None, _) => Ok(Vec::new()),
            (Some("Polygon"), Some(ArcRefs::Rings(rings))) => Ok(vec![rings_of(rings.as_slice())?]),
            (Some("MultiPolygon"), Some(ArcRefs::Polygons(polygons))) => {
                polygons.iter().map(|p| rings_of(p.as_slice())).collect()
            }
            // An empty arcs array deserializes as the shallowest variant.
            (Some("Polygon" | "MultiPolygon"), Some(ArcRefs::Line(arcs))) if arcs.is_empty() => {
                Ok(Vec::new())
            }
            (Some(other), _) => Err(TopologyError::UnsupportedGeometry(other.to_owned())),
        }
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::float_cmp,
    clippy::indexing_slicing,
    clippy::panic
)]
mod tests {
    use super::*;

    /// Two squares sharing the edge x = 1, unquantized.
    ///
    /// Arc 0: shared edge (1,0) -> (1,1)
    /// Arc 1: left square remainder (1,1) -> (0,1) -> (0,0) -> (1,0)
    /// Arc 2: right square remainder (1,0) -> (2,0) -> (2,1) -> (1,1)
    fn two_squares() -> Topology {
        serde_json::from_value(serde_json::json!({
            "type": "Topology",
            "arcs": [
                [[1.0, 0.0], [1.0, 1.0]],
                [[1.0, 1.0], [0.0, 1.0], [0.0, 0.0], [1.0, 0.0]],
                [[1.0, 0.0], [2.0, 0.0], [2.0, 1.0], [1.0, 1.0]]
            ],
            "objects": {
                "squares": {
                    "type": "GeometryCollection",
                    "geometries": [
                        { "type": "Polygon", "arcs": [[0, 1]], "id": "left",
                          "properties": { "PlateName": "Pacific" } },
                        { "type": "Polygon", "arcs": [[-1, 2]], "id": "right",
                          "properties": { "PlateName": "Africa" } }
                    ]
                }
            }
        }))
        .unwrap()
    }

    #[test]
    fn resolve_arc_handles_reversed_references() {
        assert_eq!(resolve_arc(0), Some((0, false)));
        assert_eq!(resolve_arc(3), Some((3, false)));
        assert_eq!(resolve_arc(-1), Some((0, true)));
        assert_eq!(resolve_arc(-4), Some((3, true)));
    }

    #[test]
    fn geometries_expose_plate_names() {
        let topo = two_squares();
        let names: Vec<_> = topo
            .collection("squares")
            .unwrap()
            .geometries
            .iter()
            .filter_map(TopoGeometry::plate_name)
            .collect();
        assert_eq!(names, vec!["Pacific", "Africa"]);
    }

    #[test]
    fn shared_arc_is_traversed_in_both_directions() {
        let topo = two_squares();
        let geoms = &topo.collection("squares").unwrap().geometries;

        let left = topo.polygons(&geoms[0]).unwrap();
        assert_eq!(
            left,
            vec![vec![vec![
                [1.0, 0.0],
                [1.0, 1.0],
                [0.0, 1.0],
                [0.0, 0.0],
                [1.0, 0.0]
            ]]]
        );

        let right = topo.polygons(&geoms[1]).unwrap();
        assert_eq!(
            right,
            vec![vec![vec![
                [1.0, 1.0],
                [1.0, 0.0],
                [2.0, 0.0],
                [2.0, 1.0],
                [1.0, 1.0]
            ]]]
        );
    }

    #[test]
    fn quantized_arcs_are_delta_decoded() {
        let topo: Topology = serde_json::from_value(serde_json::json!({
            "type": "Topology",
            "transform": { "scale": [0.5, 2.0], "translate": [-10.0, 5.0] },
            "arcs": [[[2, 1], [2, 0], [0, 3]]],
            "objects": {}
        }))
        .unwrap();

        let arc = topo.decode_arc(0).unwrap();
        assert_eq!(arc, vec![[-9.0, 7.0], [-8.0, 7.0], [-8.0, 13.0]]);
        assert!(topo.decode_arc(1).is_none());
    }

    #[test]
    fn dangling_reference_is_reported() {
        let topo = two_squares();
        let err = topo.ring(&[0, 7]).unwrap_err();
        assert_eq!(
            err,
            TopologyError::DanglingArc {
                reference: 7,
                arc_count: 3
            }
        );
    }

    #[test]
    fn multipolygon_arcs_deserialize_at_polygon_depth() {
        let geom: TopoGeometry = serde_json::from_value(serde_json::json!({
            "type": "MultiPolygon",
            "arcs": [[[0, 1]], [[2]]],
            "properties": { "PlateName": "Eurasia" }
        }))
        .unwrap();
        match geom.arcs {
            Some(ArcRefs::Polygons(polygons)) => {
                assert_eq!(polygons, vec![vec![vec![0, 1]], vec![vec![2]]]);
            }
            other => panic!("unexpected arcs: {other:?}"),
        }
    }

    #[test]
    fn null_geometry_decodes_to_nothing() {
        let topo = two_squares();
        let geom: TopoGeometry =
            serde_json::from_value(serde_json::json!({ "type": null, "properties": {} })).unwrap();
        assert!(topo.polygons(&geom).unwrap().is_empty());
        assert!(geom.plate_name().is_none());
    }

    #[test]
    fn line_geometries_are_not_polygons() {
        let topo = two_squares();
        let geom: TopoGeometry = serde_json::from_value(serde_json::json!({
            "type": "LineString", "arcs": [0]
        }))
        .unwrap();
        assert_eq!(
            topo.polygons(&geom).unwrap_err(),
            TopologyError::UnsupportedGeometry("LineString".to_owned())
        );
    }
}
