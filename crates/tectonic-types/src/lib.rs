//! Shared type definitions for the tectonic plates globe.
//!
//! The build pipeline writes these types to disk and the front end reads
//! them back. Record types flow to `TypeScript` via `ts-rs`.
//!
//! # Modules
//!
//! - [`plate`] -- The seven plates and the `plates.json` record schema
//! - [`topology`] -- `TopoJSON` model for `platesTopo.json`, with arc decoding
//! - [`style`] -- Per-polygon style derived from the pointer interaction state

pub mod plate;
pub mod style;
pub mod topology;

// Re-export all public types at crate root for convenience.
pub use plate::{
    Collision, Earthquake, Motion, PLATE_NAME_FIELD, PlateMeta, PlateName, UnknownPlate,
};
pub use style::{InteractionState, PlateStyle, plate_color, plate_style};
pub use topology::{
    ArcRefs, Position, Ring, TopoGeometry, TopoObject, Topology, TopologyError, Transform,
    resolve_arc,
};

#[cfg(test)]
mod tests {
    //! `TypeScript` binding generation for the front end.

    #[test]
    fn export_bindings() {
        // Files are written to `bindings/` relative to the crate root.
        use ts_rs::TS;

        let _ = crate::plate::PlateName::export_all();
        let _ = crate::plate::Earthquake::export_all();
        let _ = crate::plate::Collision::export_all();
        let _ = crate::plate::Motion::export_all();
        let _ = crate::plate::PlateMeta::export_all();

        let _ = crate::style::InteractionState::export_all();
        let _ = crate::style::PlateStyle::export_all();
    }
}
