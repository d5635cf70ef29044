//! Per-polygon style for the globe widget.
//!
//! The widget asks for a cap color, side color, stroke, and altitude for
//! every plate polygon on every frame. [`plate_style`] answers from the plate
//! and the current [`InteractionState`] alone, so it holds no state of its
//! own.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::plate::PlateName;

/// d3 `schemeCategory10`, indexed by plate declaration order.
pub const SCHEME_CATEGORY10: [&str; 10] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
    "#bcbd22", "#17becf",
];

/// Color used when a plate index falls outside the palette.
pub const FALLBACK_COLOR: &str = "#90caf9";

/// Cap color for plates that are neither selected nor hovered.
pub const TRANSPARENT_CAP: &str = "rgba(0,0,0,0)";

/// Side wall color for every plate.
pub const SIDE_COLOR: &str = "transparent";

/// Outline width for every plate.
pub const STROKE_WIDTH: f64 = 0.6;

/// Altitude a selected plate is lifted to.
pub const SELECTED_ALTITUDE: f64 = 0.01;

/// Pointer interaction state of the globe.
///
/// The UI owns a single value of this type; transitions return a new value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct InteractionState {
    /// Plate last clicked, if any.
    pub selected: Option<PlateName>,
    /// Plate under the pointer, if any.
    pub hovered: Option<PlateName>,
}

impl InteractionState {
    /// Nothing selected, nothing hovered.
    pub const fn new() -> Self {
        Self {
            selected: None,
            hovered: None,
        }
    }

    /// State after a click. Clicking empty space leaves the selection as is.
    #[must_use]
    pub const fn select(self, plate: Option<PlateName>) -> Self {
        match plate {
            Some(p) => Self {
                selected: Some(p),
                hovered: self.hovered,
            },
            None => self,
        }
    }

    /// State after the pointer moves onto `plate` (or off every plate).
    #[must_use]
    pub const fn hover(self, plate: Option<PlateName>) -> Self {
        Self {
            selected: self.selected,
            hovered: plate,
        }
    }

    /// Whether `plate` is the current selection.
    pub fn is_selected(self, plate: PlateName) -> bool {
        self.selected == Some(plate)
    }

    /// Whether `plate` is under the pointer.
    pub fn is_hovered(self, plate: PlateName) -> bool {
        self.hovered == Some(plate)
    }
}

/// Style record for one plate polygon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct PlateStyle {
    /// Fill color of the polygon cap.
    pub cap_color: String,
    /// Color of the extruded side walls.
    pub side_color: String,
    /// Outline color.
    pub stroke_color: String,
    /// Outline width.
    pub stroke_width: f64,
    /// Extrusion altitude, as a fraction of the globe radius.
    pub altitude: f64,
}

/// Base legend color of a plate.
pub fn plate_color(plate: PlateName) -> &'static str {
    SCHEME_CATEGORY10
        .get(plate.index())
        .copied()
        .unwrap_or(FALLBACK_COLOR)
}

/// Style of `plate` under the given interaction state.
pub fn plate_style(plate: PlateName, state: InteractionState) -> PlateStyle {
    let color = plate_color(plate);
    let highlighted = state.is_selected(plate) || state.is_hovered(plate);

    PlateStyle {
        cap_color: if highlighted { color } else { TRANSPARENT_CAP }.to_owned(),
        side_color: SIDE_COLOR.to_owned(),
        stroke_color: color.to_owned(),
        stroke_width: STROKE_WIDTH,
        altitude: if state.is_selected(plate) {
            SELECTED_ALTITUDE
        } else {
            0.0
        },
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn each_plate_gets_a_distinct_color() {
        let mut colors: Vec<_> = PlateName::ALL.into_iter().map(plate_color).collect();
        colors.sort_unstable();
        colors.dedup();
        assert_eq!(colors.len(), PlateName::COUNT);
        assert!(!colors.contains(&FALLBACK_COLOR));
    }

    #[test]
    fn idle_plates_are_transparent_and_flat() {
        let style = plate_style(PlateName::Eurasia, InteractionState::new());
        assert_eq!(style.cap_color, TRANSPARENT_CAP);
        assert_eq!(style.stroke_color, "#d62728");
        assert_eq!(style.altitude, 0.0);
    }

    #[test]
    fn hover_colors_without_lifting() {
        let state = InteractionState::new().hover(Some(PlateName::Africa));
        let style = plate_style(PlateName::Africa, state);
        assert_eq!(style.cap_color, "#9467bd");
        assert_eq!(style.altitude, 0.0);

        let other = plate_style(PlateName::Pacific, state);
        assert_eq!(other.cap_color, TRANSPARENT_CAP);
    }

    #[test]
    fn selection_colors_and_lifts() {
        let state = InteractionState::new().select(Some(PlateName::Pacific));
        let style = plate_style(PlateName::Pacific, state);
        assert_eq!(style.cap_color, "#1f77b4");
        assert_eq!(style.altitude, SELECTED_ALTITUDE);
    }

    #[test]
    fn clicking_empty_space_keeps_selection() {
        let state = InteractionState::new()
            .select(Some(PlateName::Antarctica))
            .hover(None)
            .select(None);
        assert_eq!(state.selected, Some(PlateName::Antarctica));
        assert_eq!(state.hovered, None);
    }

    #[test]
    fn style_serializes_camel_case() {
        let style = plate_style(PlateName::SouthAmerica, InteractionState::new());
        let value = serde_json::to_value(&style).unwrap_or_default();
        assert!(value.get("capColor").is_some());
        assert!(value.get("strokeWidth").is_some());
    }
}
