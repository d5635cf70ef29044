//! Curated plate reference data.
//!
//! The catalog holds the hand-maintained facts that do not come from the
//! shapefile: two-letter plate codes, motion vectors, and the notable
//! boundary collisions with their historical earthquakes. Plate names map to
//! codes, and the motion and collision tables are keyed by code. A partial
//! catalog is expressed by removing entries and is rejected downstream.

use std::collections::BTreeMap;

use tectonic_types::{Collision, Earthquake, Motion, PlateName};

/// Curated reference tables.
#[derive(Debug, Clone, Default)]
pub struct PlateCatalog {
    /// Two-letter code per plate name.
    pub ids: BTreeMap<String, String>,
    /// Motion vector and rate per code.
    pub motions: BTreeMap<String, Motion>,
    /// Collisions per code. A code without an entry has no collisions.
    pub collisions: BTreeMap<String, Vec<Collision>>,
}

/// Helper to build an [`Earthquake`].
fn eq(year: i32, place: &str, mw: f64) -> Earthquake {
    Earthquake {
        year,
        place: place.to_owned(),
        mw,
    }
}

/// Helper to build a [`Collision`].
fn collision(with: &str, eqs: Vec<Earthquake>) -> Collision {
    Collision {
        with: with.to_owned(),
        eqs,
    }
}

/// Helper to build a [`Motion`].
const fn motion(dx: f64, dy: f64, rate: f64) -> Motion {
    Motion {
        vector: [dx, dy],
        rate,
    }
}

impl PlateCatalog {
    /// The curated table for the seven major plates.
    #[allow(clippy::too_many_lines)]
    pub fn curated() -> Self {
        let mut catalog = Self::default();

        catalog.insert(
            PlateName::Pacific,
            "PA",
            motion(-3.2, 1.1, 7.8),
            vec![
                collision(
                    "North America",
                    vec![
                        eq(1964, "Prince William Sound, Alaska", 9.2),
                        eq(2011, "Tohoku, Japan", 9.1),
                        eq(1952, "Kamchatka Peninsula", 9.0),
                    ],
                ),
                collision(
                    "Indo-Australia",
                    vec![
                        eq(2004, "Sumatra-Andaman", 9.1),
                        eq(2005, "Nias Island", 8.6),
                        eq(2012, "Indian Ocean", 8.6),
                    ],
                ),
            ],
        );

        catalog.insert(
            PlateName::NorthAmerica,
            "NA",
            motion(-1.0, 0.2, 2.1),
            vec![collision(
                "Pacific",
                vec![
                    eq(1906, "San Francisco", 7.9),
                    eq(1989, "Loma Prieta", 6.9),
                    eq(1994, "Northridge", 6.7),
                ],
            )],
        );

        catalog.insert(
            PlateName::SouthAmerica,
            "SA",
            motion(-1.1, 0.4, 1.8),
            vec![collision(
                "Nazca",
                vec![
                    eq(1960, "Valdivia, Chile", 9.5),
                    eq(2010, "Maule, Chile", 8.8),
                    eq(1868, "Arica, Peru", 8.5),
                ],
            )],
        );

        catalog.insert(
            PlateName::Eurasia,
            "EU",
            motion(0.8, 0.1, 2.2),
            vec![collision(
                "Africa",
                vec![
                    eq(1755, "Lisbon, Portugal", 8.5),
                    eq(1999, "Izmit, Turkey", 7.6),
                    eq(2023, "Turkey-Syria", 7.8),
                ],
            )],
        );

        catalog.insert(
            PlateName::Africa,
            "AF",
            motion(0.9, 0.5, 2.5),
            vec![collision(
                "Eurasia",
                vec![
                    eq(2023, "Morocco", 6.8),
                    eq(1980, "El Asnam, Algeria", 7.1),
                    eq(2003, "Boumerdes, Algeria", 6.8),
                ],
            )],
        );

        catalog.insert(
            PlateName::IndoAustralia,
            "IA",
            motion(2.8, 1.2, 6.2),
            vec![collision(
                "Pacific",
                vec![
                    eq(2004, "Sumatra-Andaman", 9.1),
                    eq(1861, "Sumatra", 8.5),
                    eq(2007, "Sumatra", 8.5),
                ],
            )],
        );

        catalog.insert(
            PlateName::Antarctica,
            "AN",
            motion(0.1, -0.2, 1.1),
            vec![collision(
                "Scotia",
                vec![
                    eq(1929, "South Sandwich Islands", 8.1),
                    eq(2003, "South Sandwich Islands", 7.6),
                    eq(1998, "Antarctic Peninsula", 8.1),
                ],
            )],
        );

        catalog
    }

    /// Add or replace every table entry for `plate`.
    ///
    /// Entries stored under a previous code for the same plate are dropped.
    pub fn insert(&mut self, plate: PlateName, id: &str, motion: Motion, collisions: Vec<Collision>) {
        let previous = self.ids.insert(plate.as_str().to_owned(), id.to_owned());
        if let Some(previous) = previous.filter(|previous| previous != id) {
            self.motions.remove(&previous);
            self.collisions.remove(&previous);
        }
        self.motions.insert(id.to_owned(), motion);
        self.collisions.insert(id.to_owned(), collisions);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;

    #[test]
    fn curated_covers_every_plate() {
        let catalog = PlateCatalog::curated();
        for plate in PlateName::ALL {
            let name = plate.as_str();
            let id = catalog.ids.get(name).unwrap();
            assert!(catalog.motions.contains_key(id), "{name} has no motion");
            assert!(
                !catalog.collisions.get(id).unwrap().is_empty(),
                "{name} has no collisions"
            );
        }
    }

    #[test]
    fn curated_ids_are_unique_two_letter_codes() {
        let catalog = PlateCatalog::curated();
        let ids: BTreeSet<&str> = catalog.ids.values().map(String::as_str).collect();
        assert_eq!(ids.len(), PlateName::COUNT);
        assert!(ids.iter().all(|id| id.len() == 2));
    }

    #[test]
    fn every_collision_lists_three_earthquakes() {
        let catalog = PlateCatalog::curated();
        for collisions in catalog.collisions.values() {
            for c in collisions {
                assert_eq!(c.eqs.len(), 3, "collision with {}", c.with);
            }
        }
    }

    #[test]
    fn pacific_motion_matches_table() {
        let catalog = PlateCatalog::curated();
        let pacific = catalog.motions.get("PA").unwrap();
        assert_eq!(pacific.vector, [-3.2, 1.1]);
        assert_eq!(pacific.rate, 7.8);
    }

    #[test]
    fn insert_replaces_existing_entries() {
        let mut catalog = PlateCatalog::curated();
        catalog.insert(PlateName::Africa, "AX", motion(1.0, 1.0, 1.0), Vec::new());
        assert_eq!(catalog.ids.get("Africa").map(String::as_str), Some("AX"));
        assert!(catalog.collisions.get("AX").unwrap().is_empty());
        assert_eq!(catalog.ids.len(), PlateName::COUNT);
        assert!(!catalog.motions.contains_key("AF"));
        assert!(!catalog.collisions.contains_key("AF"));
        assert_eq!(catalog.motions.len(), PlateName::COUNT);
    }

    #[test]
    fn motion_and_collision_tables_are_keyed_by_code() {
        let catalog = PlateCatalog::curated();
        let codes: BTreeSet<&String> = catalog.ids.values().collect();
        assert!(catalog.motions.keys().all(|k| codes.contains(k)));
        assert!(catalog.collisions.keys().all(|k| codes.contains(k)));
        assert!(!catalog.motions.contains_key("Pacific"));
    }
}
